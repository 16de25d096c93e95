//! Error taxonomy for the Pipeline Kernel and Transformer framework (spec
//! §7). Every error crossing the kernel boundary is classified `Transient`
//! or `Fatal` at the point it's raised, mirroring `connectors::ConnectorError`
//! — the kernel's retry policy (§4.1) keys off exactly this distinction.

use connectors::ConnectorError;
use expression_engine::ExpressionError;
use model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("transient error: {0}")]
    Transient(String),

    #[error("fatal error: {0}")]
    Fatal(String),

    #[error("cancelled")]
    Cancelled,
}

impl EngineError {
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Transient(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, EngineError::Cancelled)
    }
}

impl From<ConnectorError> for EngineError {
    fn from(err: ConnectorError) -> Self {
        match err {
            ConnectorError::Transient(msg) => EngineError::Transient(msg),
            other => EngineError::Fatal(other.to_string()),
        }
    }
}

impl From<ModelError> for EngineError {
    fn from(err: ModelError) -> Self {
        EngineError::Fatal(err.to_string())
    }
}

impl From<ExpressionError> for EngineError {
    fn from(err: ExpressionError) -> Self {
        EngineError::Fatal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
