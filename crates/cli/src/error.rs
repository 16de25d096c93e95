use thiserror::Error;

/// Composes every layer's error into the CLI's exit-code mapping (spec §6
/// "Exit codes": `0` success, `1` job/config/runtime error, `2` SQL safety
/// violation, `130` cancellation).
#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to parse arguments: {0}")]
    Args(#[from] clap::Error),

    #[error("transformer directive `{0}` requires a value")]
    MissingDirectiveValue(String),

    #[error("`{0}` has no preceding transformer directive to modify")]
    DanglingDirectiveOption(String),

    #[error("{0}")]
    Model(#[from] model::ModelError),

    #[error("{0}")]
    Config(#[from] engine_config::ConfigError),

    #[error("{0}")]
    Connector(#[from] connectors::ConnectorError),

    #[error("{0}")]
    Planner(#[from] planner::PlannerError),

    #[error("{0}")]
    Engine(#[from] engine_core::error::EngineError),

    #[error("query safety violation: {0}")]
    QuerySafety(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, CliError::Engine(engine_core::error::EngineError::Cancelled))
    }

    /// Spec §6's exit-code table.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::QuerySafety(_) => 2,
            _ if self.is_cancellation() => 130,
            _ => 1,
        }
    }
}
