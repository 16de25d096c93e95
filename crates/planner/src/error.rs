use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("unsupported dialect: {0}")]
    UnsupportedDialect(String),

    #[error("no columns to render for {0}")]
    EmptySchema(String),

    #[error("cannot render native type for {0}: no mapping for {1}")]
    UnmappedType(String, String),
}

pub type Result<T> = std::result::Result<T, PlannerError>;
