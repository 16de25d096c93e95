use thiserror::Error;

/// Errors raised constructing or validating the data model itself — not the
/// I/O or data errors raised moving rows through it (those live in the
/// crates that actually perform I/O).
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unrecognized endpoint syntax: {0}")]
    UnknownEndpoint(String),

    #[error("malformed endpoint location: {0}")]
    MalformedEndpoint(String),

    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("conflicting configuration: {0}")]
    Conflict(String),
}
