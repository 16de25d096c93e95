use thiserror::Error;

/// Every connector error is classified `Transient` or `Fatal` at the point
/// it's raised (spec §4.1 "Errors": the kernel's retry policy keys off this
/// distinction — I/O, deadlock, connection reset, and provider-specific
/// retryable codes are `Transient`; everything else reaching the kernel is
/// `Fatal`, per the §7 taxonomy's catch-all bucket).
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("transient I/O error: {0}")]
    Transient(String),

    #[error("fatal error: {0}")]
    Fatal(String),

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("missing required connection property: {0}")]
    MissingProperty(String),

    #[error("keyring resolution failed for alias `{0}`: {1}")]
    KeyringResolution(String, String),

    #[error("query safety violation: {0}")]
    QuerySafety(String),
}

impl ConnectorError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ConnectorError::Transient(_))
    }
}

pub type Result<T> = std::result::Result<T, ConnectorError>;

/// Maps a raw I/O error onto the Transient bucket — the common case for
/// file adapters (disk hiccups, pipe resets).
impl From<std::io::Error> for ConnectorError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind::*;
        match err.kind() {
            Interrupted | TimedOut | WouldBlock | ConnectionReset | ConnectionAborted | BrokenPipe => {
                ConnectorError::Transient(err.to_string())
            }
            _ => ConnectorError::Fatal(err.to_string()),
        }
    }
}

impl From<csv::Error> for ConnectorError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            ConnectorError::Transient(err.to_string())
        } else {
            ConnectorError::Fatal(err.to_string())
        }
    }
}
