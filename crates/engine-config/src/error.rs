use thiserror::Error;

/// Errors raised while loading/saving job configuration or rendering
/// reports (spec §7 "Config" bucket: malformed YAML, conflicting
/// strategy/key — everything caught before any row moves).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read job file `{0}`: {1}")]
    Read(String, std::io::Error),

    #[error("failed to write job file `{0}`: {1}")]
    Write(String, std::io::Error),

    #[error("malformed job YAML: {0}")]
    MalformedYaml(#[from] serde_yaml::Error),

    #[error("failed to write metrics file `{0}`: {1}")]
    MetricsWrite(String, std::io::Error),

    #[error("failed to serialize metrics: {0}")]
    MetricsSerialize(#[from] serde_json::Error),

    #[error("{0}")]
    Model(#[from] model::ModelError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
