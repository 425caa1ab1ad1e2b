use std::path::PathBuf;
use thiserror::Error;

/// Failures in the collaborators around the engine. The engine itself has none.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed detection record on line {line}: {source}")]
    Record {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("bad timestamp {value} on line {line}: expected 0 s up to one year")]
    Timestamp { line: usize, value: f64 },

    #[error("invalid config file {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("deterrent player failed to start: {0}")]
    Deterrent(String),
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
