use std::path::PathBuf;

/// Result alias carrying the crate-wide [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Failures that can cross a module boundary.
///
/// The resolvers (metadata, lyrics, notifications) never produce one of these:
/// they degrade to defaults or sentinels instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("could not read folder {path}: {source}")]
    Listing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("background task failed: {0}")]
    Task(String),
}

/// Why the audio sink refused a request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SinkError {
    #[error("failed to open {path}: {reason}")]
    Open { path: PathBuf, reason: String },

    #[error("unsupported or corrupt audio in {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("audio device unavailable: {0}")]
    Device(String),

    #[error("seek failed: {0}")]
    Seek(String),

    #[error("no track loaded")]
    NoSource,
}

impl From<toml::de::Error> for Error {
    fn from(value: toml::de::Error) -> Self {
        Self::Config(value.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(value: toml::ser::Error) -> Self {
        Self::Config(value.to_string())
    }
}
