use thiserror::Error;

pub type Result<T> = std::result::Result<T, StyluaxError>;

#[derive(Error, Debug)]
pub enum StyluaxError {
    #[error("stylua is not installed")]
    NotInstalled,

    #[error("Could not read ignore file {path}: {error}")]
    IgnoreFile { path: String, error: String },

    #[error("Failed to run {cmd}: {error}")]
    Invocation { cmd: String, error: String },

    #[error("Release fetch failed: {0}")]
    RemoteFetch(String),

    #[error("Install error: {0}")]
    Install(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to send event: {0}")]
    EventSend(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
