use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the ginga actor.
#[derive(Error, Debug)]
pub enum ActorError {
    /// A configuration file could not be read from disk.
    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration file was read but is not valid TOML for our schema.
    #[error("Failed to parse config file {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// A camera token is not one of the known arm/spectrograph combinations.
    #[error("Invalid camera identifier: {0}")]
    InvalidCamera(String),

    /// A keyword payload does not have the shape its event kind requires.
    #[error("Malformed payload for {source_name}: {message}")]
    MalformedPayload { source_name: String, message: String },

    /// An exposure file could not be opened.
    #[error("Failed to open FITS file {path}: {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The requested header/data unit is not present in the file.
    #[error("HDU {index} not found in {path}")]
    HduNotFound { path: PathBuf, index: usize },

    /// The remote viewer does not know the requested channel.
    #[error("Channel not available: {0}")]
    ChannelUnavailable(String),

    /// The remote viewer rejected a request or could not be reached.
    #[error("Viewer error: {0}")]
    Viewer(String),

    /// A hub line could not be parsed.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the ginga crates.
pub type Result<T> = std::result::Result<T, ActorError>;
