//! Error types for Roomverb

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoomverbError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown game object: {0}")]
    UnknownGameObject(u64),

    #[error("Unknown room: {0}")]
    UnknownRoom(u64),

    #[error("Unknown portal: {0}")]
    UnknownPortal(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Opaque "not success" outcome of a sound engine call.
///
/// Only success vs. failure is ever branched on; the status code is carried
/// so it can be logged.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineFailure {
    #[error("sound engine returned status {0}")]
    Status(i32),

    #[error("sound engine command channel disconnected")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, RoomverbError>;

pub type EngineResult<T = ()> = std::result::Result<T, EngineFailure>;
