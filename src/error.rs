//! Error types for parley

use thiserror::Error;

/// Result type alias for parley operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in parley
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (fatal, aborts before the session loop starts)
    #[error("configuration error: {0}")]
    Config(String),

    /// Chat completion error (per-turn, turn abandoned, session continues)
    #[error("completion error: {0}")]
    Completion(String),

    /// Speech synthesis error
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Audio device / playback error
    #[error("audio error: {0}")]
    Audio(String),

    /// Transcript persistence error
    #[error("transcript error: {0}")]
    Transcript(String),

    /// Prompt input error
    #[error("input error: {0}")]
    Input(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
