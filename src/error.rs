//! Error types for the audio substitution engine

use thiserror::Error;

/// Main error type for the engine
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("World query error: {0}")]
    Query(#[from] QueryError),

    #[error("Signal error: {0}")]
    Signal(#[from] SignalError),

    #[error("Integration error: {0}")]
    Integration(#[from] IntegrationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid remap for '{content}': {reason}")]
    InvalidRemap { content: String, reason: String },
}

/// World query errors
///
/// `RegionNotLoaded` is transient: the caller skips the location for the
/// current tick and the next scan retries naturally.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Region not loaded at {0}")]
    RegionNotLoaded(String),

    #[error("World backend error: {0}")]
    Backend(String),
}

impl QueryError {
    /// Whether this failure is expected to resolve on a later scan
    pub fn is_transient(&self) -> bool {
        matches!(self, QueryError::RegionNotLoaded(_))
    }
}

/// Outbound signal parse errors
///
/// Always fail open: a signal the filter cannot understand is passed
/// through unmodified.
#[derive(Error, Debug)]
pub enum SignalError {
    #[error("Malformed signal payload: {0}")]
    Malformed(String),

    #[error("Signal missing field: {0}")]
    MissingField(&'static str),
}

/// Packet-interception integration errors
#[derive(Error, Debug)]
pub enum IntegrationError {
    #[error("Outbound signal channel unavailable")]
    Unavailable,

    #[error("Failed to install signal interceptor: {0}")]
    Install(String),
}

/// Result type alias for the engine
pub type Result<T> = std::result::Result<T, Error>;
