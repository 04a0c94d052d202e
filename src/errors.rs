/*!
 * Error types for the subcorpus application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions. A missing alignment
 * is never an error: both aligners return `None` for a miss.
 */

use thiserror::Error;

/// Errors raised while turning raw subtitle content into cues
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A block could not be split into sequence id, time range and text
    #[error("Malformed cue block #{block}: {reason}")]
    MalformedBlock {
        /// 1-based position of the block inside the file
        block: usize,
        /// What was wrong with it
        reason: String,
    },

    /// A timecode did not have the `H:MM:SS,mmm` shape
    #[error("Invalid timecode '{value}': {reason}")]
    InvalidTimecode {
        /// The offending timecode text
        value: String,
        /// What was wrong with it
        reason: String,
    },
}

/// Errors raised when alignment settings are rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Time tolerance must be positive, got {0} ms")]
    NonPositiveTolerance(i64),

    #[error("Similarity acceptance must be a positive finite fraction, got {0}")]
    NonPositiveAcceptance(f64),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors that can occur when talking to the translation service
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error obtaining or using credentials
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// Every allowed attempt failed
    #[error("Request failed after {attempts} attempts: {message}")]
    RetriesExhausted {
        attempts: u32,
        message: String,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// A subtitle file could not be parsed
    #[error("Failed to parse subtitle file {file}: {source}")]
    Subtitle {
        file: String,
        source: ParseError,
    },

    /// Rejected configuration
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Error from the translation provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// A corpus row could not be read or written
    #[error("Corpus error: {0}")]
    Corpus(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
