use std::io;
use thiserror::Error;

/// User-supplied target time could not be turned into a time of day.
///
/// The display text is what the target dialog shows, whatever went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Please enter time in HH:MM or HH:MM:SS format (24-hour)")]
pub struct FormatError {
    pub input: String,
}

impl FormatError {
    pub fn new(input: &str) -> Self {
        Self { input: input.into() }
    }
}

/// Reading or writing the config file failed. Never shown to the user.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("config file I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("config file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config file root is not a JSON object")]
    NotAnObject,
}
