// Error handling for the player engine

use crate::state::PlayerId;
use std::fmt;

/// Engine error types
///
/// Every variant carries a stable numeric code (see [`AudioError::code`]) so a
/// transport can map failures without looking at message text.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// No player with this id is registered
    UnknownPlayer(PlayerId),

    /// Operation invoked before `load` completed or after `dispose`
    NotInitialized(PlayerId),

    /// `load` was invoked twice on the same handle
    AlreadyInitialized(PlayerId),

    /// The asset or file could not be opened
    SourceUnavailable(String),

    /// A native primitive failed to build or transition
    BackendFailure(String),

    /// Argument outside its accepted domain
    InvalidArgument(String),

    /// The installed delegate does not implement the operation
    NotImplemented(String),
}

impl AudioError {
    pub const UNKNOWN_PLAYER: i32 = 1;
    pub const NOT_INITIALIZED: i32 = 2;
    pub const ALREADY_INITIALIZED: i32 = 3;
    pub const SOURCE_UNAVAILABLE: i32 = 4;
    pub const BACKEND_FAILURE: i32 = 5;
    pub const INVALID_ARGUMENT: i32 = 6;
    pub const NOT_IMPLEMENTED: i32 = 7;

    /// Stable error code, distinct per variant
    pub fn code(&self) -> i32 {
        match self {
            AudioError::UnknownPlayer(_) => Self::UNKNOWN_PLAYER,
            AudioError::NotInitialized(_) => Self::NOT_INITIALIZED,
            AudioError::AlreadyInitialized(_) => Self::ALREADY_INITIALIZED,
            AudioError::SourceUnavailable(_) => Self::SOURCE_UNAVAILABLE,
            AudioError::BackendFailure(_) => Self::BACKEND_FAILURE,
            AudioError::InvalidArgument(_) => Self::INVALID_ARGUMENT,
            AudioError::NotImplemented(_) => Self::NOT_IMPLEMENTED,
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AudioError::UnknownPlayer(id) => write!(f, "Unknown player: {}", id),
            AudioError::NotInitialized(id) => write!(f, "Player {} is not initialized", id),
            AudioError::AlreadyInitialized(id) => {
                write!(f, "Player {} is already initialized", id)
            }
            AudioError::SourceUnavailable(msg) => write!(f, "Source unavailable: {}", msg),
            AudioError::BackendFailure(msg) => write!(f, "Backend failure: {}", msg),
            AudioError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            AudioError::NotImplemented(msg) => write!(f, "Not implemented: {}", msg),
        }
    }
}

impl std::error::Error for AudioError {}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, AudioError>;

impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        AudioError::SourceUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            AudioError::UnknownPlayer(PlayerId(0)),
            AudioError::NotInitialized(PlayerId(0)),
            AudioError::AlreadyInitialized(PlayerId(0)),
            AudioError::SourceUnavailable(String::new()),
            AudioError::BackendFailure(String::new()),
            AudioError::InvalidArgument(String::new()),
            AudioError::NotImplemented(String::new()),
        ];
        let mut codes: Vec<i32> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
        assert!(codes.iter().all(|c| *c > 0));
    }

    #[test]
    fn test_io_error_maps_to_source_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.mp3");
        let err: AudioError = io.into();
        assert_eq!(err.code(), AudioError::SOURCE_UNAVAILABLE);
    }
}
