//! Crate-level error type

use crate::directory::DirectoryError;

/// Convenience result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for channel operations
#[derive(Debug)]
pub enum Error {
    /// Directory service failure
    Directory(DirectoryError),
    /// Tracker URI could not be parsed
    InvalidTracker(url::ParseError),
    /// Operation on a closed channel
    ChannelClosed,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Directory(e) => write!(f, "directory error: {e}"),
            Error::InvalidTracker(e) => write!(f, "invalid tracker uri: {e}"),
            Error::ChannelClosed => write!(f, "channel is closed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Directory(e) => Some(e),
            Error::InvalidTracker(e) => Some(e),
            Error::ChannelClosed => None,
        }
    }
}

impl From<DirectoryError> for Error {
    fn from(e: DirectoryError) -> Self {
        Error::Directory(e)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::InvalidTracker(e)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Error::ChannelClosed.to_string(), "channel is closed");

        let id = Uuid::nil();
        let err = Error::from(DirectoryError::NotFound(id));
        assert!(err.to_string().starts_with("directory error:"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_from_url_parse_error() {
        let parse_err = url::Url::parse("not a uri").unwrap_err();
        let err = Error::from(parse_err);
        assert!(matches!(err, Error::InvalidTracker(_)));
        assert!(err.source().is_some());
    }
}
