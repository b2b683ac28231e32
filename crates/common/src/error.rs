//! Error types shared by the extractors and the folder walker.

use thiserror::Error;

/// A Drive request failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriveError {
    /// The request never produced a response (connection, TLS, timeout).
    #[error("{op}: request failed: {message}")]
    Request { op: String, message: String },

    /// Drive answered with a non-success status.
    #[error("{op}: HTTP {status}: {message}")]
    Status { op: String, status: u16, message: String },

    /// The response body could not be decoded.
    #[error("{op}: invalid response: {message}")]
    Decode { op: String, message: String },
}

impl DriveError {
    pub fn request(op: impl Into<String>, message: impl ToString) -> Self {
        Self::Request { op: op.into(), message: message.to_string() }
    }

    pub fn decode(op: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode { op: op.into(), message: message.to_string() }
    }
}

/// Text extraction failed for one file.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error(transparent)]
    Drive(#[from] DriveError),

    #[error("extraction failed: {0}")]
    Failed(String),

    #[error("no content extracted")]
    Empty,
}

/// Errors that abort a folder walk.
#[derive(Error, Debug)]
pub enum WalkError {
    /// Listing a folder failed; there is nothing to enumerate below it.
    #[error("listing folder {folder_id} failed: {source}")]
    Listing {
        folder_id: String,
        #[source]
        source: DriveError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drive_error_display() {
        let err = DriveError::Status {
            op: "files.list".into(),
            status: 403,
            message: "rate limited".into(),
        };
        assert_eq!(err.to_string(), "files.list: HTTP 403: rate limited");
        assert_eq!(
            DriveError::request("files.get", "connection reset").to_string(),
            "files.get: request failed: connection reset"
        );
    }

    #[test]
    fn test_extract_error_wraps_drive_error() {
        let err: ExtractError = DriveError::decode("files.export", "bad body").into();
        assert!(matches!(err, ExtractError::Drive(_)));
        assert_eq!(err.to_string(), "files.export: invalid response: bad body");
    }

    #[test]
    fn test_unsupported_type_display() {
        let err = ExtractError::UnsupportedType("image/png".into());
        assert_eq!(err.to_string(), "unsupported file type: image/png");
    }

    #[test]
    fn test_walk_error_keeps_source() {
        use std::error::Error as _;
        let err = WalkError::Listing {
            folder_id: "root".into(),
            source: DriveError::request("files.list", "timeout"),
        };
        assert!(err.to_string().starts_with("listing folder root failed"));
        assert!(err.source().is_some());
    }
}
