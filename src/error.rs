//! Error types for the terabox_dl crate.

use thiserror::Error;

use crate::models::ErrorPayload;

/// Message used when the session cookie is missing, malformed or rejected.
pub const INVALID_CREDENTIAL: &str = "invalid credential";

/// Message used when a share link cannot be parsed or no longer resolves.
pub const INVALID_LINK: &str = "invalid link";

/// Message used when the destination directory or file cannot be written.
pub const CANNOT_WRITE: &str = "cannot write to destination";

/// Errors that can occur when talking to TeraBox.
///
/// Every failure of [`resolve_info`](crate::TeraboxClient::resolve_info) is a
/// `Resolution` error and every failure of
/// [`download`](crate::TeraboxClient::download) is a `Download` error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TeraboxError {
    #[error("Resolution failed: {message}")]
    Resolution { message: String },

    #[error("Download failed: {message}")]
    Download { message: String },
}

impl TeraboxError {
    /// Build an error for a failed share link resolution.
    pub fn resolution(message: impl Into<String>) -> Self {
        Self::Resolution {
            message: message.into(),
        }
    }

    /// Build an error for a failed download.
    pub fn download(message: impl Into<String>) -> Self {
        Self::Download {
            message: message.into(),
        }
    }

    /// The bare message, without the variant prefix used by `Display`.
    pub fn message(&self) -> &str {
        match self {
            Self::Resolution { message } | Self::Download { message } => message,
        }
    }

    /// Convert into the `{"error": "..."}` payload.
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            error: self.message().to_string(),
        }
    }
}

/// Result type alias for TeraboxError.
pub type Result<T> = std::result::Result<T, TeraboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_strips_prefix() {
        let err = TeraboxError::resolution(INVALID_LINK);
        assert_eq!(err.message(), "invalid link");
        assert_eq!(err.to_string(), "Resolution failed: invalid link");
    }

    #[test]
    fn test_payload_shape() {
        let err = TeraboxError::download(CANNOT_WRITE);
        let json = serde_json::to_value(err.to_payload()).unwrap();
        assert_eq!(json, serde_json::json!({"error": "cannot write to destination"}));
    }
}
