//! Error types for flashcam operations

use crate::permission::PermissionKind;
use thiserror::Error;

/// Result type alias using flashcam's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for flashcam operations
#[derive(Error, Debug)]
pub enum Error {
    /// A capability was refused by the user or the OS
    #[error("Permission denied: {0}")]
    PermissionDenied(PermissionKind),

    /// Photo, video or media-library save failed
    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    /// A collaborator API is missing on this platform
    #[error("Capability unavailable: {0}")]
    Unavailable(String),

    /// QR code decoding failed
    #[error("Failed to decode QR code: {0}")]
    QrDecode(String),

    /// No QR code found in frame
    #[error("No QR code found in frame")]
    NoQrCodeFound,

    /// Unparseable event in a replay script
    #[error("Invalid event '{0}'")]
    InvalidEvent(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image processing error
    #[error("Image processing error: {0}")]
    Image(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the error came from a permission refusal.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Error::PermissionDenied(_))
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(format!("JSON error: {}", e))
    }
}
