//! QR code link detection
//!
//! Most cameras report barcodes natively; [`QrDecoder`] is the software
//! fallback that reads a QR code out of an already-captured frame.

mod decoder;

pub use decoder::QrDecoder;

use serde::{Deserialize, Serialize};

/// A decoded QR code payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayload {
    /// The raw decoded data
    pub data: Vec<u8>,
    /// String representation if valid UTF-8
    pub text: Option<String>,
}

impl QrPayload {
    /// Create a new QR payload from raw bytes
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let text = String::from_utf8(data.clone()).ok();
        Self { data, text }
    }

    /// Get the payload as a string, if valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// The payload as a trimmed http(s) link, if it is one
    pub fn link(&self) -> Option<&str> {
        let text = self.as_str()?.trim();
        let lower = text.get(..8).unwrap_or(text).to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Some(text)
        } else {
            None
        }
    }

    /// Whether the payload opens in a browser
    pub fn is_link(&self) -> bool {
        self.link().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_are_recognised() {
        let payload = QrPayload::from_bytes(b" HTTPS://Example.com/menu ".to_vec());
        assert_eq!(payload.link(), Some("HTTPS://Example.com/menu"));

        let plain = QrPayload::from_bytes(b"WIFI:S:home;T:WPA;P:secret;;".to_vec());
        assert!(!plain.is_link());
        assert_eq!(plain.as_str(), Some("WIFI:S:home;T:WPA;P:secret;;"));
    }

    #[test]
    fn test_binary_payload_is_not_a_link() {
        let payload = QrPayload::from_bytes(vec![0xFF, 0xFE]);
        assert!(payload.as_str().is_none());
        assert!(!payload.is_link());
    }
}
