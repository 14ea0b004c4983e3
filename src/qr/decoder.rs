//! QR code decoder using rqrr

use crate::error::{Error, Result};
use crate::qr::QrPayload;
use image::{DynamicImage, GrayImage};

/// Software QR decoder for captured frames
#[derive(Debug, Default)]
pub struct QrDecoder {}

impl QrDecoder {
    /// Create a new QR decoder with default settings
    pub fn new() -> Self {
        Self {}
    }

    /// Decode the first QR code in a frame
    pub fn decode(&self, frame: &DynamicImage) -> Result<QrPayload> {
        self.decode_gray(&frame.to_luma8())
    }

    /// Decode the first QR code in a grayscale frame
    pub fn decode_gray(&self, frame: &GrayImage) -> Result<QrPayload> {
        let (width, height) = frame.dimensions();
        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
                frame.get_pixel(x as u32, y as u32)[0]
            });

        let grids = prepared.detect_grids();
        let Some(grid) = grids.first() else {
            return Err(Error::NoQrCodeFound);
        };

        let (meta, content) = grid
            .decode()
            .map_err(|e| Error::QrDecode(format!("Decode failed: {:?}", e)))?;
        tracing::debug!(
            version = ?meta.version,
            ecc_level = meta.ecc_level,
            length = content.len(),
            "decoded QR code"
        );
        Ok(QrPayload::from_bytes(content.into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use qrcode::QrCode;

    #[test]
    fn test_decodes_rendered_code() {
        let code = QrCode::new(b"https://example.com/menu").unwrap();
        let image = code.render::<Luma<u8>>().min_dimensions(300, 300).build();

        let payload = QrDecoder::new()
            .decode(&DynamicImage::ImageLuma8(image))
            .unwrap();
        assert_eq!(payload.link(), Some("https://example.com/menu"));
    }

    #[test]
    fn test_blank_frame_has_no_code() {
        let blank = GrayImage::from_pixel(200, 200, Luma([255u8]));
        let err = QrDecoder::new().decode_gray(&blank).unwrap_err();
        assert!(matches!(err, Error::NoQrCodeFound));
    }
}
