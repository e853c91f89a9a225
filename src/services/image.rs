//! Image intake
//!
//! Validates an uploaded file and prepares it for inline attachment:
//! size limit first (before anything else touches the bytes), then type
//! detection by magic number, then base64 and a `data:` preview URL.

use crate::error::AppError;
use crate::session::{ImageInput, ImageKind};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];

/// Reads uploads into [`ImageInput`]s
#[derive(Debug, Clone, Copy)]
pub struct ImageReader {
    max_bytes: usize,
}

impl ImageReader {
    /// Create a reader with the given size limit
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    /// Size limit in bytes
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Validate and encode an upload
    ///
    /// # Errors
    /// * `AppError::ImageTooLarge` if the file is over the limit
    /// * `AppError::UnsupportedImage` if it is not a PNG or JPEG
    pub fn read(&self, bytes: Vec<u8>) -> Result<ImageInput, AppError> {
        if bytes.len() > self.max_bytes {
            return Err(AppError::ImageTooLarge {
                size: bytes.len(),
                limit_mb: self.max_bytes.div_ceil(1024 * 1024),
            });
        }

        let kind = detect_kind(&bytes).ok_or_else(|| {
            AppError::UnsupportedImage("please upload a PNG or JPEG image".to_string())
        })?;

        let base64 = BASE64.encode(&bytes);
        let preview_url = format!("data:{};base64,{}", kind.mime_type(), base64);

        Ok(ImageInput {
            bytes,
            kind,
            base64,
            preview_url,
        })
    }
}

/// Detect PNG/JPEG from the leading bytes
pub fn detect_kind(bytes: &[u8]) -> Option<ImageKind> {
    if bytes.starts_with(PNG_MAGIC) {
        Some(ImageKind::Png)
    } else if bytes.starts_with(JPEG_MAGIC) {
        Some(ImageKind::Jpeg)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(len: usize) -> Vec<u8> {
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.resize(len, 0);
        bytes
    }

    #[test]
    fn test_reads_png() {
        let image = ImageReader::new(1024).read(png(16)).unwrap();
        assert_eq!(image.kind, ImageKind::Png);
        assert_eq!(BASE64.decode(&image.base64).unwrap(), png(16));
        assert!(image.preview_url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_reads_jpeg() {
        let bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10];
        let image = ImageReader::new(1024).read(bytes).unwrap();
        assert_eq!(image.kind, ImageKind::Jpeg);
    }

    #[test]
    fn test_rejects_oversized_before_type_check() {
        let reader = ImageReader::new(4 * 1024 * 1024);
        let err = reader.read(vec![0u8; 5 * 1024 * 1024]).unwrap_err();
        assert!(err.to_string().contains("exceeds 4MB"), "{}", err);
    }

    #[test]
    fn test_accepts_exactly_the_limit() {
        let reader = ImageReader::new(4 * 1024 * 1024);
        assert!(reader.read(png(4 * 1024 * 1024)).is_ok());
    }

    #[test]
    fn test_rejects_unknown_type() {
        let err = ImageReader::new(1024).read(b"GIF89a....".to_vec()).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedImage(_)));
    }
}
