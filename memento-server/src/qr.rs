//! QR codes for guest entry
//!
//! Hosts print the code of the guest link on cards and table signs; guests
//! scan it to reach the submission page.

use image::codecs::png::PngEncoder;
use image::{DynamicImage, Luma};
use memento_common::{Error, Result};
use qrcode::{EcLevel, QrCode};

/// Edge length in pixels unless the caller asks for another
pub const DEFAULT_SIZE: u32 = 512;
pub const MIN_SIZE: u32 = 128;
pub const MAX_SIZE: u32 = 2048;

/// Render `data` as a black-on-white PNG of at least `size` pixels square
///
/// The size is clamped into [`MIN_SIZE`]..=[`MAX_SIZE`]. A quiet zone is
/// always included.
pub fn render_png(data: &str, size: u32) -> Result<Vec<u8>> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::M)
        .map_err(|e| Error::InvalidInput(format!("Cannot encode QR code: {}", e)))?;
    let size = size.clamp(MIN_SIZE, MAX_SIZE);
    let image = code
        .render::<Luma<u8>>()
        .min_dimensions(size, size)
        .quiet_zone(true)
        .build();

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(image)
        .write_with_encoder(PngEncoder::new(&mut png))
        .map_err(|e| Error::Internal(format!("Failed to encode QR code: {}", e)))?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_with_quiet_zone() {
        let png = render_png("https://memento.example.com/e/ABC-DEFGH", DEFAULT_SIZE).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

        let image = image::load_from_memory(&png).unwrap().to_luma8();
        assert!(image.width() >= DEFAULT_SIZE);
        assert_eq!(image.width(), image.height());
        assert_eq!(image.get_pixel(0, 0)[0], 255);
        assert!(image.pixels().any(|p| p[0] == 0));
    }

    #[test]
    fn test_size_is_clamped() {
        let tiny = render_png("https://memento.example.com/e/ABC-DEFGH", 1).unwrap();
        let image = image::load_from_memory(&tiny).unwrap();
        assert!(image.width() >= MIN_SIZE);
    }
}
