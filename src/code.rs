//! # Code Image Provider
//!
//! Turns the invoice's code payload into a PNG for the footer. The composer
//! only sees the [`CodeImageProvider`] trait; [`QrCodeProvider`] is the
//! implementation used for rendered PDFs.

use image::{GrayImage, ImageEncoder, Luma};
use qrcode::{Color, EcLevel, QrCode};

use crate::error::{InvoiceError, Result};

/// Modules of white border around the symbol.
const QUIET_ZONE: u32 = 4;

/// Encodes a payload as a square PNG image.
pub trait CodeImageProvider {
    fn encode(&self, payload: &str) -> Result<Vec<u8>>;
}

/// QR code rasterized to a grayscale PNG.
#[derive(Debug, Clone)]
pub struct QrCodeProvider {
    /// Target pixels per side; the actual side is the nearest whole multiple
    /// of the module count.
    pub pixels: u32,
    pub ec_level: EcLevel,
}

impl QrCodeProvider {
    pub fn new(pixels: u32) -> Self {
        Self {
            pixels,
            ec_level: EcLevel::M,
        }
    }
}

impl CodeImageProvider for QrCodeProvider {
    fn encode(&self, payload: &str) -> Result<Vec<u8>> {
        let code = QrCode::with_error_correction_level(payload.as_bytes(), self.ec_level)
            .map_err(|e| InvoiceError::Backend(format!("QR encoding failed: {}", e)))?;

        let modules = code.width() as u32;
        let colors = code.to_colors();
        let total = modules + 2 * QUIET_ZONE;
        let scale = (self.pixels / total).max(1);
        let side = total * scale;

        let img = GrayImage::from_fn(side, side, |x, y| {
            let mx = (x / scale) as i64 - QUIET_ZONE as i64;
            let my = (y / scale) as i64 - QUIET_ZONE as i64;
            let dark = mx >= 0
                && my >= 0
                && (mx as u32) < modules
                && (my as u32) < modules
                && colors[(my as u32 * modules + mx as u32) as usize] == Color::Dark;
            Luma([if dark { 0u8 } else { 255u8 }])
        });

        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        encoder
            .write_image(img.as_raw(), side, side, image::ColorType::L8)
            .map_err(|e| InvoiceError::Backend(format!("PNG encoding failed: {}", e)))?;

        tracing::debug!(modules, side, "encoded QR code");
        Ok(buf)
    }
}
