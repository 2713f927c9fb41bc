//! # Image Decoding
//!
//! Prepares PNG images for PDF embedding. Grayscale images without alpha
//! (the code image) stay single-channel; everything else is decoded to RGB
//! pixels with a separate alpha channel for SMask transparency.

use std::io::Cursor;

use crate::error::{InvoiceError, Result};

/// A decoded image ready for PDF embedding.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub pixel_data: ImagePixelData,
    pub width_px: u32,
    pub height_px: u32,
}

/// The pixel data in a format the PDF serializer can consume directly.
#[derive(Debug, Clone)]
pub enum ImagePixelData {
    /// width * height bytes, DeviceGray.
    Gray(Vec<u8>),
    /// Decoded RGB pixels + optional alpha channel.
    Rgb {
        /// width * height * 3 bytes (RGB)
        rgb: Vec<u8>,
        /// width * height bytes (grayscale alpha). None if fully opaque.
        alpha: Option<Vec<u8>>,
    },
}

fn is_png(data: &[u8]) -> bool {
    data.len() >= 4 && data[0] == 0x89 && data[1] == 0x50 && data[2] == 0x4E && data[3] == 0x47
}

/// Decode PNG bytes.
pub fn decode_png(data: &[u8]) -> Result<LoadedImage> {
    if !is_png(data) {
        return Err(InvoiceError::Backend(
            "unsupported image format (expected PNG)".to_string(),
        ));
    }

    let img = image::io::Reader::with_format(Cursor::new(data), image::ImageFormat::Png)
        .decode()
        .map_err(|e| InvoiceError::Backend(format!("failed to decode PNG: {}", e)))?;

    if matches!(img.color(), image::ColorType::L8 | image::ColorType::L16) {
        let luma = img.to_luma8();
        let (width, height) = (luma.width(), luma.height());
        return Ok(LoadedImage {
            pixel_data: ImagePixelData::Gray(luma.into_raw()),
            width_px: width,
            height_px: height,
        });
    }

    let rgba = img.to_rgba8();
    let (width, height) = (rgba.width(), rgba.height());
    let pixel_count = (width * height) as usize;
    let mut rgb = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    let mut has_transparency = false;

    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel[3]);
        if pixel[3] != 255 {
            has_transparency = true;
        }
    }

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Rgb {
            rgb,
            alpha: if has_transparency { Some(alpha) } else { None },
        },
        width_px: width,
        height_px: height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(raw: &[u8], w: u32, h: u32, color: image::ColorType) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, raw, w, h, color).unwrap();
        buf
    }

    #[test]
    fn test_is_png() {
        assert!(is_png(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(!is_png(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!is_png(&[0x89, 0x50]));
    }

    #[test]
    fn test_non_png_is_backend_error() {
        let err = decode_png(&[0xFF, 0xD8, 0xFF, 0xE0]).unwrap_err();
        assert!(matches!(err, InvoiceError::Backend(_)));
    }

    #[test]
    fn test_truncated_png_is_backend_error() {
        assert!(decode_png(b"\x89PNG\r\n\x1a\nstub").is_err());
    }

    #[test]
    fn test_gray_png_stays_gray() {
        let buf = encode(&[0, 255, 255, 0], 2, 2, image::ColorType::L8);
        let loaded = decode_png(&buf).unwrap();
        assert_eq!(loaded.width_px, 2);
        match loaded.pixel_data {
            ImagePixelData::Gray(px) => assert_eq!(px, vec![0, 255, 255, 0]),
            _ => panic!("grayscale PNG should decode to Gray"),
        }
    }

    #[test]
    fn test_decode_png_with_alpha() {
        let buf = encode(&[255, 0, 0, 128], 1, 1, image::ColorType::Rgba8);
        let loaded = decode_png(&buf).unwrap();
        match &loaded.pixel_data {
            ImagePixelData::Rgb { rgb, alpha } => {
                assert_eq!(rgb, &[255, 0, 0]);
                assert_eq!(alpha.as_ref().unwrap(), &[128]);
            }
            _ => panic!("RGBA PNG should decode to Rgb"),
        }
    }

    #[test]
    fn test_opaque_png_has_no_alpha() {
        let buf = encode(&[0, 255, 0, 255], 1, 1, image::ColorType::Rgba8);
        match decode_png(&buf).unwrap().pixel_data {
            ImagePixelData::Rgb { alpha, .. } => assert!(alpha.is_none()),
            _ => panic!("RGBA PNG should decode to Rgb"),
        }
    }
}
