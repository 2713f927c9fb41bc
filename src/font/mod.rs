//! # Font Management
//!
//! The metrics provider behind the layout engine. Layout never asks the
//! drawing backend how big anything is; it asks a [`FontMetrics`] for ascent,
//! descent and advance width, so geometry is identical whichever backend
//! paints the page.
//!
//! Two sources are supported: TrueType faces parsed with ttf-parser (measured
//! hhea/hmtx values, embedded into the PDF), and the standard Helvetica pair
//! with configured vertical ratios for when no font file is available.

pub mod metrics;

use std::collections::HashMap;

pub use metrics::{StandardFont, StandardMetrics};

use crate::error::{InvoiceError, Result};
use crate::model::FontEntry;
use crate::style::InvoiceStyle;

/// Vertical and horizontal measurements of a face at a given size.
///
/// Descent is returned as a positive distance below the baseline.
pub trait FontMetrics {
    fn ascent(&self, size: f64) -> f64;
    fn descent(&self, size: f64) -> f64;
    fn advance_width(&self, size: f64, text: &str) -> f64;

    /// Total line extent, ascent plus descent.
    fn line_extent(&self, size: f64) -> f64 {
        self.ascent(size) + self.descent(size)
    }
}

/// The two faces an invoice uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FontFace {
    Regular,
    Bold,
}

/// Parsed metrics from a TrueType/OpenType font via ttf-parser.
#[derive(Debug, Clone)]
pub struct TrueTypeMetrics {
    pub data: Vec<u8>,
    pub family: String,
    pub units_per_em: u16,
    pub ascender: i16,
    pub descender: i16,
    advance_widths: HashMap<char, u16>,
    glyph_ids: HashMap<char, u16>,
    /// Advance of `.notdef`, which is what an unmapped character paints as.
    notdef_advance: u16,
}

/// Unicode ranges cached up front: Latin, Arabic and both Arabic
/// presentation-form blocks. Other characters are looked up on demand.
const SAMPLED_RANGES: [(u32, u32); 5] = [
    (0x0020, 0x024F),
    (0x0600, 0x06FF),
    (0x2000, 0x206F),
    (0xFB50, 0xFDFF),
    (0xFE70, 0xFEFF),
];

impl TrueTypeMetrics {
    /// Parse metrics from font data.
    pub fn from_font_data(data: Vec<u8>) -> Result<Self> {
        let face = ttf_parser::Face::parse(&data, 0)
            .map_err(|e| InvoiceError::Font(format!("failed to parse TrueType data: {}", e)))?;
        let units_per_em = face.units_per_em();
        let ascender = face.ascender();
        let descender = face.descender();
        let family = face
            .names()
            .into_iter()
            .find(|n| n.name_id == ttf_parser::name_id::FAMILY && n.is_unicode())
            .and_then(|n| n.to_string())
            .unwrap_or_else(|| "Embedded".to_string());

        let mut advance_widths = HashMap::new();
        let mut glyph_ids = HashMap::new();

        for (start, end) in SAMPLED_RANGES {
            for code in start..=end {
                let Some(ch) = char::from_u32(code) else {
                    continue;
                };
                if let Some(glyph_id) = face.glyph_index(ch) {
                    let advance = face.glyph_hor_advance(glyph_id).unwrap_or(0);
                    advance_widths.insert(ch, advance);
                    glyph_ids.insert(ch, glyph_id.0);
                }
            }
        }

        let notdef_advance = face
            .glyph_hor_advance(ttf_parser::GlyphId(0))
            .unwrap_or(units_per_em / 2);

        Ok(TrueTypeMetrics {
            family,
            units_per_em,
            ascender,
            descender,
            advance_widths,
            glyph_ids,
            notdef_advance,
            data,
        })
    }

    /// Glyph ID and advance for a character, if the face maps it.
    fn lookup(&self, ch: char) -> Option<(u16, u16)> {
        if let (Some(gid), Some(adv)) = (self.glyph_ids.get(&ch), self.advance_widths.get(&ch)) {
            return Some((*gid, *adv));
        }
        let face = ttf_parser::Face::parse(&self.data, 0).ok()?;
        let glyph_id = face.glyph_index(ch)?;
        Some((glyph_id.0, face.glyph_hor_advance(glyph_id).unwrap_or(0)))
    }

    /// Glyph ID for a character, if the face maps it.
    pub fn glyph_id(&self, ch: char) -> Option<u16> {
        self.lookup(ch).map(|(gid, _)| gid)
    }

    /// Advance of a character in font units. An unmapped character measures
    /// as `.notdef`, the glyph the PDF paints in its place.
    pub fn advance_units(&self, ch: char) -> u16 {
        self.lookup(ch)
            .map(|(_, adv)| adv)
            .unwrap_or(self.notdef_advance)
    }

    /// Advance of `.notdef` in font units.
    pub fn notdef_units(&self) -> u16 {
        self.notdef_advance
    }

    fn scale(&self, size: f64) -> f64 {
        size / self.units_per_em as f64
    }
}

impl FontMetrics for TrueTypeMetrics {
    fn ascent(&self, size: f64) -> f64 {
        self.ascender as f64 * self.scale(size)
    }

    fn descent(&self, size: f64) -> f64 {
        (self.descender as f64).abs() * self.scale(size)
    }

    fn advance_width(&self, size: f64, text: &str) -> f64 {
        let units: u32 = text.chars().map(|ch| self.advance_units(ch) as u32).sum();
        units as f64 * self.scale(size)
    }
}

/// A face as the renderer sees it: either embedded TrueType or a standard
/// font.
#[derive(Debug, Clone)]
pub enum LoadedFont {
    Standard(StandardMetrics),
    TrueType(TrueTypeMetrics),
}

impl FontMetrics for LoadedFont {
    fn ascent(&self, size: f64) -> f64 {
        match self {
            LoadedFont::Standard(m) => m.ascent(size),
            LoadedFont::TrueType(m) => m.ascent(size),
        }
    }

    fn descent(&self, size: f64) -> f64 {
        match self {
            LoadedFont::Standard(m) => m.descent(size),
            LoadedFont::TrueType(m) => m.descent(size),
        }
    }

    fn advance_width(&self, size: f64, text: &str) -> f64 {
        match self {
            LoadedFont::Standard(m) => m.advance_width(size, text),
            LoadedFont::TrueType(m) => m.advance_width(size, text),
        }
    }
}

/// Shared, read-only font context for layout and PDF serialization.
///
/// A missing bold face falls back to the regular one.
#[derive(Debug, Clone)]
pub struct FontContext {
    regular: LoadedFont,
    bold: Option<LoadedFont>,
}

impl FontContext {
    /// Standard Helvetica faces with the style's fallback ratios.
    pub fn standard(style: &InvoiceStyle) -> Self {
        let (a, d) = (style.fallback_ascent_ratio, style.fallback_descent_ratio);
        Self {
            regular: LoadedFont::Standard(StandardMetrics::new(StandardFont::Helvetica, a, d)),
            bold: Some(LoadedFont::Standard(StandardMetrics::new(
                StandardFont::HelveticaBold,
                a,
                d,
            ))),
        }
    }

    /// Embedded TrueType faces.
    pub fn truetype(regular: Vec<u8>, bold: Option<Vec<u8>>) -> Result<Self> {
        let regular = LoadedFont::TrueType(TrueTypeMetrics::from_font_data(regular)?);
        let bold = match bold {
            Some(data) => Some(LoadedFont::TrueType(TrueTypeMetrics::from_font_data(data)?)),
            None => None,
        };
        Ok(Self { regular, bold })
    }

    /// Build a context from font entries of an invoice document, falling back
    /// to the standard faces when no regular face is listed.
    pub fn from_entries(entries: &[FontEntry], style: &InvoiceStyle) -> Result<Self> {
        let regular = entries.iter().find(|e| !e.bold);
        let bold = entries.iter().find(|e| e.bold);
        match regular {
            Some(entry) => {
                let regular_data = read_font_source(&entry.src)?;
                let bold_data = bold.map(|e| read_font_source(&e.src)).transpose()?;
                Self::truetype(regular_data, bold_data)
            }
            None => {
                if bold.is_some() {
                    tracing::warn!(
                        "bold font supplied without a regular face; using standard fonts"
                    );
                }
                Ok(Self::standard(style))
            }
        }
    }

    /// Resolve a face to its loaded font.
    pub fn font(&self, face: FontFace) -> &LoadedFont {
        match face {
            FontFace::Regular => &self.regular,
            FontFace::Bold => self.bold.as_ref().unwrap_or(&self.regular),
        }
    }

    /// The metrics provider for a face.
    pub fn metrics(&self, face: FontFace) -> &dyn FontMetrics {
        self.font(face)
    }
}

/// Resolve a font source string to raw bytes.
///
/// Supported formats:
/// - `data:font/...;base64,...` data URI
/// - file path (absolute or `./`/`../` relative)
/// - raw base64
pub fn read_font_source(src: &str) -> Result<Vec<u8>> {
    if src.starts_with("data:") {
        let comma_pos = src
            .find(',')
            .ok_or_else(|| InvoiceError::Font("invalid data URI: missing comma".to_string()))?;
        return base64_decode(&src[comma_pos + 1..]);
    }

    // Only explicit path prefixes; base64 may contain '/'.
    if src.starts_with('/') || src.starts_with("./") || src.starts_with("../") {
        return std::fs::read(src)
            .map_err(|e| InvoiceError::Font(format!("failed to read font file '{}': {}", src, e)));
    }

    base64_decode(src)
}

fn base64_decode(input: &str) -> Result<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(input.trim())
        .map_err(|e| InvoiceError::Font(format!("base64 decode error: {}", e)))
}
