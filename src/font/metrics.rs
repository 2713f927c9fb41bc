//! Built-in metrics for the standard PDF fonts used when no TrueType face is
//! supplied.
//!
//! Widths are the Adobe AFM advance widths for Helvetica and Helvetica-Bold
//! in 1/1000 em. Characters outside printable ASCII (Arabic, presentation
//! forms) get a flat estimate; the standard fonts cannot paint them anyway,
//! but layout still needs a width to reserve.

use super::FontMetrics;

/// Advance used for anything outside the AFM table.
const DEFAULT_ADVANCE: u16 = 450;

#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,                               // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015,                                             // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,                // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,                // 'N'..'Z'
    278, 278, 278, 469, 556, 333,                                                   // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,                // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,                // 'n'..'z'
    334, 260, 334, 584,                                                             // '{'..'~'
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

/// The standard PDF font backing a face when nothing is embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
}

impl StandardFont {
    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
        }
    }

    fn widths(&self) -> &'static [u16; 95] {
        match self {
            Self::Helvetica => &HELVETICA_WIDTHS,
            Self::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        }
    }
}

/// Metrics for a standard font with configured vertical ratios.
#[derive(Debug, Clone)]
pub struct StandardMetrics {
    pub font: StandardFont,
    ascent_ratio: f64,
    descent_ratio: f64,
}

impl StandardMetrics {
    pub fn new(font: StandardFont, ascent_ratio: f64, descent_ratio: f64) -> Self {
        Self {
            font,
            ascent_ratio,
            descent_ratio,
        }
    }

    /// Advance of one character in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        let code = ch as u32;
        let w = if (0x20..=0x7E).contains(&code) {
            self.font.widths()[(code - 0x20) as usize]
        } else {
            DEFAULT_ADVANCE
        };
        w as f64 / 1000.0 * font_size
    }
}

impl FontMetrics for StandardMetrics {
    fn ascent(&self, size: f64) -> f64 {
        self.ascent_ratio * size
    }

    fn descent(&self, size: f64) -> f64 {
        self.descent_ratio * size
    }

    fn advance_width(&self, size: f64, text: &str) -> f64 {
        text.chars().map(|ch| self.char_width(ch, size)).sum()
    }
}
