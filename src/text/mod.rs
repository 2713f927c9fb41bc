//! # Text Shaping & Directionality
//!
//! Turns a logical string into glyph runs painted left to right. Arabic runs
//! get contextual forms and are reversed; numeric and Latin islands keep
//! their character order no matter where they sit in the Arabic text, so a
//! rate prints as `15%` and an amount as `57.50`.
//!
//! Widths come from the same [`FontMetrics`] the PDF writer uses for glyph
//! advances, so a measured line is exactly as wide as the painted one.

pub mod arabic;
pub mod bidi;

use std::ops::Range;

use unicode_bidi::Level;
use unicode_linebreak::{linebreaks, BreakOpportunity};

pub use bidi::RunScript;

use crate::error::Result;
use crate::font::FontMetrics;

/// Paint direction of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ltr,
    Rtl,
}

/// A contiguous same-direction, same-script span in visual order.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphRun {
    /// Shaped characters, already in visual (left-to-right) order.
    pub text: String,
    pub direction: Direction,
    pub script: RunScript,
    /// Position of this run in left-to-right paint order.
    pub paint_index: usize,
    /// Char range of the logical input this run was shaped from.
    pub logical_range: Range<usize>,
    /// Advance width in points at the shaped size.
    pub advance: f64,
    /// Offset from the line's left edge.
    pub x_offset: f64,
}

/// One line of shaped text.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedLine {
    /// Runs in paint order.
    pub runs: Vec<GlyphRun>,
    pub width: f64,
    /// Set when some run could not be shaped and was painted verbatim.
    pub fallback: bool,
}

impl ShapedLine {
    pub fn is_empty(&self) -> bool {
        self.runs.iter().all(|r| r.text.is_empty())
    }

    /// The whole line in visual order.
    pub fn visual_text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// Shape a logical string at an RTL paragraph level.
///
/// Never fails: a run the Arabic joiner rejects is painted in its logical
/// character order and the line is flagged with `fallback`.
pub fn shape(text: &str, metrics: &dyn FontMetrics, size: f64) -> ShapedLine {
    let (chars, runs) = bidi::analyze_bidi(text);
    let levels: Vec<Level> = runs.iter().map(|r| r.level).collect();
    let order = bidi::reorder_visual((0..runs.len()).collect::<Vec<usize>>(), &levels);

    let mut glyph_runs = Vec::with_capacity(runs.len());
    let mut fallback = false;
    let mut x = 0.0;

    for (paint_index, run_idx) in order.into_iter().enumerate() {
        let run = &runs[run_idx];
        let slice = &chars[run.char_start..run.char_end];

        let visual = if run.is_rtl {
            match visual_rtl(slice, run.script) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(error = %e, "painting run in logical order");
                    fallback = true;
                    slice.iter().collect()
                }
            }
        } else {
            slice.iter().collect()
        };

        let advance = metrics.advance_width(size, &visual);
        glyph_runs.push(GlyphRun {
            text: visual,
            direction: if run.is_rtl {
                Direction::Rtl
            } else {
                Direction::Ltr
            },
            script: run.script,
            paint_index,
            logical_range: run.char_start..run.char_end,
            advance,
            x_offset: x,
        });
        x += advance;
    }

    ShapedLine {
        runs: glyph_runs,
        width: x,
        fallback,
    }
}

/// Contextual forms, reversal and mirroring for one RTL run.
fn visual_rtl(slice: &[char], script: RunScript) -> Result<String> {
    let joins = script == RunScript::Arabic || slice.iter().any(|c| arabic::is_arabic(*c));
    let shaped: Vec<char> = if joins {
        arabic::reshape(slice)?.into_iter().map(|(c, _)| c).collect()
    } else {
        slice.to_vec()
    };
    Ok(shaped.into_iter().rev().map(arabic::mirror).collect())
}

/// Width of a logical string once shaped.
pub fn measure(text: &str, metrics: &dyn FontMetrics, size: f64) -> f64 {
    shape(text, metrics, size).width
}

/// Break logical text into lines no wider than `max_width`.
///
/// Lines end at UAX#14 break opportunities. A single word wider than the
/// limit is split between characters. Trailing whitespace is dropped from
/// every line; blank input gives no lines.
pub fn wrap_lines(text: &str, max_width: f64, metrics: &dyn FontMetrics, size: f64) -> Vec<String> {
    let fits = |s: &str| measure(s.trim_end(), metrics, size) <= max_width;

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut seg_start = 0;

    for (pos, opportunity) in linebreaks(text) {
        let segment = &text[seg_start..pos];
        seg_start = pos;

        let candidate = format!("{current}{segment}");
        if fits(&candidate) {
            current = candidate;
        } else {
            if !current.trim_end().is_empty() {
                lines.push(current.trim_end().to_string());
            }
            current = split_long_word(segment, &fits, &mut lines);
        }

        if opportunity == BreakOpportunity::Mandatory && !current.trim_end().is_empty() {
            lines.push(current.trim_end().to_string());
            current.clear();
        }
    }

    if !current.trim_end().is_empty() {
        lines.push(current.trim_end().to_string());
    }
    lines
}

/// Emit full-width character chunks of `word` and return the remainder.
fn split_long_word(word: &str, fits: &dyn Fn(&str) -> bool, lines: &mut Vec<String>) -> String {
    let mut chunk = String::new();
    for ch in word.chars() {
        chunk.push(ch);
        if !fits(&chunk) && chunk.chars().count() > 1 {
            chunk.pop();
            lines.push(chunk.trim_end().to_string());
            chunk.clear();
            chunk.push(ch);
        }
    }
    chunk
}
