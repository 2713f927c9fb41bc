//! # Geometry & Layout Engine
//!
//! Owns the vertical cursor of the single receipt page and hands out every
//! rectangle on it. Nothing is drawn at a position the engine did not
//! allocate first.
//!
//! The page never grows and never breaks. Content is placed top to bottom:
//!
//! 1. Ask the engine for a box (or a row of cells) at the cursor
//! 2. If it would cross the bottom margin, the render fails with
//!    `LayoutOverflow`; nothing is clipped or moved to another page
//! 3. Otherwise the cursor advances past it, and text is placed inside
//!    using a baseline computed from the font's ascent and descent
//!
//! Text placement is where clipping bugs usually hide. The baseline for a
//! cell is chosen so the ascent clears the top padding and the descent
//! clears the bottom padding; when the font is too tall for the cell, the
//! size steps down to the configured floor before giving up.

pub mod table;
pub mod totals;

use crate::backend::{DrawingBackend, Point};
use crate::error::{InvoiceError, Result};
use crate::font::{FontContext, FontFace};
use crate::style::{InvoiceStyle, RECEIPT_HEIGHT};
use crate::text::{self, ShapedLine};

/// Tolerance for floating-point geometry comparisons.
const EPSILON: f64 = 1e-6;

/// Which edges of a cell are stroked, and how thick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Border {
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
    pub left: bool,
    pub width: f64,
}

impl Border {
    pub fn all(width: f64) -> Self {
        Self {
            top: true,
            right: true,
            bottom: true,
            left: true,
            width,
        }
    }

    pub fn none() -> Self {
        Self {
            top: false,
            right: false,
            bottom: false,
            left: false,
            width: 0.0,
        }
    }

    pub fn is_none(&self) -> bool {
        !(self.top || self.right || self.bottom || self.left) || self.width <= 0.0
    }
}

/// An axis-aligned rectangle in page points, y growing downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub border: Border,
}

impl Cell {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0,
            y0,
            x1,
            y1,
            border: Border::none(),
        }
    }

    pub fn with_border(mut self, border: Border) -> Self {
        self.border = border;
        self
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x0 - EPSILON
            && p.x <= self.x1 + EPSILON
            && p.y >= self.y0 - EPSILON
            && p.y <= self.y1 + EPSILON
    }
}

/// Horizontal position of a box within the margins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
    /// Spans the whole usable width; the requested width is ignored.
    Full,
}

/// Horizontal position of text within a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// A baseline position and the font size it was computed for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    pub y: f64,
    pub font_size: f64,
    pub ascent: f64,
    pub descent: f64,
}

/// The layout engine for one invoice page.
///
/// Holds the only cursor; it starts at the top margin and only moves down.
pub struct LayoutEngine<'a> {
    style: &'a InvoiceStyle,
    fonts: &'a FontContext,
    cursor: f64,
}

impl<'a> LayoutEngine<'a> {
    pub fn new(style: &'a InvoiceStyle, fonts: &'a FontContext) -> Self {
        Self {
            style,
            fonts,
            cursor: style.margin,
        }
    }

    pub fn style(&self) -> &'a InvoiceStyle {
        self.style
    }

    pub fn fonts(&self) -> &'a FontContext {
        self.fonts
    }

    /// Current cursor position from the top of the page.
    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    fn bottom_limit(&self) -> f64 {
        RECEIPT_HEIGHT - self.style.margin
    }

    /// Space left between the cursor and the bottom margin.
    pub fn remaining(&self) -> f64 {
        (self.bottom_limit() - self.cursor).max(0.0)
    }

    fn take(&mut self, element: &str, height: f64) -> Result<(f64, f64)> {
        if height < 0.0 {
            return Err(InvoiceError::InvalidInput(format!(
                "negative height {height} for {element}"
            )));
        }
        if self.cursor + height > self.bottom_limit() + EPSILON {
            return Err(InvoiceError::overflow(element, height, self.remaining()));
        }
        let y0 = self.cursor;
        self.cursor += height;
        Ok((y0, self.cursor))
    }

    /// Allocate a bordered box at the cursor and advance past it.
    pub fn reserve_box(&mut self, height: f64, width: f64, align: Align) -> Result<Cell> {
        let usable = self.style.usable_width();
        let left = self.style.margin;
        let width = match align {
            Align::Full => usable,
            _ => width.min(usable),
        };
        let x0 = match align {
            Align::Left | Align::Full => left,
            Align::Center => left + (usable - width) / 2.0,
            Align::Right => left + usable - width,
        };
        let (y0, y1) = self.take("box", height)?;
        Ok(Cell::new(x0, y0, x0 + width, y1).with_border(Border::all(self.style.border_width)))
    }

    /// Allocate a row of bordered cells, left to right from the margin,
    /// sharing one y range. The cursor advances once, by `height`.
    pub fn reserve_row(&mut self, height: f64, widths: &[f64]) -> Result<Vec<Cell>> {
        let (y0, y1) = self.take("row", height)?;
        let border = Border::all(self.style.border_width);
        let mut x = self.style.margin;
        Ok(widths
            .iter()
            .map(|w| {
                let cell = Cell::new(x, y0, x + w, y1).with_border(border);
                x += w;
                cell
            })
            .collect())
    }

    /// Insert vertical spacing.
    pub fn advance(&mut self, gap: f64) -> Result<()> {
        self.reserve_box(gap, 0.0, Align::Full).map(|_| ())
    }

    /// Row height for `lines` stacked lines at a size:
    /// `max(min, lines × extent + (lines − 1) × gap + 2 × padding)`.
    pub fn row_height(&self, face: FontFace, size: f64, lines: usize, min: f64) -> f64 {
        let metrics = self.fonts.metrics(face);
        let n = lines.max(1) as f64;
        let content = n * metrics.line_extent(size) + (n - 1.0) * self.style.line_gap;
        min.max(content + 2.0 * self.style.cell_padding)
    }

    /// Candidate font sizes from `size` down to the configured floor,
    /// produced lazily so a fit at the first size costs one step.
    fn size_steps(&self, size: f64) -> impl Iterator<Item = f64> {
        let floor = self.style.min_font_size.min(size);
        let step = self.style.font_size_step;
        std::iter::successors(Some(size), move |s| {
            (*s > floor + EPSILON).then(|| (s - step).max(floor))
        })
    }

    /// The baseline for one line of text in a cell.
    ///
    /// Guarantees `y − ascent ≥ y0 + padding` and `y + descent ≤ y1 − padding`.
    /// The text is centred in the remaining slack.
    pub fn safe_baseline(&self, cell: &Cell, face: FontFace, size: f64) -> Result<Baseline> {
        let mut lines = self.safe_baselines(cell, face, size, 1)?;
        lines
            .pop()
            .ok_or_else(|| InvoiceError::overflow("cell", 0.0, cell.height()))
    }

    /// Baselines for `count` stacked lines in a cell, first line on top.
    pub fn safe_baselines(
        &self,
        cell: &Cell,
        face: FontFace,
        size: f64,
        count: usize,
    ) -> Result<Vec<Baseline>> {
        let metrics = self.fonts.metrics(face);
        let pad = self.style.cell_padding;
        let gap = self.style.line_gap;
        let n = count.max(1) as f64;
        let available = cell.height() - 2.0 * pad;

        let mut required = 0.0;
        for s in self.size_steps(size) {
            let ascent = metrics.ascent(s);
            let descent = metrics.descent(s);
            let block = n * (ascent + descent) + (n - 1.0) * gap;
            required = block;
            if block <= available + EPSILON {
                let top = cell.y0 + pad + (available - block).max(0.0) / 2.0;
                return Ok((0..count.max(1))
                    .map(|i| Baseline {
                        y: top + ascent + i as f64 * (ascent + descent + gap),
                        font_size: s,
                        ascent,
                        descent,
                    })
                    .collect());
            }
        }

        Err(InvoiceError::overflow(
            format!("cell at y={:.2}", cell.y0),
            required + 2.0 * pad,
            cell.height(),
        ))
    }

    /// The largest size not above `size` at which every line fits the
    /// cell's inner width.
    pub fn fit_width(
        &self,
        lines: &[String],
        face: FontFace,
        size: f64,
        max_width: f64,
    ) -> Result<f64> {
        let metrics = self.fonts.metrics(face);
        let mut widest = 0.0;
        for s in self.size_steps(size) {
            widest = lines
                .iter()
                .map(|l| text::measure(l, metrics, s))
                .fold(0.0, f64::max);
            if widest <= max_width + EPSILON {
                return Ok(s);
            }
        }
        let sample = lines.first().map(String::as_str).unwrap_or_default();
        Err(InvoiceError::overflow(format!("text {sample:?}"), widest, max_width))
    }

    /// Inner width of a cell after horizontal insets.
    pub fn inner_width(&self, cell: &Cell) -> f64 {
        (cell.width() - 2.0 * self.style.cell_inset).max(0.0)
    }

    /// Draw a cell and one line of text inside it.
    pub fn place_text(
        &self,
        backend: &mut dyn DrawingBackend,
        cell: &Cell,
        text: &str,
        face: FontFace,
        size: f64,
        align: TextAlign,
    ) -> Result<()> {
        self.place_lines(backend, cell, &[text.to_string()], face, size, align)
    }

    /// Draw a cell and stacked lines of text inside it.
    ///
    /// The size shrinks until every line fits horizontally, then again if
    /// needed until the block fits vertically.
    pub fn place_lines(
        &self,
        backend: &mut dyn DrawingBackend,
        cell: &Cell,
        lines: &[String],
        face: FontFace,
        size: f64,
        align: TextAlign,
    ) -> Result<()> {
        backend.draw_rect(cell, &cell.border)?;

        let lines: Vec<String> = lines.iter().filter(|l| !l.trim().is_empty()).cloned().collect();
        if lines.is_empty() {
            return Ok(());
        }

        let fitted = self.fit_width(&lines, face, size, self.inner_width(cell))?;
        let baselines = self.safe_baselines(cell, face, fitted, lines.len())?;
        let metrics = self.fonts.metrics(face);

        for (line, baseline) in lines.iter().zip(&baselines) {
            let shaped = text::shape(line, metrics, baseline.font_size);
            self.draw_shaped(backend, cell, &shaped, baseline, face, align)?;
        }
        Ok(())
    }

    /// Draw a cell holding a label at its right edge and a value at its left
    /// edge, on one baseline. Both shrink together until they fit side by
    /// side with an inset's gap between them.
    pub fn place_pair(
        &self,
        backend: &mut dyn DrawingBackend,
        cell: &Cell,
        label: &str,
        value: &str,
        face: FontFace,
        size: f64,
    ) -> Result<()> {
        backend.draw_rect(cell, &cell.border)?;

        let joined = format!("{label} {value}");
        let gap = self.style.cell_inset;
        let metrics = self.fonts.metrics(face);
        let available = self.inner_width(cell) - gap;
        let fitted = self.size_steps(size).find(|s| {
            text::measure(label, metrics, *s) + text::measure(value, metrics, *s)
                <= available + EPSILON
        });
        let Some(fitted) = fitted else {
            let required = self.measure(&joined, face, self.style.min_font_size.min(size));
            return Err(InvoiceError::overflow(format!("text {joined:?}"), required, available));
        };

        let baseline = self.safe_baseline(cell, face, fitted)?;
        let label_line = text::shape(label, metrics, baseline.font_size);
        let value_line = text::shape(value, metrics, baseline.font_size);
        self.draw_shaped(backend, cell, &label_line, &baseline, face, TextAlign::Right)?;
        self.draw_shaped(backend, cell, &value_line, &baseline, face, TextAlign::Left)
    }

    fn draw_shaped(
        &self,
        backend: &mut dyn DrawingBackend,
        cell: &Cell,
        shaped: &ShapedLine,
        baseline: &Baseline,
        face: FontFace,
        align: TextAlign,
    ) -> Result<()> {
        let inset = self.style.cell_inset;
        let x = match align {
            TextAlign::Right => cell.x1 - inset - shaped.width,
            TextAlign::Left => cell.x0 + inset,
            TextAlign::Center => cell.x0 + (cell.width() - shaped.width) / 2.0,
        };
        for run in &shaped.runs {
            let origin = Point {
                x: x + run.x_offset,
                y: baseline.y,
            };
            backend.draw_text(origin, run, face, baseline.font_size)?;
        }
        Ok(())
    }

    /// Shaped width of text at a size, for callers sizing boxes.
    pub fn measure(&self, text: &str, face: FontFace, size: f64) -> f64 {
        text::measure(text, self.fonts.metrics(face), size)
    }

    /// Wrap logical text to a cell's inner width.
    pub fn wrap(&self, text: &str, face: FontFace, size: f64, width: f64) -> Vec<String> {
        text::wrap_lines(text, width, self.fonts.metrics(face), size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::PageRecorder;
    use crate::style::RECEIPT_WIDTH;

    fn setup() -> (InvoiceStyle, FontContext) {
        let style = InvoiceStyle::default();
        let fonts = FontContext::standard(&style);
        (style, fonts)
    }

    #[test]
    fn cursor_starts_at_margin_and_moves_down() {
        let (style, fonts) = setup();
        let mut engine = LayoutEngine::new(&style, &fonts);
        assert_eq!(engine.cursor(), style.margin);
        let cell = engine.reserve_box(20.0, 100.0, Align::Center).unwrap();
        assert_eq!(cell.y0, style.margin);
        assert_eq!(engine.cursor(), style.margin + 20.0);
    }

    #[test]
    fn size_ladder_steps_down_to_the_floor() {
        let (style, fonts) = setup();
        let engine = LayoutEngine::new(&style, &fonts);
        let sizes: Vec<f64> = engine.size_steps(6.2).collect();
        assert_eq!(sizes.first(), Some(&6.2));
        assert_eq!(sizes.last(), Some(&style.min_font_size));
        assert!(sizes.windows(2).all(|w| w[0] > w[1]));
        assert_eq!(engine.size_steps(3.0).collect::<Vec<_>>(), vec![3.0]);
    }

    #[test]
    fn size_ladder_is_lazy() {
        let style = InvoiceStyle {
            font_size_step: 1e-9,
            ..Default::default()
        };
        let fonts = FontContext::standard(&style);
        let engine = LayoutEngine::new(&style, &fonts);
        let first: Vec<f64> = engine.size_steps(9.0).take(3).collect();
        assert_eq!(first.len(), 3);
        assert_eq!(first[0], 9.0);
    }

    #[test]
    fn box_alignment_within_margins() {
        let (style, fonts) = setup();
        let mut engine = LayoutEngine::new(&style, &fonts);
        let right = engine.reserve_box(10.0, 50.0, Align::Right).unwrap();
        assert!((right.x1 - (RECEIPT_WIDTH - style.margin)).abs() < 1e-9);
        let left = engine.reserve_box(10.0, 50.0, Align::Left).unwrap();
        assert_eq!(left.x0, style.margin);
        let full = engine.reserve_box(10.0, 5.0, Align::Full).unwrap();
        assert!((full.width() - style.usable_width()).abs() < 1e-9);
        let center = engine.reserve_box(10.0, 50.0, Align::Center).unwrap();
        let left_gap = center.x0 - style.margin;
        let right_gap = RECEIPT_WIDTH - style.margin - center.x1;
        assert!((left_gap - right_gap).abs() < 1e-9);
    }

    #[test]
    fn row_cells_share_y_and_tile_the_width() {
        let (style, fonts) = setup();
        let mut engine = LayoutEngine::new(&style, &fonts);
        let cells = engine.reserve_row(18.0, &style.column_widths()).unwrap();
        assert_eq!(cells.len(), 5);
        assert!(cells.iter().all(|c| c.y0 == cells[0].y0 && c.y1 == cells[0].y1));
        assert!(cells.windows(2).all(|w| (w[0].x1 - w[1].x0).abs() < 1e-9));
        assert!((cells[4].x1 - (RECEIPT_WIDTH - style.margin)).abs() < 1e-9);
        assert_eq!(engine.cursor(), style.margin + 18.0);
    }

    #[test]
    fn box_past_bottom_margin_is_overflow() {
        let (style, fonts) = setup();
        let mut engine = LayoutEngine::new(&style, &fonts);
        let err = engine.reserve_box(RECEIPT_HEIGHT, 10.0, Align::Full).unwrap_err();
        assert!(matches!(err, InvoiceError::LayoutOverflow { .. }));
        // Refused boxes do not move the cursor.
        assert_eq!(engine.cursor(), style.margin);
    }

    #[test]
    fn baseline_respects_padding() {
        let (style, fonts) = setup();
        let engine = LayoutEngine::new(&style, &fonts);
        let cell = Cell::new(10.0, 100.0, 60.0, 118.0);
        let b = engine.safe_baseline(&cell, FontFace::Regular, 9.0).unwrap();
        assert!(b.y - b.ascent >= cell.y0 + style.cell_padding - 1e-9);
        assert!(b.y + b.descent <= cell.y1 - style.cell_padding + 1e-9);
        assert_eq!(b.font_size, 9.0);
    }

    #[test]
    fn baseline_shrinks_font_for_short_cells() {
        let (style, fonts) = setup();
        let engine = LayoutEngine::new(&style, &fonts);
        // 9pt needs 11.7pt + padding; 12pt tall cell only offers 8pt.
        let cell = Cell::new(0.0, 0.0, 50.0, 12.0);
        let b = engine.safe_baseline(&cell, FontFace::Regular, 9.0).unwrap();
        assert!(b.font_size < 9.0);
        assert!(b.font_size >= style.min_font_size);
        assert!(b.y + b.descent <= cell.y1 - style.cell_padding + 1e-9);
    }

    #[test]
    fn baseline_overflow_below_minimum_size() {
        let (style, fonts) = setup();
        let engine = LayoutEngine::new(&style, &fonts);
        let cell = Cell::new(0.0, 0.0, 50.0, 6.0);
        let err = engine.safe_baseline(&cell, FontFace::Regular, 9.0).unwrap_err();
        assert!(matches!(err, InvoiceError::LayoutOverflow { .. }));
    }

    #[test]
    fn stacked_baselines_fit_the_cell() {
        let (style, fonts) = setup();
        let engine = LayoutEngine::new(&style, &fonts);
        let height = engine.row_height(FontFace::Regular, 7.0, 2, 0.0);
        let cell = Cell::new(0.0, 0.0, 30.0, height);
        let lines = engine.safe_baselines(&cell, FontFace::Regular, 7.0, 2).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].y < lines[1].y);
        assert!(lines[1].y + lines[1].descent <= cell.y1 - style.cell_padding + 1e-9);
        assert_eq!(lines[0].font_size, 7.0);
    }

    #[test]
    fn row_height_has_a_floor() {
        let (style, fonts) = setup();
        let engine = LayoutEngine::new(&style, &fonts);
        assert_eq!(engine.row_height(FontFace::Regular, 9.0, 1, 18.0), 18.0);
        assert!(engine.row_height(FontFace::Regular, 9.0, 3, 18.0) > 18.0);
    }

    #[test]
    fn right_aligned_text_ends_at_inner_edge() {
        let (style, fonts) = setup();
        let engine = LayoutEngine::new(&style, &fonts);
        let cell = Cell::new(10.0, 10.0, 110.0, 28.0);
        let mut rec = PageRecorder::new(RECEIPT_WIDTH, RECEIPT_HEIGHT);
        engine
            .place_text(&mut rec, &cell, "57.50", FontFace::Regular, 9.0, TextAlign::Right)
            .unwrap();
        let page = rec.finish();
        let (el, run, ..) = page.texts().next().unwrap();
        assert!((el.x + run.advance - (cell.x1 - style.cell_inset)).abs() < 1e-9);
    }

    #[test]
    fn wide_text_shrinks_to_fit() {
        let (style, fonts) = setup();
        let engine = LayoutEngine::new(&style, &fonts);
        let cell = Cell::new(0.0, 0.0, 30.0, 18.0);
        let mut rec = PageRecorder::new(RECEIPT_WIDTH, RECEIPT_HEIGHT);
        engine
            .place_text(&mut rec, &cell, "1150.00", FontFace::Regular, 9.0, TextAlign::Right)
            .unwrap();
        let page = rec.finish();
        let (el, run, _, size) = page.texts().next().unwrap();
        assert!(size < 9.0);
        assert!(el.x >= cell.x0 + style.cell_inset - 1e-9);
        assert!(el.x + run.advance <= cell.x1 - style.cell_inset + 1e-9);
    }

    #[test]
    fn pair_puts_label_right_and_value_left() {
        let (style, fonts) = setup();
        let engine = LayoutEngine::new(&style, &fonts);
        let cell = Cell::new(20.0, 10.0, 200.0, 26.0).with_border(Border::all(0.5));
        let mut rec = PageRecorder::new(RECEIPT_WIDTH, RECEIPT_HEIGHT);
        engine
            .place_pair(&mut rec, &cell, "رقم الفاتورة:", "INV10111", FontFace::Regular, 9.0)
            .unwrap();
        let page = rec.finish();
        assert_eq!(page.rects().count(), 1);
        let value = page.texts().find(|(_, run, ..)| run.text == "INV10111").unwrap();
        assert!((value.0.x - (cell.x0 + style.cell_inset)).abs() < 1e-9);
        let rightmost = page
            .texts()
            .map(|(el, run, ..)| el.x + run.advance)
            .fold(0.0, f64::max);
        assert!((rightmost - (cell.x1 - style.cell_inset)).abs() < 1e-9);
        let baselines: Vec<f64> = page.texts().map(|(el, ..)| el.y).collect();
        assert!(baselines.iter().all(|y| *y == baselines[0]));
    }

    #[test]
    fn unfittable_text_is_overflow() {
        let (style, fonts) = setup();
        let engine = LayoutEngine::new(&style, &fonts);
        let cell = Cell::new(0.0, 0.0, 12.0, 18.0);
        let mut rec = PageRecorder::new(RECEIPT_WIDTH, RECEIPT_HEIGHT);
        let err = engine
            .place_text(&mut rec, &cell, "123456789", FontFace::Regular, 9.0, TextAlign::Right)
            .unwrap_err();
        assert!(matches!(err, InvoiceError::LayoutOverflow { .. }));
    }
}
