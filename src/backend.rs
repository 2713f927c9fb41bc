//! # Drawing Backend
//!
//! The layout engine talks to the page only through [`DrawingBackend`]:
//! bordered rectangles, shaped text runs at a baseline origin, and images.
//! Every coordinate is absolute, in points, with y growing downward from the
//! top edge of the page.
//!
//! [`PageRecorder`] records the primitives into a [`LayoutPage`]. The PDF
//! writer serializes that page, and tests inspect it directly.

use crate::error::Result;
use crate::font::FontFace;
use crate::layout::{Border, Cell};
use crate::text::GlyphRun;

/// An absolute page position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Receives absolute-coordinate drawing primitives.
pub trait DrawingBackend {
    /// Stroke the flagged edges of a cell. Borderless cells are still
    /// reported so a recorder knows where every text box is.
    fn draw_rect(&mut self, cell: &Cell, border: &Border) -> Result<()>;

    /// Paint one glyph run with its baseline starting at `origin`.
    fn draw_text(&mut self, origin: Point, run: &GlyphRun, face: FontFace, size: f64)
        -> Result<()>;

    /// Paint a PNG image scaled into `cell`.
    fn draw_image(&mut self, png: &[u8], cell: &Cell) -> Result<()>;
}

/// A fully laid-out page ready for PDF serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPage {
    pub width: f64,
    pub height: f64,
    pub elements: Vec<LayoutElement>,
}

/// A positioned element on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutElement {
    /// Top-left corner for boxes and images, baseline origin for text.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// The visual properties to draw.
    pub draw: DrawCommand,
}

/// What to actually draw for this element.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// A cell outline. Edges not flagged in the border are not stroked.
    Rect { border: Border },
    /// A glyph run in visual order.
    Text {
        run: GlyphRun,
        face: FontFace,
        font_size: f64,
    },
    /// PNG-encoded image data.
    Image { png: Vec<u8> },
}

impl LayoutElement {
    pub fn is_text(&self) -> bool {
        matches!(self.draw, DrawCommand::Text { .. })
    }

    /// The element's extent as a cell, for boxes and images.
    pub fn bounds(&self) -> Cell {
        Cell::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }
}

impl LayoutPage {
    /// Text elements in paint order.
    pub fn texts(&self) -> impl Iterator<Item = (&LayoutElement, &GlyphRun, FontFace, f64)> {
        self.elements.iter().filter_map(|el| match &el.draw {
            DrawCommand::Text {
                run,
                face,
                font_size,
            } => Some((el, run, *face, *font_size)),
            _ => None,
        })
    }

    /// All rectangles, bordered or not.
    pub fn rects(&self) -> impl Iterator<Item = (&LayoutElement, &Border)> {
        self.elements.iter().filter_map(|el| match &el.draw {
            DrawCommand::Rect { border } => Some((el, border)),
            _ => None,
        })
    }

    /// The smallest recorded rectangle containing a point.
    pub fn enclosing_rect(&self, p: Point) -> Option<Cell> {
        self.rects()
            .map(|(el, _)| el.bounds())
            .filter(|c| c.contains(p))
            .min_by(|a, b| a.area().total_cmp(&b.area()))
    }

    /// Concatenated visual text of every run whose baseline sits at `y`.
    pub fn line_text_at(&self, y: f64) -> String {
        let mut runs: Vec<(&LayoutElement, &GlyphRun)> = self
            .texts()
            .filter(|(el, ..)| (el.y - y).abs() < 1e-6)
            .map(|(el, run, ..)| (el, run))
            .collect();
        runs.sort_by(|a, b| a.0.x.total_cmp(&b.0.x));
        runs.iter().map(|(_, r)| r.text.as_str()).collect()
    }

    /// Baselines of every text element containing `needle`, top to bottom.
    pub fn find_text(&self, needle: &str) -> Vec<f64> {
        let mut ys: Vec<f64> = self
            .texts()
            .map(|(el, ..)| el.y)
            .filter(|y| self.line_text_at(*y).contains(needle))
            .collect();
        ys.sort_by(|a, b| a.total_cmp(b));
        ys.dedup_by(|a, b| (*a - *b).abs() < 1e-6);
        ys
    }
}

/// Records drawing primitives into a [`LayoutPage`].
#[derive(Debug)]
pub struct PageRecorder {
    page: LayoutPage,
}

impl PageRecorder {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            page: LayoutPage {
                width,
                height,
                elements: Vec::new(),
            },
        }
    }

    pub fn finish(self) -> LayoutPage {
        self.page
    }
}

impl DrawingBackend for PageRecorder {
    fn draw_rect(&mut self, cell: &Cell, border: &Border) -> Result<()> {
        self.page.elements.push(LayoutElement {
            x: cell.x0,
            y: cell.y0,
            width: cell.width(),
            height: cell.height(),
            draw: DrawCommand::Rect { border: *border },
        });
        Ok(())
    }

    fn draw_text(
        &mut self,
        origin: Point,
        run: &GlyphRun,
        face: FontFace,
        size: f64,
    ) -> Result<()> {
        self.page.elements.push(LayoutElement {
            x: origin.x,
            y: origin.y,
            width: run.advance,
            height: size,
            draw: DrawCommand::Text {
                run: run.clone(),
                face,
                font_size: size,
            },
        });
        Ok(())
    }

    fn draw_image(&mut self, png: &[u8], cell: &Cell) -> Result<()> {
        self.page.elements.push(LayoutElement {
            x: cell.x0,
            y: cell.y0,
            width: cell.width(),
            height: cell.height(),
            draw: DrawCommand::Image { png: png.to_vec() },
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{Direction, RunScript};

    fn run(text: &str) -> GlyphRun {
        GlyphRun {
            text: text.to_string(),
            direction: Direction::Ltr,
            script: RunScript::Numeric,
            paint_index: 0,
            logical_range: 0..text.chars().count(),
            advance: 10.0,
            x_offset: 0.0,
        }
    }

    #[test]
    fn recorder_keeps_paint_order() {
        let mut rec = PageRecorder::new(100.0, 200.0);
        let cell = Cell::new(0.0, 0.0, 50.0, 20.0);
        rec.draw_rect(&cell, &Border::all(0.5)).unwrap();
        rec.draw_text(Point { x: 5.0, y: 15.0 }, &run("12"), FontFace::Regular, 9.0)
            .unwrap();
        let page = rec.finish();
        assert_eq!(page.elements.len(), 2);
        assert!(!page.elements[0].is_text());
        assert!(page.elements[1].is_text());
    }

    #[test]
    fn enclosing_rect_picks_the_smallest() {
        let mut rec = PageRecorder::new(100.0, 200.0);
        rec.draw_rect(&Cell::new(0.0, 0.0, 100.0, 100.0), &Border::none())
            .unwrap();
        rec.draw_rect(&Cell::new(10.0, 10.0, 30.0, 30.0), &Border::all(0.5))
            .unwrap();
        let page = rec.finish();
        let found = page.enclosing_rect(Point { x: 20.0, y: 20.0 }).unwrap();
        assert_eq!(found, Cell::new(10.0, 10.0, 30.0, 30.0));
    }

    #[test]
    fn line_text_joins_runs_left_to_right() {
        let mut rec = PageRecorder::new(100.0, 200.0);
        rec.draw_text(Point { x: 30.0, y: 15.0 }, &run("b"), FontFace::Regular, 9.0)
            .unwrap();
        rec.draw_text(Point { x: 10.0, y: 15.0 }, &run("a"), FontFace::Regular, 9.0)
            .unwrap();
        let page = rec.finish();
        assert_eq!(page.line_text_at(15.0), "ab");
        assert_eq!(page.find_text("ab"), vec![15.0]);
    }
}
