//! Line-item table: one header row of stacked captions, then one row per
//! item. Every row is five bordered cells sharing the same y range; columns
//! are listed in visual order, so the product name is the rightmost cell.

use crate::backend::DrawingBackend;
use crate::error::Result;
use crate::font::FontFace;
use crate::model::{Labels, LineItem};
use crate::style::InvoiceStyle;

use super::{LayoutEngine, TextAlign};

/// How a column's values are fitted into their cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Wrapped onto several lines at UAX#14 break opportunities.
    Text,
    /// Kept on one line; the font shrinks if the value is too wide.
    Numeric,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub caption: Vec<String>,
    pub width: f64,
    pub kind: ColumnKind,
}

/// Column layout of the item table, left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub columns: Vec<Column>,
}

impl TableSchema {
    /// The five invoice columns: total with VAT, VAT, unit price, quantity,
    /// product name.
    pub fn invoice(labels: &Labels, style: &InvoiceStyle) -> Self {
        let [total, vat, price, qty, product] = style.column_widths();
        let column = |caption: &Vec<String>, width, kind| Column {
            caption: caption.clone(),
            width,
            kind,
        };
        TableSchema {
            columns: vec![
                column(&labels.total_column, total, ColumnKind::Numeric),
                column(&labels.vat_column, vat, ColumnKind::Numeric),
                column(&labels.unit_price_column, price, ColumnKind::Numeric),
                column(&labels.quantity_column, qty, ColumnKind::Numeric),
                column(&labels.product_column, product, ColumnKind::Text),
            ],
        }
    }

    pub fn widths(&self) -> Vec<f64> {
        self.columns.iter().map(|c| c.width).collect()
    }
}

/// Cell texts of an item, in the schema's visual column order. Amounts are
/// printed with the scale they were supplied with.
fn item_values(item: &LineItem) -> [String; 5] {
    [
        item.total_with_vat.to_string(),
        item.vat_amount.to_string(),
        item.unit_price.to_string(),
        item.quantity.to_string(),
        item.name.clone(),
    ]
}

/// Lines to print in a cell: wrapped for text columns, one line otherwise.
fn cell_lines(
    engine: &LayoutEngine<'_>,
    column: &Column,
    text: &[String],
    face: FontFace,
    size: f64,
) -> Vec<String> {
    let width = column.width - 2.0 * engine.style().cell_inset;
    match column.kind {
        ColumnKind::Text => text
            .iter()
            .flat_map(|t| engine.wrap(t, face, size, width))
            .collect(),
        ColumnKind::Numeric => text.to_vec(),
    }
}

/// Render the header row and one row per item.
///
/// An empty item list still prints the header.
pub fn render_table(
    items: &[LineItem],
    schema: &TableSchema,
    engine: &mut LayoutEngine<'_>,
    backend: &mut dyn DrawingBackend,
) -> Result<()> {
    let style = engine.style();
    tracing::debug!(items = items.len(), "rendering item table");

    // A caption that cannot shrink into its column is wrapped, which grows
    // the header row.
    let header_size = style.header_font_size;
    let header_lines: Vec<Vec<String>> = schema
        .columns
        .iter()
        .map(|col| {
            let width = col.width - 2.0 * style.cell_inset;
            if engine.fit_width(&col.caption, FontFace::Bold, header_size, width).is_ok() {
                col.caption.clone()
            } else {
                col.caption
                    .iter()
                    .flat_map(|t| engine.wrap(t, FontFace::Bold, header_size, width))
                    .collect()
            }
        })
        .collect();
    let max_lines = header_lines.iter().map(Vec::len).max().unwrap_or(1);
    let height = engine.row_height(
        FontFace::Bold,
        header_size,
        max_lines,
        style.header_min_row_height,
    );
    let cells = engine.reserve_row(height, &schema.widths())?;
    for (cell, lines) in cells.iter().zip(&header_lines) {
        engine.place_lines(backend, cell, lines, FontFace::Bold, header_size, TextAlign::Center)?;
    }

    let body_size = style.body_font_size;
    for item in items {
        let values = item_values(item);
        let lines: Vec<Vec<String>> = schema
            .columns
            .iter()
            .zip(values)
            .map(|(col, value)| cell_lines(engine, col, &[value], FontFace::Regular, body_size))
            .collect();
        let max_lines = lines.iter().map(Vec::len).max().unwrap_or(1);
        let height =
            engine.row_height(FontFace::Regular, body_size, max_lines, style.min_row_height);
        let cells = engine.reserve_row(height, &schema.widths())?;
        for (cell, texts) in cells.iter().zip(&lines) {
            engine.place_lines(
                backend,
                cell,
                texts,
                FontFace::Regular,
                body_size,
                TextAlign::Right,
            )?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::PageRecorder;
    use crate::style::{RECEIPT_HEIGHT, RECEIPT_WIDTH};
    use crate::font::FontContext;
    use rust_decimal_macros::dec;

    fn item(name: &str) -> LineItem {
        LineItem {
            name: name.to_string(),
            quantity: 2,
            unit_price: dec!(50.00),
            vat_amount: dec!(15.00),
            total_with_vat: dec!(115.00),
        }
    }

    fn render(items: &[LineItem]) -> crate::backend::LayoutPage {
        let style = InvoiceStyle::default();
        let fonts = FontContext::standard(&style);
        let schema = TableSchema::invoice(&Labels::default(), &style);
        let mut engine = LayoutEngine::new(&style, &fonts);
        let mut rec = PageRecorder::new(RECEIPT_WIDTH, RECEIPT_HEIGHT);
        render_table(items, &schema, &mut engine, &mut rec).unwrap();
        rec.finish()
    }

    fn row_tops(page: &crate::backend::LayoutPage) -> Vec<f64> {
        let mut tops: Vec<f64> = page.rects().map(|(el, _)| el.y).collect();
        tops.dedup();
        tops
    }

    #[test]
    fn header_only_for_empty_items() {
        let page = render(&[]);
        assert_eq!(page.rects().count(), 5);
        assert_eq!(row_tops(&page).len(), 1);
    }

    #[test]
    fn header_row_is_at_least_the_minimum_height() {
        let page = render(&[]);
        let (el, _) = page.rects().next().unwrap();
        assert!(el.height >= InvoiceStyle::default().header_min_row_height);
    }

    #[test]
    fn five_cells_per_item_row() {
        let page = render(&[item("منتج"), item("منتج آخر")]);
        assert_eq!(page.rects().count(), 15);
        for chunk in page.rects().collect::<Vec<_>>().chunks(5) {
            let (top, height) = (chunk[0].0.y, chunk[0].0.height);
            assert!(chunk.iter().all(|(el, _)| el.y == top && el.height == height));
        }
    }

    #[test]
    fn amounts_keep_their_scale() {
        let page = render(&[item("منتج")]);
        let texts: Vec<&str> = page.texts().map(|(_, run, ..)| run.text.as_str()).collect();
        assert!(texts.contains(&"115.00"));
        assert!(texts.contains(&"15.00"));
        assert!(texts.contains(&"50.00"));
    }

    #[test]
    fn long_product_name_wraps_and_grows_the_row() {
        let long = "منتج طويل جدا يحتاج إلى أكثر من سطر واحد في الجدول";
        let page = render(&[item(long)]);
        let rects: Vec<_> = page.rects().collect();
        let product_cell = rects[9].0;
        assert!(product_cell.height > InvoiceStyle::default().min_row_height);
        let mut baselines: Vec<f64> = page
            .texts()
            .filter(|(el, ..)| el.x >= product_cell.x)
            .filter(|(el, ..)| el.y > product_cell.y && el.y < product_cell.y + product_cell.height)
            .map(|(el, ..)| el.y)
            .collect();
        baselines.dedup();
        assert!(baselines.len() > 1);
    }
}
