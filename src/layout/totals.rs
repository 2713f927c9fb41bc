//! The totals block under the item table: taxable amount, VAT with its
//! rate, and the grand total. Each row is a value cell on the left and a
//! label cell on the right spanning the rest of the table width.

use rust_decimal::Decimal;

use crate::backend::DrawingBackend;
use crate::error::Result;
use crate::font::FontFace;
use crate::layout::Border;
use crate::model::{Labels, Totals};

use super::{LayoutEngine, TextAlign};

struct TotalsRow {
    label: String,
    value: Decimal,
    face: FontFace,
    height: f64,
    font_size: f64,
    border_width: f64,
}

fn rows(totals: &Totals, labels: &Labels, engine: &LayoutEngine<'_>) -> [TotalsRow; 3] {
    let style = engine.style();
    let regular = |label: String, value: Decimal| TotalsRow {
        label,
        value,
        face: FontFace::Regular,
        height: style.totals_row_height,
        font_size: style.totals_font_size,
        border_width: style.border_width,
    };
    [
        regular(labels.total_taxable.clone(), totals.taxable_amount),
        regular(labels.vat_with_rate(totals.vat_rate_percent), totals.vat_amount),
        TotalsRow {
            label: labels.total_with_vat.clone(),
            value: totals.total_with_vat,
            face: FontFace::Bold,
            height: style.totals_total_row_height,
            font_size: style.totals_total_font_size,
            border_width: style.totals_total_border_width,
        },
    ]
}

/// Render the three totals rows in fixed order.
pub fn render_totals(
    totals: &Totals,
    labels: &Labels,
    engine: &mut LayoutEngine<'_>,
    backend: &mut dyn DrawingBackend,
) -> Result<()> {
    let style = engine.style();
    let value_width = style.totals_value_width;
    let widths = [value_width, style.usable_width() - value_width];

    for row in rows(totals, labels, engine) {
        let cells = engine.reserve_row(row.height, &widths)?;
        let border = Border::all(row.border_width);
        let value_cell = cells[0].with_border(border);
        let label_cell = cells[1].with_border(border);

        engine.place_text(
            backend,
            &value_cell,
            &row.value.to_string(),
            row.face,
            row.font_size,
            TextAlign::Right,
        )?;
        engine.place_text(
            backend,
            &label_cell,
            &row.label,
            row.face,
            row.font_size,
            TextAlign::Right,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DrawCommand, PageRecorder};
    use crate::font::FontContext;
    use crate::style::{InvoiceStyle, RECEIPT_HEIGHT, RECEIPT_WIDTH};
    use rust_decimal_macros::dec;

    fn totals() -> Totals {
        Totals {
            taxable_amount: dec!(100.00),
            vat_amount: dec!(15.00),
            vat_rate_percent: 15,
            total_with_vat: dec!(115.00),
        }
    }

    fn render() -> crate::backend::LayoutPage {
        let style = InvoiceStyle::default();
        let fonts = FontContext::standard(&style);
        let mut engine = LayoutEngine::new(&style, &fonts);
        let mut rec = PageRecorder::new(RECEIPT_WIDTH, RECEIPT_HEIGHT);
        render_totals(&totals(), &Labels::default(), &mut engine, &mut rec).unwrap();
        rec.finish()
    }

    #[test]
    fn three_rows_of_two_cells() {
        let page = render();
        let rects: Vec<_> = page.rects().collect();
        assert_eq!(rects.len(), 6);
        let style = InvoiceStyle::default();
        assert!((rects[0].0.width - style.totals_value_width).abs() < 1e-9);
        assert!((rects[0].0.width + rects[1].0.width - style.usable_width()).abs() < 1e-9);
    }

    #[test]
    fn rate_token_is_not_reversed() {
        let page = render();
        let vat_row = page.find_text("15%");
        assert_eq!(vat_row.len(), 1);
        assert!(page.find_text("51%").is_empty());
    }

    #[test]
    fn taxable_precedes_grand_total() {
        let page = render();
        let taxable = page.find_text("100.00")[0];
        let grand = page.find_text("115.00")[0];
        assert!(taxable < grand);
    }

    #[test]
    fn grand_total_is_bold_with_thicker_border() {
        let page = render();
        let last = page.rects().last().unwrap();
        assert_eq!(last.1.width, InvoiceStyle::default().totals_total_border_width);
        let grand = page
            .elements
            .iter()
            .find(|el| matches!(&el.draw, DrawCommand::Text { run, .. } if run.text == "115.00"))
            .unwrap();
        assert!(matches!(
            grand.draw,
            DrawCommand::Text {
                face: FontFace::Bold,
                ..
            }
        ));
    }
}
