//! # Document Composer
//!
//! Sequences the receipt top to bottom in a fixed order:
//!
//! ```text
//! title
//! [ invoice number box ]
//! store name
//! store address
//! [ date box ]
//! VAT registration line
//! ┌────┬────┬────┬───┬─────────┐
//! │    item table, 5 columns   │
//! └────┴────┴────┴───┴─────────┘
//! totals (3 rows)
//! footer marker
//! code image
//! ```
//!
//! The cursor only moves down, so the invoice number always precedes the
//! date and the taxable total always precedes the grand total.

use crate::backend::DrawingBackend;
use crate::code::CodeImageProvider;
use crate::error::Result;
use crate::font::{FontContext, FontFace};
use crate::layout::table::{render_table, TableSchema};
use crate::layout::totals::render_totals;
use crate::layout::{Align, Border, LayoutEngine, TextAlign};
use crate::model::Invoice;
use crate::style::InvoiceStyle;

/// Lays out one invoice onto a drawing backend.
pub struct Composer<'a> {
    style: &'a InvoiceStyle,
    fonts: &'a FontContext,
    codes: &'a dyn CodeImageProvider,
}

impl<'a> Composer<'a> {
    pub fn new(
        style: &'a InvoiceStyle,
        fonts: &'a FontContext,
        codes: &'a dyn CodeImageProvider,
    ) -> Self {
        Self {
            style,
            fonts,
            codes,
        }
    }

    /// Validate the invoice and lay out every section.
    ///
    /// Any error aborts the render; whatever the backend received so far
    /// must be discarded by the caller.
    pub fn compose(&self, invoice: &Invoice, backend: &mut dyn DrawingBackend) -> Result<()> {
        self.style.validate()?;
        invoice.validate()?;

        let style = self.style;
        let labels = &invoice.labels;
        let usable = style.usable_width();
        let mut engine = LayoutEngine::new(style, self.fonts);
        tracing::debug!(invoice = %invoice.invoice_number, "composing invoice");

        let title = engine
            .reserve_box(style.title_height, usable, Align::Full)?
            .with_border(Border::none());
        engine.place_text(
            backend,
            &title,
            &labels.title,
            FontFace::Bold,
            style.title_font_size,
            TextAlign::Center,
        )?;

        let number =
            engine.reserve_box(style.meta_box_height, style.meta_box_width, Align::Center)?;
        engine.place_pair(
            backend,
            &number,
            &labels.invoice_number,
            &invoice.invoice_number,
            FontFace::Regular,
            style.meta_font_size,
        )?;

        let store = engine
            .reserve_box(style.store_name_height, usable, Align::Full)?
            .with_border(Border::none());
        engine.place_text(
            backend,
            &store,
            &invoice.store_name,
            FontFace::Bold,
            style.store_name_font_size,
            TextAlign::Center,
        )?;

        let address = engine
            .reserve_box(style.store_address_height, usable, Align::Full)?
            .with_border(Border::none());
        engine.place_text(
            backend,
            &address,
            &invoice.store_address,
            FontFace::Regular,
            style.store_address_font_size,
            TextAlign::Center,
        )?;

        let date = engine.reserve_box(style.meta_box_height, style.meta_box_width, Align::Center)?;
        engine.place_pair(
            backend,
            &date,
            &labels.date,
            &invoice.formatted_date(&style.date_format),
            FontFace::Regular,
            style.meta_font_size,
        )?;

        let vat = engine
            .reserve_box(style.vat_line_height, usable, Align::Full)?
            .with_border(Border::none());
        engine.place_text(
            backend,
            &vat,
            &format!("{} {}", labels.vat_registration, invoice.vat_registration_number),
            FontFace::Regular,
            style.vat_font_size,
            TextAlign::Center,
        )?;

        engine.advance(style.section_gap)?;
        let schema = TableSchema::invoice(labels, style);
        render_table(&invoice.items, &schema, &mut engine, backend)?;

        engine.advance(style.section_gap)?;
        render_totals(&invoice.totals, labels, &mut engine, backend)?;

        engine.advance(style.section_gap)?;
        let footer = engine
            .reserve_box(style.footer_height, usable, Align::Full)?
            .with_border(Border::none());
        engine.place_text(
            backend,
            &footer,
            &invoice.footer_text(),
            FontFace::Regular,
            style.footer_font_size,
            TextAlign::Center,
        )?;

        if invoice.code_payload.is_empty() {
            tracing::warn!("invoice has no code payload; skipping code image");
        } else {
            let png = self.codes.encode(&invoice.code_payload)?;
            let code = engine
                .reserve_box(style.code_size, style.code_size, Align::Center)?
                .with_border(Border::none());
            backend.draw_image(&png, &code)?;
        }

        tracing::debug!(cursor = engine.cursor(), "invoice composed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DrawCommand, PageRecorder};
    use crate::code::QrCodeProvider;
    use crate::error::InvoiceError;
    use crate::model::{Labels, LineItem, Totals};
    use crate::style::{RECEIPT_HEIGHT, RECEIPT_WIDTH};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    /// Cheap provider so composer tests do not depend on QR encoding.
    struct FixedCode;

    impl CodeImageProvider for FixedCode {
        fn encode(&self, _payload: &str) -> Result<Vec<u8>> {
            Ok(b"\x89PNG\r\n\x1a\nstub".to_vec())
        }
    }

    fn invoice(items: usize) -> Invoice {
        Invoice {
            invoice_number: "INV10111".to_string(),
            issue_date: NaiveDate::from_ymd_opt(2021, 12, 12).unwrap(),
            store_name: "متجر".to_string(),
            store_address: "الرياض".to_string(),
            vat_registration_number: "123456789900003".to_string(),
            items: (0..items)
                .map(|_| LineItem {
                    name: "منتج".to_string(),
                    quantity: 2,
                    unit_price: dec!(50.00),
                    vat_amount: dec!(15.00),
                    total_with_vat: dec!(115.00),
                })
                .collect(),
            totals: Totals {
                taxable_amount: dec!(100.00),
                vat_amount: dec!(15.00),
                vat_rate_percent: 15,
                total_with_vat: dec!(115.00),
            },
            footer_code: "0100".to_string(),
            code_payload: "INV10111".to_string(),
            labels: Labels::default(),
        }
    }

    fn compose(inv: &Invoice) -> Result<crate::backend::LayoutPage> {
        let style = InvoiceStyle::default();
        let fonts = FontContext::standard(&style);
        let codes = FixedCode;
        let mut rec = PageRecorder::new(RECEIPT_WIDTH, RECEIPT_HEIGHT);
        Composer::new(&style, &fonts, &codes).compose(inv, &mut rec)?;
        Ok(rec.finish())
    }

    #[test]
    fn invoice_number_precedes_date() {
        let page = compose(&invoice(1)).unwrap();
        let number = page.find_text("INV10111")[0];
        let date = page.find_text("2021/12/12")[0];
        assert!(number < date);
    }

    #[test]
    fn code_image_is_last_and_centred() {
        let page = compose(&invoice(1)).unwrap();
        let last = page.elements.last().unwrap();
        assert!(matches!(last.draw, DrawCommand::Image { .. }));
        let style = InvoiceStyle::default();
        assert_eq!(last.width, style.code_size);
        let left = last.x;
        let right = RECEIPT_WIDTH - (last.x + last.width);
        assert!((left - right).abs() < 1e-9);
    }

    #[test]
    fn footer_code_above_image() {
        let page = compose(&invoice(1)).unwrap();
        let footer = page.find_text("0100")[0];
        let image = page.elements.last().unwrap().y;
        assert!(footer < image);
    }

    #[test]
    fn invalid_invoice_draws_nothing() {
        let mut inv = invoice(1);
        inv.vat_registration_number = "12".to_string();
        let style = InvoiceStyle::default();
        let fonts = FontContext::standard(&style);
        let mut rec = PageRecorder::new(RECEIPT_WIDTH, RECEIPT_HEIGHT);
        let err = Composer::new(&style, &fonts, &FixedCode)
            .compose(&inv, &mut rec)
            .unwrap_err();
        assert!(matches!(err, InvoiceError::InvalidInput(_)));
        assert!(rec.finish().elements.is_empty());
    }

    #[test]
    fn too_many_items_overflow_the_page() {
        let err = compose(&invoice(60)).unwrap_err();
        assert!(matches!(err, InvoiceError::LayoutOverflow { .. }));
    }

    #[test]
    fn everything_stays_inside_the_margins() {
        let page = compose(&invoice(5)).unwrap();
        let style = InvoiceStyle::default();
        for el in &page.elements {
            assert!(el.x >= style.margin - 1e-9);
            let bottom = el.y + if el.is_text() { 0.0 } else { el.height };
            assert!(bottom <= RECEIPT_HEIGHT - style.margin + 1e-9);
        }
    }

    #[test]
    fn real_qr_provider_composes() {
        let style = InvoiceStyle::default();
        let fonts = FontContext::standard(&style);
        let codes = QrCodeProvider::new(style.code_pixels);
        let mut rec = PageRecorder::new(RECEIPT_WIDTH, RECEIPT_HEIGHT);
        Composer::new(&style, &fonts, &codes)
            .compose(&invoice(2), &mut rec)
            .unwrap();
        assert!(rec
            .finish()
            .elements
            .iter()
            .any(|el| matches!(el.draw, DrawCommand::Image { .. })));
    }
}
