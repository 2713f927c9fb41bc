//! # taxslip
//!
//! Renders a simplified Arabic tax invoice onto a single 80mm thermal receipt
//! page and serializes it to PDF.
//!
//! The receipt page is fixed: 226.77 × 708.66 pt. Nothing paginates. Every
//! section is placed by one downward-moving cursor, and anything that would
//! cross the bottom margin fails the render with
//! [`InvoiceError::LayoutOverflow`] instead of being clipped.
//!
//! Arabic labels and product names are mixed with Latin digits, decimals and
//! percentages. Text goes through the UAX#9 bidi algorithm with numeric
//! tokens kept as atomic left-to-right islands, so `15%` never prints as
//! `51%` and `57.50` never as `05.75`.
//!
//! ## Architecture
//!
//! ```text
//! Input (JSON / Invoice)
//!       ↓
//!   [model]    : Invoice, line items, totals, labels
//!       ↓
//!   [compose]  : Fixed section order, one cursor
//!       ↓
//!   [layout]   : Boxes, rows, baselines, shrink-to-fit, table, totals
//!       ↓        ↑ [text] bidi runs, Arabic shaping, wrapping
//!       ↓        ↑ [font] metrics (TrueType or Helvetica fallback)
//!   [backend]  : Absolute drawing primitives, recorded to a LayoutPage
//!       ↓
//!   [pdf]      : Serialize to PDF bytes
//! ```

pub mod backend;
pub mod code;
pub mod compose;
pub mod error;
pub mod font;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod style;
pub mod text;

use backend::{LayoutPage, PageRecorder};
use code::{CodeImageProvider, QrCodeProvider};
use compose::Composer;
use font::FontContext;
use model::{Invoice, InvoiceDocument};
use pdf::{Metadata, PdfWriter};
use style::{InvoiceStyle, RECEIPT_HEIGHT, RECEIPT_WIDTH};

pub use error::{InvoiceError, Result};

/// Lay out an invoice into page geometry without serializing it.
///
/// Identical inputs always produce an identical [`LayoutPage`].
pub fn layout_invoice(
    invoice: &Invoice,
    style: &InvoiceStyle,
    fonts: &FontContext,
    codes: &dyn CodeImageProvider,
) -> Result<LayoutPage> {
    let mut recorder = PageRecorder::new(RECEIPT_WIDTH, RECEIPT_HEIGHT);
    Composer::new(style, fonts, codes).compose(invoice, &mut recorder)?;
    Ok(recorder.finish())
}

/// Render an invoice to PDF bytes.
///
/// This is the primary entry point. The code image is a QR code of the
/// invoice's payload.
pub fn render(invoice: &Invoice, style: &InvoiceStyle, fonts: &FontContext) -> Result<Vec<u8>> {
    let codes = QrCodeProvider::new(style.code_pixels);
    let page = layout_invoice(invoice, style, fonts, &codes)?;
    let metadata = Metadata {
        title: Some(invoice.invoice_number.clone()),
        subject: Some(invoice.labels.title.clone()),
    };
    let bytes = PdfWriter::new().write(&page, &metadata, fonts)?;
    tracing::info!(
        invoice = %invoice.invoice_number,
        items = invoice.items.len(),
        bytes = bytes.len(),
        "rendered invoice"
    );
    Ok(bytes)
}

/// Render an invoice document described as JSON to PDF bytes.
///
/// `fonts` overrides any fonts listed in the document; without it the
/// document's own font entries are loaded, falling back to Helvetica.
pub fn render_json(json: &str, fonts: Option<&FontContext>) -> Result<Vec<u8>> {
    let document: InvoiceDocument = serde_json::from_str(json)?;
    match fonts {
        Some(fonts) => render(&document.invoice, &document.style, fonts),
        None => {
            let fonts = FontContext::from_entries(&document.fonts, &document.style)?;
            render(&document.invoice, &document.style, &fonts)
        }
    }
}
