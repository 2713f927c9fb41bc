//! # Invoice Style
//!
//! Every tunable layout constant lives here: margins, font sizes, paddings,
//! row heights and column widths. Nothing in the layout code
//! hardcodes a measurement; swapping the typeface or the receipt width means
//! changing these values, not the algorithms.
//!
//! The page itself is not configurable: every invoice is one 80mm × 250mm
//! receipt, [`RECEIPT_WIDTH`] × [`RECEIPT_HEIGHT`]. A `pageWidth` or
//! `pageHeight` key in a JSON style block is ignored. All values are in PDF
//! points (1/72 inch).

use serde::{Deserialize, Serialize};

use crate::error::{InvoiceError, Result};

/// 80mm in points.
pub const RECEIPT_WIDTH: f64 = 226.77;
/// 250mm in points.
pub const RECEIPT_HEIGHT: f64 = 708.66;

/// Largest font size any text on the receipt may use.
pub const MAX_FONT_SIZE: f64 = 72.0;
/// Smallest font size the shrink-to-fit floor may be set to.
pub const MIN_FONT_SIZE_FLOOR: f64 = 1.0;
/// Bounds of the shrink-to-fit step.
pub const FONT_SIZE_STEP_RANGE: (f64, f64) = (0.1, 4.0);
/// Bounds of the rasterized code image side, in pixels.
pub const CODE_PIXELS_RANGE: (u32, u32) = (64, 2048);

/// Layout constants for one invoice render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceStyle {
    /// Left, right, top and bottom margin.
    pub margin: f64,

    pub title_font_size: f64,
    pub title_height: f64,
    pub meta_font_size: f64,
    /// Height of the invoice-number and date boxes.
    pub meta_box_height: f64,
    /// Width of the invoice-number and date boxes, centred.
    pub meta_box_width: f64,
    pub store_name_font_size: f64,
    pub store_name_height: f64,
    pub store_address_font_size: f64,
    pub store_address_height: f64,
    pub vat_font_size: f64,
    pub vat_line_height: f64,
    /// Gap between the identity block and the table.
    pub section_gap: f64,

    pub header_font_size: f64,
    pub body_font_size: f64,
    pub header_min_row_height: f64,
    pub min_row_height: f64,
    /// Vertical padding inside a cell, applied top and bottom.
    pub cell_padding: f64,
    /// Horizontal padding inside a cell, applied left and right.
    pub cell_inset: f64,
    /// Extra space between stacked lines in one cell.
    pub line_gap: f64,
    pub border_width: f64,

    /// Widths of the numeric columns, in visual order left to right:
    /// total with VAT, VAT amount, unit price, quantity. The product column
    /// takes whatever remains of the usable width.
    pub total_column_width: f64,
    pub vat_column_width: f64,
    pub unit_price_column_width: f64,
    pub quantity_column_width: f64,

    pub totals_value_width: f64,
    pub totals_row_height: f64,
    pub totals_total_row_height: f64,
    pub totals_font_size: f64,
    pub totals_total_font_size: f64,
    pub totals_total_border_width: f64,

    pub footer_font_size: f64,
    pub footer_height: f64,
    pub code_size: f64,
    /// Pixels per side of the rasterized code image.
    pub code_pixels: u32,

    /// Font size reduction floor for text that does not fit its cell.
    pub min_font_size: f64,
    /// Step used when shrinking text to fit.
    pub font_size_step: f64,

    /// Ascent and descent as a fraction of the font size, used when no
    /// TrueType font is loaded. Measured on Amiri.
    pub fallback_ascent_ratio: f64,
    pub fallback_descent_ratio: f64,

    /// chrono format string for the issue date.
    pub date_format: String,
}

impl Default for InvoiceStyle {
    fn default() -> Self {
        InvoiceStyle {
            margin: 10.0,

            title_font_size: 14.0,
            title_height: 24.0,
            meta_font_size: 9.0,
            meta_box_height: 16.0,
            meta_box_width: 180.0,
            store_name_font_size: 11.0,
            store_name_height: 20.0,
            store_address_font_size: 9.0,
            store_address_height: 16.0,
            vat_font_size: 8.0,
            vat_line_height: 16.0,
            section_gap: 4.0,

            header_font_size: 7.0,
            body_font_size: 9.0,
            header_min_row_height: 28.0,
            min_row_height: 18.0,
            cell_padding: 2.0,
            cell_inset: 3.0,
            line_gap: 1.0,
            border_width: 0.5,

            total_column_width: 30.0,
            vat_column_width: 30.0,
            unit_price_column_width: 30.0,
            quantity_column_width: 20.0,

            totals_value_width: 40.0,
            totals_row_height: 16.0,
            totals_total_row_height: 18.0,
            totals_font_size: 9.0,
            totals_total_font_size: 10.0,
            totals_total_border_width: 1.0,

            footer_font_size: 7.0,
            footer_height: 14.0,
            code_size: 55.0,
            code_pixels: 256,

            min_font_size: 5.0,
            font_size_step: 0.5,

            fallback_ascent_ratio: 0.8,
            fallback_descent_ratio: 0.5,

            date_format: "%Y/%m/%d".to_string(),
        }
    }
}

impl InvoiceStyle {
    /// Page width minus both margins.
    pub fn usable_width(&self) -> f64 {
        RECEIPT_WIDTH - 2.0 * self.margin
    }

    /// Table column widths in visual order, left to right:
    /// total with VAT, VAT amount, unit price, quantity, product name.
    ///
    /// The product column is the remainder, so the widths always sum to the
    /// usable width exactly.
    pub fn column_widths(&self) -> [f64; 5] {
        let numeric = self.total_column_width
            + self.vat_column_width
            + self.unit_price_column_width
            + self.quantity_column_width;
        [
            self.total_column_width,
            self.vat_column_width,
            self.unit_price_column_width,
            self.quantity_column_width,
            self.usable_width() - numeric,
        ]
    }

    /// Reject configurations the layout engine cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.margin < 0.0 || RECEIPT_WIDTH <= 2.0 * self.margin {
            return Err(InvoiceError::InvalidInput(format!(
                "margin {} leaves no room on a {}x{} page",
                self.margin, RECEIPT_WIDTH, RECEIPT_HEIGHT
            )));
        }
        let widths = self.column_widths();
        if widths.iter().any(|w| *w <= 0.0) {
            return Err(InvoiceError::InvalidInput(format!(
                "column widths {:?} do not fit the usable width {:.2}",
                widths,
                self.usable_width()
            )));
        }
        if self.totals_value_width >= self.usable_width() {
            return Err(InvoiceError::InvalidInput(
                "totals value column is wider than the table".to_string(),
            ));
        }
        if !(MIN_FONT_SIZE_FLOOR..=MAX_FONT_SIZE).contains(&self.min_font_size) {
            return Err(InvoiceError::InvalidInput(format!(
                "minimum font size {} must be between {} and {}",
                self.min_font_size, MIN_FONT_SIZE_FLOOR, MAX_FONT_SIZE
            )));
        }
        let (step_lo, step_hi) = FONT_SIZE_STEP_RANGE;
        if !(step_lo..=step_hi).contains(&self.font_size_step) {
            return Err(InvoiceError::InvalidInput(format!(
                "font size step {} must be between {} and {}",
                self.font_size_step, step_lo, step_hi
            )));
        }
        for (name, size) in self.font_sizes() {
            if !(size > 0.0 && size <= MAX_FONT_SIZE) {
                return Err(InvoiceError::InvalidInput(format!(
                    "{name} {size} must be positive and at most {MAX_FONT_SIZE}"
                )));
            }
        }
        let (px_lo, px_hi) = CODE_PIXELS_RANGE;
        if !(px_lo..=px_hi).contains(&self.code_pixels) {
            return Err(InvoiceError::InvalidInput(format!(
                "code image size {} px must be between {} and {}",
                self.code_pixels, px_lo, px_hi
            )));
        }
        Ok(())
    }

    fn font_sizes(&self) -> [(&'static str, f64); 10] {
        [
            ("titleFontSize", self.title_font_size),
            ("metaFontSize", self.meta_font_size),
            ("storeNameFontSize", self.store_name_font_size),
            ("storeAddressFontSize", self.store_address_font_size),
            ("vatFontSize", self.vat_font_size),
            ("headerFontSize", self.header_font_size),
            ("bodyFontSize", self.body_font_size),
            ("totalsFontSize", self.totals_font_size),
            ("totalsTotalFontSize", self.totals_total_font_size),
            ("footerFontSize", self.footer_font_size),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_widths_sum_to_usable_width() {
        let style = InvoiceStyle::default();
        let sum: f64 = style.column_widths().iter().sum();
        assert!((sum - style.usable_width()).abs() < 1e-9);
    }

    #[test]
    fn product_column_is_widest_and_rightmost() {
        let widths = InvoiceStyle::default().column_widths();
        let product = widths[4];
        assert!(widths[..4].iter().all(|w| *w < product));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let style: InvoiceStyle = serde_json::from_str(r#"{"margin": 8}"#).unwrap();
        assert_eq!(style.margin, 8.0);
        assert_eq!(style.body_font_size, InvoiceStyle::default().body_font_size);
    }

    #[test]
    fn page_size_keys_are_ignored() {
        let style: InvoiceStyle =
            serde_json::from_str(r#"{"pageWidth": 595, "pageHeight": 842}"#).unwrap();
        assert_eq!(style, InvoiceStyle::default());
        assert!((style.usable_width() - (RECEIPT_WIDTH - 20.0)).abs() < 1e-9);
    }

    #[test]
    fn default_style_is_valid() {
        assert!(InvoiceStyle::default().validate().is_ok());
    }

    #[test]
    fn tiny_shrink_step_rejected() {
        let style: InvoiceStyle = serde_json::from_str(r#"{"fontSizeStep": 0.000001}"#).unwrap();
        let err = style.validate().unwrap_err();
        assert!(err.to_string().contains("font size step"), "{err}");
    }

    #[test]
    fn font_size_floor_bounds() {
        for floor in [0.0, 0.5, 100.0] {
            let style = InvoiceStyle {
                min_font_size: floor,
                ..Default::default()
            };
            assert!(style.validate().is_err(), "floor {floor} accepted");
        }
    }

    #[test]
    fn huge_font_size_rejected() {
        let style = InvoiceStyle {
            title_font_size: 1.0e9,
            ..Default::default()
        };
        let err = style.validate().unwrap_err();
        assert!(err.to_string().contains("titleFontSize"), "{err}");
    }

    #[test]
    fn code_pixels_bounds() {
        for pixels in [0, 8, 100_000] {
            let style = InvoiceStyle {
                code_pixels: pixels,
                ..Default::default()
            };
            assert!(matches!(style.validate(), Err(InvoiceError::InvalidInput(_))));
        }
    }

    #[test]
    fn oversized_columns_rejected() {
        let style = InvoiceStyle {
            total_column_width: 200.0,
            ..Default::default()
        };
        assert!(style.validate().is_err());
    }
}
