//! # Invoice Model
//!
//! The input representation for the renderer. An [`Invoice`] carries values
//! that have already been computed upstream: line totals, VAT amounts and the
//! totals block arrive ready to print. The renderer never recomputes them, it
//! prints exactly the digits and scale it was handed.
//!
//! Everything deserializes from camelCase JSON so invoices can be produced by
//! a point-of-sale backend without a Rust toolchain.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{InvoiceError, Result};
use crate::style::InvoiceStyle;

/// Length of a VAT registration number.
pub const VAT_NUMBER_LEN: usize = 15;

/// A complete invoice ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub store_name: String,
    pub store_address: String,
    /// Fixed-length numeric registration number.
    pub vat_registration_number: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
    pub totals: Totals,
    /// Numeric marker printed above the code image.
    pub footer_code: String,
    /// Data handed to the code-image provider.
    #[serde(default)]
    pub code_payload: String,
    #[serde(default)]
    pub labels: Labels,
}

/// One row of the item table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub vat_amount: Decimal,
    pub total_with_vat: Decimal,
}

/// The totals block. All amounts are pre-computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub taxable_amount: Decimal,
    pub vat_amount: Decimal,
    pub vat_rate_percent: u32,
    pub total_with_vat: Decimal,
}

/// Caption texts. Defaults are the Arabic captions of a simplified tax
/// invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Labels {
    pub title: String,
    pub invoice_number: String,
    pub date: String,
    pub vat_registration: String,
    /// Captions for (product, quantity, unit price, VAT, total), each one or
    /// two stacked lines.
    pub product_column: Vec<String>,
    pub quantity_column: Vec<String>,
    pub unit_price_column: Vec<String>,
    pub vat_column: Vec<String>,
    pub total_column: Vec<String>,
    pub total_taxable: String,
    pub vat: String,
    pub total_with_vat: String,
    pub footer: String,
}

impl Default for Labels {
    fn default() -> Self {
        Labels {
            title: "فاتورة ضريبية مبسطة".to_string(),
            invoice_number: "رقم الفاتورة:".to_string(),
            date: "التاريخ:".to_string(),
            vat_registration: "رقم تسجيل ضريبة القيمة المضافة:".to_string(),
            product_column: vec!["المنتجات".to_string()],
            quantity_column: vec!["الكمية".to_string()],
            unit_price_column: vec!["سعر".to_string(), "الوحدة".to_string()],
            vat_column: vec!["ضريبة القيمة".to_string(), "المضافة".to_string()],
            total_column: vec!["السعر شامل".to_string(), "الضريبة".to_string()],
            total_taxable: "إجمالي المبلغ الخاضع للضريبة".to_string(),
            vat: "ضريبة القيمة المضافة".to_string(),
            total_with_vat: "المجموع مع الضريبة".to_string(),
            footer: "شكراً لتعاملكم معنا".to_string(),
        }
    }
}

impl Labels {
    /// The VAT label with the rate token embedded, e.g. `ضريبة القيمة المضافة (15%)`.
    pub fn vat_with_rate(&self, rate_percent: u32) -> String {
        format!("{} ({}%)", self.vat, rate_percent)
    }
}

/// A font supplied alongside the invoice JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontEntry {
    /// Base64-encoded font data, a `data:` URI, or a file path.
    pub src: String,
    #[serde(default)]
    pub bold: bool,
}

/// The JSON document accepted by [`crate::render_json`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDocument {
    pub invoice: Invoice,
    #[serde(default)]
    pub style: InvoiceStyle,
    #[serde(default)]
    pub fonts: Vec<FontEntry>,
}

impl Invoice {
    /// Check required fields before any layout work starts.
    ///
    /// An empty item list is valid; the table still prints its header.
    pub fn validate(&self) -> Result<()> {
        if self.invoice_number.trim().is_empty() {
            return Err(InvoiceError::InvalidInput(
                "invoice number is required".to_string(),
            ));
        }
        if self.store_name.trim().is_empty() {
            return Err(InvoiceError::InvalidInput(
                "store name is required".to_string(),
            ));
        }
        let vat = &self.vat_registration_number;
        if vat.chars().count() != VAT_NUMBER_LEN || !vat.chars().all(|c| c.is_ascii_digit()) {
            return Err(InvoiceError::InvalidInput(format!(
                "VAT registration number must be {} digits, got {:?}",
                VAT_NUMBER_LEN, vat
            )));
        }
        if self.footer_code.is_empty() || !self.footer_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(InvoiceError::InvalidInput(format!(
                "footer code must be numeric, got {:?}",
                self.footer_code
            )));
        }
        for (i, item) in self.items.iter().enumerate() {
            if item.quantity == 0 {
                return Err(InvoiceError::InvalidInput(format!(
                    "item {} ({:?}) has zero quantity",
                    i + 1,
                    item.name
                )));
            }
            if item.name.trim().is_empty() {
                return Err(InvoiceError::InvalidInput(format!(
                    "item {} has no product name",
                    i + 1
                )));
            }
        }
        Ok(())
    }

    /// The issue date as printed, using the style's chrono format string.
    pub fn formatted_date(&self, format: &str) -> String {
        self.issue_date.format(format).to_string()
    }

    /// The footer marker text: optional label followed by the code.
    pub fn footer_text(&self) -> String {
        if self.labels.footer.is_empty() {
            self.footer_code.clone()
        } else {
            format!("{} {}", self.labels.footer, self.footer_code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> Invoice {
        Invoice {
            invoice_number: "INV10111".to_string(),
            issue_date: NaiveDate::from_ymd_opt(2021, 12, 12).unwrap(),
            store_name: "متجر التجربة".to_string(),
            store_address: "الرياض".to_string(),
            vat_registration_number: "123456789900003".to_string(),
            items: vec![LineItem {
                name: "منتج".to_string(),
                quantity: 1,
                unit_price: dec!(50),
                vat_amount: dec!(7.5),
                total_with_vat: dec!(57.5),
            }],
            totals: Totals {
                taxable_amount: dec!(50),
                vat_amount: dec!(7.5),
                vat_rate_percent: 15,
                total_with_vat: dec!(57.5),
            },
            footer_code: "0100".to_string(),
            code_payload: "payload".to_string(),
            labels: Labels::default(),
        }
    }

    #[test]
    fn valid_invoice_passes() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn empty_items_are_valid() {
        let mut inv = sample();
        inv.items.clear();
        assert!(inv.validate().is_ok());
    }

    #[test]
    fn missing_invoice_number_rejected() {
        let mut inv = sample();
        inv.invoice_number = "  ".to_string();
        assert!(matches!(inv.validate(), Err(InvoiceError::InvalidInput(_))));
    }

    #[test]
    fn short_vat_number_rejected() {
        let mut inv = sample();
        inv.vat_registration_number = "12345".to_string();
        assert!(matches!(inv.validate(), Err(InvoiceError::InvalidInput(_))));
    }

    #[test]
    fn zero_quantity_rejected() {
        let mut inv = sample();
        inv.items[0].quantity = 0;
        assert!(matches!(inv.validate(), Err(InvoiceError::InvalidInput(_))));
    }

    #[test]
    fn date_uses_style_format() {
        assert_eq!(sample().formatted_date("%Y/%m/%d"), "2021/12/12");
    }

    #[test]
    fn vat_label_embeds_rate() {
        let labels = Labels::default();
        assert!(labels.vat_with_rate(15).ends_with("(15%)"));
    }

    #[test]
    fn footer_shows_default_caption_then_code() {
        let text = sample().footer_text();
        assert!(text.starts_with("شكراً لتعاملكم معنا"), "{text}");
        assert!(text.ends_with(" 0100"), "{text}");
    }

    #[test]
    fn empty_footer_caption_prints_code_alone() {
        let mut inv = sample();
        inv.labels.footer.clear();
        assert_eq!(inv.footer_text(), "0100");
    }

    #[test]
    fn decimals_keep_supplied_scale() {
        let json = r#"{"name":"x","quantity":2,"unitPrice":"50.00",
                       "vatAmount":"15.00","totalWithVat":"115.00"}"#;
        let item: LineItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.total_with_vat.to_string(), "115.00");
    }

    #[test]
    fn labels_default_when_missing() {
        let json = r#"{"title":"Tax Invoice"}"#;
        let labels: Labels = serde_json::from_str(json).unwrap();
        assert_eq!(labels.title, "Tax Invoice");
        assert_eq!(labels.date, Labels::default().date);
    }
}
