//! Structured error types for the invoice renderer.
//!
//! Layout overflow and backend failures abort a render. Shaping failures are
//! recovered inside the text module and only surface as warnings.

use thiserror::Error;

/// The unified error type returned by all public taxslip API functions.
#[derive(Debug, Error)]
pub enum InvoiceError {
    /// A cell cannot hold its text even at the minimum font size, or a box
    /// would extend past the bottom of the fixed page.
    #[error("Layout overflow in {element}: needs {required:.2}pt, {available:.2}pt available")]
    LayoutOverflow {
        element: String,
        required: f64,
        available: f64,
    },

    /// A script segment could not be shaped. The text module recovers from
    /// this by painting the run verbatim.
    #[error("Shaping failed for {text:?}: {reason}")]
    ShapingFailure { text: String, reason: String },

    /// Drawing or serialization failed in the backend.
    #[error("Backend error: {0}")]
    Backend(String),

    /// The invoice is missing a required field or a field is malformed.
    #[error("Invalid invoice: {0}")]
    InvalidInput(String),

    /// JSON input failed to parse as a valid invoice document.
    #[error("Failed to parse invoice document: {source}{}", hint_suffix(.hint))]
    Parse {
        #[source]
        source: serde_json::Error,
        hint: String,
    },

    /// A font could not be loaded or parsed.
    #[error("Font error: {0}")]
    Font(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, InvoiceError>;

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for InvoiceError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the invoice schema. \
                 Check field names, dates (YYYY-MM-DD) and amounts."
                    .to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        InvoiceError::Parse { source: e, hint }
    }
}

impl InvoiceError {
    pub(crate) fn overflow(element: impl Into<String>, required: f64, available: f64) -> Self {
        InvoiceError::LayoutOverflow {
            element: element.into(),
            required,
            available,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_carries_hint() {
        let err: InvoiceError = serde_json::from_str::<serde_json::Value>("{\"a\": 1,}")
            .unwrap_err()
            .into();
        let msg = err.to_string();
        assert!(msg.contains("Hint: Check for trailing commas"), "{msg}");
    }

    #[test]
    fn overflow_message_names_element() {
        let err = InvoiceError::overflow("totals row", 20.0, 16.0);
        assert_eq!(
            err.to_string(),
            "Layout overflow in totals row: needs 20.00pt, 16.00pt available"
        );
    }
}
