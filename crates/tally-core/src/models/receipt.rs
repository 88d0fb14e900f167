//! Receipt data extracted from OCR text.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Best-effort receipt fields recovered from recognized text.
///
/// Every field is a hint for pre-filling an expense form. Absence is the only
/// failure signal; nothing here has been validated by a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiptParseResult {
    /// Full recognized text, kept for audit.
    pub raw_text: String,

    /// Amount before tax and tip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<Decimal>,

    /// Sales tax (VAT/GST/HST).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax: Option<Decimal>,

    /// Gratuity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tip: Option<Decimal>,

    /// Amount charged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<Decimal>,

    /// Transaction date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,

    /// Merchant name line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,

    /// How each field was obtained.
    #[serde(default)]
    pub confidence: FieldConfidence,
}

impl ReceiptParseResult {
    /// Create an empty result for the given text.
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            ..Default::default()
        }
    }

    /// Date formatted as `YYYY-MM-DD`.
    pub fn date_string(&self) -> Option<String> {
        self.date.map(|d| d.format("%Y-%m-%d").to_string())
    }

    /// True when no field could be extracted.
    pub fn is_empty(&self) -> bool {
        self.subtotal.is_none()
            && self.tax.is_none()
            && self.tip.is_none()
            && self.total.is_none()
            && self.date.is_none()
            && self.merchant.is_none()
    }

    /// Whether the form should ask the user to double-check the values.
    ///
    /// True when there is no total, or any extracted field came from a
    /// fallback scan.
    pub fn needs_review(&self) -> bool {
        if self.total.is_none() {
            return true;
        }
        let c = &self.confidence;
        [c.subtotal, c.tax, c.tip, c.total, c.date, c.merchant]
            .iter()
            .any(|level| *level == Confidence::Low)
    }
}

/// Confidence level attached to an extracted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Field was not found.
    #[default]
    None,
    /// Found by a fallback scan.
    Low,
    /// Derived from other fields.
    Medium,
    /// Found next to its label.
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Per-field confidence for a [`ReceiptParseResult`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfidence {
    pub subtotal: Confidence,
    pub tax: Confidence,
    pub tip: Confidence,
    pub total: Confidence,
    pub date: Confidence,
    pub merchant: Confidence,
}
