//! Rule-based field extractors for receipts.

pub mod amounts;
pub mod dates;
pub mod merchant;
pub mod patterns;

pub use amounts::{
    AmountExtractor, ReceiptAmounts, extract_amounts, extract_amounts_with_floor, format_amount,
    parse_amount,
};
pub use dates::{DateExtractor, extract_date};
pub use merchant::{MerchantExtractor, digit_ratio, extract_merchant};

use crate::models::receipt::Confidence;

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all occurrences of the field.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// Extraction context with confidence scores.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Position in source text.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, confidence: f32, source: impl Into<String>) -> Self {
        Self {
            value,
            confidence,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }

    /// Bucket the numeric score into a [`Confidence`] level.
    pub fn level(&self) -> Confidence {
        Confidence::from_score(self.confidence)
    }
}

impl Confidence {
    /// `>= 0.9` high, `>= 0.7` medium, anything else positive low.
    pub fn from_score(score: f32) -> Self {
        if score >= 0.9 {
            Self::High
        } else if score >= 0.7 {
            Self::Medium
        } else if score > 0.0 {
            Self::Low
        } else {
            Self::None
        }
    }
}
