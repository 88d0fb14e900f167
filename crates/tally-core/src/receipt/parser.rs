//! Receipt text parser combining the amount, date and merchant rules.

use std::time::Instant;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::models::config::ReceiptConfig;
use crate::models::receipt::{Confidence, ReceiptParseResult};
use crate::ocr::OcrResult;

use super::ReceiptExtractor;
use super::rules::{
    FieldExtractor, MerchantExtractor, ReceiptAmounts, extract_amounts_with_floor, extract_date,
};

/// Turns raw OCR text into best-effort receipt fields.
///
/// Parsing is pure and deterministic and never fails: a field that cannot be
/// recognized is simply left empty.
pub struct ReceiptTextParser {
    merchant: MerchantExtractor,
    /// Exclusive floor for the bare-amount-line fallback.
    bare_amount_floor: Decimal,
}

impl ReceiptTextParser {
    /// Create a parser with default thresholds.
    pub fn new() -> Self {
        Self::from_config(&ReceiptConfig::default())
    }

    pub fn from_config(config: &ReceiptConfig) -> Self {
        Self {
            merchant: MerchantExtractor::new()
                .with_max_lines(config.merchant_scan_lines)
                .with_length_bounds(config.merchant_min_len, config.merchant_max_len)
                .with_max_digit_ratio(config.merchant_max_digit_ratio),
            bare_amount_floor: config.bare_amount_floor,
        }
    }

    /// Set the bare-amount-line floor.
    pub fn with_bare_amount_floor(mut self, floor: Decimal) -> Self {
        self.bare_amount_floor = floor;
        self
    }

    /// Parse every field out of `text`.
    pub fn parse(&self, text: &str) -> ReceiptParseResult {
        let start = Instant::now();

        info!("Parsing receipt from {} characters of text", text.len());

        let mut result = ReceiptParseResult::new(text);

        let amounts = self.parse_amounts(text);
        if let Some(m) = amounts.subtotal {
            result.confidence.subtotal = m.level();
            result.subtotal = Some(m.value);
        }
        if let Some(m) = amounts.tax {
            result.confidence.tax = m.level();
            result.tax = Some(m.value);
        }
        if let Some(m) = amounts.tip {
            result.confidence.tip = m.level();
            result.tip = Some(m.value);
        }
        if let Some(m) = amounts.total {
            result.confidence.total = m.level();
            result.total = Some(m.value);
        }

        if let Some(m) = extract_date(text) {
            result.confidence.date = m.level();
            result.date = Some(m.value);
        }

        if let Some(m) = self.merchant.extract(text) {
            result.confidence.merchant = m.level();
            result.merchant = Some(m.value);
        }

        debug!(
            merchant = result.merchant.as_deref().unwrap_or("-"),
            total = ?result.total,
            date = ?result.date,
            "Parsed receipt in {:?}",
            start.elapsed()
        );

        result
    }

    /// Subtotal, tax, tip and total, with derivation and fallbacks applied.
    pub fn parse_amounts(&self, text: &str) -> ReceiptAmounts {
        extract_amounts_with_floor(text, self.bare_amount_floor)
    }

    /// First recognizable calendar date.
    pub fn parse_date(&self, text: &str) -> Option<NaiveDate> {
        extract_date(text).map(|m| m.value)
    }

    /// Merchant line from near the top of the receipt.
    pub fn parse_merchant(&self, text: &str) -> Option<String> {
        self.merchant.extract(text).map(|m| m.value)
    }
}

impl Default for ReceiptTextParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiptExtractor for ReceiptTextParser {
    fn extract(&self, ocr_result: &OcrResult) -> ReceiptParseResult {
        let result = self.parse(&ocr_result.text);

        debug!(
            "Receipt OCR took {}ms over {} text boxes",
            ocr_result.processing_time_ms,
            ocr_result.boxes.len()
        );

        if result.total.is_none() {
            info!("No total found on receipt, user will have to enter it");
        } else if result.confidence.total == Confidence::Low {
            info!("Receipt total came from a fallback scan");
        }

        result
    }
}
