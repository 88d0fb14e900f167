//! Merchant name extraction.

use super::{ExtractionMatch, FieldExtractor};

/// Picks the merchant line from the top of a receipt.
///
/// Merchant names are mostly letters; addresses, phone numbers and
/// receipt numbers are digit-dense.
pub struct MerchantExtractor {
    /// How many non-empty lines from the top to inspect.
    max_lines: usize,
    /// Inclusive character length bounds.
    min_len: usize,
    max_len: usize,
    /// Lines at or above this digit ratio are rejected.
    max_digit_ratio: f32,
}

impl MerchantExtractor {
    pub fn new() -> Self {
        Self {
            max_lines: 5,
            min_len: 3,
            max_len: 50,
            max_digit_ratio: 0.3,
        }
    }

    pub fn with_max_lines(mut self, max_lines: usize) -> Self {
        self.max_lines = max_lines;
        self
    }

    pub fn with_length_bounds(mut self, min_len: usize, max_len: usize) -> Self {
        self.min_len = min_len;
        self.max_len = max_len;
        self
    }

    pub fn with_max_digit_ratio(mut self, ratio: f32) -> Self {
        self.max_digit_ratio = ratio;
        self
    }

    fn is_candidate(&self, line: &str) -> bool {
        let len = line.chars().count();
        if len < self.min_len || len > self.max_len {
            return false;
        }
        digit_ratio(line) < self.max_digit_ratio
    }
}

impl Default for MerchantExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for MerchantExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .take(self.max_lines)
            .enumerate()
            .filter(|(_, line)| self.is_candidate(line))
            .map(|(index, line)| {
                // The very first line is the usual spot for the store name.
                let confidence = if index == 0 { 0.9 } else { 0.7 };
                ExtractionMatch::new(line.to_string(), confidence, line)
            })
            .collect()
    }
}

/// Extract the merchant using default thresholds.
pub fn extract_merchant(text: &str) -> Option<String> {
    MerchantExtractor::new().extract(text).map(|m| m.value)
}

/// Share of characters that are ASCII digits.
pub fn digit_ratio(line: &str) -> f32 {
    let total = line.chars().count();
    if total == 0 {
        return 0.0;
    }
    let digits = line.chars().filter(|c| c.is_ascii_digit()).count();
    digits as f32 / total as f32
}
