//! Amount extraction for receipts.

use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

use super::patterns::{
    BARE_AMOUNT_LINE, CURRENCY_AMOUNT, SUBTOTAL_PATTERNS, TAX_PATTERNS, TIP_PATTERNS,
    TOTAL_PATTERNS,
};
use super::{ExtractionMatch, FieldExtractor};

/// Confidence of a match found next to its label by the first (strict) pattern.
const LABELLED_STRICT: f32 = 0.95;
/// Confidence of a match found by a looser labelled pattern.
const LABELLED_LOOSE: f32 = 0.9;
/// Confidence of a value computed from other fields.
const DERIVED: f32 = 0.8;
/// Confidence of a value found by an unlabelled scan.
const FALLBACK: f32 = 0.5;

/// Extractor for every `$`-prefixed amount in the text.
pub struct AmountExtractor;

impl AmountExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = ExtractionMatch<Decimal>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        CURRENCY_AMOUNT
            .captures_iter(text)
            .filter_map(|caps| {
                let amount = parse_amount(&caps[1])?;
                let full_match = caps.get(0)?;
                Some(
                    ExtractionMatch::new(amount, FALLBACK, full_match.as_str())
                        .with_position(full_match.start(), full_match.end()),
                )
            })
            .collect()
    }
}

/// Labelled amounts found on a receipt.
#[derive(Debug, Clone, Default)]
pub struct ReceiptAmounts {
    pub subtotal: Option<ExtractionMatch<Decimal>>,
    pub tax: Option<ExtractionMatch<Decimal>>,
    pub tip: Option<ExtractionMatch<Decimal>>,
    pub total: Option<ExtractionMatch<Decimal>>,
}

/// Extract amounts using the default bare-line floor of $1.00.
pub fn extract_amounts(text: &str) -> ReceiptAmounts {
    extract_amounts_with_floor(text, Decimal::ONE)
}

/// Extract subtotal, tax, tip, and total from receipt text.
///
/// `bare_line_floor` is the exclusive lower bound for accepting a line that
/// holds nothing but a dollar amount when no labelled total was found.
pub fn extract_amounts_with_floor(text: &str, bare_line_floor: Decimal) -> ReceiptAmounts {
    let mut result = ReceiptAmounts {
        subtotal: first_labelled(&SUBTOTAL_PATTERNS, text),
        tax: first_labelled(&TAX_PATTERNS, text),
        tip: first_labelled(&TIP_PATTERNS, text),
        total: first_labelled(&TOTAL_PATTERNS, text),
    };

    // A lone "$12.40" line is usually the charged amount
    if result.total.is_none() && result.subtotal.is_none() {
        result.total = BARE_AMOUNT_LINE.captures_iter(text).find_map(|caps| {
            let amount = parse_amount(&caps[1]).filter(|a| *a > bare_line_floor)?;
            Some(ExtractionMatch::new(amount, FALLBACK, caps[0].trim()))
        });
    }

    if result.total.is_none() {
        if let (Some(subtotal), Some(tax)) = (&result.subtotal, &result.tax) {
            let tip = result.tip.as_ref().map(|m| m.value).unwrap_or(Decimal::ZERO);
            let total = subtotal.value + tax.value + tip;
            result.total = Some(ExtractionMatch::new(total, DERIVED, "calculated"));
        }
    }

    if result.subtotal.is_none() {
        if let Some(total) = &result.total {
            let confidence = total.confidence.min(DERIVED);
            result.subtotal = Some(ExtractionMatch::new(total.value, confidence, "calculated"));
        }
    }

    // Last resort: the largest dollar amount on the receipt
    if result.total.is_none() && result.subtotal.is_none() {
        let largest = AmountExtractor::new()
            .extract_all(text)
            .into_iter()
            .max_by(|a, b| a.value.cmp(&b.value));
        if let Some(largest) = largest {
            result.subtotal = Some(largest.clone());
            result.total = Some(largest);
        }
    }

    result
}

/// Try each pattern in order and return the first usable amount.
fn first_labelled(patterns: &[Regex], text: &str) -> Option<ExtractionMatch<Decimal>> {
    patterns.iter().enumerate().find_map(|(index, re)| {
        let caps = re.captures(text)?;
        let amount = parse_amount(&caps[1])?;
        let full_match = caps.get(0)?;
        let confidence = if index == 0 {
            LABELLED_STRICT
        } else {
            LABELLED_LOOSE
        };
        Some(
            ExtractionMatch::new(amount, confidence, full_match.as_str().trim())
                .with_position(full_match.start(), full_match.end()),
        )
    })
}

/// Parse a US-formatted amount (e.g., "$1,234.56").
///
/// Returns `None` for non-numeric input and for values that are zero or
/// negative.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();

    Decimal::from_str(&cleaned)
        .ok()
        .filter(|amount| *amount > Decimal::ZERO)
}

/// Format amount with thousands separators (1,234.56).
pub fn format_amount(amount: Decimal) -> String {
    let s = format!("{:.2}", amount.round_dp(2));
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s.as_str()),
    };
    let (integer_part, decimal_part) = digits.split_once('.').unwrap_or((digits, "00"));

    let chars: Vec<char> = integer_part.chars().collect();
    let mut formatted = String::new();

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(*c);
    }

    format!("{}{}.{}", sign, formatted, decimal_part)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("$1,234.56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("12"), Some(dec("12")));
        assert_eq!(parse_amount("$ 9.18"), Some(dec("9.18")));
        assert_eq!(parse_amount("0.00"), None);
        assert_eq!(parse_amount("-3.00"), None);
        assert_eq!(parse_amount("abc"), None);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(dec("1234.5")), "1,234.50");
        assert_eq!(format_amount(dec("12345678.90")), "12,345,678.90");
        assert_eq!(format_amount(dec("9.18")), "9.18");
    }

    #[test]
    fn test_subtotal_and_tax_derive_total() {
        let amounts = extract_amounts("Subtotal: $20.00\nTax: $1.60\n");

        assert_eq!(amounts.subtotal.unwrap().value, dec("20.00"));
        assert_eq!(amounts.tax.unwrap().value, dec("1.60"));
        let total = amounts.total.unwrap();
        assert_eq!(total.value, dec("21.60"));
        assert_eq!(total.source, "calculated");
    }

    #[test]
    fn test_derived_total_includes_tip() {
        let amounts = extract_amounts("Subtotal 40.00\nTax 3.20\nTip 8.00\n");
        assert_eq!(amounts.total.unwrap().value, dec("51.20"));
    }

    #[test]
    fn test_total_only_backfills_subtotal() {
        let amounts = extract_amounts("Total: $42.10");
        assert_eq!(amounts.total.unwrap().value, dec("42.10"));
        assert_eq!(amounts.subtotal.unwrap().value, dec("42.10"));
    }

    #[test]
    fn test_zero_tax_is_absent() {
        let amounts = extract_amounts("Subtotal: $5.00\nTax: $0.00\n");
        assert!(amounts.tax.is_none());
        // Without tax the total cannot be derived, so subtotal stays alone.
        assert!(amounts.total.is_none());
        assert_eq!(amounts.subtotal.unwrap().value, dec("5.00"));
    }

    #[test]
    fn test_tax_synonyms() {
        for text in ["VAT: 1.20", "GST $1.20", "HST 1.20", "TAX1 1.20", "Tax 1: $1.20"] {
            let amounts = extract_amounts(text);
            assert_eq!(amounts.tax.map(|m| m.value), Some(dec("1.20")), "{}", text);
        }
    }

    #[test]
    fn test_tax_line_with_taxable_flag() {
        let amounts = extract_amounts("SUBTOTAL 8.50\nTAX 0.68 T\nTOTAL 9.18");
        assert_eq!(amounts.subtotal.unwrap().value, dec("8.50"));
        assert_eq!(amounts.tax.unwrap().value, dec("0.68"));
        assert_eq!(amounts.total.unwrap().value, dec("9.18"));
    }

    #[test]
    fn test_total_synonyms() {
        for text in [
            "Grand Total: $15.00",
            "Amount Due $15.00",
            "BALANCE DUE 15.00",
            "Total Amount: $15.00",
            "Final Total - 15.00",
        ] {
            let amounts = extract_amounts(text);
            assert_eq!(amounts.total.map(|m| m.value), Some(dec("15.00")), "{}", text);
        }
    }

    #[test]
    fn test_thousands_separator() {
        let amounts = extract_amounts("TOTAL $1,299.99");
        assert_eq!(amounts.total.unwrap().value, dec("1299.99"));
    }

    #[test]
    fn test_bare_amount_line_fallback() {
        let text = "CORNER MARKET\n$0.50\n   $23.75\nTHANK YOU";
        let amounts = extract_amounts(text);
        let total = amounts.total.unwrap();
        assert_eq!(total.value, dec("23.75"));
        assert_eq!(total.confidence, FALLBACK);
        assert_eq!(amounts.subtotal.unwrap().value, dec("23.75"));
    }

    #[test]
    fn test_bare_amount_line_respects_floor() {
        let amounts = extract_amounts_with_floor("$0.90\n$4.00", dec("5"));
        // Both lines are under the floor, so the max-amount scan decides.
        assert_eq!(amounts.total.unwrap().value, dec("4.00"));
    }

    #[test]
    fn test_largest_amount_fallback() {
        let text = "Coffee $3.50 Muffin $2.25 paid with card $5.75 ea";
        let amounts = extract_amounts(text);
        assert_eq!(amounts.total.unwrap().value, dec("5.75"));
        assert_eq!(amounts.subtotal.unwrap().value, dec("5.75"));
    }

    #[test]
    fn test_nothing_found() {
        let amounts = extract_amounts("no prices here");
        assert!(amounts.total.is_none());
        assert!(amounts.subtotal.is_none());
    }

    #[test]
    fn test_extract_all_amounts() {
        let extractor = AmountExtractor::new();
        let results = extractor.extract_all("Coffee $3.50, Bagel $2.00, $0.00 discount");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].position, Some((7, 12)));
    }
}
