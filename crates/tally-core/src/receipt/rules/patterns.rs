//! Common regex patterns for receipt extraction.
//!
//! Each labelled field has an ordered list of patterns. Earlier patterns are
//! stricter (anchored to the start of a line); later ones are looser. The
//! amount is always capture group 1.

use lazy_static::lazy_static;
use regex::Regex;

/// Amount body: `1,234.56`, `1234.56`, `12.5`, `12`.
///
/// The grouped form needs at least one `,ddd` group so that `1234.56` is
/// not cut short at `123`.
const AMOUNT: &str = r"(\d{1,3}(?:,\d{3})+(?:\.\d{1,2})?|\d+(?:\.\d{1,2})?)";

/// Separator between a label and its amount: optional colon/dash, optional `$`.
const SEP: &str = r"[ \t]*[:\-]?[ \t]*\$?[ \t]*";

fn labelled(label: &str) -> Regex {
    Regex::new(&format!(r"(?im)^[ \t]*{label}{SEP}{AMOUNT}")).unwrap()
}

/// Like `labelled`, but the amount must end the line, optionally followed by
/// a short flag or currency code (`T`, `N`, `USD`).
fn labelled_line(label: &str) -> Regex {
    Regex::new(&format!(
        r"(?im)^[ \t]*{label}{SEP}{AMOUNT}[ \t\r]*(?:[a-z]{{1,3}}[ \t\r]*)?$"
    ))
    .unwrap()
}

lazy_static! {
    pub static ref SUBTOTAL_PATTERNS: Vec<Regex> = vec![
        labelled(r"sub[ \t\-]?total"),
        Regex::new(&format!(r"(?i)\bsub[ \t\-]?total\b[^\n$\d]*\$?[ \t]*{AMOUNT}")).unwrap(),
    ];

    pub static ref TAX_PATTERNS: Vec<Regex> = vec![
        // "Tax: $0.68", "TAX1 0.50", "Tax 1 - 0.50", "GST $1.20", "TAX 0.68 T"
        labelled_line(r"(?:sales[ \t]+)?(?:tax|vat|gst|hst)(?:[ \t]*\d\b)?"),
        // "Sales Tax 8.25% $0.70": require the `$` so the rate is skipped
        Regex::new(&format!(
            r"(?i)\b(?:sales[ \t]+)?(?:tax|vat|gst|hst)\d?\b[^\n$]*?\$[ \t]*{AMOUNT}"
        ))
        .unwrap(),
    ];

    pub static ref TIP_PATTERNS: Vec<Regex> = vec![
        labelled(r"(?:tip|tips|gratuity)"),
        Regex::new(&format!(r"(?i)\b(?:tip|tips|gratuity)\b[^\n$\d]*\$?[ \t]*{AMOUNT}")).unwrap(),
    ];

    pub static ref TOTAL_PATTERNS: Vec<Regex> = vec![
        labelled(r"(?:grand|final)[ \t]+total"),
        labelled(r"total[ \t]+amount"),
        labelled(r"total"),
        labelled(r"amount[ \t]+due"),
        labelled(r"balance[ \t]+due"),
        Regex::new(&format!(r"(?i)\b(?:amount|balance)[ \t]+due\b[^\n$\d]*\$?[ \t]*{AMOUNT}")).unwrap(),
    ];

    /// A line holding nothing but a dollar amount with cents.
    pub static ref BARE_AMOUNT_LINE: Regex = Regex::new(
        r"(?m)^[ \t]*\$(\d+\.\d{2})[ \t\r]*$"
    ).unwrap();

    /// Any dollar amount anywhere in the text.
    pub static ref CURRENCY_AMOUNT: Regex = Regex::new(
        r"\$[ \t]*(\d{1,3}(?:,\d{3})+(?:\.\d{2})?|\d+(?:\.\d{2})?)"
    ).unwrap();

    // Date patterns, tried in this order
    pub static ref DATE_MDY: Regex = Regex::new(
        r"\b(\d{1,2})[/\-.](\d{1,2})[/\-.](\d{4}|\d{2})\b"
    ).unwrap();

    pub static ref DATE_YMD: Regex = Regex::new(
        r"\b(\d{4})[/\-.](\d{1,2})[/\-.](\d{1,2})\b"
    ).unwrap();

    pub static ref DATE_MONTH_NAME: Regex = Regex::new(
        r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?[ \t]+(\d{1,2})(?:st|nd|rd|th)?,?[ \t]+(\d{4})\b"
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
        patterns
            .iter()
            .find_map(|re| re.captures(text))
            .map(|caps| caps[1].to_string())
    }

    #[test]
    fn test_subtotal_not_read_as_total() {
        assert_eq!(first_capture(&TOTAL_PATTERNS, "Subtotal: $8.50"), None);
        assert_eq!(first_capture(&TOTAL_PATTERNS, "Sub Total 8.50"), None);
        assert_eq!(
            first_capture(&SUBTOTAL_PATTERNS, "Sub-Total 8.50"),
            Some("8.50".to_string())
        );
    }

    #[test]
    fn test_total_amount_label_not_split() {
        assert_eq!(first_capture(&TOTAL_PATTERNS, "Total Tax: $1.00"), None);
        assert_eq!(
            first_capture(&TOTAL_PATTERNS, "TOTAL AMOUNT $1,234.56"),
            Some("1,234.56".to_string())
        );
    }

    #[test]
    fn test_tax_rate_is_skipped() {
        assert_eq!(
            first_capture(&TAX_PATTERNS, "Sales Tax 8.25% $0.70"),
            Some("0.70".to_string())
        );
    }

    #[test]
    fn test_numbered_tax_does_not_eat_amount() {
        assert_eq!(first_capture(&TAX_PATTERNS, "Tax 10.50"), Some("10.50".to_string()));
        assert_eq!(first_capture(&TAX_PATTERNS, "TAX 1 0.50"), Some("0.50".to_string()));
    }

    #[test]
    fn test_tax_with_trailing_flag() {
        assert_eq!(first_capture(&TAX_PATTERNS, "TAX 0.68 T"), Some("0.68".to_string()));
        assert_eq!(first_capture(&TAX_PATTERNS, "Tax 0.68 USD"), Some("0.68".to_string()));
        assert_eq!(first_capture(&TAX_PATTERNS, "TAX1 10.50 N"), Some("10.50".to_string()));
        assert_eq!(first_capture(&TAX_PATTERNS, "Tax 0.68 TAXABLE"), None);
    }

    #[test]
    fn test_amount_without_grouping() {
        assert_eq!(
            first_capture(&TOTAL_PATTERNS, "Total: 1234.56"),
            Some("1234.56".to_string())
        );
    }

    #[test]
    fn test_bare_amount_line() {
        let caps = BARE_AMOUNT_LINE.captures("THANK YOU\n   $12.40  \nVISA").unwrap();
        assert_eq!(&caps[1], "12.40");
        assert!(BARE_AMOUNT_LINE.captures("Paid $12.40").is_none());
    }
}
