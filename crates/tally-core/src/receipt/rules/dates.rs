//! Date extraction for receipts.

use chrono::NaiveDate;
use regex::{Captures, Regex};

use super::patterns::{DATE_MDY, DATE_MONTH_NAME, DATE_YMD};
use super::{ExtractionMatch, FieldExtractor};

/// Date field extractor.
///
/// Tries `MM/DD/YYYY`, then `YYYY/MM/DD`, then `Mon DD, YYYY`. Only the first
/// match of each family is looked at; a match that is not a real calendar
/// date falls through to the next family.
pub struct DateExtractor;

impl DateExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = ExtractionMatch<NaiveDate>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        families().into_iter().find_map(|(re, build)| {
            let caps = re.captures(text)?;
            let date = build(&caps)?;
            let full_match = caps.get(0)?;
            Some(
                ExtractionMatch::new(date, 0.9, full_match.as_str())
                    .with_position(full_match.start(), full_match.end()),
            )
        })
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results: Vec<Self::Output> = Vec::new();

        for (re, build) in families() {
            for caps in re.captures_iter(text) {
                let Some(date) = build(&caps) else { continue };
                // Skip if already found
                if results.iter().any(|r| r.value == date) {
                    continue;
                }
                if let Some(full_match) = caps.get(0) {
                    results.push(
                        ExtractionMatch::new(date, 0.9, full_match.as_str())
                            .with_position(full_match.start(), full_match.end()),
                    );
                }
            }
        }

        results
    }
}

/// Extract the transaction date from receipt text.
pub fn extract_date(text: &str) -> Option<ExtractionMatch<NaiveDate>> {
    DateExtractor::new().extract(text)
}

type DateBuilder = fn(&Captures) -> Option<NaiveDate>;

fn families() -> [(&'static Regex, DateBuilder); 3] {
    [
        (&*DATE_MDY, mdy as DateBuilder),
        (&*DATE_YMD, ymd as DateBuilder),
        (&*DATE_MONTH_NAME, month_name as DateBuilder),
    ]
}

fn mdy(caps: &Captures) -> Option<NaiveDate> {
    let month: u32 = caps[1].parse().ok()?;
    let day: u32 = caps[2].parse().ok()?;
    let year = parse_year(&caps[3])?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn ymd(caps: &Captures) -> Option<NaiveDate> {
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn month_name(caps: &Captures) -> Option<NaiveDate> {
    let month = month_to_number(&caps[1])?;
    let day: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Two-digit years are taken as 20YY.
fn parse_year(s: &str) -> Option<i32> {
    let year: i32 = s.parse().ok()?;
    if s.len() == 2 {
        Some(2000 + year)
    } else {
        Some(year)
    }
}

fn month_to_number(month: &str) -> Option<u32> {
    let month = match month.to_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_extract_date_mdy() {
        let result = extract_date("Date: 10/20/2025 14:02");
        assert_eq!(result.unwrap().value, date(2025, 10, 20));

        let result = extract_date("03-07-2024");
        assert_eq!(result.unwrap().value, date(2024, 3, 7));
    }

    #[test]
    fn test_extract_date_ymd() {
        let result = extract_date("2024/01/15 09:30");
        assert_eq!(result.unwrap().value, date(2024, 1, 15));

        let result = extract_date("2024-1-5");
        assert_eq!(result.unwrap().value, date(2024, 1, 5));
    }

    #[test]
    fn test_extract_date_month_name() {
        assert_eq!(extract_date("Jan 5, 2024").unwrap().value, date(2024, 1, 5));
        assert_eq!(extract_date("SEPT 30 2023").unwrap().value, date(2023, 9, 30));
        assert_eq!(extract_date("december 1st, 2022").unwrap().value, date(2022, 12, 1));
    }

    #[test]
    fn test_two_digit_year() {
        let result = extract_date("10/20/25");
        assert_eq!(result.unwrap().value, date(2025, 10, 20));
    }

    #[test]
    fn test_invalid_date_is_absent() {
        assert!(extract_date("13/45/2024").is_none());
        assert!(extract_date("02/30/2024").is_none());
        assert!(extract_date("no date on this one").is_none());
    }

    #[test]
    fn test_invalid_first_family_falls_through() {
        let result = extract_date("Ref 13/45/2024 printed Mar 3, 2024");
        assert_eq!(result.unwrap().value, date(2024, 3, 3));
    }

    #[test]
    fn test_street_name_is_not_a_month() {
        assert!(extract_date("123 Market St").is_none());
    }

    #[test]
    fn test_extract_all_dedupes() {
        let results = DateExtractor::new().extract_all("01/15/2024 and 2024-01-15 and 02/01/2024");
        let values: Vec<NaiveDate> = results.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![date(2024, 1, 15), date(2024, 2, 1)]);
    }
}
