//! Rule-based expense categorization from the merchant name.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::config::CategoryConfig;

/// How a rule's pattern is matched against the merchant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    /// Case-insensitive substring match (supports | for OR)
    #[default]
    Contains,
    /// Regular expression match
    Regex,
    /// Exact string match (case-insensitive)
    Exact,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Regex => "regex",
            Self::Exact => "exact",
        }
    }
}

impl std::str::FromStr for PatternType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "contains" => Ok(Self::Contains),
            "regex" => Ok(Self::Regex),
            "exact" => Ok(Self::Exact),
            _ => Err(format!("Unknown pattern type: {}", s)),
        }
    }
}

/// Maps merchants matching `pattern` to `category`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub pattern: String,
    #[serde(default)]
    pub pattern_type: PatternType,
    pub category: String,
    /// Higher priority rules are checked first
    #[serde(default)]
    pub priority: i32,
}

impl CategoryRule {
    pub fn new(pattern: &str, pattern_type: PatternType, category: &str, priority: i32) -> Self {
        Self {
            pattern: pattern.to_string(),
            pattern_type,
            category: category.to_string(),
            priority,
        }
    }

    /// Built-in rules for common receipt merchants.
    pub fn defaults() -> Vec<Self> {
        use PatternType::Contains;
        vec![
            Self::new("SHELL|CHEVRON|EXXON|MOBIL|ARCO|TEXACO", Contains, "Fuel", 20),
            // Short tokens need word boundaries: "1776 BAKERY", "DINNER"
            Self::new(r"^76\b", PatternType::Regex, "Fuel", 20),
            Self::new(r"\bGAS\b|\bFUEL\b", PatternType::Regex, "Fuel", 15),
            Self::new("PARKING|PARK MOBILE|SPOTHERO", Contains, "Parking", 20),
            Self::new("UBER|LYFT", Contains, "Travel", 15),
            Self::new(r"\b(?:TAXI|CAB)\b", PatternType::Regex, "Travel", 15),
            Self::new("AIRLINES|AIRWAYS|DELTA|UNITED|SOUTHWEST", Contains, "Travel", 15),
            Self::new("HOTEL|SUITES|MARRIOTT|HILTON|HYATT", Contains, "Lodging", 15),
            Self::new(r"\bINN\b", PatternType::Regex, "Lodging", 15),
            Self::new("STAPLES|OFFICE DEPOT|OFFICEMAX", Contains, "Office Supplies", 20),
            Self::new("COFFEE|CAFE|STARBUCKS|DUNKIN", Contains, "Meals", 10),
            Self::new("RESTAURANT|GRILL|DINER|PIZZA|BISTRO|KITCHEN", Contains, "Meals", 10),
        ]
    }

    fn matches(&self, merchant: &str, regex: Option<&Regex>) -> bool {
        let merchant_upper = merchant.to_uppercase();
        match self.pattern_type {
            PatternType::Contains => self
                .pattern
                .split('|')
                .filter(|p| !p.is_empty())
                .any(|p| merchant_upper.contains(&p.to_uppercase())),
            PatternType::Regex => {
                regex.is_some_and(|re| re.is_match(merchant) || re.is_match(&merchant_upper))
            }
            PatternType::Exact => merchant_upper.trim() == self.pattern.to_uppercase().trim(),
        }
    }
}

/// The category assigned to a merchant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Categorization {
    pub category: String,
    /// Pattern of the rule that matched; `None` means the fallback was used.
    pub pattern: Option<String>,
}

impl Categorization {
    pub fn is_fallback(&self) -> bool {
        self.pattern.is_none()
    }
}

/// Applies category rules in priority order.
#[derive(Debug, Clone)]
pub struct Categorizer {
    rules: Vec<(CategoryRule, Option<Regex>)>,
    fallback: String,
}

impl Categorizer {
    /// Build from rules, highest priority first. Rules with an invalid
    /// regex are skipped.
    pub fn new(rules: Vec<CategoryRule>, fallback: impl Into<String>) -> Self {
        let mut compiled: Vec<(CategoryRule, Option<Regex>)> = rules
            .into_iter()
            .filter_map(|rule| match rule.pattern_type {
                PatternType::Regex => match Regex::new(&rule.pattern) {
                    Ok(re) => Some((rule, Some(re))),
                    Err(e) => {
                        warn!("Skipping category rule {:?}: {}", rule.pattern, e);
                        None
                    }
                },
                _ => Some((rule, None)),
            })
            .collect();
        // Stable: equal priorities keep their configured order
        compiled.sort_by(|a, b| b.0.priority.cmp(&a.0.priority));

        Self {
            rules: compiled,
            fallback: fallback.into(),
        }
    }

    pub fn from_config(config: &CategoryConfig) -> Self {
        Self::new(config.rules.clone(), config.fallback.clone())
    }

    pub fn rules(&self) -> impl Iterator<Item = &CategoryRule> {
        self.rules.iter().map(|(rule, _)| rule)
    }

    /// Category for a merchant, or the fallback when nothing matches.
    pub fn categorize(&self, merchant: Option<&str>) -> Categorization {
        if let Some(merchant) = merchant.filter(|m| !m.trim().is_empty()) {
            for (rule, regex) in &self.rules {
                if rule.matches(merchant, regex.as_ref()) {
                    debug!("Merchant {:?} matched {:?} -> {}", merchant, rule.pattern, rule.category);
                    return Categorization {
                        category: rule.category.clone(),
                        pattern: Some(rule.pattern.clone()),
                    };
                }
            }
        }

        Categorization {
            category: self.fallback.clone(),
            pattern: None,
        }
    }
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::from_config(&CategoryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_rules() {
        let categorizer = Categorizer::default();
        assert_eq!(categorizer.categorize(Some("ACME COFFEE")).category, "Meals");
        assert_eq!(categorizer.categorize(Some("Shell Oil 5521")).category, "Fuel");
        assert_eq!(categorizer.categorize(Some("Joe's Gas & Go")).category, "Fuel");
        assert_eq!(categorizer.categorize(Some("Staples #1203")).category, "Office Supplies");
    }

    #[test]
    fn test_short_tokens_need_word_boundaries() {
        let categorizer = Categorizer::default();
        assert_eq!(categorizer.categorize(Some("Hampton Inn Downtown")).category, "Lodging");
        assert_eq!(categorizer.categorize(Some("76 Station 0421")).category, "Fuel");
        assert_eq!(categorizer.categorize(Some("Yellow Cab Co")).category, "Travel");
        assert_eq!(categorizer.categorize(Some("WINNERS DINER")).category, "Meals");
        assert!(categorizer.categorize(Some("1776 BAKERY")).is_fallback());
        assert!(categorizer.categorize(Some("Scabbard Supply")).is_fallback());
    }

    #[test]
    fn test_fallback() {
        let categorizer = Categorizer::default();
        let result = categorizer.categorize(Some("ZZZ Widgets"));
        assert_eq!(result.category, "Uncategorized");
        assert!(result.is_fallback());
        assert!(categorizer.categorize(None).is_fallback());
        assert!(categorizer.categorize(Some("  ")).is_fallback());
    }

    #[test]
    fn test_priority_order() {
        let categorizer = Categorizer::new(
            vec![
                CategoryRule::new("COFFEE", PatternType::Contains, "Meals", 1),
                CategoryRule::new("client coffee", PatternType::Contains, "Client Entertainment", 5),
            ],
            "Other",
        );
        assert_eq!(
            categorizer.categorize(Some("CLIENT COFFEE BAR")).category,
            "Client Entertainment"
        );
        assert_eq!(categorizer.categorize(Some("Coffee Hut")).category, "Meals");
    }

    #[test]
    fn test_equal_priority_keeps_order() {
        let categorizer = Categorizer::new(
            vec![
                CategoryRule::new("MART", PatternType::Contains, "Groceries", 0),
                CategoryRule::new("WALMART", PatternType::Contains, "General", 0),
            ],
            "Other",
        );
        assert_eq!(categorizer.categorize(Some("Walmart")).category, "Groceries");
    }

    #[test]
    fn test_exact_and_regex() {
        let categorizer = Categorizer::new(
            vec![
                CategoryRule::new("costco", PatternType::Exact, "Warehouse", 0),
                CategoryRule::new(r"^TST\* ", PatternType::Regex, "Meals", 0),
                CategoryRule::new("(unclosed", PatternType::Regex, "Broken", 100),
            ],
            "Other",
        );
        assert_eq!(categorizer.rules().count(), 2);
        assert_eq!(categorizer.categorize(Some("COSTCO")).category, "Warehouse");
        assert_eq!(categorizer.categorize(Some("COSTCO GAS")).category, "Other");
        assert_eq!(categorizer.categorize(Some("TST* Taqueria")).category, "Meals");
    }

    #[test]
    fn test_pattern_type_parsing() {
        assert_eq!("Regex".parse::<PatternType>(), Ok(PatternType::Regex));
        assert_eq!(PatternType::Exact.as_str(), "exact");
        assert!("fuzzy".parse::<PatternType>().is_err());
    }

    #[test]
    fn test_rules_deserialize_with_defaults() {
        let rule: CategoryRule =
            serde_json::from_str(r#"{"pattern": "ikea", "category": "Furniture"}"#).unwrap();
        assert_eq!(rule.pattern_type, PatternType::Contains);
        assert_eq!(rule.priority, 0);
    }
}
