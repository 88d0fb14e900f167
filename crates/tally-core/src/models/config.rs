//! Configuration structures for receipt parsing and mileage tracking.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::categorize::CategoryRule;
use crate::error::{Result, TallyError};
use crate::mileage::rates::{MileageRate, MileageRateTable};
use crate::models::trip::TripPurpose;

/// Main configuration for tally.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    /// OCR configuration.
    pub ocr: OcrConfig,

    /// Receipt text parsing configuration.
    pub receipt: ReceiptConfig,

    /// Motion trip detection configuration.
    pub detector: DetectorConfig,

    /// Mileage reimbursement configuration.
    pub mileage: MileageConfig,

    /// Expense categorization rules.
    pub categories: CategoryConfig,
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory containing `det.onnx`, `latin_rec.onnx` and `latin_dict.txt`.
    pub model_dir: PathBuf,

    /// Keep `[UNK]` tokens in recognized text instead of blanking them.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            keep_unk: false,
        }
    }
}

/// Receipt parsing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiptConfig {
    /// Non-empty lines from the top inspected for the merchant name.
    pub merchant_scan_lines: usize,

    /// Shortest accepted merchant line, in characters.
    pub merchant_min_len: usize,

    /// Longest accepted merchant line, in characters.
    pub merchant_max_len: usize,

    /// Merchant lines must have a digit ratio strictly below this.
    pub merchant_max_digit_ratio: f32,

    /// A line holding only a dollar amount must exceed this to count as the total.
    pub bare_amount_floor: Decimal,
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            merchant_scan_lines: 5,
            merchant_min_len: 3,
            merchant_max_len: 50,
            merchant_max_digit_ratio: 0.3,
            bare_amount_floor: Decimal::ONE,
        }
    }
}

/// Motion detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Speeds strictly above this count as driving (m/s).
    pub moving_speed_mps: f64,

    /// Consecutive moving fixes needed before a trip is auto-started.
    pub required_moving_samples: u32,

    /// Minimum fix-time between distance writes to the store, in seconds.
    pub sync_interval_secs: u64,

    /// Purpose given to auto-started trips.
    pub auto_start_purpose: TripPurpose,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            moving_speed_mps: 3.0,
            required_moving_samples: 2,
            sync_interval_secs: 30,
            auto_start_purpose: TripPurpose::Business,
        }
    }
}

/// Mileage reimbursement configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MileageConfig {
    /// Reimbursement rates by effective date.
    pub rates: Vec<MileageRate>,
}

impl Default for MileageConfig {
    fn default() -> Self {
        Self {
            rates: MileageRateTable::irs_business().into_rates(),
        }
    }
}

impl MileageConfig {
    pub fn rate_table(&self) -> MileageRateTable {
        MileageRateTable::new(self.rates.clone())
    }
}

/// Categorization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    /// Rules evaluated by descending priority.
    pub rules: Vec<CategoryRule>,

    /// Category used when no rule matches.
    pub fallback: String,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            rules: CategoryRule::defaults(),
            fallback: "Uncategorized".to_string(),
        }
    }
}

impl TallyConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| TallyError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| TallyError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = TallyConfig::default();
        assert_eq!(config.receipt.merchant_scan_lines, 5);
        assert_eq!(config.detector.moving_speed_mps, 3.0);
        assert_eq!(config.detector.required_moving_samples, 2);
        assert_eq!(config.detector.sync_interval_secs, 30);
        assert!(!config.mileage.rates.is_empty());
        assert!(!config.categories.rules.is_empty());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: TallyConfig =
            serde_json::from_str(r#"{"detector": {"moving_speed_mps": 4.5}}"#).unwrap();
        assert_eq!(config.detector.moving_speed_mps, 4.5);
        assert_eq!(config.detector.required_moving_samples, 2);
        assert_eq!(config.receipt.merchant_max_len, 50);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = TallyConfig::default();
        config.receipt.bare_amount_floor = Decimal::new(250, 2);
        config.detector.auto_start_purpose = TripPurpose::Personal;
        config.save(&path).unwrap();

        let loaded = TallyConfig::from_file(&path).unwrap();
        assert_eq!(loaded.receipt.bare_amount_floor, Decimal::new(250, 2));
        assert_eq!(loaded.detector.auto_start_purpose, TripPurpose::Personal);
        assert_eq!(loaded.mileage.rates, config.mileage.rates);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            TallyConfig::from_file(&path),
            Err(TallyError::Config(_))
        ));
    }
}
