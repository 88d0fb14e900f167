//! WASM bindings for receipt parsing and trip detection.
//!
//! The web front end runs its own OCR and owns trip storage; these bindings
//! give it the same parser, detector and mileage math as the native CLI.

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use wasm_bindgen::prelude::*;

use tally_core::mileage::{self, DetectorState, MileageRateTable, MotionTripDetector};
use tally_core::models::config::DetectorConfig;
use tally_core::{Categorizer, GpsFix, ReceiptTextParser, TripPurpose};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Extract subtotal, tax, tip, total, date and merchant from recognized text.
#[wasm_bindgen]
pub fn parse_receipt(text: &str) -> Result<JsValue, JsValue> {
    to_js(&ReceiptTextParser::new().parse(text))
}

/// Suggest an expense category for a merchant name.
#[wasm_bindgen]
pub fn categorize_merchant(merchant: &str) -> String {
    Categorizer::default().categorize(Some(merchant)).category
}

/// Great-circle distance in miles between two points in degrees.
#[wasm_bindgen]
pub fn haversine_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    mileage::haversine_miles((lat1, lon1), (lat2, lon2))
}

/// Reimbursement in dollars: `distance × rate` for business trips, else 0.
#[wasm_bindgen]
pub fn reimbursement(distance_miles: f64, purpose: &str, rate_per_mile: f64) -> Result<f64, JsValue> {
    let purpose: TripPurpose = purpose.parse().map_err(|e: String| JsValue::from_str(&e))?;
    let rate = Decimal::try_from(rate_per_mile)
        .map_err(|e| JsValue::from_str(&format!("Invalid rate: {}", e)))?;

    Ok(mileage::reimbursement(distance_miles, purpose, rate)
        .to_f64()
        .unwrap_or(0.0))
}

/// IRS business rate in effect on a `YYYY-MM-DD` date.
#[wasm_bindgen]
pub fn mileage_rate_on(date: &str) -> Option<f64> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    MileageRateTable::irs_business()
        .rate_on(date)
        .and_then(|r| r.to_f64())
}

/// IRS business rate in effect today.
#[wasm_bindgen]
pub fn mileage_rate_today() -> Option<f64> {
    let now = Utc.timestamp_millis_opt(js_sys::Date::now() as i64).single()?;
    MileageRateTable::irs_business()
        .rate_on(now.date_naive())
        .and_then(|r| r.to_f64())
}

/// Motion-based trip detector for the browser.
///
/// The caller owns trip storage: when `observe` reports `should_auto_start`,
/// call `begin_auto_start`, create the trip, then report the outcome with
/// `auto_start_succeeded` or `auto_start_failed`.
#[wasm_bindgen]
pub struct MotionDetector {
    inner: MotionTripDetector,
}

#[derive(serde::Serialize)]
struct Observation {
    moving: bool,
    speed_mps: Option<f64>,
    added_miles: f64,
    distance_miles: f64,
    consecutive_moving_samples: u32,
    should_auto_start: bool,
}

#[wasm_bindgen]
impl MotionDetector {
    /// Create a detector. Omitted settings use the defaults (3 m/s, 2 samples).
    #[wasm_bindgen(constructor)]
    pub fn new(moving_speed_mps: Option<f64>, required_moving_samples: Option<u32>) -> Self {
        let mut config = DetectorConfig::default();
        if let Some(speed) = moving_speed_mps {
            config.moving_speed_mps = speed;
        }
        if let Some(samples) = required_moving_samples {
            config.required_moving_samples = samples;
        }
        Self {
            inner: MotionTripDetector::from_config(&config),
        }
    }

    /// Feed one location fix.
    #[wasm_bindgen]
    pub fn observe(
        &mut self,
        latitude: f64,
        longitude: f64,
        timestamp_ms: f64,
        speed_mps: Option<f64>,
    ) -> Result<JsValue, JsValue> {
        let mut fix = GpsFix::new(latitude, longitude, timestamp_ms as i64);
        fix.speed_mps = speed_mps;

        if let Err(e) = fix.validate() {
            web_sys::console::warn_1(&JsValue::from_str(&e.to_string()));
            return Err(JsValue::from_str(&e.to_string()));
        }

        let reading = self.inner.observe(&fix);
        to_js(&Observation {
            moving: reading.moving,
            speed_mps: reading.speed_mps,
            added_miles: reading.added_miles,
            distance_miles: self.inner.distance_miles(),
            consecutive_moving_samples: self.inner.consecutive_moving_samples(),
            should_auto_start: self.inner.should_auto_start(),
        })
    }

    #[wasm_bindgen]
    pub fn should_auto_start(&self) -> bool {
        self.inner.should_auto_start()
    }

    /// Enter `auto_starting`. Returns false if a trip should not be started.
    #[wasm_bindgen]
    pub fn begin_auto_start(&mut self) -> bool {
        self.inner.begin_auto_start()
    }

    #[wasm_bindgen]
    pub fn auto_start_succeeded(&mut self, trip_id: f64) {
        self.inner.auto_start_succeeded(trip_id as i64);
    }

    #[wasm_bindgen]
    pub fn auto_start_failed(&mut self) {
        self.inner.auto_start_failed();
    }

    /// Track a trip started by hand, resuming from `distance_miles`.
    #[wasm_bindgen]
    pub fn start_tracking(&mut self, trip_id: f64, distance_miles: f64) {
        self.inner.start_tracking(trip_id as i64, distance_miles);
    }

    /// Stop tracking and return the final distance, if a trip was tracked.
    #[wasm_bindgen]
    pub fn stop_tracking(&mut self) -> Option<f64> {
        self.inner.stop_tracking().map(|(_, distance)| distance)
    }

    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// `idle`, `auto_starting` or `tracking`.
    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        match self.inner.state() {
            DetectorState::Idle => "idle",
            DetectorState::AutoStarting => "auto_starting",
            DetectorState::Tracking { .. } => "tracking",
        }
        .to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn trip_id(&self) -> Option<f64> {
        self.inner.trip_id().map(|id| id as f64)
    }

    #[wasm_bindgen(getter)]
    pub fn distance_miles(&self) -> f64 {
        self.inner.distance_miles()
    }

    #[wasm_bindgen(getter)]
    pub fn consecutive_moving_samples(&self) -> u32 {
        self.inner.consecutive_moving_samples()
    }

    #[wasm_bindgen(getter)]
    pub fn has_auto_started(&self) -> bool {
        self.inner.has_auto_started()
    }
}

impl Default for MotionDetector {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_haversine() {
        assert_eq!(haversine_miles(40.0, -74.0, 40.0, -74.0), 0.0);
        assert!((haversine_miles(0.0, 0.0, 1.0, 0.0) - 69.1).abs() < 0.1);
    }

    #[wasm_bindgen_test]
    fn test_reimbursement() {
        assert_eq!(reimbursement(10.0, "business", 0.67).unwrap(), 6.7);
        assert_eq!(reimbursement(10.0, "personal", 0.67).unwrap(), 0.0);
        assert!(reimbursement(10.0, "commute", 0.67).is_err());
    }

    #[wasm_bindgen_test]
    fn test_rate_lookup() {
        assert_eq!(mileage_rate_on("2024-03-01"), Some(0.67));
        assert_eq!(mileage_rate_on("2019-03-01"), None);
        assert_eq!(mileage_rate_on("not a date"), None);
    }

    #[wasm_bindgen_test]
    fn test_categorize() {
        assert_eq!(categorize_merchant("ACME COFFEE"), "Meals");
    }

    #[wasm_bindgen_test]
    fn test_detector_lifecycle() {
        let mut detector = MotionDetector::default();
        detector.observe(47.0, -122.0, 0.0, Some(1.0)).unwrap();
        detector.observe(47.001, -122.0, 10_000.0, Some(4.0)).unwrap();
        assert!(!detector.should_auto_start());
        detector.observe(47.002, -122.0, 20_000.0, Some(4.0)).unwrap();
        assert!(detector.should_auto_start());

        assert!(detector.begin_auto_start());
        assert_eq!(detector.state(), "auto_starting");
        detector.auto_start_succeeded(12.0);
        assert_eq!(detector.trip_id(), Some(12.0));

        detector.observe(47.003, -122.0, 30_000.0, Some(4.0)).unwrap();
        assert!(detector.distance_miles() > 0.06);
        assert!(!detector.should_auto_start());

        assert!(detector.stop_tracking().is_some());
        assert_eq!(detector.state(), "idle");
    }

    #[wasm_bindgen_test]
    fn test_rejects_bad_fix() {
        let mut detector = MotionDetector::default();
        assert!(detector.observe(120.0, 0.0, 0.0, None).is_err());
    }
}
