//! Mileage trip and location fix models.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TripError;

/// A single location fix from the platform location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    /// Latitude in degrees.
    pub latitude: f64,

    /// Longitude in degrees.
    pub longitude: f64,

    /// Fix time in milliseconds since the Unix epoch.
    #[serde(alias = "timestamp")]
    pub timestamp_ms: i64,

    /// Instantaneous speed reported by the provider, in meters per second.
    #[serde(default, alias = "speed", skip_serializing_if = "Option::is_none")]
    pub speed_mps: Option<f64>,
}

impl GpsFix {
    pub fn new(latitude: f64, longitude: f64, timestamp_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp_ms,
            speed_mps: None,
        }
    }

    pub fn with_speed(mut self, speed_mps: f64) -> Self {
        self.speed_mps = Some(speed_mps);
        self
    }

    /// Reject coordinates no real provider can produce.
    pub fn validate(&self) -> Result<(), TripError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(TripError::MalformedFix(format!(
                "latitude {} out of range",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(TripError::MalformedFix(format!(
                "longitude {} out of range",
                self.longitude
            )));
        }
        if let Some(speed) = self.speed_mps {
            if speed.is_nan() {
                return Err(TripError::MalformedFix("speed is NaN".to_string()));
            }
        }
        if self.time().is_none() {
            return Err(TripError::MalformedFix(format!(
                "timestamp {} out of range",
                self.timestamp_ms
            )));
        }
        Ok(())
    }

    /// Fix time as a UTC timestamp.
    pub fn time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp_ms).single()
    }
}

/// Why a trip was driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripPurpose {
    /// Reimbursable business driving.
    #[default]
    Business,
    /// Personal driving, never reimbursed.
    Personal,
}

impl TripPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Business => "business",
            Self::Personal => "personal",
        }
    }
}

impl std::str::FromStr for TripPurpose {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "business" => Ok(Self::Business),
            "personal" => Ok(Self::Personal),
            _ => Err(format!("Unknown trip purpose: {}", s)),
        }
    }
}

/// A mileage trip as persisted by the trip store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MileageTrip {
    pub id: i64,
    pub user_id: String,
    pub profile: String,
    pub purpose: TripPurpose,
    pub start_time: DateTime<Utc>,
    /// `None` while the trip is in progress.
    pub end_time: Option<DateTime<Utc>>,
    /// Accumulated great-circle distance.
    pub distance_miles: f64,
    /// Created by motion detection rather than by the user.
    #[serde(default)]
    pub auto_started: bool,
}

impl MileageTrip {
    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }

    /// Elapsed time, if the trip has ended.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.end_time.map(|end| end - self.start_time)
    }
}

/// Data needed to insert a new trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTrip {
    pub user_id: String,
    pub profile: String,
    pub purpose: TripPurpose,
    pub start_time: DateTime<Utc>,
    pub auto_started: bool,
}
