//! Motion-based trip start detection.
//!
//! The detector is a pure state machine. It classifies each fix as moving or
//! not, debounces with a consecutive-sample counter, and accumulates distance
//! while a trip is tracked. Talking to the trip store is the session's job.

use serde::{Deserialize, Serialize};

use crate::models::config::DetectorConfig;
use crate::models::trip::GpsFix;

use super::geo::{average_speed_mps, distance_miles};

/// Where the detector is in the trip lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DetectorState {
    /// Watching for motion, no trip.
    Idle,
    /// A trip is being created in the store.
    AutoStarting,
    /// Accumulating distance for a trip.
    Tracking { trip_id: i64 },
}

/// Per-session detection memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripDetectionState {
    pub consecutive_moving_samples: u32,
    pub last_fix: Option<GpsFix>,
    /// Latches once a trip was auto-started in this session.
    pub has_auto_started: bool,
}

/// What a single fix told the detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixReading {
    /// Reported speed, or the speed derived from the previous fix.
    pub speed_mps: Option<f64>,
    pub moving: bool,
    /// Miles added to the tracked trip by this fix.
    pub added_miles: f64,
}

/// Decides when motion means a trip has started and measures it.
#[derive(Debug, Clone)]
pub struct MotionTripDetector {
    moving_speed_mps: f64,
    required_moving_samples: u32,
    state: DetectorState,
    detection: TripDetectionState,
    distance_miles: f64,
}

impl MotionTripDetector {
    /// Create a detector with the default 3 m/s threshold and two-sample debounce.
    pub fn new() -> Self {
        Self::from_config(&DetectorConfig::default())
    }

    pub fn from_config(config: &DetectorConfig) -> Self {
        Self {
            moving_speed_mps: config.moving_speed_mps,
            required_moving_samples: config.required_moving_samples.max(1),
            state: DetectorState::Idle,
            detection: TripDetectionState::default(),
            distance_miles: 0.0,
        }
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn detection(&self) -> &TripDetectionState {
        &self.detection
    }

    pub fn consecutive_moving_samples(&self) -> u32 {
        self.detection.consecutive_moving_samples
    }

    pub fn has_auto_started(&self) -> bool {
        self.detection.has_auto_started
    }

    /// Distance accumulated for the tracked trip.
    pub fn distance_miles(&self) -> f64 {
        self.distance_miles
    }

    /// Id of the tracked trip.
    pub fn trip_id(&self) -> Option<i64> {
        match self.state {
            DetectorState::Tracking { trip_id } => Some(trip_id),
            _ => None,
        }
    }

    /// Feed one fix: classify it, update the debounce counter, add distance
    /// when tracking, and remember it as the last fix.
    pub fn observe(&mut self, fix: &GpsFix) -> FixReading {
        let speed_mps = match fix.speed_mps {
            Some(speed) if speed >= 0.0 => Some(speed),
            _ => self
                .detection
                .last_fix
                .as_ref()
                .and_then(|last| average_speed_mps(last, fix)),
        };

        let moving = speed_mps.is_some_and(|speed| speed > self.moving_speed_mps);
        if moving {
            self.detection.consecutive_moving_samples += 1;
        } else {
            self.detection.consecutive_moving_samples = 0;
        }

        let mut added_miles = 0.0;
        if let DetectorState::Tracking { .. } = self.state {
            if let Some(last) = &self.detection.last_fix {
                added_miles = distance_miles(last, fix);
                self.distance_miles += added_miles;
            }
        }

        self.detection.last_fix = Some(*fix);

        FixReading {
            speed_mps,
            moving,
            added_miles,
        }
    }

    /// Enough consecutive motion, idle, and no trip auto-started yet.
    pub fn should_auto_start(&self) -> bool {
        self.state == DetectorState::Idle
            && !self.detection.has_auto_started
            && self.detection.consecutive_moving_samples >= self.required_moving_samples
    }

    /// Idle -> AutoStarting.
    pub fn begin_auto_start(&mut self) -> bool {
        if !self.should_auto_start() {
            return false;
        }
        self.state = DetectorState::AutoStarting;
        true
    }

    /// AutoStarting -> Tracking once the store created the trip.
    pub fn auto_start_succeeded(&mut self, trip_id: i64) {
        if self.state == DetectorState::AutoStarting {
            self.detection.has_auto_started = true;
            self.distance_miles = 0.0;
            self.state = DetectorState::Tracking { trip_id };
        }
    }

    /// AutoStarting -> Idle, leaving the next qualifying fix free to retry.
    pub fn auto_start_failed(&mut self) {
        if self.state == DetectorState::AutoStarting {
            self.detection.has_auto_started = false;
            self.state = DetectorState::Idle;
        }
    }

    /// Track a trip that was started by hand.
    pub fn start_tracking(&mut self, trip_id: i64, distance_miles: f64) {
        self.state = DetectorState::Tracking { trip_id };
        self.distance_miles = distance_miles.max(0.0);
    }

    /// Leave tracking and start a fresh detection session.
    ///
    /// Returns the trip id and its final distance if a trip was tracked.
    pub fn stop_tracking(&mut self) -> Option<(i64, f64)> {
        let finished = self.trip_id().map(|id| (id, self.distance_miles));
        self.reset();
        finished
    }

    /// Forget everything: Idle, counter zero, no last fix, latch cleared.
    pub fn reset(&mut self) {
        self.state = DetectorState::Idle;
        self.detection = TripDetectionState::default();
        self.distance_miles = 0.0;
    }
}

impl Default for MotionTripDetector {
    fn default() -> Self {
        Self::new()
    }
}
