//! A detection session drives the motion detector against a trip store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::TripError;
use crate::models::config::DetectorConfig;
use crate::models::trip::{GpsFix, MileageTrip, NewTrip, TripPurpose};

use super::detector::{DetectorState, MotionTripDetector};
use super::store::TripStore;

/// Location permission at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationPermission {
    #[default]
    Granted,
    Denied,
}

/// What happened when a fix was handled.
#[derive(Debug, Clone, PartialEq)]
pub enum FixOutcome {
    /// Location permission is denied; the fix was dropped.
    Ignored,
    /// No trip yet.
    Watching {
        moving: bool,
        consecutive_moving_samples: u32,
    },
    /// Motion started a new trip.
    AutoStarted(MileageTrip),
    /// The store failed to create the trip; the next moving fix retries.
    AutoStartFailed,
    /// Another trip is already active for this user and profile.
    ActiveTripExists(i64),
    /// Distance was added to the tracked trip.
    Tracking {
        trip_id: i64,
        added_miles: f64,
        distance_miles: f64,
    },
}

/// One user's trip detection, fed fix by fix.
pub struct DetectionSession<S: TripStore> {
    store: S,
    detector: MotionTripDetector,
    user_id: String,
    profile: String,
    permission: LocationPermission,
    auto_start_purpose: TripPurpose,
    sync_interval_ms: i64,
    last_sync_ms: Option<i64>,
    permission_warned: bool,
    stopped: bool,
}

impl<S: TripStore> DetectionSession<S> {
    pub fn new(
        store: S,
        user_id: impl Into<String>,
        profile: impl Into<String>,
        permission: LocationPermission,
        config: &DetectorConfig,
    ) -> Self {
        Self {
            store,
            detector: MotionTripDetector::from_config(config),
            user_id: user_id.into(),
            profile: profile.into(),
            permission,
            auto_start_purpose: config.auto_start_purpose,
            sync_interval_ms: (config.sync_interval_secs as i64).saturating_mul(1000),
            last_sync_ms: None,
            permission_warned: false,
            stopped: false,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn detector(&self) -> &MotionTripDetector {
        &self.detector
    }

    pub fn permission(&self) -> LocationPermission {
        self.permission
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Stop accepting fixes. An active trip can still be ended.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Handle one location fix.
    ///
    /// A malformed fix stops the session and is returned as an error; every
    /// later fix gets [`TripError::SessionStopped`]. Store failures while
    /// auto-starting or syncing are logged, not returned.
    pub fn on_fix(&mut self, fix: &GpsFix) -> Result<FixOutcome, TripError> {
        if self.stopped {
            return Err(TripError::SessionStopped);
        }

        if self.permission == LocationPermission::Denied {
            if !self.permission_warned {
                warn!("Location permission denied, ignoring fixes for {}", self.user_id);
                self.permission_warned = true;
            }
            return Ok(FixOutcome::Ignored);
        }

        if let Err(e) = fix.validate() {
            warn!("Stopping trip detection for {}: {}", self.user_id, e);
            self.stopped = true;
            return Err(e);
        }

        let reading = self.detector.observe(fix);

        if let DetectorState::Tracking { trip_id } = self.detector.state() {
            self.sync_distance(trip_id, fix.timestamp_ms);
            return Ok(FixOutcome::Tracking {
                trip_id,
                added_miles: reading.added_miles,
                distance_miles: self.detector.distance_miles(),
            });
        }

        if self.detector.begin_auto_start() {
            return Ok(self.auto_start(fix));
        }

        Ok(FixOutcome::Watching {
            moving: reading.moving,
            consecutive_moving_samples: self.detector.consecutive_moving_samples(),
        })
    }

    /// Start a trip by hand. Allowed even without location permission.
    pub fn start_manual_trip(
        &mut self,
        purpose: TripPurpose,
        now: DateTime<Utc>,
    ) -> Result<MileageTrip, TripError> {
        if let Some(trip_id) = self.detector.trip_id() {
            return Err(TripError::ActiveTripExists(trip_id));
        }
        if let Some(existing) = self.store.active_trip(&self.user_id, &self.profile)? {
            return Err(TripError::ActiveTripExists(existing.id));
        }

        let trip = self.store.create_trip(NewTrip {
            user_id: self.user_id.clone(),
            profile: self.profile.clone(),
            purpose,
            start_time: now,
            auto_started: false,
        })?;

        info!("Started {} trip {} for {}", purpose.as_str(), trip.id, self.user_id);
        self.detector.start_tracking(trip.id, 0.0);
        self.last_sync_ms = Some(now.timestamp_millis());
        Ok(trip)
    }

    /// Close the tracked trip with its final distance and reset detection.
    ///
    /// If the store rejects the write the session keeps tracking so the
    /// caller can retry.
    pub fn end_trip(&mut self, now: DateTime<Utc>) -> Result<MileageTrip, TripError> {
        let trip_id = self.detector.trip_id().ok_or(TripError::NoActiveTrip)?;
        let distance = self.detector.distance_miles();

        let closed = self.store.close_trip(trip_id, now, distance)?;

        info!("Ended trip {} at {:.2} miles", closed.id, closed.distance_miles);
        self.detector.reset();
        self.last_sync_ms = None;
        Ok(closed)
    }

    fn auto_start(&mut self, fix: &GpsFix) -> FixOutcome {
        match self.store.active_trip(&self.user_id, &self.profile) {
            Ok(Some(existing)) => {
                debug!("Trip {} already active, not auto-starting", existing.id);
                self.detector.auto_start_failed();
                return FixOutcome::ActiveTripExists(existing.id);
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Auto-start check failed: {}", e);
                self.detector.auto_start_failed();
                return FixOutcome::AutoStartFailed;
            }
        }

        let new_trip = NewTrip {
            user_id: self.user_id.clone(),
            profile: self.profile.clone(),
            purpose: self.auto_start_purpose,
            start_time: fix.time().unwrap_or_else(Utc::now),
            auto_started: true,
        };

        match self.store.create_trip(new_trip) {
            Ok(trip) => {
                info!("Auto-started trip {} for {}", trip.id, self.user_id);
                self.detector.auto_start_succeeded(trip.id);
                self.last_sync_ms = Some(fix.timestamp_ms);
                FixOutcome::AutoStarted(trip)
            }
            Err(TripError::ActiveTripExists(id)) => {
                debug!("Trip {} became active concurrently", id);
                self.detector.auto_start_failed();
                FixOutcome::ActiveTripExists(id)
            }
            Err(e) => {
                warn!("Auto-start failed, will retry: {}", e);
                self.detector.auto_start_failed();
                FixOutcome::AutoStartFailed
            }
        }
    }

    fn sync_distance(&mut self, trip_id: i64, now_ms: i64) {
        let last = *self.last_sync_ms.get_or_insert(now_ms);
        if now_ms.saturating_sub(last) < self.sync_interval_ms {
            return;
        }

        self.last_sync_ms = Some(now_ms);
        let distance = self.detector.distance_miles();
        match self.store.update_distance(trip_id, distance) {
            Ok(()) => debug!("Synced trip {} at {:.3} miles", trip_id, distance),
            Err(e) => warn!("Distance sync for trip {} failed: {}", trip_id, e),
        }
    }
}
