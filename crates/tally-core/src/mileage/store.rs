//! Trip persistence.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::TripError;
use crate::models::trip::{MileageTrip, NewTrip};

/// Backing store for mileage trips.
///
/// Methods take `&self` so one store can back several sessions.
pub trait TripStore {
    /// The trip still in progress for a user and profile, if any.
    fn active_trip(&self, user_id: &str, profile: &str) -> Result<Option<MileageTrip>, TripError>;

    /// Insert a trip with zero distance and no end time.
    fn create_trip(&self, trip: NewTrip) -> Result<MileageTrip, TripError>;

    /// Record the distance driven so far on an active trip.
    fn update_distance(&self, trip_id: i64, distance_miles: f64) -> Result<(), TripError>;

    /// Write the final distance and end time.
    fn close_trip(
        &self,
        trip_id: i64,
        end_time: DateTime<Utc>,
        distance_miles: f64,
    ) -> Result<MileageTrip, TripError>;
}

/// In-process trip store.
///
/// Rejects a second active trip for the same user and profile.
#[derive(Debug, Default)]
pub struct MemoryTripStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    trips: Vec<MileageTrip>,
}

impl MemoryTripStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All trips in creation order.
    pub fn trips(&self) -> Result<Vec<MileageTrip>, TripError> {
        Ok(self.lock()?.trips.clone())
    }

    pub fn trip(&self, trip_id: i64) -> Result<Option<MileageTrip>, TripError> {
        Ok(self.lock()?.trips.iter().find(|t| t.id == trip_id).cloned())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, TripError> {
        self.inner
            .lock()
            .map_err(|_| TripError::Store("trip store lock poisoned".to_string()))
    }
}

impl Inner {
    fn active_mut(&mut self, trip_id: i64) -> Result<&mut MileageTrip, TripError> {
        let trip = self
            .trips
            .iter_mut()
            .find(|t| t.id == trip_id)
            .ok_or(TripError::NotFound(trip_id))?;
        if !trip.is_active() {
            return Err(TripError::Store(format!("trip {} is already closed", trip_id)));
        }
        Ok(trip)
    }
}

impl TripStore for MemoryTripStore {
    fn active_trip(&self, user_id: &str, profile: &str) -> Result<Option<MileageTrip>, TripError> {
        Ok(self
            .lock()?
            .trips
            .iter()
            .find(|t| t.is_active() && t.user_id == user_id && t.profile == profile)
            .cloned())
    }

    fn create_trip(&self, trip: NewTrip) -> Result<MileageTrip, TripError> {
        let mut inner = self.lock()?;

        if let Some(existing) = inner
            .trips
            .iter()
            .find(|t| t.is_active() && t.user_id == trip.user_id && t.profile == trip.profile)
        {
            return Err(TripError::ActiveTripExists(existing.id));
        }

        inner.next_id += 1;
        let created = MileageTrip {
            id: inner.next_id,
            user_id: trip.user_id,
            profile: trip.profile,
            purpose: trip.purpose,
            start_time: trip.start_time,
            end_time: None,
            distance_miles: 0.0,
            auto_started: trip.auto_started,
        };
        debug!("Created trip {} for {}/{}", created.id, created.user_id, created.profile);
        inner.trips.push(created.clone());
        Ok(created)
    }

    fn update_distance(&self, trip_id: i64, distance_miles: f64) -> Result<(), TripError> {
        let mut inner = self.lock()?;
        let trip = inner.active_mut(trip_id)?;
        trip.distance_miles = trip.distance_miles.max(distance_miles);
        Ok(())
    }

    fn close_trip(
        &self,
        trip_id: i64,
        end_time: DateTime<Utc>,
        distance_miles: f64,
    ) -> Result<MileageTrip, TripError> {
        let mut inner = self.lock()?;
        let trip = inner.active_mut(trip_id)?;
        trip.distance_miles = trip.distance_miles.max(distance_miles);
        trip.end_time = Some(end_time.max(trip.start_time));
        Ok(trip.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::trip::TripPurpose;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn new_trip(user: &str, profile: &str) -> NewTrip {
        NewTrip {
            user_id: user.to_string(),
            profile: profile.to_string(),
            purpose: TripPurpose::Business,
            start_time: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
            auto_started: true,
        }
    }

    #[test]
    fn test_create_and_find_active() {
        let store = MemoryTripStore::new();
        let trip = store.create_trip(new_trip("alice", "work")).unwrap();

        assert_eq!(trip.id, 1);
        assert_eq!(trip.distance_miles, 0.0);
        assert!(trip.is_active());
        assert_eq!(store.active_trip("alice", "work").unwrap(), Some(trip));
        assert_eq!(store.active_trip("alice", "personal").unwrap(), None);
        assert_eq!(store.active_trip("bob", "work").unwrap(), None);
    }

    #[test]
    fn test_one_active_trip_per_user_and_profile() {
        let store = MemoryTripStore::new();
        let first = store.create_trip(new_trip("alice", "work")).unwrap();

        assert_eq!(
            store.create_trip(new_trip("alice", "work")),
            Err(TripError::ActiveTripExists(first.id))
        );
        assert!(store.create_trip(new_trip("alice", "side-gig")).is_ok());
    }

    #[test]
    fn test_close_then_create_again() {
        let store = MemoryTripStore::new();
        let first = store.create_trip(new_trip("alice", "work")).unwrap();
        store.update_distance(first.id, 4.2).unwrap();

        let end = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let closed = store.close_trip(first.id, end, 5.0).unwrap();
        assert_eq!(closed.end_time, Some(end));
        assert_eq!(closed.distance_miles, 5.0);
        assert_eq!(store.active_trip("alice", "work").unwrap(), None);

        let second = store.create_trip(new_trip("alice", "work")).unwrap();
        assert_eq!(second.id, 2);
        assert_eq!(store.trips().unwrap().len(), 2);
    }

    #[test]
    fn test_distance_never_decreases() {
        let store = MemoryTripStore::new();
        let trip = store.create_trip(new_trip("alice", "work")).unwrap();
        store.update_distance(trip.id, 3.0).unwrap();
        store.update_distance(trip.id, 1.0).unwrap();
        assert_eq!(store.trip(trip.id).unwrap().unwrap().distance_miles, 3.0);
    }

    #[test]
    fn test_unknown_and_closed_trips_rejected() {
        let store = MemoryTripStore::new();
        assert_eq!(store.update_distance(42, 1.0), Err(TripError::NotFound(42)));

        let trip = store.create_trip(new_trip("alice", "work")).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        store.close_trip(trip.id, end, 1.0).unwrap();
        assert!(matches!(
            store.update_distance(trip.id, 2.0),
            Err(TripError::Store(_))
        ));
    }
}
