//! Mileage tracking: motion-based trip detection, distance and reimbursement.

pub mod detector;
pub mod geo;
pub mod rates;
pub mod session;
pub mod store;

pub use detector::{DetectorState, FixReading, MotionTripDetector, TripDetectionState};
pub use geo::{distance_miles, haversine_miles};
pub use rates::{reimbursement, MileageRate, MileageRateTable};
pub use session::{DetectionSession, FixOutcome, LocationPermission};
pub use store::{MemoryTripStore, TripStore};
