//! Data models.

pub mod config;
pub mod receipt;
pub mod trip;

pub use config::TallyConfig;
pub use receipt::{Confidence, FieldConfidence, ReceiptParseResult};
pub use trip::{GpsFix, MileageTrip, NewTrip, TripPurpose};
