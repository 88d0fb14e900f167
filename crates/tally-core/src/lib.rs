//! Core library for expense and mileage tracking.
//!
//! This crate provides:
//! - Receipt field extraction from OCR text (amounts, date, merchant)
//! - An OCR text source abstraction with a pure Rust ONNX engine
//! - Rule-based expense categorization
//! - Motion-based trip detection and mileage accumulation

pub mod categorize;
pub mod error;
pub mod mileage;
pub mod models;
pub mod ocr;
pub mod receipt;

pub use categorize::{CategoryRule, Categorization, Categorizer, PatternType};
pub use error::{OcrError, Result, TallyError, TripError};
pub use mileage::{
    DetectionSession, DetectorState, FixOutcome, LocationPermission, MemoryTripStore,
    MileageRateTable, MotionTripDetector, TripStore,
};
pub use models::receipt::{Confidence, FieldConfidence, ReceiptParseResult};
pub use models::trip::{GpsFix, MileageTrip, NewTrip, TripPurpose};
pub use ocr::{OcrResult, TextBox, TextSource};
#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
pub use receipt::{ReceiptExtractor, ReceiptTextParser, scan_receipt};
