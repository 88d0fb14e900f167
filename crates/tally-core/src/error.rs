//! Error types for the tally-core library.

use thiserror::Error;

/// Main error type for the tally library.
#[derive(Error, Debug)]
pub enum TallyError {
    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Trip detection or persistence error.
    #[error("trip error: {0}")]
    Trip(#[from] TripError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors raised by the trip detector and trip stores.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TripError {
    /// The backing store rejected or failed an operation.
    #[error("trip store error: {0}")]
    Store(String),

    /// A location fix carried impossible coordinates.
    #[error("malformed fix: {0}")]
    MalformedFix(String),

    /// The detection session was stopped and accepts no more fixes.
    #[error("detection session stopped")]
    SessionStopped,

    /// No trip is being tracked.
    #[error("no active trip")]
    NoActiveTrip,

    /// A trip is already active for this user and profile.
    #[error("trip {0} is already active")]
    ActiveTripExists(i64),

    /// Referenced trip does not exist.
    #[error("trip {0} not found")]
    NotFound(i64),
}

/// Result type for the tally library.
pub type Result<T> = std::result::Result<T, TallyError>;
