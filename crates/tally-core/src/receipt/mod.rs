//! Receipt field extraction module.

mod parser;
pub mod rules;

pub use parser::ReceiptTextParser;

use image::DynamicImage;

use crate::error::OcrError;
use crate::models::receipt::ReceiptParseResult;
use crate::ocr::{OcrResult, TextSource};

/// Trait for receipt field extractors.
pub trait ReceiptExtractor {
    /// Extract receipt fields from an OCR result.
    fn extract(&self, ocr_result: &OcrResult) -> ReceiptParseResult;
}

/// Recognize `image` with `source`, then parse the recognized text.
pub fn scan_receipt<S, E>(
    source: &S,
    extractor: &E,
    image: &DynamicImage,
) -> std::result::Result<ReceiptParseResult, OcrError>
where
    S: TextSource + ?Sized,
    E: ReceiptExtractor + ?Sized,
{
    let ocr_result = source.recognize(image)?;
    Ok(extractor.extract(&ocr_result))
}
