//! Attachment content extraction
//!
//! Turns stored files or in-flight uploads into bounded plain-text snippets
//! for inclusion in AI prompts.

mod extractor;
pub mod ocr;

pub use extractor::{ContentExtractor, ExtractionError};
pub use ocr::{OcrEngine, TesseractOcr};
