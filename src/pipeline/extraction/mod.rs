//! Text recognition and medication candidate extraction.

pub mod confidence;
pub mod medication;
pub mod ocr;
pub mod preprocess;
pub mod recognizer;
pub mod types;

pub use confidence::*;
pub use medication::*;
pub use ocr::*;
pub use preprocess::*;
pub use recognizer::*;
pub use types::*;

use thiserror::Error;

/// Why a recognition pass produced no result. Never fatal to an upload.
#[derive(Error, Debug)]
pub enum RecognitionError {
    #[error("could not load stored image: {0}")]
    ImageLoad(String),

    #[error("could not decode image: {0}")]
    ImageDecode(String),

    #[error("OCR engine failed: {0}")]
    Engine(String),

    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("OCR timed out after {0}s")]
    Timeout(u64),

    #[error("OCR task failed: {0}")]
    TaskFailed(String),
}

impl RecognitionError {
    /// Only transient engine failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Engine(_))
    }
}
