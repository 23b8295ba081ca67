use serde::{Deserialize, Serialize};

use super::RecognitionError;

/// Raw OCR result from the engine
#[derive(Debug, Clone, Default)]
pub struct OcrPageResult {
    pub text: String,
    /// One entry per recognized token, engine scale (0-100). `-1` means no estimate.
    pub token_confidences: Vec<i32>,
}

/// OCR engine abstraction (allows mocking for tests)
pub trait OcrEngine: Send + Sync {
    /// Recognize text in an already prepared (grayscale PNG) image.
    fn recognize(&self, image_bytes: &[u8]) -> Result<OcrPageResult, RecognitionError>;
}

/// Text and whole-image confidence for one recognition pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub raw_text: String,
    pub confidence: i32,
}

/// An unconfirmed medication entry read from one line of label text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationCandidate {
    pub name: String,
    /// Empty when no dosage was found.
    pub dosage: String,
    /// Empty when no frequency rule matched.
    pub frequency: String,
    pub raw_text: String,
}
