use std::sync::Arc;
use std::time::Duration;

use super::preprocess::prepare_for_ocr;
use super::types::{OcrEngine, OcrPageResult};
use super::RecognitionError;

/// Runs the OCR engine off the async runtime, bounded by a timeout.
///
/// On timeout the blocking task is abandoned, not killed; it finishes on the
/// blocking pool and its result is dropped.
#[derive(Clone)]
pub struct TextRecognizer {
    engine: Arc<dyn OcrEngine>,
    timeout: Duration,
    retries: u32,
}

impl TextRecognizer {
    pub fn new(engine: Arc<dyn OcrEngine>, timeout: Duration, retries: u32) -> Self {
        Self {
            engine,
            timeout,
            retries,
        }
    }

    /// Prepare the image and recognize it. Engine errors are retried up to `retries` times.
    pub async fn recognize(&self, image_bytes: Vec<u8>) -> Result<OcrPageResult, RecognitionError> {
        let image_bytes = Arc::new(image_bytes);
        let mut attempt = 0;
        loop {
            match self.attempt(Arc::clone(&image_bytes)).await {
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %e, "OCR attempt failed, retrying");
                }
                result => return result,
            }
        }
    }

    async fn attempt(&self, image_bytes: Arc<Vec<u8>>) -> Result<OcrPageResult, RecognitionError> {
        let engine = Arc::clone(&self.engine);
        let task = tokio::task::spawn_blocking(move || {
            let prepared = prepare_for_ocr(&image_bytes)?;
            engine.recognize(&prepared)
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(RecognitionError::TaskFailed(join_err.to_string())),
            Err(_) => Err(RecognitionError::Timeout(self.timeout.as_secs())),
        }
    }
}
