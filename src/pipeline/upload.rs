//! Upload entry point: ingest, recognize, extract, materialize.
//!
//! Only ingestion failures fail the request. Recognition and materialization
//! problems are logged and reported inside the outcome.

use std::sync::Arc;

use uuid::Uuid;

use super::extraction::{
    aggregate_confidence, extract_candidates, MedicationCandidate, OcrPageResult,
    RecognitionError, RecognitionResult, TextRecognizer,
};
use super::ingestion::{
    ingest_image, BlobStorage, ImageUpload, IngestionConfig, IngestionError, StoredImageRef,
};
use super::materialize::{materialize, MaterializeError, MedicationStore};

/// An uploaded label photo plus the patient it belongs to, if any.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub image: ImageUpload,
    pub patient_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub stored: StoredImageRef,
    /// `None` when recognition failed.
    pub recognition: Option<RecognitionResult>,
    pub candidates: Vec<MedicationCandidate>,
    pub medications_created: usize,
    pub materialization_error: Option<String>,
}

pub struct UploadPipeline {
    storage: Arc<dyn BlobStorage>,
    recognizer: TextRecognizer,
    store: Arc<dyn MedicationStore>,
    config: IngestionConfig,
}

impl UploadPipeline {
    pub fn new(
        storage: Arc<dyn BlobStorage>,
        recognizer: TextRecognizer,
        store: Arc<dyn MedicationStore>,
        config: IngestionConfig,
    ) -> Self {
        Self {
            storage,
            recognizer,
            store,
            config,
        }
    }

    pub fn config(&self) -> &IngestionConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn BlobStorage> {
        &self.storage
    }

    pub async fn process(&self, request: UploadRequest) -> Result<UploadOutcome, IngestionError> {
        let stored = self.ingest(request.image).await?;

        let recognition = match self.recognize_stored(&stored).await {
            Ok(page) => {
                // Aggregation and extraction both read only the page result
                let confidence = aggregate_confidence(&page.token_confidences);
                let candidates = extract_candidates(&page.text);
                tracing::info!(
                    generated_name = %stored.generated_name,
                    confidence,
                    candidates = candidates.len(),
                    "Recognition complete"
                );
                Some((
                    RecognitionResult {
                        raw_text: page.text,
                        confidence,
                    },
                    candidates,
                ))
            }
            Err(e) => {
                tracing::warn!(
                    generated_name = %stored.generated_name,
                    error = %e,
                    "Recognition failed, continuing without OCR result"
                );
                None
            }
        };

        let mut outcome = UploadOutcome {
            stored,
            recognition: None,
            candidates: Vec::new(),
            medications_created: 0,
            materialization_error: None,
        };

        let Some((recognition, candidates)) = recognition else {
            return Ok(outcome);
        };

        if let Some(patient_id) = request.patient_id {
            match self
                .materialize_for(patient_id, &recognition, &outcome.stored.storage_path, &candidates)
                .await
            {
                Ok(created) => outcome.medications_created = created,
                Err(message) => outcome.materialization_error = Some(message),
            }
        }

        outcome.recognition = Some(recognition);
        outcome.candidates = candidates;
        Ok(outcome)
    }

    async fn ingest(&self, image: ImageUpload) -> Result<StoredImageRef, IngestionError> {
        let storage = Arc::clone(&self.storage);
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || ingest_image(storage.as_ref(), &config, image))
            .await
            .map_err(|e| IngestionError::StorageWriteFailed(e.to_string()))?
    }

    async fn recognize_stored(
        &self,
        stored: &StoredImageRef,
    ) -> Result<OcrPageResult, RecognitionError> {
        let storage = Arc::clone(&self.storage);
        let name = stored.generated_name.clone();
        let bytes = tokio::task::spawn_blocking(move || storage.get(&name))
            .await
            .map_err(|e| RecognitionError::TaskFailed(e.to_string()))?
            .map_err(|e| RecognitionError::ImageLoad(e.to_string()))?;
        self.recognizer.recognize(bytes).await
    }

    /// Number of records created, or a message describing why none were.
    async fn materialize_for(
        &self,
        patient_id: Uuid,
        recognition: &RecognitionResult,
        image_path: &str,
        candidates: &[MedicationCandidate],
    ) -> Result<usize, String> {
        let store = Arc::clone(&self.store);
        let recognition = recognition.clone();
        let image_path = image_path.to_string();
        let candidates = candidates.to_vec();

        let result = tokio::task::spawn_blocking(move || -> Result<Option<usize>, MaterializeError> {
            if store.find_patient(&patient_id)?.is_none() {
                return Ok(None);
            }
            let created = materialize(
                store.as_ref(),
                patient_id,
                &recognition,
                &image_path,
                &candidates,
            )?;
            Ok(Some(created.len()))
        })
        .await
        .map_err(|e| e.to_string())?;

        match result {
            Ok(Some(created)) => Ok(created),
            Ok(None) => {
                tracing::warn!(patient_id = %patient_id, "Patient not found, skipping materialization");
                Ok(0)
            }
            Err(e) => {
                tracing::error!(patient_id = %patient_id, error = %e, "Materialization failed");
                Err(e.to_string())
            }
        }
    }
}
