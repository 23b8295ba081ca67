//! Label photo upload and retrieval.
//!
//! - `POST /api/v1/upload/image?patient_id=`: multipart field `file`
//! - `GET /api/v1/upload/images/:filename`: stored bytes

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::extraction::MedicationCandidate;
use crate::pipeline::ingestion::{check_declared_type, validate_stored_name, BoundedBody, ImageUpload};
use crate::pipeline::upload::{UploadOutcome, UploadRequest};

const FILE_FIELD: &str = "file";

#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    pub patient_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct OcrResultBody {
    pub text: String,
    pub confidence: i32,
    pub suggested_medications: Vec<MedicationCandidate>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub file_path: String,
    pub ocr_result: Option<OcrResultBody>,
    pub medications_created: usize,
    pub materialization_error: Option<String>,
}

impl From<UploadOutcome> for UploadResponse {
    fn from(outcome: UploadOutcome) -> Self {
        let candidates = outcome.candidates;
        Self {
            filename: outcome.stored.generated_name,
            file_path: outcome.stored.storage_path,
            ocr_result: outcome.recognition.map(|r| OcrResultBody {
                text: r.raw_text.trim().to_string(),
                confidence: r.confidence,
                suggested_medications: candidates,
            }),
            medications_created: outcome.medications_created,
            materialization_error: outcome.materialization_error,
        }
    }
}

fn multipart_error(err: MultipartError, limit: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge { limit }
    } else {
        ApiError::BadRequest(format!("Malformed multipart body: {}", err.body_text()))
    }
}

/// `POST /api/v1/upload/image`: store a label photo and read medications from it.
///
/// The declared type is checked before the body is read; the body is then
/// read chunk by chunk and dropped as soon as it crosses the size bound.
pub async fn upload_image(
    State(ctx): State<ApiContext>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let config = ctx.pipeline.config().clone();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, config.max_bytes))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        check_declared_type(&config, content_type.as_deref())?;

        let mut body = BoundedBody::new(config.max_bytes);
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error(e, config.max_bytes))?
        {
            body.push(&chunk)?;
        }

        let outcome = ctx
            .pipeline
            .process(UploadRequest {
                image: ImageUpload {
                    bytes: body.into_bytes(),
                    content_type,
                    filename,
                },
                patient_id: query.patient_id,
            })
            .await?;

        return Ok(Json(outcome.into()));
    }

    Err(ApiError::BadRequest(format!(
        "Multipart field '{FILE_FIELD}' is required"
    )))
}

/// `GET /api/v1/upload/images/:filename`
pub async fn get_image(
    State(ctx): State<ApiContext>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    validate_stored_name(&filename)?;
    let storage = ctx.pipeline.storage().clone();
    let name = filename.clone();
    let bytes = tokio::task::spawn_blocking(move || storage.get(&name)).await??;

    let content_type = mime_guess::from_path(&filename)
        .first_or_octet_stream()
        .to_string();
    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}
