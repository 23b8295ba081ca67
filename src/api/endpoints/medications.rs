//! Medication endpoints.
//!
//! Photo-sourced records are created by the upload flow only; these handlers
//! cover manual entry, listing, and review edits, and reject `source: photo`.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::MessageResponse;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository::{self, Page};
use crate::db::DatabaseError;
use crate::models::enums::MedicationSource;
use crate::models::{Medication, MedicationInput, MedicationUpdate};

#[derive(Debug, Default, Deserialize)]
pub struct MedListQuery {
    pub patient_id: Option<Uuid>,
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

fn reject_photo_source(source: Option<MedicationSource>) -> Result<(), ApiError> {
    if source == Some(MedicationSource::Photo) {
        return Err(ApiError::BadRequest(
            "source 'photo' is reserved for image uploads".into(),
        ));
    }
    Ok(())
}

pub async fn create(
    State(ctx): State<ApiContext>,
    Json(input): Json<MedicationInput>,
) -> Result<Json<Medication>, ApiError> {
    if input.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".into()));
    }
    reject_photo_source(Some(input.source))?;
    let med = ctx
        .with_db(move |conn| repository::create_medication(conn, input))
        .await?;
    Ok(Json(med))
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<MedListQuery>,
) -> Result<Json<Vec<Medication>>, ApiError> {
    let page = Page::new(query.skip, query.limit);
    let patient_id = query.patient_id;
    let meds = ctx
        .with_db(move |conn| repository::list_medications(conn, patient_id.as_ref(), page))
        .await?;
    Ok(Json(meds))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Medication>, ApiError> {
    let med = ctx
        .with_db(move |conn| {
            repository::get_medication(conn, &id)?
                .ok_or_else(|| DatabaseError::not_found("Medication", id))
        })
        .await?;
    Ok(Json(med))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(update): Json<MedicationUpdate>,
) -> Result<Json<Medication>, ApiError> {
    if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::BadRequest("name must not be blank".into()));
    }
    reject_photo_source(update.source)?;
    let med = ctx
        .with_db(move |conn| repository::update_medication(conn, &id, update))
        .await?;
    Ok(Json(med))
}

pub async fn delete(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    ctx.with_db(move |conn| repository::delete_medication(conn, &id))
        .await?;
    Ok(Json(MessageResponse {
        message: "Medication deleted successfully",
    }))
}
