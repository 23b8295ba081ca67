//! Patient endpoints.
//!
//! - `POST /api/v1/patients`: create
//! - `GET /api/v1/patients`: list (`skip`, `limit`)
//! - `GET|PUT|DELETE /api/v1/patients/:id`

use axum::extract::{Path, Query, State};
use axum::Json;
use uuid::Uuid;

use super::{MessageResponse, PageQuery};
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository;
use crate::db::DatabaseError;
use crate::models::{Patient, PatientInput};

fn validate(input: &PatientInput) -> Result<(), ApiError> {
    if input.first_name.trim().is_empty() || input.last_name.trim().is_empty() {
        return Err(ApiError::BadRequest("first_name and last_name are required".into()));
    }
    Ok(())
}

pub async fn create(
    State(ctx): State<ApiContext>,
    Json(input): Json<PatientInput>,
) -> Result<Json<Patient>, ApiError> {
    validate(&input)?;
    let patient = ctx
        .with_db(move |conn| repository::create_patient(conn, input))
        .await?;
    tracing::info!(patient_id = %patient.id, "Patient created");
    Ok(Json(patient))
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    let page = query.page();
    let patients = ctx
        .with_db(move |conn| repository::list_patients(conn, page))
        .await?;
    Ok(Json(patients))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Patient>, ApiError> {
    let patient = ctx
        .with_db(move |conn| {
            repository::get_patient(conn, &id)?
                .ok_or_else(|| DatabaseError::not_found("Patient", id))
        })
        .await?;
    Ok(Json(patient))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<PatientInput>,
) -> Result<Json<Patient>, ApiError> {
    validate(&input)?;
    let patient = ctx
        .with_db(move |conn| repository::update_patient(conn, &id, input))
        .await?;
    Ok(Json(patient))
}

pub async fn delete(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    ctx.with_db(move |conn| repository::delete_patient(conn, &id))
        .await?;
    tracing::info!(patient_id = %id, "Patient deleted");
    Ok(Json(MessageResponse {
        message: "Patient deleted successfully",
    }))
}
