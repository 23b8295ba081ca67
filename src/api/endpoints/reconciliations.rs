//! Reconciliation endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository::{self, Page, ReconciliationFilter};
use crate::db::DatabaseError;
use crate::models::enums::ReconciliationStatus;
use crate::models::{MedicationSummary, Reconciliation, ReconciliationUpdate};

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub patient_id: Uuid,
    #[serde(default)]
    pub reviewer: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecListQuery {
    pub status: Option<ReconciliationStatus>,
    pub patient_id: Option<Uuid>,
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Serialize)]
pub struct ReconciliationDetail {
    pub reconciliation: Reconciliation,
    pub patient_name: String,
    pub medications: Vec<MedicationSummary>,
}

#[derive(Serialize)]
pub struct CompleteResponse {
    pub message: &'static str,
    pub reconciliation: Reconciliation,
}

pub async fn start(
    State(ctx): State<ApiContext>,
    Json(req): Json<StartRequest>,
) -> Result<Json<Reconciliation>, ApiError> {
    let rec = ctx
        .with_db(move |conn| {
            repository::start_reconciliation(conn, &req.patient_id, req.reviewer, req.notes)
        })
        .await?;
    tracing::info!(
        reconciliation_id = %rec.id,
        total_medications = rec.total_medications,
        "Reconciliation started"
    );
    Ok(Json(rec))
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<RecListQuery>,
) -> Result<Json<Vec<Reconciliation>>, ApiError> {
    let filter = ReconciliationFilter {
        status: query.status,
        patient_id: query.patient_id,
    };
    let page = Page::new(query.skip, query.limit);
    let recs = ctx
        .with_db(move |conn| repository::list_reconciliations(conn, &filter, page))
        .await?;
    Ok(Json(recs))
}

/// The reconciliation plus the patient's current active medications.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReconciliationDetail>, ApiError> {
    let detail = ctx
        .with_db(move |conn| {
            let reconciliation = repository::get_reconciliation(conn, &id)?
                .ok_or_else(|| DatabaseError::not_found("Reconciliation", id))?;
            let patient = repository::get_patient(conn, &reconciliation.patient_id)?
                .ok_or_else(|| DatabaseError::not_found("Patient", reconciliation.patient_id))?;
            let medications =
                repository::get_active_medication_summaries(conn, &reconciliation.patient_id)?;
            Ok(ReconciliationDetail {
                reconciliation,
                patient_name: patient.display_name(),
                medications,
            })
        })
        .await?;
    Ok(Json(detail))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(update): Json<ReconciliationUpdate>,
) -> Result<Json<Reconciliation>, ApiError> {
    let rec = ctx
        .with_db(move |conn| repository::update_reconciliation(conn, &id, update))
        .await?;
    Ok(Json(rec))
}

pub async fn complete(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<CompleteResponse>, ApiError> {
    let rec = ctx
        .with_db(move |conn| repository::complete_reconciliation(conn, &id))
        .await?;
    tracing::info!(reconciliation_id = %rec.id, "Reconciliation completed");
    Ok(Json(CompleteResponse {
        message: "Reconciliation completed successfully",
        reconciliation: rec,
    }))
}
