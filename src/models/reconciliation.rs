use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{MedicationSource, ReconciliationStatus};

/// A structured review of one patient's medication list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reconciliation {
    pub id: Uuid,
    pub patient_id: Uuid,
    /// Free-text name of whoever runs the review.
    pub reviewer: Option<String>,
    pub status: ReconciliationStatus,
    pub total_medications: i32,
    pub approved_medications: i32,
    pub conflicts_found: i32,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconciliationUpdate {
    pub status: Option<ReconciliationStatus>,
    pub notes: Option<String>,
    pub approved_medications: Option<i32>,
    pub conflicts_found: Option<i32>,
}

/// Medication line shown in a reconciliation detail view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationSummary {
    pub id: Uuid,
    pub name: String,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub source: MedicationSource,
}
