use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::MedicationSource;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub name: String,
    pub generic_name: Option<String>,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub source: MedicationSource,
    pub ndc_number: Option<String>,
    pub last_filled: Option<NaiveDate>,
    pub is_active: bool,
    pub notes: Option<String>,
    /// Public storage path of the label photo this record was read from.
    pub image_path: Option<String>,
    /// Whole-image OCR confidence (0-100) for photo-sourced records.
    pub ocr_confidence: Option<i32>,
    pub created_at: NaiveDateTime,
}

/// Fields accepted when a provider records a medication by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationInput {
    pub patient_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub generic_name: Option<String>,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub source: MedicationSource,
    #[serde(default)]
    pub ndc_number: Option<String>,
    #[serde(default)]
    pub last_filled: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update: `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedicationUpdate {
    pub name: Option<String>,
    pub generic_name: Option<String>,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub source: Option<MedicationSource>,
    pub ndc_number: Option<String>,
    pub last_filled: Option<NaiveDate>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

impl MedicationUpdate {
    pub fn apply(self, med: &mut Medication) {
        if let Some(name) = self.name {
            med.name = name;
        }
        if let Some(v) = self.generic_name {
            med.generic_name = Some(v);
        }
        if let Some(v) = self.dosage {
            med.dosage = Some(v);
        }
        if let Some(v) = self.frequency {
            med.frequency = Some(v);
        }
        if let Some(v) = self.source {
            med.source = v;
        }
        if let Some(v) = self.ndc_number {
            med.ndc_number = Some(v);
        }
        if let Some(v) = self.last_filled {
            med.last_filled = Some(v);
        }
        if let Some(v) = self.notes {
            med.notes = Some(v);
        }
        if let Some(v) = self.is_active {
            med.is_active = v;
        }
    }
}
