//! Turn extracted candidates into persisted photo-sourced medication records.

use thiserror::Error;
use uuid::Uuid;

use super::extraction::{MedicationCandidate, RecognitionResult};
use crate::db::repository::{get_patient, insert_medications_batch, now_timestamp};
use crate::db::{Database, DatabaseError};
use crate::models::enums::MedicationSource;
use crate::models::{Medication, Patient};

#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("Failed to persist extracted medications: {0}")]
    Storage(#[from] DatabaseError),
}

/// Patient lookup and batch persistence used by the upload flow.
pub trait MedicationStore: Send + Sync {
    fn find_patient(&self, id: &Uuid) -> Result<Option<Patient>, DatabaseError>;

    /// Commit every record or none.
    fn save_medications(&self, records: &[Medication]) -> Result<(), DatabaseError>;
}

pub struct SqliteMedicationStore {
    db: Database,
}

impl SqliteMedicationStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl MedicationStore for SqliteMedicationStore {
    fn find_patient(&self, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
        let conn = self.db.open()?;
        get_patient(&conn, id)
    }

    fn save_medications(&self, records: &[Medication]) -> Result<(), DatabaseError> {
        let conn = self.db.open()?;
        insert_medications_batch(&conn, records)
    }
}

pub fn traceability_note(raw_text: &str) -> String {
    format!("Auto-extracted from image. Raw text: {raw_text}")
}

/// One record per candidate, all sharing the image path and whole-image confidence.
pub fn build_records(
    patient_id: Uuid,
    confidence: i32,
    image_path: &str,
    candidates: &[MedicationCandidate],
) -> Vec<Medication> {
    let created_at = now_timestamp();
    candidates
        .iter()
        .map(|c| Medication {
            id: Uuid::new_v4(),
            patient_id,
            name: c.name.clone(),
            generic_name: None,
            dosage: Some(c.dosage.clone()),
            frequency: Some(c.frequency.clone()),
            source: MedicationSource::Photo,
            ndc_number: None,
            last_filled: None,
            is_active: true,
            notes: Some(traceability_note(&c.raw_text)),
            image_path: Some(image_path.to_string()),
            ocr_confidence: Some(confidence),
            created_at,
        })
        .collect()
}

/// Build and save the records for one recognized image.
pub fn materialize(
    store: &dyn MedicationStore,
    patient_id: Uuid,
    recognition: &RecognitionResult,
    image_path: &str,
    candidates: &[MedicationCandidate],
) -> Result<Vec<Medication>, MaterializeError> {
    let records = build_records(patient_id, recognition.confidence, image_path, candidates);
    if records.is_empty() {
        return Ok(records);
    }
    store.save_medications(&records)?;
    tracing::info!(
        patient_id = %patient_id,
        created = records.len(),
        confidence = recognition.confidence,
        "Materialized medications from image"
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{create_patient, list_medications, Page};
    use crate::models::PatientInput;
    use chrono::NaiveDate;

    fn candidate(name: &str, raw: &str) -> MedicationCandidate {
        MedicationCandidate {
            name: name.into(),
            dosage: "10mg".into(),
            frequency: "Once daily".into(),
            raw_text: raw.into(),
        }
    }

    fn recognition(confidence: i32) -> RecognitionResult {
        RecognitionResult {
            raw_text: "irrelevant".into(),
            confidence,
        }
    }

    fn setup() -> (tempfile::TempDir, Database, Uuid) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::initialize(&dir.path().join("test.db")).unwrap();
        let conn = db.open().unwrap();
        let patient = create_patient(
            &conn,
            PatientInput {
                first_name: "Mary".into(),
                last_name: "Shelley".into(),
                date_of_birth: NaiveDate::from_ymd_opt(1950, 8, 30).unwrap(),
                phone: None,
                email: None,
                mrn: None,
            },
        )
        .unwrap();
        (dir, db, patient.id)
    }

    struct BrokenStore;

    impl MedicationStore for BrokenStore {
        fn find_patient(&self, _id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
            Ok(None)
        }

        fn save_medications(&self, _records: &[Medication]) -> Result<(), DatabaseError> {
            Err(DatabaseError::ConstraintViolation("disk full".into()))
        }
    }

    #[test]
    fn records_share_image_and_confidence() {
        let patient_id = Uuid::new_v4();
        let records = build_records(
            patient_id,
            77,
            "/uploads/x.png",
            &[candidate("A", "A 10mg once daily"), candidate("B", "B 10mg once daily")],
        );
        assert_eq!(records.len(), 2);
        for r in &records {
            assert_eq!(r.patient_id, patient_id);
            assert_eq!(r.source, MedicationSource::Photo);
            assert_eq!(r.image_path.as_deref(), Some("/uploads/x.png"));
            assert_eq!(r.ocr_confidence, Some(77));
            assert!(r.is_active);
        }
        assert_eq!(
            records[0].notes.as_deref(),
            Some("Auto-extracted from image. Raw text: A 10mg once daily")
        );
        assert_ne!(records[0].id, records[1].id);
    }

    #[test]
    fn candidate_fields_are_copied_verbatim() {
        let mut c = candidate("Aspirin", "Aspirin tablet tid");
        c.dosage = String::new();
        c.frequency = "Three times daily".into();
        let records = build_records(Uuid::new_v4(), 0, "/uploads/y.jpg", &[c]);
        assert_eq!(records[0].name, "Aspirin");
        assert_eq!(records[0].dosage.as_deref(), Some(""));
        assert_eq!(records[0].frequency.as_deref(), Some("Three times daily"));
    }

    #[test]
    fn materialize_persists_all_candidates() {
        let (_dir, db, patient_id) = setup();
        let store = SqliteMedicationStore::new(db.clone());
        let created = materialize(
            &store,
            patient_id,
            &recognition(85),
            "/uploads/z.png",
            &[candidate("A", "A"), candidate("B", "B")],
        )
        .unwrap();
        assert_eq!(created.len(), 2);

        let conn = db.open().unwrap();
        let stored = list_medications(&conn, Some(&patient_id), Page::default()).unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|m| m.ocr_confidence == Some(85)));
    }

    #[test]
    fn store_finds_existing_patient_only() {
        let (_dir, db, patient_id) = setup();
        let store = SqliteMedicationStore::new(db);
        assert!(store.find_patient(&patient_id).unwrap().is_some());
        assert!(store.find_patient(&Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn no_candidates_is_a_no_op() {
        let created = materialize(&BrokenStore, Uuid::new_v4(), &recognition(50), "/u/x", &[]).unwrap();
        assert!(created.is_empty());
    }

    #[test]
    fn storage_failure_is_reported() {
        let result = materialize(
            &BrokenStore,
            Uuid::new_v4(),
            &recognition(50),
            "/u/x",
            &[candidate("A", "A")],
        );
        assert!(matches!(result, Err(MaterializeError::Storage(_))));
    }
}
