use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_datetime, now_timestamp, parse_date, parse_datetime, parse_uuid, Page};
use crate::db::DatabaseError;
use crate::models::enums::MedicationSource;
use crate::models::{Medication, MedicationInput, MedicationSummary, MedicationUpdate};

const MEDICATION_COLUMNS: &str = "id, patient_id, name, generic_name, dosage, frequency, source,
     ndc_number, last_filled, is_active, notes, image_path, ocr_confidence, created_at";

pub fn insert_medication(conn: &Connection, med: &Medication) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medications (id, patient_id, name, generic_name, dosage, frequency, source,
         ndc_number, last_filled, is_active, notes, image_path, ocr_confidence, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            med.id.to_string(),
            med.patient_id.to_string(),
            med.name,
            med.generic_name,
            med.dosage,
            med.frequency,
            med.source.as_str(),
            med.ndc_number,
            med.last_filled.map(|d| d.to_string()),
            med.is_active as i32,
            med.notes,
            med.image_path,
            med.ocr_confidence,
            format_datetime(&med.created_at),
        ],
    )?;
    Ok(())
}

/// Insert all records in one transaction. Either every row lands or none does.
pub fn insert_medications_batch(
    conn: &Connection,
    meds: &[Medication],
) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    for med in meds {
        insert_medication(&tx, med)?;
    }
    tx.commit()?;
    Ok(())
}

/// Build and insert a manually entered medication. The patient must exist.
pub fn create_medication(
    conn: &Connection,
    input: MedicationInput,
) -> Result<Medication, DatabaseError> {
    if !super::patient_exists(conn, &input.patient_id)? {
        return Err(DatabaseError::not_found("Patient", input.patient_id));
    }
    let med = Medication {
        id: Uuid::new_v4(),
        patient_id: input.patient_id,
        name: input.name,
        generic_name: input.generic_name,
        dosage: input.dosage,
        frequency: input.frequency,
        source: input.source,
        ndc_number: input.ndc_number,
        last_filled: input.last_filled,
        is_active: true,
        notes: input.notes,
        image_path: None,
        ocr_confidence: None,
        created_at: now_timestamp(),
    };
    insert_medication(conn, &med)?;
    Ok(med)
}

pub fn get_medication(conn: &Connection, id: &Uuid) -> Result<Option<Medication>, DatabaseError> {
    let sql = format!("SELECT {MEDICATION_COLUMNS} FROM medications WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id.to_string()], |row| {
            Ok(medication_row_from_rusqlite(row))
        })
        .optional()?;
    match row {
        Some(row) => Ok(Some(medication_from_row(row?)?)),
        None => Ok(None),
    }
}

/// Newest first, optionally narrowed to one patient.
pub fn list_medications(
    conn: &Connection,
    patient_id: Option<&Uuid>,
    page: Page,
) -> Result<Vec<Medication>, DatabaseError> {
    let sql = format!(
        "SELECT {MEDICATION_COLUMNS} FROM medications
         WHERE (?1 IS NULL OR patient_id = ?1)
         ORDER BY created_at DESC, name LIMIT ?2 OFFSET ?3"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![patient_id.map(|id| id.to_string()), page.limit, page.skip],
        |row| Ok(medication_row_from_rusqlite(row)),
    )?;

    let mut meds = Vec::new();
    for row in rows {
        meds.push(medication_from_row(row??)?);
    }
    Ok(meds)
}

pub fn count_active_medications(conn: &Connection, patient_id: &Uuid) -> Result<i32, DatabaseError> {
    let count: i32 = conn.query_row(
        "SELECT COUNT(*) FROM medications WHERE patient_id = ?1 AND is_active = 1",
        params![patient_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Active medications of one patient, reduced to the review columns.
pub fn get_active_medication_summaries(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<MedicationSummary>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, dosage, frequency, source FROM medications
         WHERE patient_id = ?1 AND is_active = 1 ORDER BY name",
    )?;
    let rows = stmt.query_map(params![patient_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut summaries = Vec::new();
    for row in rows {
        let (id, name, dosage, frequency, source) = row?;
        summaries.push(MedicationSummary {
            id: parse_uuid(&id)?,
            name,
            dosage,
            frequency,
            source: MedicationSource::from_str(&source)?,
        });
    }
    Ok(summaries)
}

/// Apply a partial update and persist the result.
pub fn update_medication(
    conn: &Connection,
    id: &Uuid,
    update: MedicationUpdate,
) -> Result<Medication, DatabaseError> {
    let mut med = get_medication(conn, id)?.ok_or_else(|| DatabaseError::not_found("Medication", id))?;
    update.apply(&mut med);
    conn.execute(
        "UPDATE medications SET name = ?2, generic_name = ?3, dosage = ?4, frequency = ?5,
         source = ?6, ndc_number = ?7, last_filled = ?8, is_active = ?9, notes = ?10
         WHERE id = ?1",
        params![
            med.id.to_string(),
            med.name,
            med.generic_name,
            med.dosage,
            med.frequency,
            med.source.as_str(),
            med.ndc_number,
            med.last_filled.map(|d| d.to_string()),
            med.is_active as i32,
            med.notes,
        ],
    )?;
    Ok(med)
}

pub fn delete_medication(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM medications WHERE id = ?1", params![id.to_string()])?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Medication", id));
    }
    Ok(())
}

// ═══════════════════════════════════════════
// Row mapping
// ═══════════════════════════════════════════

struct MedicationRow {
    id: String,
    patient_id: String,
    name: String,
    generic_name: Option<String>,
    dosage: Option<String>,
    frequency: Option<String>,
    source: String,
    ndc_number: Option<String>,
    last_filled: Option<String>,
    is_active: i32,
    notes: Option<String>,
    image_path: Option<String>,
    ocr_confidence: Option<i32>,
    created_at: String,
}

fn medication_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<MedicationRow, rusqlite::Error> {
    Ok(MedicationRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        name: row.get(2)?,
        generic_name: row.get(3)?,
        dosage: row.get(4)?,
        frequency: row.get(5)?,
        source: row.get(6)?,
        ndc_number: row.get(7)?,
        last_filled: row.get(8)?,
        is_active: row.get(9)?,
        notes: row.get(10)?,
        image_path: row.get(11)?,
        ocr_confidence: row.get(12)?,
        created_at: row.get(13)?,
    })
}

fn medication_from_row(row: MedicationRow) -> Result<Medication, DatabaseError> {
    Ok(Medication {
        id: parse_uuid(&row.id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        name: row.name,
        generic_name: row.generic_name,
        dosage: row.dosage,
        frequency: row.frequency,
        source: MedicationSource::from_str(&row.source)?,
        ndc_number: row.ndc_number,
        last_filled: row.last_filled.as_deref().map(parse_date).transpose()?,
        is_active: row.is_active != 0,
        notes: row.notes,
        image_path: row.image_path,
        ocr_confidence: row.ocr_confidence,
        created_at: parse_datetime(&row.created_at)?,
    })
}
