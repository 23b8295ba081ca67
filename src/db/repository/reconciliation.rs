use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{count_active_medications, format_datetime, now_timestamp, parse_datetime, parse_uuid, Page};
use crate::db::DatabaseError;
use crate::models::enums::ReconciliationStatus;
use crate::models::{Reconciliation, ReconciliationUpdate};

const RECONCILIATION_COLUMNS: &str = "id, patient_id, reviewer, status, total_medications,
     approved_medications, conflicts_found, notes, created_at, completed_at";

/// Optional filters for listing reconciliations.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationFilter {
    pub status: Option<ReconciliationStatus>,
    pub patient_id: Option<Uuid>,
}

/// Open a review for a patient, snapshotting the active medication count.
pub fn start_reconciliation(
    conn: &Connection,
    patient_id: &Uuid,
    reviewer: Option<String>,
    notes: Option<String>,
) -> Result<Reconciliation, DatabaseError> {
    if !super::patient_exists(conn, patient_id)? {
        return Err(DatabaseError::not_found("Patient", patient_id));
    }
    let rec = Reconciliation {
        id: Uuid::new_v4(),
        patient_id: *patient_id,
        reviewer,
        status: ReconciliationStatus::InProgress,
        total_medications: count_active_medications(conn, patient_id)?,
        approved_medications: 0,
        conflicts_found: 0,
        notes,
        created_at: now_timestamp(),
        completed_at: None,
    };
    conn.execute(
        "INSERT INTO reconciliations (id, patient_id, reviewer, status, total_medications,
         approved_medications, conflicts_found, notes, created_at, completed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            rec.id.to_string(),
            rec.patient_id.to_string(),
            rec.reviewer,
            rec.status.as_str(),
            rec.total_medications,
            rec.approved_medications,
            rec.conflicts_found,
            rec.notes,
            format_datetime(&rec.created_at),
            rec.completed_at.as_ref().map(format_datetime),
        ],
    )?;
    Ok(rec)
}

pub fn get_reconciliation(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<Reconciliation>, DatabaseError> {
    let sql = format!("SELECT {RECONCILIATION_COLUMNS} FROM reconciliations WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id.to_string()], |row| {
            Ok(reconciliation_row_from_rusqlite(row))
        })
        .optional()?;
    match row {
        Some(row) => Ok(Some(reconciliation_from_row(row?)?)),
        None => Ok(None),
    }
}

/// Newest first.
pub fn list_reconciliations(
    conn: &Connection,
    filter: &ReconciliationFilter,
    page: Page,
) -> Result<Vec<Reconciliation>, DatabaseError> {
    let sql = format!(
        "SELECT {RECONCILIATION_COLUMNS} FROM reconciliations
         WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR patient_id = ?2)
         ORDER BY created_at DESC LIMIT ?3 OFFSET ?4"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![
            filter.status.map(|s| s.as_str()),
            filter.patient_id.map(|id| id.to_string()),
            page.limit,
            page.skip,
        ],
        |row| Ok(reconciliation_row_from_rusqlite(row)),
    )?;

    let mut recs = Vec::new();
    for row in rows {
        recs.push(reconciliation_from_row(row??)?);
    }
    Ok(recs)
}

/// Apply a partial update. Every move to `completed` restamps `completed_at`.
pub fn update_reconciliation(
    conn: &Connection,
    id: &Uuid,
    update: ReconciliationUpdate,
) -> Result<Reconciliation, DatabaseError> {
    let mut rec = get_reconciliation(conn, id)?
        .ok_or_else(|| DatabaseError::not_found("Reconciliation", id))?;

    if let Some(status) = update.status {
        rec.status = status;
        if status == ReconciliationStatus::Completed {
            rec.completed_at = Some(now_timestamp());
        }
    }
    if let Some(notes) = update.notes {
        rec.notes = Some(notes);
    }
    if let Some(n) = update.approved_medications {
        rec.approved_medications = n;
    }
    if let Some(n) = update.conflicts_found {
        rec.conflicts_found = n;
    }

    conn.execute(
        "UPDATE reconciliations SET status = ?2, notes = ?3, approved_medications = ?4,
         conflicts_found = ?5, completed_at = ?6 WHERE id = ?1",
        params![
            rec.id.to_string(),
            rec.status.as_str(),
            rec.notes,
            rec.approved_medications,
            rec.conflicts_found,
            rec.completed_at.as_ref().map(format_datetime),
        ],
    )?;
    Ok(rec)
}

pub fn complete_reconciliation(
    conn: &Connection,
    id: &Uuid,
) -> Result<Reconciliation, DatabaseError> {
    update_reconciliation(
        conn,
        id,
        ReconciliationUpdate {
            status: Some(ReconciliationStatus::Completed),
            ..Default::default()
        },
    )
}

struct ReconciliationRow {
    id: String,
    patient_id: String,
    reviewer: Option<String>,
    status: String,
    total_medications: i32,
    approved_medications: i32,
    conflicts_found: i32,
    notes: Option<String>,
    created_at: String,
    completed_at: Option<String>,
}

fn reconciliation_row_from_rusqlite(
    row: &rusqlite::Row<'_>,
) -> Result<ReconciliationRow, rusqlite::Error> {
    Ok(ReconciliationRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        reviewer: row.get(2)?,
        status: row.get(3)?,
        total_medications: row.get(4)?,
        approved_medications: row.get(5)?,
        conflicts_found: row.get(6)?,
        notes: row.get(7)?,
        created_at: row.get(8)?,
        completed_at: row.get(9)?,
    })
}

fn reconciliation_from_row(row: ReconciliationRow) -> Result<Reconciliation, DatabaseError> {
    Ok(Reconciliation {
        id: parse_uuid(&row.id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        reviewer: row.reviewer,
        status: ReconciliationStatus::from_str(&row.status)?,
        total_medications: row.total_medications,
        approved_medications: row.approved_medications,
        conflicts_found: row.conflicts_found,
        notes: row.notes,
        created_at: parse_datetime(&row.created_at)?,
        completed_at: row.completed_at.as_deref().map(parse_datetime).transpose()?,
    })
}
