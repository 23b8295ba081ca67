use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_datetime, now_timestamp, parse_date, parse_datetime, parse_uuid, Page};
use crate::db::DatabaseError;
use crate::models::{Patient, PatientInput};

const PATIENT_COLUMNS: &str =
    "id, first_name, last_name, date_of_birth, phone, email, mrn, created_at";

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, first_name, last_name, date_of_birth, phone, email, mrn, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            patient.id.to_string(),
            patient.first_name,
            patient.last_name,
            patient.date_of_birth.to_string(),
            patient.phone,
            patient.email,
            patient.mrn,
            format_datetime(&patient.created_at),
        ],
    )?;
    Ok(())
}

/// Build and insert a patient from provider input.
pub fn create_patient(conn: &Connection, input: PatientInput) -> Result<Patient, DatabaseError> {
    let patient = Patient {
        id: Uuid::new_v4(),
        first_name: input.first_name,
        last_name: input.last_name,
        date_of_birth: input.date_of_birth,
        phone: input.phone,
        email: input.email,
        mrn: input.mrn,
        created_at: now_timestamp(),
    };
    insert_patient(conn, &patient)?;
    Ok(patient)
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id.to_string()], |row| Ok(patient_row_from_rusqlite(row)))
        .optional()?;
    match row {
        Some(row) => Ok(Some(patient_from_row(row?)?)),
        None => Ok(None),
    }
}

pub fn patient_exists(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM patients WHERE id = ?1",
        params![id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Patients ordered by last name, then first name.
pub fn list_patients(conn: &Connection, page: Page) -> Result<Vec<Patient>, DatabaseError> {
    let sql = format!(
        "SELECT {PATIENT_COLUMNS} FROM patients
         ORDER BY last_name, first_name LIMIT ?1 OFFSET ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![page.limit, page.skip], |row| {
        Ok(patient_row_from_rusqlite(row))
    })?;

    let mut patients = Vec::new();
    for row in rows {
        patients.push(patient_from_row(row??)?);
    }
    Ok(patients)
}

/// Replace the editable fields. Returns `NotFound` for an unknown id.
pub fn update_patient(
    conn: &Connection,
    id: &Uuid,
    input: PatientInput,
) -> Result<Patient, DatabaseError> {
    let changed = conn.execute(
        "UPDATE patients SET first_name = ?2, last_name = ?3, date_of_birth = ?4,
         phone = ?5, email = ?6, mrn = ?7 WHERE id = ?1",
        params![
            id.to_string(),
            input.first_name,
            input.last_name,
            input.date_of_birth.to_string(),
            input.phone,
            input.email,
            input.mrn,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Patient", id));
    }
    get_patient(conn, id)?.ok_or_else(|| DatabaseError::not_found("Patient", id))
}

/// Delete a patient; medications and reconciliations go with it.
pub fn delete_patient(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM patients WHERE id = ?1", params![id.to_string()])?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Patient", id));
    }
    Ok(())
}

struct PatientRow {
    id: String,
    first_name: String,
    last_name: String,
    date_of_birth: String,
    phone: Option<String>,
    email: Option<String>,
    mrn: Option<String>,
    created_at: String,
}

fn patient_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<PatientRow, rusqlite::Error> {
    Ok(PatientRow {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        date_of_birth: row.get(3)?,
        phone: row.get(4)?,
        email: row.get(5)?,
        mrn: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    Ok(Patient {
        id: parse_uuid(&row.id)?,
        first_name: row.first_name,
        last_name: row.last_name,
        date_of_birth: parse_date(&row.date_of_birth)?,
        phone: row.phone,
        email: row.email,
        mrn: row.mrn,
        created_at: parse_datetime(&row.created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use chrono::NaiveDate;

    fn input(first: &str, last: &str) -> PatientInput {
        PatientInput {
            first_name: first.into(),
            last_name: last.into(),
            date_of_birth: NaiveDate::from_ymd_opt(1958, 3, 14).unwrap(),
            phone: None,
            email: None,
            mrn: Some("MRN-001".into()),
        }
    }

    #[test]
    fn create_and_get() {
        let conn = open_memory_database().unwrap();
        let created = create_patient(&conn, input("Ada", "Lovelace")).unwrap();
        let fetched = get_patient(&conn, &created.id).unwrap().unwrap();
        assert_eq!(fetched.display_name(), "Ada Lovelace");
        assert_eq!(fetched.mrn.as_deref(), Some("MRN-001"));
        assert_eq!(fetched.created_at, created.created_at);
        assert!(patient_exists(&conn, &created.id).unwrap());
    }

    #[test]
    fn get_unknown_is_none() {
        let conn = open_memory_database().unwrap();
        assert!(get_patient(&conn, &Uuid::new_v4()).unwrap().is_none());
        assert!(!patient_exists(&conn, &Uuid::new_v4()).unwrap());
    }

    #[test]
    fn list_is_sorted_and_paged() {
        let conn = open_memory_database().unwrap();
        create_patient(&conn, input("Zed", "Young")).unwrap();
        create_patient(&conn, input("Bob", "Adams")).unwrap();
        create_patient(&conn, input("Al", "Adams")).unwrap();

        let all = list_patients(&conn, Page::default()).unwrap();
        let names: Vec<_> = all.iter().map(|p| p.display_name()).collect();
        assert_eq!(names, vec!["Al Adams", "Bob Adams", "Zed Young"]);

        let page = list_patients(&conn, Page::new(Some(1), Some(1))).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].first_name, "Bob");
    }

    #[test]
    fn update_replaces_fields() {
        let conn = open_memory_database().unwrap();
        let created = create_patient(&conn, input("Ada", "Lovelace")).unwrap();
        let mut changed = input("Ada", "King");
        changed.phone = Some("555-0100".into());
        let updated = update_patient(&conn, &created.id, changed).unwrap();
        assert_eq!(updated.last_name, "King");
        assert_eq!(updated.phone.as_deref(), Some("555-0100"));
    }

    #[test]
    fn update_and_delete_unknown_are_not_found() {
        let conn = open_memory_database().unwrap();
        let id = Uuid::new_v4();
        assert!(matches!(
            update_patient(&conn, &id, input("A", "B")),
            Err(DatabaseError::NotFound { .. })
        ));
        assert!(matches!(
            delete_patient(&conn, &id),
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[test]
    fn delete_removes_patient() {
        let conn = open_memory_database().unwrap();
        let created = create_patient(&conn, input("Ada", "Lovelace")).unwrap();
        delete_patient(&conn, &created.id).unwrap();
        assert!(get_patient(&conn, &created.id).unwrap().is_none());
    }
}
