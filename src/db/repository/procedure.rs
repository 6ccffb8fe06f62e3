use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::*;

const PROCEDURE_COLUMNS: &str = "id, date, procedure_key, procedure_label, count, ward";

pub fn insert_procedure(conn: &Connection, proc: &NewProcedure) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO procedures (date, procedure_key, procedure_label, count, ward)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            proc.date,
            proc.procedure_key.as_str(),
            proc.procedure_label,
            proc.count,
            proc.ward,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Procedures dated within `[from, to]`, optionally restricted to one ward
/// (exact, case-sensitive match).
pub fn procedures_in_range(
    conn: &Connection,
    from: &str,
    to: &str,
    ward: Option<&str>,
) -> Result<Vec<ProcedureRow>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PROCEDURE_COLUMNS} FROM procedures
         WHERE date BETWEEN ?1 AND ?2 AND (?3 IS NULL OR ward = ?3)
         ORDER BY date, id"
    ))?;
    let rows = stmt.query_map(params![from, to, ward], map_procedure)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn procedures_on_date(
    conn: &Connection,
    date: &str,
) -> Result<Vec<ProcedureRow>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PROCEDURE_COLUMNS} FROM procedures WHERE date = ?1 ORDER BY id"
    ))?;
    let rows = stmt.query_map(params![date], map_procedure)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn get_procedure(conn: &Connection, id: i64) -> Result<Option<ProcedureRow>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {PROCEDURE_COLUMNS} FROM procedures WHERE id = ?1"),
        params![id],
        map_procedure,
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn update_procedure(
    conn: &Connection,
    id: i64,
    proc: &NewProcedure,
    only_on: Option<&str>,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE procedures
         SET date = ?2, procedure_key = ?3, procedure_label = ?4, count = ?5, ward = ?6
         WHERE id = ?1 AND (?7 IS NULL OR date = ?7)",
        params![
            id,
            proc.date,
            proc.procedure_key.as_str(),
            proc.procedure_label,
            proc.count,
            proc.ward,
            only_on,
        ],
    )?;
    Ok(changed)
}

pub fn delete_procedure(
    conn: &Connection,
    id: i64,
    only_on: Option<&str>,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "DELETE FROM procedures WHERE id = ?1 AND (?2 IS NULL OR date = ?2)",
        params![id, only_on],
    )?;
    Ok(changed)
}

fn map_procedure(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProcedureRow> {
    Ok(ProcedureRow {
        id: row.get(0)?,
        date: row.get(1)?,
        procedure_key: row.get(2)?,
        procedure_label: row.get(3)?,
        count: row.get(4)?,
        ward: row.get(5)?,
    })
}
