use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::*;

pub fn insert_counter(
    conn: &Connection,
    kind: CounterKind,
    date: &str,
    count: i64,
) -> Result<i64, DatabaseError> {
    conn.execute(
        &format!("INSERT INTO {} (date, count) VALUES (?1, ?2)", kind.table()),
        params![date, count],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn counters_in_range(
    conn: &Connection,
    kind: CounterKind,
    from: &str,
    to: &str,
) -> Result<Vec<CounterRow>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, date, count FROM {} WHERE date BETWEEN ?1 AND ?2 ORDER BY date, id",
        kind.table()
    ))?;
    let rows = stmt.query_map(params![from, to], map_counter)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn counters_on_date(
    conn: &Connection,
    kind: CounterKind,
    date: &str,
) -> Result<Vec<CounterRow>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, date, count FROM {} WHERE date = ?1 ORDER BY id",
        kind.table()
    ))?;
    let rows = stmt.query_map(params![date], map_counter)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn get_counter(
    conn: &Connection,
    kind: CounterKind,
    id: i64,
) -> Result<Option<CounterRow>, DatabaseError> {
    conn.query_row(
        &format!("SELECT id, date, count FROM {} WHERE id = ?1", kind.table()),
        params![id],
        map_counter,
    )
    .optional()
    .map_err(DatabaseError::from)
}

/// Returns the number of rows changed (0 or 1).
pub fn update_counter(
    conn: &Connection,
    kind: CounterKind,
    id: i64,
    date: &str,
    count: i64,
    only_on: Option<&str>,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        &format!(
            "UPDATE {} SET date = ?2, count = ?3 WHERE id = ?1 AND (?4 IS NULL OR date = ?4)",
            kind.table()
        ),
        params![id, date, count, only_on],
    )?;
    Ok(changed)
}

pub fn delete_counter(
    conn: &Connection,
    kind: CounterKind,
    id: i64,
    only_on: Option<&str>,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        &format!(
            "DELETE FROM {} WHERE id = ?1 AND (?2 IS NULL OR date = ?2)",
            kind.table()
        ),
        params![id, only_on],
    )?;
    Ok(changed)
}

fn map_counter(row: &rusqlite::Row<'_>) -> rusqlite::Result<CounterRow> {
    Ok(CounterRow {
        id: row.get(0)?,
        date: row.get(1)?,
        count: row.get(2)?,
    })
}
