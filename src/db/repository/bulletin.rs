use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::*;

pub fn insert_activity(
    conn: &Connection,
    date: &str,
    title: &str,
    detail: &str,
    posted_by: &str,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO activities (date, title, detail, posted_by) VALUES (?1, ?2, ?3, ?4)",
        params![date, title, detail, posted_by],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_activities(conn: &Connection, limit: u32) -> Result<Vec<Activity>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, date, title, detail, posted_by, created_at FROM activities
         ORDER BY date DESC, id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit], |row| {
        Ok(Activity {
            id: row.get(0)?,
            date: row.get(1)?,
            title: row.get(2)?,
            detail: row.get(3)?,
            posted_by: row.get(4)?,
            created_at: row.get(5)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn delete_activity(conn: &Connection, id: i64) -> Result<usize, DatabaseError> {
    Ok(conn.execute("DELETE FROM activities WHERE id = ?1", params![id])?)
}

pub fn insert_encouragement(
    conn: &Connection,
    sender: &str,
    recipient: &str,
    message: &str,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO encouragements (sender, recipient, message) VALUES (?1, ?2, ?3)",
        params![sender, recipient, message],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_encouragements(
    conn: &Connection,
    limit: u32,
) -> Result<Vec<Encouragement>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, sender, recipient, message, created_at FROM encouragements
         ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit], |row| {
        Ok(Encouragement {
            id: row.get(0)?,
            sender: row.get(1)?,
            recipient: row.get(2)?,
            message: row.get(3)?,
            created_at: row.get(4)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn delete_encouragement(conn: &Connection, id: i64) -> Result<usize, DatabaseError> {
    Ok(conn.execute("DELETE FROM encouragements WHERE id = ?1", params![id])?)
}
