use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::*;

/// Rows that count as real admissions. NULL is the pre-migration "admit".
pub const ADMISSION_SQL: &str = "(stay_type = 'admit' OR stay_type IS NULL)";

/// Stays without a discharge date.
pub const OPEN_SQL: &str = "(discharge_date IS NULL OR discharge_date = '')";

const STAY_COLUMNS: &str = "id, hn, ward, admit_date, discharge_date, los, stay_type";

type RawStay = (i64, String, String, String, Option<String>, i64, Option<String>);

/// Insert one open admission.
pub fn insert_admission(
    conn: &Connection,
    hn: &str,
    ward: &str,
    admit_date: &str,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO ipd_stays (hn, ward, admit_date, discharge_date, los, stay_type)
         VALUES (?1, ?2, ?3, '', 0, 'admit')",
        params![hn, ward, admit_date],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Insert `count` independent "ao" rows in one transaction.
pub fn insert_ao_batch(
    conn: &Connection,
    ward: &str,
    admit_date: &str,
    count: u32,
) -> Result<Vec<i64>, DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    let mut ids = Vec::with_capacity(count as usize);
    {
        let mut stmt = tx.prepare(
            "INSERT INTO ipd_stays (hn, ward, admit_date, discharge_date, los, stay_type)
             VALUES ('', ?1, ?2, '', 0, 'ao')",
        )?;
        for _ in 0..count {
            stmt.execute(params![ward, admit_date])?;
            ids.push(tx.last_insert_rowid());
        }
    }
    tx.commit()?;
    Ok(ids)
}

/// Most recent open admission for a patient, by admit date (latest id on ties).
pub fn latest_open_admission(
    conn: &Connection,
    hn: &str,
) -> Result<Option<StayRow>, DatabaseError> {
    let raw = conn
        .query_row(
            &format!(
                "SELECT {STAY_COLUMNS} FROM ipd_stays
                 WHERE hn = ?1 AND {ADMISSION_SQL} AND {OPEN_SQL}
                 ORDER BY admit_date DESC, id DESC LIMIT 1"
            ),
            params![hn],
            read_raw,
        )
        .optional()?;
    raw.map(stay_from_raw).transpose()
}

pub fn set_discharge(
    conn: &Connection,
    id: i64,
    discharge_date: &str,
    los: i64,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE ipd_stays SET discharge_date = ?2, los = ?3 WHERE id = ?1",
        params![id, discharge_date, los],
    )?;
    Ok(changed)
}

pub fn get_stay(conn: &Connection, id: i64) -> Result<Option<StayRow>, DatabaseError> {
    let raw = conn
        .query_row(
            &format!("SELECT {STAY_COLUMNS} FROM ipd_stays WHERE id = ?1"),
            params![id],
            read_raw,
        )
        .optional()?;
    raw.map(stay_from_raw).transpose()
}

/// Overwrite a stay. `only_on` is compared with the stored admit date.
pub fn update_stay(
    conn: &Connection,
    id: i64,
    stay: &StayUpdate,
    only_on: Option<&str>,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE ipd_stays
         SET hn = ?2, ward = ?3, admit_date = ?4, discharge_date = ?5, los = ?6, stay_type = ?7
         WHERE id = ?1 AND (?8 IS NULL OR admit_date = ?8)",
        params![
            id,
            stay.hn,
            stay.ward,
            stay.admit_date,
            stay.discharge_date,
            stay.los,
            stay.stay_type.as_column(),
            only_on,
        ],
    )?;
    Ok(changed)
}

pub fn delete_stay(
    conn: &Connection,
    id: i64,
    only_on: Option<&str>,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "DELETE FROM ipd_stays WHERE id = ?1 AND (?2 IS NULL OR admit_date = ?2)",
        params![id, only_on],
    )?;
    Ok(changed)
}

/// Every open admission, newest admit date first. Not date-filtered.
pub fn open_cases(conn: &Connection) -> Result<Vec<OpenCase>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, hn, ward, admit_date FROM ipd_stays
         WHERE {ADMISSION_SQL} AND {OPEN_SQL}
         ORDER BY admit_date DESC, id DESC"
    ))?;
    let rows = stmt.query_map([], |row| {
        Ok(OpenCase {
            id: row.get(0)?,
            hn: row.get(1)?,
            ward: row.get(2)?,
            admit_date: row.get(3)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Stays admitted or discharged on `date`, any stay type.
pub fn stays_touching_date(conn: &Connection, date: &str) -> Result<Vec<StayRow>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {STAY_COLUMNS} FROM ipd_stays
         WHERE admit_date = ?1 OR discharge_date = ?1
         ORDER BY id"
    ))?;
    let rows = stmt.query_map(params![date], read_raw)?;
    let mut stays = Vec::new();
    for row in rows {
        stays.push(stay_from_raw(row?)?);
    }
    Ok(stays)
}

/// Admissions (admit-type) with an admit date in range.
pub fn admissions_in_range(
    conn: &Connection,
    from: &str,
    to: &str,
) -> Result<Vec<StayEvent>, DatabaseError> {
    stay_events(
        conn,
        &format!(
            "SELECT admit_date, ward, los FROM ipd_stays
             WHERE admit_date BETWEEN ?1 AND ?2 AND {ADMISSION_SQL}
             ORDER BY admit_date, id"
        ),
        from,
        to,
    )
}

/// Discharges (admit-type) with a discharge date in range.
pub fn discharges_in_range(
    conn: &Connection,
    from: &str,
    to: &str,
) -> Result<Vec<StayEvent>, DatabaseError> {
    stay_events(
        conn,
        &format!(
            "SELECT discharge_date, ward, los FROM ipd_stays
             WHERE discharge_date BETWEEN ?1 AND ?2 AND NOT {OPEN_SQL} AND {ADMISSION_SQL}
             ORDER BY discharge_date, id"
        ),
        from,
        to,
    )
}

/// "ao" rows with an admit date in range.
pub fn ao_in_range(
    conn: &Connection,
    from: &str,
    to: &str,
) -> Result<Vec<StayEvent>, DatabaseError> {
    stay_events(
        conn,
        "SELECT admit_date, ward, los FROM ipd_stays
         WHERE admit_date BETWEEN ?1 AND ?2 AND stay_type = 'ao'
         ORDER BY admit_date, id",
        from,
        to,
    )
}

fn stay_events(
    conn: &Connection,
    sql: &str,
    from: &str,
    to: &str,
) -> Result<Vec<StayEvent>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![from, to], |row| {
        Ok(StayEvent {
            date: row.get(0)?,
            ward: row.get(1)?,
            los: row.get(2)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawStay> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn stay_from_raw(raw: RawStay) -> Result<StayRow, DatabaseError> {
    let (id, hn, ward, admit_date, discharge_date, los, stay_type) = raw;
    Ok(StayRow {
        id,
        hn,
        ward,
        admit_date,
        discharge_date: discharge_date.unwrap_or_default(),
        los,
        stay_type: StayType::from_column(stay_type.as_deref())?,
    })
}
