//! Repository layer — table-scoped database operations.
//!
//! Id-scoped updates and deletes take an optional `only_on` date. When set,
//! the row is touched only if its own date (admit date for stays) matches.

mod bulletin;
mod counter;
mod procedure;
mod stay;

use rusqlite::{params, Connection, OptionalExtension};

use super::DatabaseError;

pub use bulletin::*;
pub use counter::*;
pub use procedure::*;
pub use stay::*;

/// Whether a row with this id exists in `table`.
///
/// `table` must be one of the crate's own table names, never user input.
pub fn row_exists(conn: &Connection, table: &str, id: i64) -> Result<bool, DatabaseError> {
    let found = conn
        .query_row(
            &format!("SELECT 1 FROM {table} WHERE id = ?1"),
            params![id],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::*;

    fn test_db() -> Connection {
        open_memory_database().unwrap()
    }

    #[test]
    fn counter_rows_accumulate_instead_of_overwriting() {
        let conn = test_db();
        for count in [5, 3, 2] {
            insert_counter(&conn, CounterKind::Opd, "2024-06-01", count).unwrap();
        }
        let rows = counters_in_range(&conn, CounterKind::Opd, "2024-06-01", "2024-06-01").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.iter().map(|r| r.count).sum::<i64>(), 10);
    }

    #[test]
    fn counter_kinds_use_separate_tables() {
        let conn = test_db();
        insert_counter(&conn, CounterKind::Er, "2024-06-01", 4).unwrap();
        assert!(counters_on_date(&conn, CounterKind::Opd, "2024-06-01").unwrap().is_empty());
        assert_eq!(counters_on_date(&conn, CounterKind::Er, "2024-06-01").unwrap().len(), 1);
    }

    #[test]
    fn range_is_inclusive_on_both_ends() {
        let conn = test_db();
        for date in ["2024-05-31", "2024-06-01", "2024-06-30", "2024-07-01"] {
            insert_counter(&conn, CounterKind::Consult, date, 1).unwrap();
        }
        let rows =
            counters_in_range(&conn, CounterKind::Consult, "2024-06-01", "2024-06-30").unwrap();
        let dates: Vec<&str> = rows.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-06-01", "2024-06-30"]);
    }

    #[test]
    fn scoped_update_skips_rows_from_other_dates() {
        let conn = test_db();
        let id = insert_counter(&conn, CounterKind::Opd, "2024-06-01", 5).unwrap();

        let only_on = Some("2024-06-02");
        let changed = update_counter(&conn, CounterKind::Opd, id, "2024-06-01", 9, only_on);
        assert_eq!(changed.unwrap(), 0);

        let changed = update_counter(&conn, CounterKind::Opd, id, "2024-06-01", 9, None).unwrap();
        assert_eq!(changed, 1);
        assert_eq!(get_counter(&conn, CounterKind::Opd, id).unwrap().unwrap().count, 9);
    }

    #[test]
    fn row_exists_reports_presence() {
        let conn = test_db();
        let id = insert_counter(&conn, CounterKind::Opd, "2024-06-01", 1).unwrap();
        assert!(row_exists(&conn, CounterKind::Opd.table(), id).unwrap());
        assert_eq!(delete_counter(&conn, CounterKind::Opd, id, None).unwrap(), 1);
        assert!(!row_exists(&conn, CounterKind::Opd.table(), id).unwrap());
    }

    #[test]
    fn procedure_ward_filter_is_exact() {
        let conn = test_db();
        let new = |ward: &str| NewProcedure {
            date: "2024-06-01".into(),
            procedure_key: ProcedureKey::Intubation,
            procedure_label: String::new(),
            count: 1,
            ward: ward.into(),
        };
        insert_procedure(&conn, &new("MED1")).unwrap();
        insert_procedure(&conn, &new("med1")).unwrap();

        let all = procedures_in_range(&conn, "2024-06-01", "2024-06-01", None).unwrap();
        assert_eq!(all.len(), 2);
        let med1 = procedures_in_range(&conn, "2024-06-01", "2024-06-01", Some("MED1")).unwrap();
        assert_eq!(med1.len(), 1);
        assert_eq!(med1[0].ward, "MED1");
    }

    #[test]
    fn latest_open_admission_prefers_latest_admit_date() {
        let conn = test_db();
        insert_admission(&conn, "HN1", "MED1", "2024-03-01").unwrap();
        let newer = insert_admission(&conn, "HN1", "MED2", "2024-03-10").unwrap();
        insert_admission(&conn, "HN2", "MED1", "2024-03-12").unwrap();

        let found = latest_open_admission(&conn, "HN1").unwrap().unwrap();
        assert_eq!(found.id, newer);
        assert_eq!(found.ward, "MED2");
    }

    #[test]
    fn latest_open_admission_ignores_closed_stays() {
        let conn = test_db();
        let id = insert_admission(&conn, "HN1", "MED1", "2024-03-01").unwrap();
        set_discharge(&conn, id, "2024-03-05", 4).unwrap();
        assert!(latest_open_admission(&conn, "HN1").unwrap().is_none());
    }

    #[test]
    fn ao_batch_inserts_independent_rows() {
        let conn = test_db();
        let ids = insert_ao_batch(&conn, "MED1", "2024-03-01", 3).unwrap();
        assert_eq!(ids.len(), 3);
        let stays = stays_touching_date(&conn, "2024-03-01").unwrap();
        assert_eq!(stays.len(), 3);
        assert!(stays.iter().all(|s| s.stay_type == StayType::Ao && s.hn.is_empty()));
    }

    #[test]
    fn open_cases_include_legacy_rows_and_exclude_ao() {
        let conn = test_db();
        conn.execute(
            "INSERT INTO ipd_stays (hn, ward, admit_date, discharge_date, los, stay_type)
             VALUES ('LEGACY', 'MED1', '2024-01-01', NULL, 0, NULL)",
            [],
        )
        .unwrap();
        insert_admission(&conn, "HN1", "MED1", "2024-02-01").unwrap();
        insert_ao_batch(&conn, "MED1", "2024-02-02", 2).unwrap();

        let open = open_cases(&conn).unwrap();
        let hns: Vec<&str> = open.iter().map(|c| c.hn.as_str()).collect();
        assert_eq!(hns, vec!["HN1", "LEGACY"]);
    }

    #[test]
    fn stays_touching_date_matches_admit_or_discharge() {
        let conn = test_db();
        let a = insert_admission(&conn, "HN1", "MED1", "2024-03-01").unwrap();
        set_discharge(&conn, a, "2024-03-05", 4).unwrap();
        insert_admission(&conn, "HN2", "MED1", "2024-03-05").unwrap();
        insert_admission(&conn, "HN3", "MED1", "2024-03-04").unwrap();

        let rows = stays_touching_date(&conn, "2024-03-05").unwrap();
        let mut hns: Vec<&str> = rows.iter().map(|s| s.hn.as_str()).collect();
        hns.sort();
        assert_eq!(hns, vec!["HN1", "HN2"]);
    }

    #[test]
    fn bulletin_lists_newest_first() {
        let conn = test_db();
        insert_activity(&conn, "2024-01-01", "Old", "", "").unwrap();
        insert_activity(&conn, "2024-02-01", "New", "", "").unwrap();
        insert_encouragement(&conn, "A", "B", "first").unwrap();
        insert_encouragement(&conn, "A", "B", "second").unwrap();

        let activities = list_activities(&conn, 10).unwrap();
        assert_eq!(activities[0].title, "New");
        let notes = list_encouragements(&conn, 10).unwrap();
        assert_eq!(notes[0].message, "second");
        assert_eq!(list_encouragements(&conn, 1).unwrap().len(), 1);
    }
}
