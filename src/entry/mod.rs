//! Validated mutations against the event store.
//!
//! Every operation validates its input before touching storage and reports
//! a specific [`EntryError`] on failure. Cache invalidation is the caller's
//! job (see `api::endpoints::mutate`).

pub mod lenient;
pub mod validate;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::bucket::parse_date;
use crate::db::{self, DatabaseError};
use crate::models::*;

/// Errors from mutation operations.
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    /// The row exists but is not dated today.
    #[error("{0}")]
    NotFoundForToday(String),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<rusqlite::Error> for EntryError {
    fn from(err: rusqlite::Error) -> Self {
        EntryError::Database(DatabaseError::Sqlite(err))
    }
}

/// Which rows an id-scoped update/delete may touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowScope {
    /// Administrative edit: any row.
    Any,
    /// Self-service edit: only rows dated on this day (the server's today).
    Today(String),
}

impl RowScope {
    fn only_on(&self) -> Option<&str> {
        match self {
            RowScope::Any => None,
            RowScope::Today(date) => Some(date.as_str()),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Inputs
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterEntry {
    pub kind: Option<String>,
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub count: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcedureEntry {
    pub date: Option<String>,
    pub procedure_key: Option<String>,
    pub procedure_label: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub count: Option<i64>,
    pub ward: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmitEntry {
    pub hn: Option<String>,
    pub ward: Option<String>,
    pub admit_date: Option<String>,
    pub stay_type: Option<String>,
    /// Number of rows for `stayType = "ao"`.
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub count: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DischargeEntry {
    pub hn: Option<String>,
    pub discharge_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowRef {
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub id: Option<i64>,
}

/// Generic edit payload. Which fields are read depends on `kind`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowUpdate {
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub id: Option<i64>,
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub count: Option<i64>,
    pub procedure_key: Option<String>,
    pub procedure_label: Option<String>,
    pub ward: Option<String>,
    pub hn: Option<String>,
    pub admit_date: Option<String>,
    pub discharge_date: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub los: Option<i64>,
    pub stay_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub date: Option<String>,
    pub title: Option<String>,
    pub detail: Option<String>,
    pub posted_by: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncouragementEntry {
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub message: Option<String>,
}

// ═══════════════════════════════════════════════════════════
// Outcomes
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AdmitOutcome {
    Admitted { id: i64 },
    Counted { inserted: usize, ids: Vec<i64> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DischargeOutcome {
    pub id: i64,
    pub los: i64,
}

// ═══════════════════════════════════════════════════════════
// Length of stay
// ═══════════════════════════════════════════════════════════

/// Whole days between admission and discharge, never less than one.
pub fn compute_los(admit_date: &str, discharge_date: &str) -> Result<i64, EntryError> {
    let admit = parse_date(admit_date).ok_or_else(|| {
        EntryError::Validation(format!("invalid admitDate on record: {admit_date}"))
    })?;
    let discharge = validate::date(Some(discharge_date), "dischargeDate")?;
    Ok((discharge - admit).num_days().max(1))
}

// ═══════════════════════════════════════════════════════════
// Inserts
// ═══════════════════════════════════════════════════════════

/// Insert one OPD/ER/consult row. Never merges with same-date rows.
pub fn add_counter(conn: &Connection, entry: &CounterEntry) -> Result<i64, EntryError> {
    let kind: CounterKind = validate::one_of(entry.kind.as_deref(), "kind")?;
    let date = validate::date_text(entry.date.as_deref(), "date")?;
    let count = validate::count(entry.count, "count", 0, validate::MAX_COUNTER)?;

    let id = db::insert_counter(conn, kind, &date, count)?;
    tracing::info!(kind = kind.as_str(), %date, count, id, "Counter row added");
    Ok(id)
}

fn procedure_fields(
    date: Option<&str>,
    key: Option<&str>,
    label: Option<&str>,
    count: Option<i64>,
    ward: Option<&str>,
) -> Result<NewProcedure, EntryError> {
    let date = validate::date_text(date, "date")?;
    let procedure_key: ProcedureKey = validate::one_of(key, "procedureKey")?;
    let procedure_label = if procedure_key == ProcedureKey::Other {
        validate::required_text(label, "procedureLabel", validate::MAX_LABEL_LEN)?
    } else {
        validate::text(label, "procedureLabel", validate::MAX_LABEL_LEN)?
    };
    let count = validate::count(count, "count", 1, validate::MAX_PROCEDURE_COUNT)?;
    let ward = validate::text(ward, "ward", validate::MAX_WARD_LEN)?;
    Ok(NewProcedure {
        date,
        procedure_key,
        procedure_label,
        count,
        ward,
    })
}

pub fn add_procedure(conn: &Connection, entry: &ProcedureEntry) -> Result<i64, EntryError> {
    let proc = procedure_fields(
        entry.date.as_deref(),
        entry.procedure_key.as_deref(),
        entry.procedure_label.as_deref(),
        entry.count,
        entry.ward.as_deref(),
    )?;
    let id = db::insert_procedure(conn, &proc)?;
    tracing::info!(key = proc.procedure_key.as_str(), count = proc.count, id, "Procedure added");
    Ok(id)
}

/// `admit` (or absent/blank) vs `ao`. `null` in storage is written only by
/// pre-migration rows; new writes always carry an explicit tag.
fn requested_stay_type(value: Option<&str>) -> Result<StayType, EntryError> {
    match value.map(str::trim) {
        None | Some("") | Some("admit") => Ok(StayType::Admit),
        Some("ao") => Ok(StayType::Ao),
        Some(other) => Err(EntryError::Validation(format!(
            "stayType has an unsupported value: {other}"
        ))),
    }
}

/// Record an admission.
///
/// `ao` submissions insert `count` independent same-day rows without an HN,
/// all in one transaction. Anything else inserts a single open stay.
pub fn admit(conn: &Connection, entry: &AdmitEntry) -> Result<AdmitOutcome, EntryError> {
    let stay_type = requested_stay_type(entry.stay_type.as_deref())?;
    let ward = validate::required_text(entry.ward.as_deref(), "ward", validate::MAX_WARD_LEN)?;
    let admit_date = validate::date_text(entry.admit_date.as_deref(), "admitDate")?;

    if stay_type.is_admission() {
        let hn = validate::required_text(entry.hn.as_deref(), "hn", validate::MAX_HN_LEN)?;
        let id = db::insert_admission(conn, &hn, &ward, &admit_date)?;
        tracing::info!(%ward, %admit_date, id, "Admission added");
        return Ok(AdmitOutcome::Admitted { id });
    }

    let count = validate::count(entry.count, "count", 1, validate::MAX_AO_BATCH)?;
    let ids = db::insert_ao_batch(conn, &ward, &admit_date, count as u32)?;
    tracing::info!(%ward, %admit_date, inserted = ids.len(), "AO rows added");
    Ok(AdmitOutcome::Counted {
        inserted: ids.len(),
        ids,
    })
}

/// Close the most recent open admission for an HN.
///
/// Two concurrent discharges for the same HN may both select the same row;
/// the later write wins.
pub fn discharge(
    conn: &Connection,
    entry: &DischargeEntry,
) -> Result<DischargeOutcome, EntryError> {
    let hn = validate::required_text(entry.hn.as_deref(), "hn", validate::MAX_HN_LEN)?;
    let discharge_date = validate::date_text(entry.discharge_date.as_deref(), "dischargeDate")?;

    let stay = db::latest_open_admission(conn, &hn)?
        .ok_or_else(|| EntryError::NotFound(format!("No open case for HN {hn}")))?;
    let los = compute_los(&stay.admit_date, &discharge_date)?;

    db::set_discharge(conn, stay.id, &discharge_date, los)?;
    tracing::info!(id = stay.id, %discharge_date, los, "Stay discharged");
    Ok(DischargeOutcome { id: stay.id, los })
}

pub fn add_activity(conn: &Connection, entry: &ActivityEntry) -> Result<i64, EntryError> {
    let date = validate::date_text(entry.date.as_deref(), "date")?;
    let title = validate::required_text(entry.title.as_deref(), "title", validate::MAX_TITLE_LEN)?;
    let detail = validate::text(entry.detail.as_deref(), "detail", validate::MAX_DETAIL_LEN)?;
    let posted_by = validate::text(entry.posted_by.as_deref(), "postedBy", validate::MAX_NAME_LEN)?;
    let id = db::insert_activity(conn, &date, &title, &detail, &posted_by)?;
    tracing::info!(id, "Activity posted");
    Ok(id)
}

pub fn add_encouragement(conn: &Connection, entry: &EncouragementEntry) -> Result<i64, EntryError> {
    let sender = validate::text(entry.sender.as_deref(), "sender", validate::MAX_NAME_LEN)?;
    let recipient =
        validate::text(entry.recipient.as_deref(), "recipient", validate::MAX_NAME_LEN)?;
    let message =
        validate::required_text(entry.message.as_deref(), "message", validate::MAX_MESSAGE_LEN)?;
    let id = db::insert_encouragement(conn, &sender, &recipient, &message)?;
    tracing::info!(id, "Encouragement posted");
    Ok(id)
}

// ═══════════════════════════════════════════════════════════
// Generic edit / delete
// ═══════════════════════════════════════════════════════════

fn table_of(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Opd | RecordKind::Er | RecordKind::Consult => kind
            .counter()
            .map(|c| c.table())
            .unwrap_or("opd_counts"),
        RecordKind::Procedure => "procedures",
        RecordKind::Ipd => "ipd_stays",
        RecordKind::Activity => "activities",
        RecordKind::Encouragement => "encouragements",
    }
}

/// Map "nothing changed" to the right not-found flavour.
fn check_changed(
    conn: &Connection,
    kind: RecordKind,
    id: i64,
    scope: &RowScope,
    changed: usize,
) -> Result<(), EntryError> {
    if changed > 0 {
        return Ok(());
    }
    let exists = db::row_exists(conn, table_of(kind), id)?;
    match scope {
        RowScope::Today(today) if exists => Err(EntryError::NotFoundForToday(format!(
            "{kind} row {id} is not dated today ({today})"
        ))),
        _ => Err(EntryError::NotFound(format!("{kind} row {id} not found"))),
    }
}

fn stay_fields(update: &RowUpdate) -> Result<StayUpdate, EntryError> {
    let stay_type = requested_stay_type(update.stay_type.as_deref())?;
    let ward = validate::required_text(update.ward.as_deref(), "ward", validate::MAX_WARD_LEN)?;
    let admit_date = validate::date_text(update.admit_date.as_deref(), "admitDate")?;

    if !stay_type.is_admission() {
        return Ok(StayUpdate {
            hn: String::new(),
            ward,
            admit_date,
            discharge_date: String::new(),
            los: 0,
            stay_type,
        });
    }

    let hn = validate::required_text(update.hn.as_deref(), "hn", validate::MAX_HN_LEN)?;
    let discharge_date =
        validate::optional_date_text(update.discharge_date.as_deref(), "dischargeDate")?;
    let los = if discharge_date.is_empty() {
        validate::count(Some(update.los.unwrap_or(0)), "los", 0, i64::from(i32::MAX))?
    } else {
        compute_los(&admit_date, &discharge_date)?
    };

    Ok(StayUpdate {
        hn,
        ward,
        admit_date,
        discharge_date,
        los,
        stay_type,
    })
}

/// Overwrite a row by id. Under [`RowScope::Today`] the stored row must be
/// dated today (stays: admitted today).
pub fn update_row(
    conn: &Connection,
    update: &RowUpdate,
    scope: &RowScope,
) -> Result<(), EntryError> {
    let kind: RecordKind = validate::one_of(update.kind.as_deref(), "kind")?;
    let id = validate::id(update.id)?;
    let only_on = scope.only_on();

    let changed = match kind {
        RecordKind::Opd | RecordKind::Er | RecordKind::Consult => {
            let counter = kind
                .counter()
                .ok_or_else(|| EntryError::Validation(format!("{kind} is not a counter")))?;
            let date = validate::date_text(update.date.as_deref(), "date")?;
            let count = validate::count(update.count, "count", 0, validate::MAX_COUNTER)?;
            db::update_counter(conn, counter, id, &date, count, only_on)?
        }
        RecordKind::Procedure => {
            let proc = procedure_fields(
                update.date.as_deref(),
                update.procedure_key.as_deref(),
                update.procedure_label.as_deref(),
                update.count,
                update.ward.as_deref(),
            )?;
            db::update_procedure(conn, id, &proc, only_on)?
        }
        RecordKind::Ipd => {
            let stay = stay_fields(update)?;
            db::update_stay(conn, id, &stay, only_on)?
        }
        RecordKind::Activity | RecordKind::Encouragement => {
            return Err(EntryError::Validation(format!("{kind} rows cannot be edited")));
        }
    };

    check_changed(conn, kind, id, scope, changed)?;
    tracing::info!(kind = kind.as_str(), id, scoped = only_on.is_some(), "Row updated");
    Ok(())
}

/// Hard-delete a row by id, with the same date scoping as [`update_row`].
pub fn delete_row(conn: &Connection, target: &RowRef, scope: &RowScope) -> Result<(), EntryError> {
    let kind: RecordKind = validate::one_of(target.kind.as_deref(), "kind")?;
    let id = validate::id(target.id)?;
    let only_on = scope.only_on();

    let changed = match kind {
        RecordKind::Opd | RecordKind::Er | RecordKind::Consult => {
            let counter = kind
                .counter()
                .ok_or_else(|| EntryError::Validation(format!("{kind} is not a counter")))?;
            db::delete_counter(conn, counter, id, only_on)?
        }
        RecordKind::Procedure => db::delete_procedure(conn, id, only_on)?,
        RecordKind::Ipd => db::delete_stay(conn, id, only_on)?,
        RecordKind::Activity | RecordKind::Encouragement if only_on.is_some() => {
            return Err(EntryError::Validation(format!(
                "{kind} rows can only be removed by an administrator"
            )));
        }
        RecordKind::Activity => db::delete_activity(conn, id)?,
        RecordKind::Encouragement => db::delete_encouragement(conn, id)?,
    };

    check_changed(conn, kind, id, scope, changed)?;
    tracing::info!(kind = kind.as_str(), id, scoped = only_on.is_some(), "Row deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn test_db() -> Connection {
        open_memory_database().unwrap()
    }

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    fn admit_hn(conn: &Connection, hn: &str, admit_date: &str) -> i64 {
        match admit(
            conn,
            &AdmitEntry {
                hn: s(hn),
                ward: s("MED1"),
                admit_date: s(admit_date),
                ..AdmitEntry::default()
            },
        )
        .unwrap()
        {
            AdmitOutcome::Admitted { id } => id,
            other => panic!("expected single admission, got {other:?}"),
        }
    }

    fn discharge_hn(
        conn: &Connection,
        hn: &str,
        date: &str,
    ) -> Result<DischargeOutcome, EntryError> {
        discharge(
            conn,
            &DischargeEntry {
                hn: s(hn),
                discharge_date: s(date),
            },
        )
    }

    #[test]
    fn discharge_computes_length_of_stay() {
        let conn = test_db();
        let id = admit_hn(&conn, "HN1", "2024-03-01");
        let outcome = discharge_hn(&conn, "HN1", "2024-03-05").unwrap();
        assert_eq!(outcome, DischargeOutcome { id, los: 4 });

        let stay = db::get_stay(&conn, id).unwrap().unwrap();
        assert_eq!(stay.discharge_date, "2024-03-05");
        assert_eq!(stay.los, 4);
    }

    #[test]
    fn same_day_discharge_has_los_of_one() {
        let conn = test_db();
        admit_hn(&conn, "HN1", "2024-03-01");
        let outcome = discharge_hn(&conn, "HN1", "2024-03-01").unwrap();
        assert_eq!(outcome.los, 1);
    }

    #[test]
    fn discharge_targets_latest_open_stay() {
        let conn = test_db();
        let older = admit_hn(&conn, "HN1", "2024-03-01");
        let newer = admit_hn(&conn, "HN1", "2024-03-08");

        let outcome = discharge_hn(&conn, "HN1", "2024-03-10").unwrap();
        assert_eq!(outcome.id, newer);
        assert!(db::get_stay(&conn, older).unwrap().unwrap().is_open());

        // Second discharge goes to the remaining open stay
        let outcome = discharge_hn(&conn, "HN1", "2024-03-11").unwrap();
        assert_eq!(outcome.id, older);
        assert_eq!(outcome.los, 10);
    }

    #[test]
    fn discharge_without_open_case_is_not_found() {
        let conn = test_db();
        match discharge_hn(&conn, "HN404", "2024-03-05") {
            Err(EntryError::NotFound(msg)) => assert!(msg.contains("HN404")),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn discharge_requires_hn_and_date() {
        let conn = test_db();
        assert!(matches!(
            discharge(&conn, &DischargeEntry::default()),
            Err(EntryError::Validation(_))
        ));
        assert!(matches!(
            discharge_hn(&conn, "HN1", "05/03/2024"),
            Err(EntryError::Validation(_))
        ));
    }

    #[test]
    fn ao_admission_inserts_count_rows_without_hn() {
        let conn = test_db();
        let outcome = admit(
            &conn,
            &AdmitEntry {
                hn: s("ignored"),
                ward: s("MED1"),
                admit_date: s("2024-03-01"),
                stay_type: s("ao"),
                count: Some(3),
            },
        )
        .unwrap();
        match outcome {
            AdmitOutcome::Counted { inserted, ids } => {
                assert_eq!(inserted, 3);
                assert_eq!(ids.len(), 3);
            }
            other => panic!("expected counted rows, got {other:?}"),
        }
        let stays = db::stays_touching_date(&conn, "2024-03-01").unwrap();
        assert!(stays.iter().all(|st| st.hn.is_empty() && st.stay_type == StayType::Ao));
        assert!(db::open_cases(&conn).unwrap().is_empty());
    }

    #[test]
    fn ao_count_must_be_within_bounds() {
        let conn = test_db();
        for count in [Some(0), Some(101), None] {
            let result = admit(
                &conn,
                &AdmitEntry {
                    ward: s("MED1"),
                    admit_date: s("2024-03-01"),
                    stay_type: s("ao"),
                    count,
                    ..AdmitEntry::default()
                },
            );
            assert!(matches!(result, Err(EntryError::Validation(_))), "count {count:?}");
        }
    }

    #[test]
    fn regular_admission_requires_hn() {
        let conn = test_db();
        let result = admit(
            &conn,
            &AdmitEntry {
                ward: s("MED1"),
                admit_date: s("2024-03-01"),
                ..AdmitEntry::default()
            },
        );
        assert!(matches!(result, Err(EntryError::Validation(_))));
    }

    #[test]
    fn unknown_stay_type_is_rejected() {
        let conn = test_db();
        let result = admit(
            &conn,
            &AdmitEntry {
                hn: s("HN1"),
                ward: s("MED1"),
                admit_date: s("2024-03-01"),
                stay_type: s("observation"),
                ..AdmitEntry::default()
            },
        );
        assert!(matches!(result, Err(EntryError::Validation(_))));
    }

    #[test]
    fn counter_and_procedure_validation() {
        let conn = test_db();
        let ok = add_counter(
            &conn,
            &CounterEntry {
                kind: s("consult"),
                date: s("2024-03-01"),
                count: Some(0),
            },
        );
        assert!(ok.is_ok());

        let bad_kind = add_counter(
            &conn,
            &CounterEntry {
                kind: s("icu"),
                date: s("2024-03-01"),
                count: Some(1),
            },
        );
        assert!(matches!(bad_kind, Err(EntryError::Validation(_))));

        let other_without_label = add_procedure(
            &conn,
            &ProcedureEntry {
                date: s("2024-03-01"),
                procedure_key: s("other"),
                count: Some(1),
                ..ProcedureEntry::default()
            },
        );
        assert!(matches!(other_without_label, Err(EntryError::Validation(_))));

        let missing_key = add_procedure(
            &conn,
            &ProcedureEntry {
                date: s("2024-03-01"),
                count: Some(1),
                ..ProcedureEntry::default()
            },
        );
        assert!(matches!(missing_key, Err(EntryError::Validation(_))));

        let zero_count = add_procedure(
            &conn,
            &ProcedureEntry {
                date: s("2024-03-01"),
                procedure_key: s("intubation"),
                count: Some(0),
                ..ProcedureEntry::default()
            },
        );
        assert!(matches!(zero_count, Err(EntryError::Validation(_))));
    }

    #[test]
    fn today_scoped_update_rejects_other_dates() {
        let conn = test_db();
        let id = db::insert_counter(&conn, CounterKind::Opd, "2024-03-01", 5).unwrap();
        let update = RowUpdate {
            kind: s("opd"),
            id: Some(id),
            date: s("2024-03-01"),
            count: Some(8),
            ..RowUpdate::default()
        };

        let result = update_row(&conn, &update, &RowScope::Today("2024-03-02".into()));
        assert!(matches!(result, Err(EntryError::NotFoundForToday(_))));
        assert_eq!(db::get_counter(&conn, CounterKind::Opd, id).unwrap().unwrap().count, 5);

        update_row(&conn, &update, &RowScope::Today("2024-03-01".into())).unwrap();
        assert_eq!(db::get_counter(&conn, CounterKind::Opd, id).unwrap().unwrap().count, 8);
    }

    #[test]
    fn missing_row_is_not_found_in_either_scope() {
        let conn = test_db();
        let target = RowRef {
            kind: s("procedure"),
            id: Some(99),
        };
        assert!(matches!(
            delete_row(&conn, &target, &RowScope::Any),
            Err(EntryError::NotFound(_))
        ));
        assert!(matches!(
            delete_row(&conn, &target, &RowScope::Today("2024-03-01".into())),
            Err(EntryError::NotFound(_))
        ));
    }

    #[test]
    fn admin_delete_ignores_date() {
        let conn = test_db();
        let id = admit_hn(&conn, "HN1", "2020-01-01");
        let target = RowRef {
            kind: s("ipd"),
            id: Some(id),
        };
        assert!(matches!(
            delete_row(&conn, &target, &RowScope::Today("2024-03-01".into())),
            Err(EntryError::NotFoundForToday(_))
        ));
        delete_row(&conn, &target, &RowScope::Any).unwrap();
        assert!(db::get_stay(&conn, id).unwrap().is_none());
    }

    #[test]
    fn stay_update_recomputes_los() {
        let conn = test_db();
        let id = admit_hn(&conn, "HN1", "2024-03-01");
        let update = RowUpdate {
            kind: s("ipd"),
            id: Some(id),
            hn: s("HN1"),
            ward: s("MED2"),
            admit_date: s("2024-03-01"),
            discharge_date: s("2024-03-08"),
            los: Some(99),
            ..RowUpdate::default()
        };
        update_row(&conn, &update, &RowScope::Any).unwrap();

        let stay = db::get_stay(&conn, id).unwrap().unwrap();
        assert_eq!(stay.los, 7);
        assert_eq!(stay.ward, "MED2");
        assert_eq!(stay.stay_type, StayType::Admit);
    }

    #[test]
    fn open_stay_update_keeps_los_override() {
        let conn = test_db();
        let id = admit_hn(&conn, "HN1", "2024-03-01");
        let update = RowUpdate {
            kind: s("ipd"),
            id: Some(id),
            hn: s("HN1"),
            ward: s("MED1"),
            admit_date: s("2024-03-01"),
            los: Some(3),
            ..RowUpdate::default()
        };
        update_row(&conn, &update, &RowScope::Any).unwrap();
        let stay = db::get_stay(&conn, id).unwrap().unwrap();
        assert!(stay.is_open());
        assert_eq!(stay.los, 3);
    }

    #[test]
    fn ao_update_forces_blank_hn_and_discharge() {
        let conn = test_db();
        let id = admit_hn(&conn, "HN1", "2024-03-01");
        let update = RowUpdate {
            kind: s("ipd"),
            id: Some(id),
            hn: s("HN1"),
            ward: s("MED1"),
            admit_date: s("2024-03-01"),
            discharge_date: s("2024-03-04"),
            los: Some(3),
            stay_type: s("ao"),
            ..RowUpdate::default()
        };
        update_row(&conn, &update, &RowScope::Any).unwrap();

        let stay = db::get_stay(&conn, id).unwrap().unwrap();
        assert_eq!(stay.hn, "");
        assert_eq!(stay.discharge_date, "");
        assert_eq!(stay.los, 0);
        assert_eq!(stay.stay_type, StayType::Ao);
    }

    #[test]
    fn bulletin_rows_are_not_editable() {
        let conn = test_db();
        let id = add_activity(
            &conn,
            &ActivityEntry {
                date: s("2024-03-01"),
                title: s("Grand round"),
                ..ActivityEntry::default()
            },
        )
        .unwrap();
        let update = RowUpdate {
            kind: s("activity"),
            id: Some(id),
            ..RowUpdate::default()
        };
        assert!(matches!(
            update_row(&conn, &update, &RowScope::Any),
            Err(EntryError::Validation(_))
        ));
        delete_row(
            &conn,
            &RowRef {
                kind: s("activity"),
                id: Some(id),
            },
            &RowScope::Any,
        )
        .unwrap();
        assert!(db::list_activities(&conn, 10).unwrap().is_empty());
    }

    #[test]
    fn encouragement_requires_message() {
        let conn = test_db();
        let result = add_encouragement(
            &conn,
            &EncouragementEntry {
                sender: s("Ward A"),
                ..EncouragementEntry::default()
            },
        );
        assert!(matches!(result, Err(EntryError::Validation(_))));
    }

    #[test]
    fn los_floor_applies_to_reversed_dates() {
        assert_eq!(compute_los("2024-03-05", "2024-03-01").unwrap(), 1);
        assert_eq!(compute_los("2024-02-28", "2024-03-01").unwrap(), 2);
    }
}
