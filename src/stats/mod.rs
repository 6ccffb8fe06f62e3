//! Aggregation queries over the event store.
//!
//! Each query scans its tables over an inclusive date range, buckets rows by
//! [`bucket_key`](crate::bucket::bucket_key), and returns one row per bucket
//! that has data. Empty buckets are omitted. Output is sorted ascending by
//! bucket key (then ward where present).

pub mod types;

use std::collections::BTreeMap;

use rusqlite::Connection;

use crate::bucket::bucket_key_str;
use crate::db::{self, DatabaseError};
use crate::models::{CounterKind, Granularity};

pub use types::*;

/// Bulletin lists are capped at this many rows.
pub const BULLETIN_LIMIT: u32 = 100;

/// Group `items` by the bucket of their date.
///
/// Items whose stored date does not parse are skipped with a warning: a bad
/// row should not fail the whole dashboard.
fn bucketed<'a, T, F>(
    items: &'a [T],
    granularity: Granularity,
    date_of: F,
) -> impl Iterator<Item = (String, &'a T)>
where
    F: Fn(&T) -> &str + 'a,
{
    items.iter().filter_map(move |item| {
        let date = date_of(item);
        match bucket_key_str(date, granularity) {
            Some(key) => Some((key, item)),
            None => {
                tracing::warn!(date, "skipping row with malformed date");
                None
            }
        }
    })
}

/// Overall patient-flow statistics.
pub fn overall_stats(
    conn: &Connection,
    range: &DateRange,
    granularity: Granularity,
) -> Result<OverallStats, DatabaseError> {
    let opd = db::counters_in_range(conn, CounterKind::Opd, &range.from, &range.to)?;
    let er = db::counters_in_range(conn, CounterKind::Er, &range.from, &range.to)?;
    let consult = db::counters_in_range(conn, CounterKind::Consult, &range.from, &range.to)?;
    let admissions = db::admissions_in_range(conn, &range.from, &range.to)?;
    let discharges = db::discharges_in_range(conn, &range.from, &range.to)?;

    let mut buckets: BTreeMap<String, StatsBucket> = BTreeMap::new();
    for (key, row) in bucketed(&opd, granularity, |r| r.date.as_str()) {
        stats_slot(&mut buckets, key).opd += row.count;
    }
    for (key, row) in bucketed(&er, granularity, |r| r.date.as_str()) {
        stats_slot(&mut buckets, key).er += row.count;
    }
    for (key, row) in bucketed(&consult, granularity, |r| r.date.as_str()) {
        stats_slot(&mut buckets, key).consult += row.count;
    }
    for (key, _) in bucketed(&admissions, granularity, |e| e.date.as_str()) {
        stats_slot(&mut buckets, key).ipd_admit += 1;
    }
    for (key, _) in bucketed(&discharges, granularity, |e| e.date.as_str()) {
        stats_slot(&mut buckets, key).ipd_discharge += 1;
    }

    let mut wards: BTreeMap<&str, WardStat> = BTreeMap::new();
    for event in &admissions {
        ward_slot(&mut wards, &event.ward).admit += 1;
    }
    for event in &discharges {
        ward_slot(&mut wards, &event.ward).discharge += 1;
    }

    let los: Vec<i64> = discharges.iter().map(|e| e.los).filter(|los| *los > 0).collect();
    let avg_los_days = if los.is_empty() {
        None
    } else {
        let mean = los.iter().sum::<i64>() as f64 / los.len() as f64;
        Some((mean * 100.0).round() / 100.0)
    };

    Ok(OverallStats {
        rows: buckets.into_values().collect(),
        ward_stats: wards.into_values().collect(),
        avg_los_days,
    })
}

fn stats_slot(buckets: &mut BTreeMap<String, StatsBucket>, key: String) -> &mut StatsBucket {
    buckets.entry(key.clone()).or_insert_with(|| StatsBucket {
        key,
        ..StatsBucket::default()
    })
}

fn ward_slot<'m, 'a>(
    wards: &'m mut BTreeMap<&'a str, WardStat>,
    ward: &'a str,
) -> &'m mut WardStat {
    wards.entry(ward).or_insert_with(|| WardStat {
        ward: ward.to_string(),
        ..WardStat::default()
    })
}

fn ward_cell<'m>(
    cells: &'m mut BTreeMap<(String, String), WardBucket>,
    key: String,
    ward: &str,
) -> &'m mut WardBucket {
    cells
        .entry((key.clone(), ward.to_string()))
        .or_insert_with(|| WardBucket {
            key,
            ward: ward.to_string(),
            ..WardBucket::default()
        })
}

/// Inpatient admissions, discharges and "ao" counts per (bucket, ward).
pub fn ipd_by_ward(
    conn: &Connection,
    range: &DateRange,
    granularity: Granularity,
) -> Result<WardBreakdown, DatabaseError> {
    let admissions = db::admissions_in_range(conn, &range.from, &range.to)?;
    let discharges = db::discharges_in_range(conn, &range.from, &range.to)?;
    let ao = db::ao_in_range(conn, &range.from, &range.to)?;

    let mut cells: BTreeMap<(String, String), WardBucket> = BTreeMap::new();
    for (key, event) in bucketed(&admissions, granularity, |e| e.date.as_str()) {
        ward_cell(&mut cells, key, &event.ward).admit += 1;
    }
    for (key, event) in bucketed(&discharges, granularity, |e| e.date.as_str()) {
        ward_cell(&mut cells, key, &event.ward).discharge += 1;
    }
    for (key, event) in bucketed(&ao, granularity, |e| e.date.as_str()) {
        ward_cell(&mut cells, key, &event.ward).ao += 1;
    }

    Ok(WardBreakdown {
        rows: cells.into_values().collect(),
    })
}

/// Procedure totals per bucket plus a (key, label) breakdown, optionally for
/// one ward only.
pub fn procedure_stats(
    conn: &Connection,
    range: &DateRange,
    granularity: Granularity,
    ward: Option<&str>,
) -> Result<ProcedureStats, DatabaseError> {
    let procedures = db::procedures_in_range(conn, &range.from, &range.to, ward)?;

    let mut totals: BTreeMap<String, i64> = BTreeMap::new();
    for (key, row) in bucketed(&procedures, granularity, |p| p.date.as_str()) {
        *totals.entry(key).or_default() += row.count;
    }

    let mut by_pair: BTreeMap<(&str, &str), i64> = BTreeMap::new();
    for row in &procedures {
        *by_pair
            .entry((row.procedure_key.as_str(), row.procedure_label.as_str()))
            .or_default() += row.count;
    }
    let mut by_procedure: Vec<ProcedureCount> = by_pair
        .into_iter()
        .map(|((key, label), count)| ProcedureCount {
            procedure_key: key.to_string(),
            procedure_label: label.to_string(),
            count,
        })
        .collect();
    // Stable sort keeps (key, label) order among equal counts.
    by_procedure.sort_by(|a, b| b.count.cmp(&a.count));

    Ok(ProcedureStats {
        rows: totals
            .into_iter()
            .map(|(key, total)| ProcedureBucket { key, total })
            .collect(),
        by_procedure,
    })
}

/// Live list of patients currently admitted.
pub fn open_inpatient_cases(conn: &Connection) -> Result<OpenCases, DatabaseError> {
    Ok(OpenCases {
        rows: db::open_cases(conn)?,
    })
}

/// Every raw row dated `date` (stays by admit or discharge date).
pub fn day_entries(conn: &Connection, date: &str) -> Result<DayEntries, DatabaseError> {
    Ok(DayEntries {
        opd: db::counters_on_date(conn, CounterKind::Opd, date)?,
        er: db::counters_on_date(conn, CounterKind::Er, date)?,
        consult: db::counters_on_date(conn, CounterKind::Consult, date)?,
        ipd: db::stays_touching_date(conn, date)?,
        procedures: db::procedures_on_date(conn, date)?,
    })
}

/// Open cases plus, when a date is given, that day's raw rows.
pub fn admin_snapshot(
    conn: &Connection,
    date: Option<&str>,
) -> Result<AdminSnapshot, DatabaseError> {
    let entries = match date {
        Some(date) => day_entries(conn, date)?,
        None => DayEntries::default(),
    };
    Ok(AdminSnapshot {
        ipd_open: db::open_cases(conn)?,
        entries,
    })
}

pub fn activities(conn: &Connection) -> Result<Rows<crate::models::Activity>, DatabaseError> {
    Ok(Rows {
        rows: db::list_activities(conn, BULLETIN_LIMIT)?,
    })
}

pub fn encouragements(
    conn: &Connection,
) -> Result<Rows<crate::models::Encouragement>, DatabaseError> {
    Ok(Rows {
        rows: db::list_encouragements(conn, BULLETIN_LIMIT)?,
    })
}
