use serde::Serialize;

use crate::models::{CounterRow, OpenCase, ProcedureRow, StayRow};

/// Inclusive `[from, to]` range of canonical `YYYY-MM-DD` dates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsBucket {
    pub key: String,
    pub opd: i64,
    pub er: i64,
    pub consult: i64,
    pub ipd_admit: i64,
    pub ipd_discharge: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WardStat {
    pub ward: String,
    pub admit: i64,
    pub discharge: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    pub rows: Vec<StatsBucket>,
    pub ward_stats: Vec<WardStat>,
    /// Mean LOS over discharged admissions with `los > 0`; `None` when there are none.
    pub avg_los_days: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WardBucket {
    pub key: String,
    pub ward: String,
    pub admit: i64,
    pub discharge: i64,
    pub ao: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WardBreakdown {
    pub rows: Vec<WardBucket>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcedureBucket {
    pub key: String,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcedureCount {
    pub procedure_key: String,
    pub procedure_label: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcedureStats {
    pub rows: Vec<ProcedureBucket>,
    pub by_procedure: Vec<ProcedureCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenCases {
    pub rows: Vec<OpenCase>,
}

/// Raw rows entered on one date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DayEntries {
    pub opd: Vec<CounterRow>,
    pub er: Vec<CounterRow>,
    pub consult: Vec<CounterRow>,
    pub ipd: Vec<StayRow>,
    pub procedures: Vec<ProcedureRow>,
}

/// Administrative lookup: one day's raw rows plus the live open-case list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSnapshot {
    pub ipd_open: Vec<OpenCase>,
    #[serde(flatten)]
    pub entries: DayEntries,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rows<T> {
    pub rows: Vec<T>,
}
