//! `GET /api?action=...` — read-only aggregation queries.
//!
//! Parameters are validated into a typed [`QueryRequest`] before the cache is
//! consulted, so the cache key is built from canonical values (defaults
//! resolved, the code excluded). Authorization runs before the cache: a
//! cached body is never served to a caller who could not compute it.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rusqlite::Connection;
use serde::Deserialize;

use super::{json_response, ok_body, run_blocking};
use crate::api::error::ApiError;
use crate::api::types::{ActionTag, ApiContext, CacheStatus, Capability};
use crate::entry::validate;
use crate::models::Granularity;
use crate::query_cache::{CachedResponse, Lookup};
use crate::stats::{self, DateRange};

/// Raw query-string parameters. Which ones are read depends on `action`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryParams {
    pub action: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub group: Option<String>,
    pub ward: Option<String>,
    pub date: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryRequest {
    Stats {
        range: DateRange,
        group: Granularity,
    },
    IpdByWard {
        range: DateRange,
        group: Granularity,
    },
    ProcedureStats {
        range: DateRange,
        group: Granularity,
        ward: Option<String>,
    },
    Activities,
    Encouragement,
    IpdOpenCases,
    PatientDataAdmin {
        date: Option<String>,
    },
    TodayEntries {
        date: String,
    },
}

impl QueryRequest {
    /// Validate parameters for the requested action. `today` fills in the
    /// default date for `todayEntries`.
    pub fn parse(params: &QueryParams, today: &str) -> Result<Self, ApiError> {
        let action = params.action.as_deref().map(str::trim).unwrap_or("");
        match action {
            "stats" => Ok(Self::Stats {
                range: date_range(params)?,
                group: granularity(params)?,
            }),
            "ipdByWard" => Ok(Self::IpdByWard {
                range: date_range(params)?,
                group: granularity(params)?,
            }),
            "procedureStats" => {
                let ward = validate::text(params.ward.as_deref(), "ward", validate::MAX_WARD_LEN)?;
                Ok(Self::ProcedureStats {
                    range: date_range(params)?,
                    group: granularity(params)?,
                    ward: Some(ward).filter(|w| !w.is_empty()),
                })
            }
            "activities" => Ok(Self::Activities),
            "encouragement" => Ok(Self::Encouragement),
            "ipdOpenCases" => Ok(Self::IpdOpenCases),
            "patientDataAdmin" => {
                let date = validate::optional_date_text(params.date.as_deref(), "date")?;
                Ok(Self::PatientDataAdmin {
                    date: Some(date).filter(|d| !d.is_empty()),
                })
            }
            "todayEntries" => {
                let date = validate::optional_date_text(params.date.as_deref(), "date")?;
                Ok(Self::TodayEntries {
                    date: if date.is_empty() { today.to_string() } else { date },
                })
            }
            "" => Err(ApiError::BadRequest("action is required".into())),
            other => Err(ApiError::BadRequest(format!("Unknown query action: {other}"))),
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Self::Stats { .. } => "stats",
            Self::IpdByWard { .. } => "ipdByWard",
            Self::ProcedureStats { .. } => "procedureStats",
            Self::Activities => "activities",
            Self::Encouragement => "encouragement",
            Self::IpdOpenCases => "ipdOpenCases",
            Self::PatientDataAdmin { .. } => "patientDataAdmin",
            Self::TodayEntries { .. } => "todayEntries",
        }
    }

    pub fn capability(&self) -> Capability {
        match self {
            Self::IpdOpenCases | Self::TodayEntries { .. } => Capability::Unit,
            Self::PatientDataAdmin { .. } => Capability::Admin,
            _ => Capability::Public,
        }
    }

    /// Ward breakdowns are always recomputed.
    pub fn is_volatile(&self) -> bool {
        matches!(self, Self::IpdByWard { .. } | Self::ProcedureStats { .. })
    }

    /// Canonical cache key: action plus every parameter that shapes the result.
    pub fn cache_key(&self) -> String {
        let action = self.action();
        match self {
            Self::Stats { range, group } | Self::IpdByWard { range, group } => {
                format!("{action}|from={}|to={}|group={group}", range.from, range.to)
            }
            Self::ProcedureStats { range, group, ward } => format!(
                "{action}|from={}|to={}|group={group}|ward={}",
                range.from,
                range.to,
                ward.as_deref().unwrap_or("")
            ),
            Self::PatientDataAdmin { date } => {
                format!("{action}|date={}", date.as_deref().unwrap_or(""))
            }
            Self::TodayEntries { date } => format!("{action}|date={date}"),
            Self::Activities | Self::Encouragement | Self::IpdOpenCases => action.to_string(),
        }
    }

    /// Run the query and serialize the `ok: true` response body.
    pub fn execute(&self, conn: &Connection) -> Result<String, ApiError> {
        match self {
            Self::Stats { range, group } => ok_body(&stats::overall_stats(conn, range, *group)?),
            Self::IpdByWard { range, group } => ok_body(&stats::ipd_by_ward(conn, range, *group)?),
            Self::ProcedureStats { range, group, ward } => ok_body(&stats::procedure_stats(
                conn,
                range,
                *group,
                ward.as_deref(),
            )?),
            Self::Activities => ok_body(&stats::activities(conn)?),
            Self::Encouragement => ok_body(&stats::encouragements(conn)?),
            Self::IpdOpenCases => ok_body(&stats::open_inpatient_cases(conn)?),
            Self::PatientDataAdmin { date } => {
                ok_body(&stats::admin_snapshot(conn, date.as_deref())?)
            }
            Self::TodayEntries { date } => ok_body(&stats::day_entries(conn, date)?),
        }
    }
}

fn date_range(params: &QueryParams) -> Result<DateRange, ApiError> {
    let from = validate::date_text(params.from.as_deref(), "from")?;
    let to = validate::date_text(params.to.as_deref(), "to")?;
    if from > to {
        return Err(ApiError::BadRequest(format!(
            "from ({from}) must not be after to ({to})"
        )));
    }
    Ok(DateRange { from, to })
}

/// `group` defaults to `day` when absent.
fn granularity(params: &QueryParams) -> Result<Granularity, ApiError> {
    match params.group.as_deref().map(str::trim) {
        None | Some("") => Ok(Granularity::Day),
        Some(raw) => Ok(validate::one_of(Some(raw), "group")?),
    }
}

/// `GET /api` — dispatch a query action.
pub async fn handle(State(ctx): State<ApiContext>, Query(params): Query<QueryParams>) -> Response {
    let action = params.action.clone().unwrap_or_default();
    let mut response = match handle_inner(&ctx, &params).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };
    response.extensions_mut().insert(ActionTag(action));
    response
}

async fn handle_inner(ctx: &ApiContext, params: &QueryParams) -> Result<Response, ApiError> {
    let request = QueryRequest::parse(params, &ctx.core.today())?;
    ctx.authorize(params.code.as_deref(), request.capability())?;

    if request.is_volatile() {
        let body = compute(ctx, request)
            .await?
            .ok_or(ApiError::UpstreamTimeout)?;
        return Ok(json_response(StatusCode::OK, body, Some(CacheStatus::Bypass)));
    }

    let key = request.cache_key();
    let (stale, generation) = {
        let mut cache = ctx.core.cache()?;
        match cache.lookup(&key) {
            Lookup::Hit(entry) => {
                tracing::debug!(%key, "Cache hit");
                return Ok(cached(entry, CacheStatus::Hit));
            }
            Lookup::Expired(entry) => (Some(entry), cache.generation()),
            Lookup::Miss => (None, cache.generation()),
        }
    };

    match compute(ctx, request).await? {
        Some(body) => {
            let entry = CachedResponse::new(body.clone(), StatusCode::OK.as_u16());
            let stored = ctx.core.cache()?.put_if_generation(key.clone(), entry, generation);
            tracing::debug!(%key, stored, "Cache miss");
            Ok(json_response(StatusCode::OK, body, Some(CacheStatus::Miss)))
        }
        None => match stale {
            Some(entry) if ctx.core.serve_stale => {
                tracing::warn!(%key, "Query timed out, serving stale cache entry");
                Ok(cached(entry, CacheStatus::Stale))
            }
            _ => {
                tracing::warn!(%key, "Query timed out");
                Err(ApiError::UpstreamTimeout)
            }
        },
    }
}

/// `Ok(None)` when the work timed out or the database stayed locked. Reads
/// have no side effects, so both take the same stale-or-504 path.
async fn compute(ctx: &ApiContext, request: QueryRequest) -> Result<Option<String>, ApiError> {
    match run_blocking(&ctx.core, move |_, conn| request.execute(conn)).await {
        Err(ApiError::StorageBusy) => {
            tracing::warn!("Database busy during query");
            Ok(None)
        }
        other => other,
    }
}

fn cached(entry: CachedResponse, status: CacheStatus) -> Response {
    let code = StatusCode::from_u16(entry.status).unwrap_or(StatusCode::OK);
    json_response(code, entry.body, Some(status))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        let mut p = QueryParams::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "action" => p.action = v,
                "from" => p.from = v,
                "to" => p.to = v,
                "group" => p.group = v,
                "ward" => p.ward = v,
                "date" => p.date = v,
                "code" => p.code = v,
                other => panic!("unknown param {other}"),
            }
        }
        p
    }

    const TODAY: &str = "2024-06-15";

    #[test]
    fn stats_requires_a_valid_range() {
        let ok = QueryRequest::parse(
            &params(&[
                ("action", "stats"),
                ("from", "2024-06-01"),
                ("to", "2024-06-30"),
                ("group", "month"),
            ]),
            TODAY,
        )
        .unwrap();
        assert_eq!(
            ok,
            QueryRequest::Stats {
                range: DateRange {
                    from: "2024-06-01".into(),
                    to: "2024-06-30".into(),
                },
                group: Granularity::Month,
            }
        );

        for bad in [
            params(&[("action", "stats"), ("to", "2024-06-30")]),
            params(&[("action", "stats"), ("from", "2024-6-1"), ("to", "2024-06-30")]),
            params(&[("action", "stats"), ("from", "2024-07-01"), ("to", "2024-06-30")]),
            params(&[
                ("action", "stats"),
                ("from", "2024-06-01"),
                ("to", "2024-06-30"),
                ("group", "decade"),
            ]),
        ] {
            assert!(matches!(QueryRequest::parse(&bad, TODAY), Err(ApiError::BadRequest(_))));
        }
    }

    #[test]
    fn group_defaults_to_day() {
        let req = QueryRequest::parse(
            &params(&[("action", "ipdByWard"), ("from", "2024-06-01"), ("to", "2024-06-02")]),
            TODAY,
        )
        .unwrap();
        assert!(matches!(req, QueryRequest::IpdByWard { group: Granularity::Day, .. }));
    }

    #[test]
    fn unknown_and_missing_actions_are_rejected() {
        assert!(QueryRequest::parse(&params(&[("action", "addStatsRow")]), TODAY).is_err());
        assert!(QueryRequest::parse(&params(&[]), TODAY).is_err());
    }

    #[test]
    fn today_entries_defaults_to_server_date() {
        let req = QueryRequest::parse(&params(&[("action", "todayEntries")]), TODAY).unwrap();
        assert_eq!(req, QueryRequest::TodayEntries { date: TODAY.into() });
        assert_eq!(req.cache_key(), "todayEntries|date=2024-06-15");
    }

    #[test]
    fn cache_key_ignores_code_and_unused_params() {
        let a = QueryRequest::parse(
            &params(&[
                ("action", "stats"),
                ("from", "2024-06-01"),
                ("to", "2024-06-30"),
                ("code", "x"),
            ]),
            TODAY,
        )
        .unwrap();
        let b = QueryRequest::parse(
            &params(&[
                ("action", "stats"),
                ("from", "2024-06-01"),
                ("to", "2024-06-30"),
                ("group", "day"),
                ("ward", "MED1"),
            ]),
            TODAY,
        )
        .unwrap();
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn capabilities_and_volatility() {
        let open = QueryRequest::IpdOpenCases;
        assert_eq!(open.capability(), Capability::Unit);
        assert!(!open.is_volatile());

        let admin = QueryRequest::PatientDataAdmin { date: None };
        assert_eq!(admin.capability(), Capability::Admin);

        assert_eq!(QueryRequest::Activities.capability(), Capability::Public);

        let procs = QueryRequest::parse(
            &params(&[
                ("action", "procedureStats"),
                ("from", "2024-06-01"),
                ("to", "2024-06-30"),
                ("ward", " "),
            ]),
            TODAY,
        )
        .unwrap();
        assert!(procs.is_volatile());
        assert!(matches!(procs, QueryRequest::ProcedureStats { ward: None, .. }));
    }
}
