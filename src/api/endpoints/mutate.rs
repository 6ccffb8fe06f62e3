//! `POST /api` — writes.
//!
//! The body is a JSON object `{action, code, ...fields}`. Any content type is
//! accepted so browser forms can post as `text/plain` without a preflight.
//! Each successful write flushes the whole query cache before the response
//! is produced.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{json_response, ok_body, run_blocking};
use crate::api::error::ApiError;
use crate::api::types::{ActionTag, ApiContext, Capability};
use crate::entry::{self, lenient, RowScope};

#[derive(Debug, Default, Deserialize)]
struct Envelope {
    action: Option<String>,
    /// Numeric form inputs post the code as a number.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    code: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Mutation {
    AddStatsRow(entry::CounterEntry),
    AddProcedure(entry::ProcedureEntry),
    AddIpdAdmit(entry::AdmitEntry),
    AddIpdDischarge(entry::DischargeEntry),
    AddActivity(entry::ActivityEntry),
    AddEncouragement(entry::EncouragementEntry),
    DeleteRow(entry::RowRef),
    UpdateRow(entry::RowUpdate),
    UpdateTodayRow(entry::RowUpdate),
    DeleteTodayRow(entry::RowRef),
}

#[derive(Serialize)]
struct Inserted {
    id: i64,
}

#[derive(Serialize)]
struct Done {}

fn fields<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {e}")))
}

impl Mutation {
    /// Parse the action-specific fields of a request body.
    pub fn parse(action: &str, body: Value) -> Result<Self, ApiError> {
        Ok(match action {
            "addStatsRow" => Self::AddStatsRow(fields(body)?),
            "addProcedure" => Self::AddProcedure(fields(body)?),
            "addIpdAdmit" => Self::AddIpdAdmit(fields(body)?),
            "addIpdDischarge" => Self::AddIpdDischarge(fields(body)?),
            "addActivity" => Self::AddActivity(fields(body)?),
            "addEncouragement" => Self::AddEncouragement(fields(body)?),
            "deleteRow" => Self::DeleteRow(fields(body)?),
            "updateRow" => Self::UpdateRow(fields(body)?),
            "updateTodayRow" => Self::UpdateTodayRow(fields(body)?),
            "deleteTodayRow" => Self::DeleteTodayRow(fields(body)?),
            "" => return Err(ApiError::BadRequest("action is required".into())),
            other => {
                return Err(ApiError::BadRequest(format!("Unknown mutation action: {other}")))
            }
        })
    }

    pub fn action(&self) -> &'static str {
        match self {
            Self::AddStatsRow(_) => "addStatsRow",
            Self::AddProcedure(_) => "addProcedure",
            Self::AddIpdAdmit(_) => "addIpdAdmit",
            Self::AddIpdDischarge(_) => "addIpdDischarge",
            Self::AddActivity(_) => "addActivity",
            Self::AddEncouragement(_) => "addEncouragement",
            Self::DeleteRow(_) => "deleteRow",
            Self::UpdateRow(_) => "updateRow",
            Self::UpdateTodayRow(_) => "updateTodayRow",
            Self::DeleteTodayRow(_) => "deleteTodayRow",
        }
    }

    /// Unrestricted edits need the admin code; everything else the unit code.
    pub fn capability(&self) -> Capability {
        match self {
            Self::DeleteRow(_) | Self::UpdateRow(_) => Capability::Admin,
            _ => Capability::Unit,
        }
    }

    /// Apply the write and serialize the `ok: true` response body.
    pub fn apply(&self, conn: &Connection, today: &str) -> Result<String, ApiError> {
        let today_scope = || RowScope::Today(today.to_string());
        match self {
            Self::AddStatsRow(e) => ok_body(&Inserted {
                id: entry::add_counter(conn, e)?,
            }),
            Self::AddProcedure(e) => ok_body(&Inserted {
                id: entry::add_procedure(conn, e)?,
            }),
            Self::AddIpdAdmit(e) => ok_body(&entry::admit(conn, e)?),
            Self::AddIpdDischarge(e) => ok_body(&entry::discharge(conn, e)?),
            Self::AddActivity(e) => ok_body(&Inserted {
                id: entry::add_activity(conn, e)?,
            }),
            Self::AddEncouragement(e) => ok_body(&Inserted {
                id: entry::add_encouragement(conn, e)?,
            }),
            Self::DeleteRow(r) => {
                entry::delete_row(conn, r, &RowScope::Any)?;
                ok_body(&Done {})
            }
            Self::UpdateRow(u) => {
                entry::update_row(conn, u, &RowScope::Any)?;
                ok_body(&Done {})
            }
            Self::UpdateTodayRow(u) => {
                entry::update_row(conn, u, &today_scope())?;
                ok_body(&Done {})
            }
            Self::DeleteTodayRow(r) => {
                entry::delete_row(conn, r, &today_scope())?;
                ok_body(&Done {})
            }
        }
    }
}

/// `POST /api` — dispatch a mutation action.
pub async fn handle(State(ctx): State<ApiContext>, body: Bytes) -> Response {
    let mut action = String::new();
    let mut response = match handle_inner(&ctx, &body, &mut action).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };
    response.extensions_mut().insert(ActionTag(action));
    response
}

async fn handle_inner(
    ctx: &ApiContext,
    body: &[u8],
    action: &mut String,
) -> Result<Response, ApiError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| ApiError::BadRequest("Request body must be a JSON object".into()))?;
    if !value.is_object() {
        return Err(ApiError::BadRequest("Request body must be a JSON object".into()));
    }
    let envelope: Envelope = fields(value.clone())?;
    *action = envelope.action.as_deref().map(str::trim).unwrap_or("").to_string();

    let mutation = Mutation::parse(action.as_str(), value)?;
    ctx.authorize(envelope.code.as_deref(), mutation.capability())?;

    let result = run_blocking(&ctx.core, move |state, conn| {
        let body = mutation.apply(conn, &state.today())?;
        state.invalidate_all()?;
        Ok(body)
    })
    .await?;

    match result {
        Some(body) => Ok(json_response(StatusCode::OK, body, None)),
        None => {
            tracing::warn!(action = %action, "Mutation timed out, outcome unknown");
            Err(ApiError::MutationTimeout)
        }
    }
}
