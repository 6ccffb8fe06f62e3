use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcedureRow {
    pub id: i64,
    pub date: String,
    /// Stored key. Validated against `ProcedureKey` on write, kept as text on
    /// read so rows written under an older key list still load.
    pub procedure_key: String,
    pub procedure_label: String,
    pub count: i64,
    pub ward: String,
}

/// Validated procedure fields for insert/update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProcedure {
    pub date: String,
    pub procedure_key: super::ProcedureKey,
    pub procedure_label: String,
    pub count: i64,
    pub ward: String,
}
