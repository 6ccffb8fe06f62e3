use serde::{Deserialize, Serialize};

/// One OPD/ER/consult data-entry submission. Several rows may share a date;
/// queries sum them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRow {
    pub id: i64,
    pub date: String,
    pub count: i64,
}
