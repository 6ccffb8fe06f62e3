use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: i64,
    pub date: String,
    pub title: String,
    pub detail: String,
    pub posted_by: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encouragement {
    pub id: i64,
    pub sender: String,
    pub recipient: String,
    pub message: String,
    pub created_at: String,
}
