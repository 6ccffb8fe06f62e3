use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::db::DatabaseError;

/// Inpatient stay discriminant.
///
/// `Unset` is the NULL written by rows that predate the column. It is a real
/// admission: every admission filter goes through [`StayType::is_admission`]
/// (or the matching SQL predicate in `db::repository::stay`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StayType {
    Admit,
    Unset,
    Ao,
}

impl StayType {
    pub fn is_admission(&self) -> bool {
        matches!(self, Self::Admit | Self::Unset)
    }

    pub fn from_column(value: Option<&str>) -> Result<Self, DatabaseError> {
        match value {
            None => Ok(Self::Unset),
            Some("admit") => Ok(Self::Admit),
            Some("ao") => Ok(Self::Ao),
            Some(other) => Err(DatabaseError::InvalidEnum {
                field: "StayType".into(),
                value: other.into(),
            }),
        }
    }

    pub fn as_column(&self) -> Option<&'static str> {
        match self {
            Self::Admit => Some("admit"),
            Self::Unset => None,
            Self::Ao => Some("ao"),
        }
    }
}

impl Serialize for StayType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_column() {
            Some(s) => serializer.serialize_str(s),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for StayType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        StayType::from_column(value.as_deref()).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StayRow {
    pub id: i64,
    pub hn: String,
    pub ward: String,
    pub admit_date: String,
    /// Empty while the stay is open.
    pub discharge_date: String,
    pub los: i64,
    pub stay_type: StayType,
}

impl StayRow {
    pub fn is_open(&self) -> bool {
        self.discharge_date.is_empty()
    }
}

/// Snapshot entry for a patient currently in a ward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenCase {
    pub id: i64,
    pub hn: String,
    pub ward: String,
    pub admit_date: String,
}

/// Validated stay fields for the generic edit path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StayUpdate {
    pub hn: String,
    pub ward: String,
    pub admit_date: String,
    pub discharge_date: String,
    pub los: i64,
    pub stay_type: StayType,
}

/// One admission, discharge or "ao" occurrence, reduced to what the
/// aggregation layer buckets on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StayEvent {
    pub date: String,
    pub ward: String,
    pub los: i64,
}
