use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(CounterKind {
    Opd => "opd",
    Er => "er",
    Consult => "consult",
});

impl CounterKind {
    pub const ALL: [CounterKind; 3] = [CounterKind::Opd, CounterKind::Er, CounterKind::Consult];

    /// Backing table for this counter.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Opd => "opd_counts",
            Self::Er => "er_counts",
            Self::Consult => "consult_counts",
        }
    }
}

str_enum!(ProcedureKey {
    Intubation => "intubation",
    CentralLine => "central_line",
    ChestDrain => "chest_drain",
    Thoracentesis => "thoracentesis",
    Paracentesis => "paracentesis",
    LumbarPuncture => "lumbar_puncture",
    BoneMarrow => "bone_marrow",
    HemodialysisCatheter => "hemodialysis_catheter",
    Other => "other",
});

// Tag carried by generic update/delete requests.
str_enum!(RecordKind {
    Opd => "opd",
    Er => "er",
    Consult => "consult",
    Procedure => "procedure",
    Ipd => "ipd",
    Activity => "activity",
    Encouragement => "encouragement",
});

impl RecordKind {
    pub fn counter(&self) -> Option<CounterKind> {
        match self {
            Self::Opd => Some(CounterKind::Opd),
            Self::Er => Some(CounterKind::Er),
            Self::Consult => Some(CounterKind::Consult),
            _ => None,
        }
    }
}

str_enum!(Granularity {
    Day => "day",
    Week => "week",
    Month => "month",
    Year => "year",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn counter_kind_maps_to_its_own_table() {
        assert_eq!(CounterKind::Opd.table(), "opd_counts");
        assert_eq!(CounterKind::Er.table(), "er_counts");
        assert_eq!(CounterKind::Consult.table(), "consult_counts");
    }

    #[test]
    fn record_kind_counter_projection() {
        assert_eq!(RecordKind::Er.counter(), Some(CounterKind::Er));
        assert_eq!(RecordKind::Ipd.counter(), None);
        assert_eq!(RecordKind::Activity.counter(), None);
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&ProcedureKey::ChestDrain).unwrap();
        assert_eq!(json, "\"chest_drain\"");
        let parsed: Granularity = serde_json::from_str("\"week\"").unwrap();
        assert_eq!(parsed, Granularity::Week);
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(Granularity::from_str("quarter").is_err());
        assert!(ProcedureKey::from_str("Intubation").is_err());
        assert!(RecordKind::from_str("").is_err());
        match CounterKind::from_str("icu") {
            Err(DatabaseError::InvalidEnum { field, value }) => {
                assert_eq!(field, "CounterKind");
                assert_eq!(value, "icu");
            }
            other => panic!("expected InvalidEnum, got {other:?}"),
        }
    }
}
