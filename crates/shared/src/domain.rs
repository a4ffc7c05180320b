use std::fmt;

use chrono::{DateTime, NaiveDateTime, Timelike};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::StatusParseError;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// First eight characters, used when naming the record in notices.
            pub fn short(&self) -> &str {
                match self.0.char_indices().nth(8) {
                    Some((idx, _)) => &self.0[..idx],
                    None => &self.0,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

id_newtype!(AppointmentId);
id_newtype!(CompanyId);

pub const NOTES_MAX_CHARS: usize = 250;

/// Wire layout for outgoing appointment dates.
pub const WIRE_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M";

pub const DISPLAY_DATE_FORMAT: &str = "%d %B %Y %H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Customer,
    CompanyAdmin,
}

impl Role {
    /// Path segment under `/api` that scopes every data call for this role.
    pub fn api_scope(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::CompanyAdmin => "company-admin",
        }
    }

    /// Value sent as `RequestedRole` when signing in.
    pub fn requested_role(self) -> &'static str {
        match self {
            Self::Customer => "Customer",
            Self::CompanyAdmin => "CompanyAdmin",
        }
    }

    pub fn loads_company_directory(self) -> bool {
        matches!(self, Self::Customer)
    }
}

/// Appointment status and its fixed wire ordinal.
///
/// The label/ordinal pairs are a contract with the remote service and must not
/// be reordered. No transition rules live here: any status may be requested
/// from any other and the service decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub const ALL: [Self; 4] = [
        Self::Pending,
        Self::Confirmed,
        Self::Cancelled,
        Self::Completed,
    ];

    pub fn ordinal(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Confirmed => 1,
            Self::Cancelled => 2,
            Self::Completed => 3,
        }
    }

    pub fn from_ordinal(ordinal: u8) -> Result<Self, StatusParseError> {
        match ordinal {
            0 => Ok(Self::Pending),
            1 => Ok(Self::Confirmed),
            2 => Ok(Self::Cancelled),
            3 => Ok(Self::Completed),
            other => Err(StatusParseError::UnknownOrdinal(other.into())),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Cancelled => "Cancelled",
            Self::Completed => "Completed",
        }
    }

    pub fn from_label(label: &str) -> Result<Self, StatusParseError> {
        Self::ALL
            .into_iter()
            .find(|status| status.label() == label)
            .ok_or_else(|| StatusParseError::UnknownLabel(label.to_string()))
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for AppointmentStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s)
    }
}

impl Serialize for AppointmentStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for AppointmentStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawStatus {
            Label(String),
            Ordinal(u64),
        }

        match RawStatus::deserialize(deserializer)? {
            RawStatus::Label(label) => Self::from_label(&label).map_err(de::Error::custom),
            RawStatus::Ordinal(ordinal) => u8::try_from(ordinal)
                .map_err(|_| StatusParseError::UnknownOrdinal(ordinal))
                .and_then(Self::from_ordinal)
                .map_err(de::Error::custom),
        }
    }
}

/// Truncates a wall-clock reading to whole minutes, the resolution of the
/// booking form.
pub fn truncate_to_minute(value: NaiveDateTime) -> NaiveDateTime {
    value
        .with_second(0)
        .and_then(|v| v.with_nanosecond(0))
        .unwrap_or(value)
}

pub fn format_display_date(value: &NaiveDateTime) -> String {
    value.format(DISPLAY_DATE_FORMAT).to_string()
}

/// Parses a date sent by the service. Offsets are dropped and the wall-clock
/// reading kept.
pub fn parse_wire_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Some(with_offset.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", WIRE_DATE_FORMAT]
        .into_iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

pub mod wire_date {
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::{parse_wire_date, WIRE_DATE_FORMAT};

    pub fn serialize<S: Serializer>(
        value: &NaiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(WIRE_DATE_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_wire_date(&raw)
            .ok_or_else(|| de::Error::custom(format!("unrecognized appointment date: {raw}")))
    }
}
