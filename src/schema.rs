//! Semantic column types.
//!
//! [`ColumnType`] is the closed set of types a table column may carry. Each
//! variant owns its string patterns: the temporal types parse and render with
//! fixed ISO layouts so that values written out can always be read back.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::error::Error;

/// `yyyy-MM-dd`
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// `HH:mm:ss`
pub const TIME_FORMAT: &str = "%H:%M:%S";
/// `yyyy-MM-ddTHH:mm:ss`
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    String,
    Integer,
    Double,
    Boolean,
    Date,
    Time,
    DateTime,
}

impl ColumnType {
    pub const ALL: [ColumnType; 7] = [
        ColumnType::String,
        ColumnType::Integer,
        ColumnType::Double,
        ColumnType::Boolean,
        ColumnType::Date,
        ColumnType::Time,
        ColumnType::DateTime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Integer => "int",
            ColumnType::Double => "double",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
            ColumnType::DateTime => "datetime",
        }
    }

    pub fn variants() -> &'static [&'static str] {
        &[
            "string", "int", "double", "boolean", "date", "time", "datetime",
        ]
    }

    /// Human readable layout expected when parsing, for temporal types only.
    pub fn pattern(&self) -> Option<&'static str> {
        match self {
            ColumnType::Date => Some("yyyy-MM-dd"),
            ColumnType::Time => Some("HH:mm:ss"),
            ColumnType::DateTime => Some("yyyy-MM-ddTHH:mm:ss"),
            _ => None,
        }
    }

    /// The chrono format string used to parse and render temporal values.
    pub fn chrono_format(&self) -> Option<&'static str> {
        match self {
            ColumnType::Date => Some(DATE_FORMAT),
            ColumnType::Time => Some(TIME_FORMAT),
            ColumnType::DateTime => Some(DATETIME_FORMAT),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Double)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            ColumnType::Date | ColumnType::Time | ColumnType::DateTime
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "string" | "str" | "text" => Ok(ColumnType::String),
            "int" | "integer" | "long" => Ok(ColumnType::Integer),
            "double" | "float" => Ok(ColumnType::Double),
            "boolean" | "bool" => Ok(ColumnType::Boolean),
            "date" => Ok(ColumnType::Date),
            "time" => Ok(ColumnType::Time),
            "datetime" | "date-time" | "timestamp" => Ok(ColumnType::DateTime),
            _ => Err(Error::UnsupportedType(value.to_string())),
        }
    }
}

impl Serialize for ColumnType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ColumnType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        ColumnType::from_str(&token).map_err(|err| de::Error::custom(err.to_string()))
    }
}
