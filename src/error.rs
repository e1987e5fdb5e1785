//! Error taxonomy for the table model and the mapping engine.
//!
//! Configuration errors are raised before any row is read, schema errors are
//! fatal to the call that triggered them, and conversion errors are scoped to
//! a single cell or row. Per-row failures raised during a conversion pass are
//! wrapped in [`Error::Row`] so callers can see which source row failed.

use thiserror::Error;

use crate::schema::ColumnType;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    /// Invalid mapping configuration or table definition
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Type tag outside the supported set
    #[error("Unknown column type '{0}'. Supported types: {supported}", supported = ColumnType::variants().join(", "))]
    UnsupportedType(String),

    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    #[error("Duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("Row {row} is out of range (table has {count} row(s))")]
    RowOutOfRange { row: usize, count: usize },

    /// Declared column absent from a row while default filling is disabled
    #[error("Missing value for column '{0}'")]
    MissingColumn(String),

    /// String could not be parsed as the requested type
    #[error("Failed to parse '{value}' as {datatype}{}", expected_suffix(.expected))]
    Conversion {
        value: String,
        datatype: ColumnType,
        expected: Option<&'static str>,
    },

    /// Typed value does not match the column's declared type
    #[error("Value of type {actual} is not valid for column '{column}' of type {expected}")]
    InvalidValue {
        column: String,
        expected: ColumnType,
        actual: ColumnType,
    },

    #[error("Column '{column}' is declared as {table} but the mapping targets {mapping}")]
    TypeMismatch {
        column: String,
        table: ColumnType,
        mapping: ColumnType,
    },

    #[error("Column '{column}': {source}")]
    Column {
        column: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Mapping {mapping}: {source}")]
    Mapping {
        mapping: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to decode text with encoding {0}")]
    Decode(&'static str),
}

impl Error {
    pub(crate) fn conversion(value: &str, datatype: ColumnType) -> Self {
        Error::Conversion {
            value: value.to_string(),
            datatype,
            expected: datatype.pattern(),
        }
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    /// True for errors confined to a single row or cell.
    pub fn is_row_scoped(&self) -> bool {
        matches!(
            self,
            Error::Conversion { .. }
                | Error::InvalidValue { .. }
                | Error::MissingColumn(_)
                | Error::Column { .. }
                | Error::Mapping { .. }
                | Error::Row { .. }
        )
    }
}

fn expected_suffix(expected: &Option<&'static str>) -> String {
    match expected {
        Some(pattern) => format!(" (expected {pattern})"),
        None => String::new(),
    }
}
