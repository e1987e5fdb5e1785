//! Typed column descriptors.

use serde::{Deserialize, Serialize};

use crate::{
    data::{Value, format_value, parse_typed_value},
    error::{Error, Result},
    rows::Cell,
    schema::ColumnType,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    datatype: ColumnType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
}

impl Column {
    /// Creates a column whose default is the type's natural default.
    pub fn new(name: impl Into<String>, datatype: ColumnType) -> Self {
        Self {
            name: name.into(),
            datatype,
            default: Value::default_for(datatype),
        }
    }

    /// Replaces the default; `None` means missing values stay empty.
    pub fn with_default(mut self, default: Option<Value>) -> Result<Self> {
        if let Some(value) = &default {
            self.ensure_valid(value)?;
        }
        self.default = default;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn datatype(&self) -> ColumnType {
        self.datatype
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn create_default_value(&self) -> Option<Value> {
        self.default.clone()
    }

    /// An absent value is always valid; otherwise the variant must match.
    pub fn is_valid_value(&self, value: Option<&Value>) -> bool {
        value.is_none_or(|v| v.column_type() == self.datatype)
    }

    pub fn ensure_valid(&self, value: &Value) -> Result<()> {
        if self.is_valid_value(Some(value)) {
            Ok(())
        } else {
            Err(Error::InvalidValue {
                column: self.name.clone(),
                expected: self.datatype,
                actual: value.column_type(),
            })
        }
    }

    pub fn convert_from_string(&self, raw: &str) -> Result<Option<Value>> {
        parse_typed_value(raw, self.datatype)
    }

    pub fn format(&self, value: Option<&Value>) -> String {
        value.map(format_value).unwrap_or_default()
    }

    pub fn create_cell(&self, value: Option<Value>) -> Cell {
        Cell::new(self.name.clone(), value)
    }
}
