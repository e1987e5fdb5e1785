//! In-memory typed tables.
//!
//! A [`Table`] owns an ordered column set and an ordered list of rows. Rows
//! are appended either as typed values or as raw text, in which case every
//! value is converted with its column's type before the row is stored.
//!
//! ## Round-trip text
//!
//! Parsing `"30000.00"` into a double loses the two trailing zeros. When text
//! containing a decimal point is ingested into a double column the exact input
//! is kept alongside the row, keyed by `(column, row index)`, and
//! [`Table::get_value_at`] returns it verbatim. Entries are dropped when the
//! cell is overwritten with a typed value and purged whenever
//! [`Table::set_columns`] replaces the schema.

use std::collections::{BTreeMap, HashSet};

use log::debug;

use crate::{
    column::Column,
    data::{Value, format_double, retains_original_text},
    error::{Error, Result},
    rows::{Cell, Row},
    schema::ColumnType,
};

#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Row>,
    create_default_values: bool,
    original_text: BTreeMap<(String, usize), String>,
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl Table {
    /// Creates an empty table with default filling enabled.
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            create_default_values: true,
            original_text: BTreeMap::new(),
        }
    }

    pub fn with_columns(columns: Vec<Column>) -> Result<Self> {
        let mut table = Self::new();
        table.set_column_definitions(columns)?;
        Ok(table)
    }

    pub fn create_default_values(&self) -> bool {
        self.create_default_values
    }

    /// When disabled, rows missing a declared column are rejected.
    pub fn set_create_default_values(&mut self, enabled: bool) {
        self.create_default_values = enabled;
    }

    /// Replaces the schema from `(name, type tag)` pairs.
    ///
    /// **Destructive:** every existing row and all retained round-trip text is
    /// discarded, even when the new schema matches the old one.
    pub fn set_columns<I, N, T>(&mut self, definitions: I) -> Result<()>
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: AsRef<str>,
    {
        let columns = definitions
            .into_iter()
            .map(|(name, tag)| {
                let name = name.into();
                let tag = tag.as_ref();
                if tag.trim().is_empty() {
                    return Err(Error::configuration(format!(
                        "Column '{name}' has a blank type"
                    )));
                }
                Ok(Column::new(name, tag.parse::<ColumnType>()?))
            })
            .collect::<Result<Vec<_>>>()?;
        self.set_column_definitions(columns)
    }

    /// Replaces the schema with fully specified columns. **Destructive**, as
    /// [`Table::set_columns`].
    pub fn set_column_definitions(&mut self, columns: Vec<Column>) -> Result<()> {
        {
            let mut seen = HashSet::with_capacity(columns.len());
            for column in &columns {
                if column.name().trim().is_empty() {
                    return Err(Error::configuration("Column names must not be blank"));
                }
                if !seen.insert(column.name()) {
                    return Err(Error::DuplicateColumn(column.name().to_string()));
                }
            }
        }
        if !self.rows.is_empty() {
            debug!(
                "Replacing schema discards {} existing row(s)",
                self.rows.len()
            );
        }
        self.columns = columns;
        self.rows.clear();
        self.original_text.clear();
        Ok(())
    }

    /// Appends a column. Rows already in the table gain no cell for it.
    pub fn add_column(&mut self, column: Column) -> Result<()> {
        if column.name().trim().is_empty() {
            return Err(Error::configuration("Column names must not be blank"));
        }
        if self.column_index(column.name()).is_some() {
            return Err(Error::DuplicateColumn(column.name().to_string()));
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name().to_string()).collect()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Appends a row of typed values and returns its index.
    ///
    /// Declared columns missing from `values` receive their default when
    /// default filling is enabled; otherwise the row is rejected. Names that
    /// are not table columns are rejected.
    pub fn add_row<I, K>(&mut self, values: I) -> Result<usize>
    where
        I: IntoIterator<Item = (K, Option<Value>)>,
        K: Into<String>,
    {
        let values = values
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .collect::<BTreeMap<_, _>>();
        self.insert_row(values, Vec::new())
    }

    /// Appends a row of raw text, converting each value with its column type.
    pub fn add_raw_row<I, K, V>(&mut self, values: I) -> Result<usize>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut typed = BTreeMap::new();
        let mut originals = Vec::new();
        for (name, raw) in values {
            let name = name.into();
            let raw = raw.as_ref();
            let column = self
                .column(&name)
                .ok_or_else(|| Error::ColumnNotFound(name.clone()))?;
            let value = column
                .convert_from_string(raw)
                .map_err(|err| Error::Column {
                    column: name.clone(),
                    source: Box::new(err),
                })?;
            if retains_original_text(column.datatype(), raw) {
                originals.push((name.clone(), raw.to_string()));
            }
            typed.insert(name, value);
        }
        self.insert_row(typed, originals)
    }

    /// Shared insertion path: validates, fills defaults and records retained
    /// text. Nothing is stored unless the whole row is valid.
    pub(crate) fn insert_row(
        &mut self,
        mut values: BTreeMap<String, Option<Value>>,
        originals: Vec<(String, String)>,
    ) -> Result<usize> {
        if let Some(unknown) = values.keys().find(|name| self.column_index(name).is_none()) {
            return Err(Error::ColumnNotFound(unknown.clone()));
        }
        let mut cells = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let value = match values.remove(column.name()) {
                Some(Some(value)) => {
                    column.ensure_valid(&value)?;
                    Some(value)
                }
                Some(None) => None,
                None if self.create_default_values => column.create_default_value(),
                None => return Err(Error::MissingColumn(column.name().to_string())),
            };
            cells.push(column.create_cell(value));
        }
        let index = self.rows.len();
        self.rows.push(Row::new(cells));
        for (column, text) in originals {
            self.original_text.insert((column, index), text);
        }
        Ok(index)
    }

    /// Drops every row from `len` on, together with its retained text.
    pub(crate) fn truncate_rows(&mut self, len: usize) {
        if len >= self.rows.len() {
            return;
        }
        debug!("Discarding {} row(s) from index {len}", self.rows.len() - len);
        self.rows.truncate(len);
        self.original_text.retain(|(_, row), _| *row < len);
    }

    fn locate(&self, row: usize, column: &str) -> Result<(&Row, &Column)> {
        let column = self
            .column(column)
            .ok_or_else(|| Error::ColumnNotFound(column.to_string()))?;
        let row = self.rows.get(row).ok_or(Error::RowOutOfRange {
            row,
            count: self.rows.len(),
        })?;
        Ok((row, column))
    }

    /// Typed value of a cell; `Ok(None)` for a null cell or one the row lacks.
    pub fn value(&self, row: usize, column: &str) -> Result<Option<&Value>> {
        let (row, column) = self.locate(row, column)?;
        Ok(row.value(column.name()))
    }

    /// Text form of a cell, the inverse of [`Table::add_raw_row`].
    ///
    /// Null cells render as the empty string. Double cells return retained
    /// input text when present.
    pub fn get_value_at(&self, row: usize, column: &str) -> Result<String> {
        let (row_ref, column_ref) = self.locate(row, column)?;
        let Some(value) = row_ref.value(column_ref.name()) else {
            return Ok(String::new());
        };
        if let Value::Double(number) = value {
            return Ok(match self.original_text(column, row) {
                Some(text) => text.to_string(),
                None => format_double(*number),
            });
        }
        Ok(column_ref.format(Some(value)))
    }

    /// Converts `raw` with the column type and stores it in one cell.
    pub fn set_value_at(&mut self, row: usize, column: &str, raw: &str) -> Result<()> {
        let (_, column_ref) = self.locate(row, column)?;
        let datatype = column_ref.datatype();
        let value = column_ref
            .convert_from_string(raw)
            .map_err(|err| Error::Column {
                column: column.to_string(),
                source: Box::new(err),
            })?;
        self.store(row, column, value);
        let key = (column.to_string(), row);
        if retains_original_text(datatype, raw) {
            self.original_text.insert(key, raw.to_string());
        } else {
            self.original_text.remove(&key);
        }
        Ok(())
    }

    /// Stores a typed value in one cell, dropping any retained text.
    pub fn set_value(&mut self, row: usize, column: &str, value: Option<Value>) -> Result<()> {
        let (_, column_ref) = self.locate(row, column)?;
        if let Some(value) = &value {
            column_ref.ensure_valid(value)?;
        }
        self.store(row, column, value);
        self.original_text.remove(&(column.to_string(), row));
        Ok(())
    }

    fn store(&mut self, row: usize, column: &str, value: Option<Value>) {
        let Some(row) = self.rows.get_mut(row) else {
            return;
        };
        match row.cell_mut(column) {
            Some(cell) => cell.set(value),
            None => row.push(Cell::new(column, value)),
        }
    }

    /// Retained input text for a double cell, if any.
    pub fn original_text(&self, column: &str, row: usize) -> Option<&str> {
        self.original_text
            .get(&(column.to_string(), row))
            .map(String::as_str)
    }

    pub fn retained_text_count(&self) -> usize {
        self.original_text.len()
    }

    /// Every row rendered as text in column order.
    pub fn to_string_rows(&self) -> Result<Vec<Vec<String>>> {
        (0..self.rows.len())
            .map(|row| {
                self.columns
                    .iter()
                    .map(|column| self.get_value_at(row, column.name()))
                    .collect()
            })
            .collect()
    }
}
