//! Rows and cells.
//!
//! A [`Row`] holds one [`Cell`] per column its table declared when the row was
//! inserted, in the table's column order. Columns added to the table later are
//! not back-filled; lookups for them find no cell.

use serde::{Deserialize, Serialize};

use crate::data::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    column: String,
    value: Option<Value>,
}

impl Cell {
    pub fn new(column: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            column: column.into(),
            value,
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    pub(crate) fn set(&mut self, value: Option<Value>) {
        self.value = value;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    cells: Vec<Cell>,
}

impl Row {
    pub(crate) fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell(&self, column: &str) -> Option<&Cell> {
        self.cells.iter().find(|cell| cell.column == column)
    }

    pub(crate) fn push(&mut self, cell: Cell) {
        self.cells.push(cell);
    }

    pub(crate) fn cell_mut(&mut self, column: &str) -> Option<&mut Cell> {
        self.cells.iter_mut().find(|cell| cell.column == column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.cell(column).is_some()
    }

    /// Typed value for `column`; `None` for a null cell or a column the row lacks.
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.cell(column).and_then(Cell::value)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(Cell::column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_are_by_column_name() {
        let row = Row::new(vec![
            Cell::new("id", Some(Value::Integer(7))),
            Cell::new("note", None),
        ]);
        assert_eq!(row.len(), 2);
        assert_eq!(row.value("id"), Some(&Value::Integer(7)));
        assert!(row.cell("note").is_some_and(Cell::is_null));
        assert!(!row.contains("missing"));
        assert_eq!(row.column_names().collect::<Vec<_>>(), vec!["id", "note"]);
    }
}
