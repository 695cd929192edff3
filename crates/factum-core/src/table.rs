//! Fixed tabular abstraction: ordered rows, named columns.
//!
//! The row-major, then column-major traversal order of a [`Table`] is part
//! of the observable contract: it determines triple insertion order and
//! hence the entity/relation index assignment downstream. Keep it stable.

use crate::error::{Error, Result};
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// An in-memory table: named columns and rows of typed cells.
///
/// Each row is one subject; each column is one predicate. Rows without an
/// explicit label get `Event_{i}` where `i` is the insertion position.
///
/// # Example
///
/// ```rust
/// use factum_core::{Table, Value};
///
/// let mut table = Table::new(vec!["colX".into(), "colY".into()]);
/// table.push_row(vec![Value::from("A"), Value::from(1)]).unwrap();
/// table.push_row(vec![Value::from("B"), Value::from(2)]).unwrap();
/// assert_eq!(table.num_rows(), 2);
/// assert_eq!(table.row_label(0), "Event_0");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    labels: Vec<String>,
}

impl Table {
    /// Create an empty table with the given column names.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            labels: Vec::new(),
        }
    }

    /// Append a row with the default `Event_{i}` label.
    pub fn push_row(&mut self, cells: Vec<Value>) -> Result<()> {
        let label = format!("Event_{}", self.rows.len());
        self.push_labeled_row(label, cells)
    }

    /// Append a row with an explicit subject label.
    pub fn push_labeled_row(&mut self, label: impl Into<String>, cells: Vec<Value>) -> Result<()> {
        if cells.len() != self.columns.len() {
            return Err(Error::InvalidInput(format!(
                "Row has {} cells but table has {} columns",
                cells.len(),
                self.columns.len()
            )));
        }
        self.labels.push(label.into());
        self.rows.push(cells);
        Ok(())
    }

    /// Column names, in declaration order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Subject label of row `i`.
    pub fn row_label(&self, i: usize) -> &str {
        &self.labels[i]
    }

    /// Cells of row `i`, in column order.
    pub fn row(&self, i: usize) -> &[Value] {
        &self.rows[i]
    }

    /// Iterate (label, cells) pairs in row order.
    pub fn iter_rows(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.rows.iter().map(Vec::as_slice))
    }

    /// Check structural well-formedness.
    ///
    /// `push_row` already enforces arity, but tables can also be built by
    /// deserialization; materialization revalidates before writing.
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(Error::InvalidInput("Table has no columns".into()));
        }
        if self.labels.len() != self.rows.len() {
            return Err(Error::InvalidInput(format!(
                "Table has {} labels but {} rows",
                self.labels.len(),
                self.rows.len()
            )));
        }
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(Error::InvalidInput(format!(
                    "Row {} has {} cells but table has {} columns",
                    i,
                    row.len(),
                    self.columns.len()
                )));
            }
        }
        Ok(())
    }
}
