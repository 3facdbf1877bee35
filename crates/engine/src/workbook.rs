//! Storage boundary: a spreadsheet-like workbook made of named worksheets.
//!
//! Each worksheet has a header in row 1 and an ordered list of data rows
//! below it. Rows and columns are addressed 1-based, header included, the
//! same way spreadsheet services address them.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod memory;
mod sheets;
mod sqlite;

pub use memory::MemoryWorkbook;
pub use sheets::SheetsWorkbook;
pub use sqlite::SqliteWorkbook;

/// A single cell value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Int(i64),
    Text(String),
}

impl Cell {
    /// Integer view of the cell. Text cells holding an integer are accepted
    /// since spreadsheets may hand numbers back as strings.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Cell::Int(value) => Some(*value),
            Cell::Text(text) => text.trim().parse().ok(),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Cell::Int(value) => value.to_string(),
            Cell::Text(text) => text.clone(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Int(value) => write!(f, "{value}"),
            Cell::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Cell::Int(i64::from(value))
    }
}

impl From<u32> for Cell {
    fn from(value: u32) -> Self {
        Cell::Int(i64::from(value))
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

/// A data row read back from a worksheet, keyed by the header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, Cell)>,
}

impl Record {
    /// Pairs `header` with `cells`. Missing trailing cells are left out,
    /// cells beyond the header are dropped.
    pub fn from_row(header: &[String], cells: Vec<Cell>) -> Self {
        Self {
            fields: header.iter().cloned().zip(cells).collect(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.fields
            .iter()
            .find_map(|(name, cell)| (name == column).then_some(cell))
    }

    /// True for a row with no non-whitespace cell, such as a cleared row.
    pub fn is_blank(&self) -> bool {
        self.fields
            .iter()
            .all(|(_, cell)| cell.as_text().trim().is_empty())
    }
}

/// Handle to a worksheet.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Worksheet {
    pub id: i64,
    pub title: String,
}

/// Sizing hint used when a worksheet is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SheetSize {
    pub rows: u32,
    pub cols: u32,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("\"{0}\" not found")]
    NotFound(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("malformed data: {0}")]
    Malformed(String),
}

impl From<sea_orm::DbErr> for BackendError {
    fn from(err: sea_orm::DbErr) -> Self {
        BackendError::Request(err.to_string())
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Request(err.to_string())
    }
}

/// The primitives the ledger needs from a spreadsheet service.
#[async_trait]
pub trait Workbook: Send + Sync {
    /// Name of the opened workbook.
    fn name(&self) -> &str;

    /// Looks a worksheet up by title. `Ok(None)` means it does not exist.
    async fn worksheet(&self, title: &str) -> Result<Option<Worksheet>, BackendError>;

    /// Creates a worksheet and writes `header` as its first row.
    async fn add_worksheet(
        &self,
        title: &str,
        header: &[&str],
        size: SheetSize,
    ) -> Result<Worksheet, BackendError>;

    async fn append_row(&self, sheet: &Worksheet, row: Vec<Cell>) -> Result<(), BackendError>;

    /// Every row after the header, in sheet order.
    async fn records(&self, sheet: &Worksheet) -> Result<Vec<Record>, BackendError>;

    async fn update_cell(
        &self,
        sheet: &Worksheet,
        row: usize,
        col: usize,
        value: Cell,
    ) -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_lookup_by_header() {
        let header = vec!["Year".to_string(), "Month".to_string(), "TotalExpense".to_string()];
        let record = Record::from_row(&header, vec![Cell::Int(2024), Cell::Int(3)]);
        assert_eq!(record.get("Month"), Some(&Cell::Int(3)));
        assert_eq!(record.get("TotalExpense"), None);
    }

    #[test]
    fn cleared_rows_are_blank() {
        let header = vec!["Year".to_string(), "Month".to_string()];
        assert!(Record::from_row(&header, Vec::new()).is_blank());
        assert!(Record::from_row(&header, vec![Cell::from(""), Cell::from(" ")]).is_blank());
        assert!(!Record::from_row(&header, vec![Cell::from(""), Cell::Int(0)]).is_blank());
    }

    #[test]
    fn text_cells_holding_numbers_read_as_int() {
        assert_eq!(Cell::from(" 25000").as_int(), Some(25_000));
        assert_eq!(Cell::from("Rp25.000").as_int(), None);
        assert_eq!(Cell::Int(-3).as_int(), Some(-3));
    }
}
