//! Monthly ledger partitions.
//!
//! Every calendar month gets its own worksheet named after its
//! [`PartitionKey`], created on first use with the [`LEDGER_HEADER`] row.
use std::{fmt, sync::Arc};

use async_trait::async_trait;
use chrono::{Datelike, NaiveDateTime};

use crate::{
    StoreError, Transaction,
    workbook::{Cell, Record, SheetSize, Workbook, Worksheet},
};

pub const LEDGER_HEADER: [&str; 4] = ["Date", "Category", "Description", "Amount"];

/// Format of the `Date` column.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

const LEDGER_SIZE: SheetSize = SheetSize { rows: 500, cols: 4 };

/// Identifies the partition of a calendar month, displayed as `2024-03`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionKey {
    pub year: i32,
    pub month: u32,
}

impl PartitionKey {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// Partition of the month `timestamp` falls in.
    pub fn of(timestamp: NaiveDateTime) -> Self {
        Self::new(timestamp.year(), timestamp.month())
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// Handle to a resolved partition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition {
    pub key: PartitionKey,
    pub worksheet: Worksheet,
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Returns the partition of `year`/`month`, creating it when missing.
    /// Never creates a second partition for the same key.
    async fn resolve_partition(&self, year: i32, month: u32) -> Result<Partition, StoreError>;

    /// Appends one transaction row, in header order.
    async fn append(&self, partition: &Partition, tx: &Transaction) -> Result<(), StoreError>;

    /// Every transaction of the partition, oldest first.
    async fn transactions(&self, partition: &Partition) -> Result<Vec<Transaction>, StoreError>;
}

/// [`LedgerStore`] keeping one worksheet per month in a [`Workbook`].
#[derive(Clone)]
pub struct SheetLedgerStore {
    workbook: Arc<dyn Workbook>,
}

impl SheetLedgerStore {
    pub fn new(workbook: Arc<dyn Workbook>) -> Self {
        Self { workbook }
    }
}

fn to_row(tx: &Transaction) -> Vec<Cell> {
    vec![
        Cell::Text(tx.timestamp.format(DATE_FORMAT).to_string()),
        Cell::Text(tx.category.clone()),
        Cell::Text(tx.description.clone()),
        Cell::Int(tx.amount),
    ]
}

fn from_record(key: PartitionKey, index: usize, record: &Record) -> Result<Transaction, StoreError> {
    // Data rows start right below the header.
    let row = index + 2;
    let malformed = |column: &str| StoreError::ReadFailed(format!("{key} row {row}: invalid {column}"));

    let date = record.get("Date").map(Cell::as_text).ok_or_else(|| malformed("Date"))?;
    let timestamp = NaiveDateTime::parse_from_str(&date, DATE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(&date, "%Y-%m-%d %H:%M:%S"))
        .map_err(|_| malformed("Date"))?;
    let amount = record
        .get("Amount")
        .and_then(Cell::as_int)
        .ok_or_else(|| malformed("Amount"))?;

    Ok(Transaction {
        timestamp,
        category: record.get("Category").map(Cell::as_text).unwrap_or_default(),
        description: record
            .get("Description")
            .map(Cell::as_text)
            .unwrap_or_default(),
        amount,
    })
}

#[async_trait]
impl LedgerStore for SheetLedgerStore {
    async fn resolve_partition(&self, year: i32, month: u32) -> Result<Partition, StoreError> {
        let key = PartitionKey::new(year, month);
        let title = key.to_string();

        let existing = self
            .workbook
            .worksheet(&title)
            .await
            .map_err(StoreError::read)?;

        let worksheet = match existing {
            Some(worksheet) => worksheet,
            None => {
                tracing::info!(
                    "creating ledger partition \"{title}\" in \"{}\"",
                    self.workbook.name()
                );
                self.workbook
                    .add_worksheet(&title, &LEDGER_HEADER, LEDGER_SIZE)
                    .await
                    .map_err(StoreError::write)?
            }
        };

        Ok(Partition { key, worksheet })
    }

    async fn append(&self, partition: &Partition, tx: &Transaction) -> Result<(), StoreError> {
        self.workbook
            .append_row(&partition.worksheet, to_row(tx))
            .await
            .map_err(|err| {
                tracing::warn!("append to \"{}\" failed: {err}", partition.key);
                StoreError::write(err)
            })
    }

    async fn transactions(&self, partition: &Partition) -> Result<Vec<Transaction>, StoreError> {
        let records = self
            .workbook
            .records(&partition.worksheet)
            .await
            .map_err(StoreError::read)?;

        records
            .iter()
            .enumerate()
            .filter(|(_, record)| !record.is_blank())
            .map(|(index, record)| from_record(partition.key, index, record))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::workbook::MemoryWorkbook;

    fn at(year: i32, month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(9, 5, 30)
            .unwrap()
    }

    #[test]
    fn partition_key_is_zero_padded() {
        assert_eq!(PartitionKey::new(2024, 3).to_string(), "2024-03");
        assert_eq!(PartitionKey::new(2024, 12).to_string(), "2024-12");
        assert_eq!(PartitionKey::of(at(2025, 1, 31)).to_string(), "2025-01");
    }

    #[tokio::test]
    async fn resolve_is_idempotent() {
        let book = MemoryWorkbook::new("Test");
        let store = SheetLedgerStore::new(Arc::new(book.clone()));

        let first = store.resolve_partition(2024, 3).await.unwrap();
        let second = store.resolve_partition(2024, 3).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(book.titles().await, vec!["2024-03".to_string()]);
        assert_eq!(
            book.header("2024-03").await.unwrap(),
            LEDGER_HEADER.map(String::from).to_vec()
        );
    }

    #[tokio::test]
    async fn lookup_failure_is_not_treated_as_missing() {
        let book = MemoryWorkbook::new("Test");
        book.fail_lookups(true).await;
        let store = SheetLedgerStore::new(Arc::new(book.clone()));

        let err = store.resolve_partition(2024, 3).await.unwrap_err();
        assert!(matches!(err, StoreError::ReadFailed(_)));
        assert!(book.titles().await.is_empty());
    }

    #[tokio::test]
    async fn rows_are_written_in_header_order() {
        let book = MemoryWorkbook::new("Test");
        let store = SheetLedgerStore::new(Arc::new(book.clone()));
        let partition = store.resolve_partition(2024, 3).await.unwrap();
        let tx = Transaction::parse(&["Food", "Soto", "25000"], at(2024, 3, 15)).unwrap();

        store.append(&partition, &tx).await.unwrap();

        assert_eq!(
            book.rows("2024-03").await.unwrap(),
            vec![vec![
                Cell::from("2024-03-15 09:05"),
                Cell::from("Food"),
                Cell::from("Soto"),
                Cell::Int(25_000),
            ]]
        );
        let read = store.transactions(&partition).await.unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].category, "Food");
        assert_eq!(read[0].amount, 25_000);
    }

    #[tokio::test]
    async fn blank_rows_are_skipped_on_read() {
        let book = MemoryWorkbook::new("Test");
        let store = SheetLedgerStore::new(Arc::new(book.clone()));
        let partition = store.resolve_partition(2024, 3).await.unwrap();
        book.append_row(&partition.worksheet, Vec::new())
            .await
            .unwrap();
        book.append_row(
            &partition.worksheet,
            vec![Cell::from(""), Cell::from(" "), Cell::from(""), Cell::from("")],
        )
        .await
        .unwrap();
        let tx = Transaction::parse(&["Food", "10"], at(2024, 3, 15)).unwrap();
        store.append(&partition, &tx).await.unwrap();
        let read = store.transactions(&partition).await.unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].amount, 10);

        book.append_row(
            &partition.worksheet,
            vec![Cell::from("2024-03-16 10:00"), Cell::from("Food")],
        )
        .await
        .unwrap();

        let err = store.transactions(&partition).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::ReadFailed("2024-03 row 5: invalid Amount".to_string())
        );
    }

    #[tokio::test]
    async fn malformed_amount_names_the_row() {
        let book = MemoryWorkbook::new("Test");
        let store = SheetLedgerStore::new(Arc::new(book.clone()));
        let partition = store.resolve_partition(2024, 3).await.unwrap();
        book.append_row(
            &partition.worksheet,
            vec![
                Cell::from("2024-03-15 09:05"),
                Cell::from("Food"),
                Cell::from(""),
                Cell::from("lots"),
            ],
        )
        .await
        .unwrap();

        let err = store.transactions(&partition).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::ReadFailed("2024-03 row 2: invalid Amount".to_string())
        );
    }
}
