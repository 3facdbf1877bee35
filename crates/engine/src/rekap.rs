//! Running totals per (year, month).
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    StoreError,
    workbook::{Cell, Record, SheetSize, Workbook, Worksheet},
};

pub const REKAP_TITLE: &str = "Rekap";
pub const REKAP_HEADER: [&str; 3] = ["Year", "Month", "TotalExpense"];

const REKAP_SIZE: SheetSize = SheetSize { rows: 100, cols: 3 };
/// 1-based column of `TotalExpense`.
const TOTAL_COLUMN: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RekapRow {
    pub year: i32,
    pub month: u32,
    pub total_amount: i64,
}

#[async_trait]
pub trait RekapStore: Send + Sync {
    /// Adds `delta` to the row of `year`/`month`, inserting the row when
    /// missing. At most one row exists per (year, month).
    async fn increment_or_insert(
        &self,
        year: i32,
        month: u32,
        delta: i64,
    ) -> Result<RekapRow, StoreError>;

    async fn row(&self, year: i32, month: u32) -> Result<Option<RekapRow>, StoreError>;

    /// Rows of `year`, in table order.
    async fn year_rows(&self, year: i32) -> Result<Vec<RekapRow>, StoreError>;
}

/// [`RekapStore`] kept in a single worksheet of a [`Workbook`].
#[derive(Clone)]
pub struct SheetRekapStore {
    workbook: Arc<dyn Workbook>,
}

impl SheetRekapStore {
    pub fn new(workbook: Arc<dyn Workbook>) -> Self {
        Self { workbook }
    }

    async fn table(&self) -> Result<Worksheet, StoreError> {
        let existing = self
            .workbook
            .worksheet(REKAP_TITLE)
            .await
            .map_err(StoreError::read)?;

        match existing {
            Some(worksheet) => Ok(worksheet),
            None => {
                tracing::info!("creating rekap table in \"{}\"", self.workbook.name());
                self.workbook
                    .add_worksheet(REKAP_TITLE, &REKAP_HEADER, REKAP_SIZE)
                    .await
                    .map_err(StoreError::write)
            }
        }
    }

    /// Rekap rows paired with their sheet row number. Blank rows are skipped.
    async fn load(&self) -> Result<(Worksheet, Vec<(usize, RekapRow)>), StoreError> {
        let table = self.table().await?;
        let records = self
            .workbook
            .records(&table)
            .await
            .map_err(StoreError::read)?;
        let rows = records
            .iter()
            .enumerate()
            .filter(|(_, record)| !record.is_blank())
            .map(|(index, record)| {
                // Data rows start right below the header.
                let row = index + 2;
                from_record(row, record).map(|rekap| (row, rekap))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok((table, rows))
    }
}

fn from_record(row: usize, record: &Record) -> Result<RekapRow, StoreError> {
    let int = |column: &str| {
        record.get(column).and_then(Cell::as_int).ok_or_else(|| {
            StoreError::ReadFailed(format!("{REKAP_TITLE} row {row}: invalid {column}"))
        })
    };
    let year = int("Year")?;
    let month = int("Month")?;

    Ok(RekapRow {
        year: i32::try_from(year)
            .map_err(|_| StoreError::ReadFailed(format!("year {year} out of range")))?,
        month: u32::try_from(month)
            .map_err(|_| StoreError::ReadFailed(format!("month {month} out of range")))?,
        total_amount: int("TotalExpense")?,
    })
}

#[async_trait]
impl RekapStore for SheetRekapStore {
    async fn increment_or_insert(
        &self,
        year: i32,
        month: u32,
        delta: i64,
    ) -> Result<RekapRow, StoreError> {
        let (table, rows) = self.load().await?;

        match rows
            .iter()
            .find(|(_, row)| row.year == year && row.month == month)
        {
            Some(&(row, current)) => {
                let total_amount = current.total_amount.checked_add(delta).ok_or_else(|| {
                    StoreError::WriteFailed(format!("{year}-{month:02} total overflows"))
                })?;
                self.workbook
                    .update_cell(&table, row, TOTAL_COLUMN, Cell::Int(total_amount))
                    .await
                    .map_err(StoreError::write)?;
                tracing::debug!("rekap {year}-{month:02}: {} -> {total_amount}", current.total_amount);
                Ok(RekapRow {
                    total_amount,
                    ..current
                })
            }
            None => {
                self.workbook
                    .append_row(
                        &table,
                        vec![Cell::from(year), Cell::from(month), Cell::Int(delta)],
                    )
                    .await
                    .map_err(StoreError::write)?;
                tracing::debug!("rekap {year}-{month:02}: inserted with {delta}");
                Ok(RekapRow {
                    year,
                    month,
                    total_amount: delta,
                })
            }
        }
    }

    async fn row(&self, year: i32, month: u32) -> Result<Option<RekapRow>, StoreError> {
        let (_, rows) = self.load().await?;
        Ok(rows
            .into_iter()
            .map(|(_, row)| row)
            .find(|row| row.year == year && row.month == month))
    }

    async fn year_rows(&self, year: i32) -> Result<Vec<RekapRow>, StoreError> {
        let (_, rows) = self.load().await?;
        Ok(rows
            .into_iter()
            .map(|(_, row)| row)
            .filter(|row| row.year == year)
            .collect())
    }
}
