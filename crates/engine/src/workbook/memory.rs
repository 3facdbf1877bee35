use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{BackendError, Cell, Record, SheetSize, Workbook, Worksheet};

#[derive(Debug)]
struct Sheet {
    worksheet: Worksheet,
    header: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Default)]
struct Faults {
    next_append: bool,
    next_update: bool,
    reads: bool,
    lookups: bool,
}

#[derive(Debug, Default)]
struct State {
    sheets: Vec<Sheet>,
    faults: Faults,
}

impl State {
    fn sheet_mut(&mut self, sheet: &Worksheet) -> Result<&mut Sheet, BackendError> {
        self.sheets
            .iter_mut()
            .find(|s| s.worksheet.id == sheet.id)
            .ok_or_else(|| BackendError::NotFound(sheet.title.clone()))
    }
}

/// Process-local workbook. Cloning shares the same sheets.
///
/// Besides backing the `memory` storage setting it lets tests inject
/// backend failures.
#[derive(Clone, Debug)]
pub struct MemoryWorkbook {
    name: String,
    inner: Arc<Mutex<State>>,
}

impl MemoryWorkbook {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inner: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Titles of every worksheet, in creation order.
    pub async fn titles(&self) -> Vec<String> {
        let guard = self.inner.lock().await;
        guard
            .sheets
            .iter()
            .map(|s| s.worksheet.title.clone())
            .collect()
    }

    /// Raw data rows of a worksheet (header excluded).
    pub async fn rows(&self, title: &str) -> Option<Vec<Vec<Cell>>> {
        let guard = self.inner.lock().await;
        guard
            .sheets
            .iter()
            .find(|s| s.worksheet.title == title)
            .map(|s| s.rows.clone())
    }

    /// Header of a worksheet.
    pub async fn header(&self, title: &str) -> Option<Vec<String>> {
        let guard = self.inner.lock().await;
        guard
            .sheets
            .iter()
            .find(|s| s.worksheet.title == title)
            .map(|s| s.header.clone())
    }

    /// The next `append_row` call fails.
    pub async fn fail_next_append(&self) {
        self.inner.lock().await.faults.next_append = true;
    }

    /// The next `update_cell` call fails.
    pub async fn fail_next_update(&self) {
        self.inner.lock().await.faults.next_update = true;
    }

    /// Every `records` call fails while set.
    pub async fn fail_reads(&self, fail: bool) {
        self.inner.lock().await.faults.reads = fail;
    }

    /// Every `worksheet` lookup fails while set.
    pub async fn fail_lookups(&self, fail: bool) {
        self.inner.lock().await.faults.lookups = fail;
    }
}

#[async_trait]
impl Workbook for MemoryWorkbook {
    fn name(&self) -> &str {
        &self.name
    }

    async fn worksheet(&self, title: &str) -> Result<Option<Worksheet>, BackendError> {
        let guard = self.inner.lock().await;
        if guard.faults.lookups {
            return Err(BackendError::Request("lookup unavailable".to_string()));
        }
        Ok(guard
            .sheets
            .iter()
            .find(|s| s.worksheet.title == title)
            .map(|s| s.worksheet.clone()))
    }

    async fn add_worksheet(
        &self,
        title: &str,
        header: &[&str],
        _size: SheetSize,
    ) -> Result<Worksheet, BackendError> {
        let mut guard = self.inner.lock().await;
        if guard.sheets.iter().any(|s| s.worksheet.title == title) {
            return Err(BackendError::Request(format!(
                "a sheet named \"{title}\" already exists"
            )));
        }

        let worksheet = Worksheet {
            id: guard.sheets.len() as i64,
            title: title.to_string(),
        };
        guard.sheets.push(Sheet {
            worksheet: worksheet.clone(),
            header: header.iter().map(ToString::to_string).collect(),
            rows: Vec::new(),
        });
        Ok(worksheet)
    }

    async fn append_row(&self, sheet: &Worksheet, row: Vec<Cell>) -> Result<(), BackendError> {
        let mut guard = self.inner.lock().await;
        if std::mem::take(&mut guard.faults.next_append) {
            return Err(BackendError::Request("append rejected".to_string()));
        }
        guard.sheet_mut(sheet)?.rows.push(row);
        Ok(())
    }

    async fn records(&self, sheet: &Worksheet) -> Result<Vec<Record>, BackendError> {
        let mut guard = self.inner.lock().await;
        if guard.faults.reads {
            return Err(BackendError::Request("read rejected".to_string()));
        }
        let sheet = guard.sheet_mut(sheet)?;
        Ok(sheet
            .rows
            .iter()
            .map(|row| Record::from_row(&sheet.header, row.clone()))
            .collect())
    }

    async fn update_cell(
        &self,
        sheet: &Worksheet,
        row: usize,
        col: usize,
        value: Cell,
    ) -> Result<(), BackendError> {
        let mut guard = self.inner.lock().await;
        if std::mem::take(&mut guard.faults.next_update) {
            return Err(BackendError::Request("update rejected".to_string()));
        }
        let sheet = guard.sheet_mut(sheet)?;
        // Row 1 is the header.
        if row < 2 || col == 0 {
            return Err(BackendError::Malformed(format!(
                "cell ({row}, {col}) is outside the data rows"
            )));
        }
        let title = sheet.worksheet.title.clone();
        let cells = sheet
            .rows
            .get_mut(row - 2)
            .ok_or_else(|| BackendError::NotFound(format!("{title} row {row}")))?;
        if cells.len() < col {
            cells.resize(col, Cell::Text(String::new()));
        }
        cells[col - 1] = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: SheetSize = SheetSize { rows: 10, cols: 3 };

    #[tokio::test]
    async fn update_cell_touches_only_the_target() {
        let book = MemoryWorkbook::new("Test");
        let sheet = book.add_worksheet("S", &["A", "B"], SIZE).await.unwrap();
        book.append_row(&sheet, vec![Cell::Int(1), Cell::Int(2)])
            .await
            .unwrap();
        book.append_row(&sheet, vec![Cell::Int(3), Cell::Int(4)])
            .await
            .unwrap();

        book.update_cell(&sheet, 3, 2, Cell::Int(40)).await.unwrap();

        let rows = book.rows("S").await.unwrap();
        assert_eq!(rows[0], vec![Cell::Int(1), Cell::Int(2)]);
        assert_eq!(rows[1], vec![Cell::Int(3), Cell::Int(40)]);
    }

    #[tokio::test]
    async fn header_row_cannot_be_updated() {
        let book = MemoryWorkbook::new("Test");
        let sheet = book.add_worksheet("S", &["A"], SIZE).await.unwrap();
        let err = book.update_cell(&sheet, 1, 1, Cell::Int(0)).await.unwrap_err();
        assert!(matches!(err, BackendError::Malformed(_)));
    }

    #[tokio::test]
    async fn duplicate_titles_are_rejected() {
        let book = MemoryWorkbook::new("Test");
        book.add_worksheet("S", &["A"], SIZE).await.unwrap();
        assert!(book.add_worksheet("S", &["A"], SIZE).await.is_err());
        assert_eq!(book.titles().await, vec!["S".to_string()]);
    }

    #[tokio::test]
    async fn injected_append_failure_is_one_shot() {
        let book = MemoryWorkbook::new("Test");
        let sheet = book.add_worksheet("S", &["A"], SIZE).await.unwrap();
        book.fail_next_append().await;
        assert!(book.append_row(&sheet, vec![Cell::Int(1)]).await.is_err());
        assert!(book.append_row(&sheet, vec![Cell::Int(1)]).await.is_ok());
        assert_eq!(book.rows("S").await.unwrap().len(), 1);
    }
}
