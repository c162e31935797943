use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::StoreError;
use crate::range::{CellRef, ColumnRange};

/// Rows returned for one range; each row holds the non-empty cells of that row
pub type RangeValues = Vec<Vec<String>>;

/// Operations the service needs from the remote spreadsheet
///
/// Every method is one remote round trip. Worksheets are addressed by title
/// inside the single spreadsheet the store was opened on.
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Titles of all worksheets, in spreadsheet order
    async fn worksheet_titles(&self) -> Result<Vec<String>, StoreError>;

    /// Every value of a column, header included; empty cells come back as `""`
    /// and trailing empty cells are omitted
    async fn column_values(&self, sheet: &str, column: u16) -> Result<Vec<String>, StoreError>;

    /// One cell, `None` when empty
    async fn cell_value(&self, sheet: &str, cell: CellRef) -> Result<Option<String>, StoreError>;

    /// Several ranges of one worksheet in a single read
    ///
    /// The result has one entry per requested range. Trailing empty rows of a
    /// range are omitted, empty rows inside it are empty vectors.
    async fn batch_get(
        &self,
        sheet: &str,
        ranges: &[ColumnRange],
    ) -> Result<Vec<RangeValues>, StoreError>;

    async fn update_cell(&self, sheet: &str, cell: CellRef, value: &str) -> Result<(), StoreError>;

    /// Append a row after the last non-empty row of a worksheet
    async fn append_row(&self, sheet: &str, row: Vec<String>) -> Result<(), StoreError>;
}

/// In-process spreadsheet with the same answer shapes as the remote service
///
/// Counts every call so callers can check that no remote access happened.
#[derive(Default)]
pub struct MemoryStore {
    sheets: Mutex<Vec<(String, Vec<Vec<String>>)>>,
    failure: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a worksheet from rows of cell values (row 1 first)
    pub fn with_sheet<I, R, S>(self, title: &str, rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let grid = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        self.lock_sheets().push((title.to_string(), grid));
        self
    }

    /// Add an empty worksheet
    pub fn with_empty_sheet(self, title: &str) -> Self {
        self.with_sheet(title, Vec::<Vec<String>>::new())
    }

    /// Make every following call fail with a connectivity error
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = Some(message.to_string());
    }

    /// Number of store operations performed so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Write a cell without counting it as a remote call
    pub fn set_cell(&self, sheet: &str, cell: CellRef, value: &str) {
        let mut sheets = self.lock_sheets();
        if let Some((_, grid)) = sheets.iter_mut().find(|(t, _)| t == sheet) {
            write_cell(grid, cell, value);
        }
    }

    /// Read a cell without counting it as a remote call
    pub fn peek(&self, sheet: &str, cell: CellRef) -> Option<String> {
        let sheets = self.lock_sheets();
        let (_, grid) = sheets.iter().find(|(t, _)| t == sheet)?;
        read_cell(grid, cell)
    }

    /// All rows of a worksheet without counting it as a remote call
    pub fn rows(&self, sheet: &str) -> Option<Vec<Vec<String>>> {
        let sheets = self.lock_sheets();
        sheets
            .iter()
            .find(|(t, _)| t == sheet)
            .map(|(_, grid)| grid.clone())
    }

    fn lock_sheets(&self) -> std::sync::MutexGuard<'_, Vec<(String, Vec<Vec<String>>)>> {
        self.sheets.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin_call(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failure.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            Some(message) => Err(StoreError::Connectivity(message.clone())),
            None => Ok(()),
        }
    }

    fn with_grid<T>(
        &self,
        sheet: &str,
        f: impl FnOnce(&mut Vec<Vec<String>>) -> T,
    ) -> Result<T, StoreError> {
        let mut sheets = self.lock_sheets();
        sheets
            .iter_mut()
            .find(|(t, _)| t == sheet)
            .map(|(_, grid)| f(grid))
            .ok_or_else(|| StoreError::NotFound(format!("worksheet '{}'", sheet)))
    }
}

fn read_cell(grid: &[Vec<String>], cell: CellRef) -> Option<String> {
    let r = (cell.row as usize).checked_sub(1)?;
    let c = (cell.column as usize).checked_sub(1)?;
    grid.get(r)
        .and_then(|row| row.get(c))
        .filter(|v| !v.is_empty())
        .cloned()
}

fn write_cell(grid: &mut Vec<Vec<String>>, cell: CellRef, value: &str) {
    let r = (cell.row as usize).saturating_sub(1);
    let c = (cell.column as usize).saturating_sub(1);
    if grid.len() <= r {
        grid.resize(r + 1, Vec::new());
    }
    let row = &mut grid[r];
    if row.len() <= c {
        row.resize(c + 1, String::new());
    }
    row[c] = value.to_string();
}

fn trim_trailing_empty<T>(mut items: Vec<T>, is_empty: impl Fn(&T) -> bool) -> Vec<T> {
    while items.last().is_some_and(&is_empty) {
        items.pop();
    }
    items
}

#[async_trait]
impl SheetStore for MemoryStore {
    async fn worksheet_titles(&self) -> Result<Vec<String>, StoreError> {
        self.begin_call()?;
        Ok(self.lock_sheets().iter().map(|(t, _)| t.clone()).collect())
    }

    async fn column_values(&self, sheet: &str, column: u16) -> Result<Vec<String>, StoreError> {
        self.begin_call()?;
        self.with_grid(sheet, |grid| {
            let values: Vec<String> = grid
                .iter()
                .map(|row| {
                    row.get((column as usize).saturating_sub(1))
                        .cloned()
                        .unwrap_or_default()
                })
                .collect();
            trim_trailing_empty(values, |v: &String| v.is_empty())
        })
    }

    async fn cell_value(&self, sheet: &str, cell: CellRef) -> Result<Option<String>, StoreError> {
        self.begin_call()?;
        self.with_grid(sheet, |grid| read_cell(grid, cell))
    }

    async fn batch_get(
        &self,
        sheet: &str,
        ranges: &[ColumnRange],
    ) -> Result<Vec<RangeValues>, StoreError> {
        self.begin_call()?;
        self.with_grid(sheet, |grid| {
            let grid: &Vec<Vec<String>> = grid;
            ranges
                .iter()
                .map(|range| {
                    let rows: RangeValues = (range.row_start..=range.row_end)
                        .map(|row| {
                            read_cell(grid, CellRef::new(range.column, row))
                                .into_iter()
                                .collect::<Vec<_>>()
                        })
                        .collect();
                    trim_trailing_empty(rows, |r: &Vec<String>| r.is_empty())
                })
                .collect()
        })
    }

    async fn update_cell(&self, sheet: &str, cell: CellRef, value: &str) -> Result<(), StoreError> {
        self.begin_call()?;
        self.with_grid(sheet, |grid| write_cell(grid, cell, value))
    }

    async fn append_row(&self, sheet: &str, row: Vec<String>) -> Result<(), StoreError> {
        self.begin_call()?;
        self.with_grid(sheet, |grid| {
            while grid
                .last()
                .is_some_and(|r| r.iter().all(|v| v.is_empty()))
            {
                grid.pop();
            }
            grid.push(row);
        })
    }
}
