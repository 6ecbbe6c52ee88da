//! Spreadsheet-shaped persistence.
//!
//! A store hands out worksheets by name. Row 1 of a worksheet is its header;
//! rows and columns are addressed 1-based, the way spreadsheet cells are.
//! There is no transaction or locking primitive: two writers updating the
//! same cell race and the last write wins.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::model::StoreError;
use std::sync::Arc;

/// Header plus data rows as read from a worksheet. Rows may be shorter than
/// the header; missing cells read as empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SheetTable {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.rows.is_empty()
    }

    /// 1-based sheet row of the data row at `index`.
    pub fn sheet_row(index: usize) -> usize {
        index + 2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

#[async_trait::async_trait]
pub trait SheetStore: Send + Sync {
    /// Opens the named worksheet, creating an empty one on first use.
    async fn open(&self, sheet_name: &str) -> Result<Arc<dyn Worksheet>, StoreError>;
}

#[async_trait::async_trait]
pub trait Worksheet: Send + Sync {
    fn name(&self) -> &str;

    async fn read_all(&self) -> Result<SheetTable, StoreError>;

    /// Appends rows after the last one; on an empty sheet the first row
    /// becomes the header. Returns how many rows were persisted.
    async fn append_rows(&self, rows: &[Vec<String>]) -> Result<usize, StoreError>;

    async fn update_cell(&self, row: usize, col: usize, value: &str) -> Result<(), StoreError>;

    /// First cell, scanning row by row, whose value equals `value`.
    async fn find(&self, value: &str) -> Result<Option<CellRef>, StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;
}

/// Sets `cells[col - 1]`, padding the row with empty cells as needed.
pub(crate) fn set_cell(cells: &mut Vec<String>, col: usize, value: &str) {
    if cells.len() < col {
        cells.resize(col, String::new());
    }
    cells[col - 1] = value.to_string();
}

pub(crate) fn find_in_rows<'a, I>(rows: I, value: &str) -> Option<CellRef>
where
    I: IntoIterator<Item = &'a Vec<String>>,
{
    for (r, cells) in rows.into_iter().enumerate() {
        if let Some(c) = cells.iter().position(|cell| cell == value) {
            return Some(CellRef { row: r + 1, col: c + 1 });
        }
    }
    None
}
