use super::{find_in_rows, set_cell, CellRef, SheetStore, SheetTable, Worksheet};
use crate::model::StoreError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Failure injection for the in-memory store.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// Every operation fails as if the store were offline.
    pub unreachable: bool,
    /// Appends persist at most this many rows and report the shortfall.
    pub append_limit: Option<usize>,
    /// Cell updates start failing once this many have succeeded.
    pub fail_updates_after: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Read(String),
    Append { sheet: String, rows: usize },
    Update { sheet: String, row: usize, col: usize },
    Find(String),
    Clear(String),
}

#[derive(Default)]
struct Inner {
    sheets: HashMap<String, SheetTable>,
    faults: Faults,
    log: Vec<StoreOp>,
    updates_done: usize,
}

/// Process-local sheet store. Clones share the same sheets.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a sheet with a header and data rows.
    pub fn with_sheet(self, name: &str, header: &[&str], rows: &[&[&str]]) -> Self {
        let table = SheetTable::new(
            header.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        );
        if let Ok(mut inner) = self.inner.lock() {
            inner.sheets.insert(name.to_string(), table);
        }
        self
    }

    pub fn set_faults(&self, faults: Faults) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.faults = faults;
        }
    }

    pub fn snapshot(&self, name: &str) -> SheetTable {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.sheets.get(name).cloned())
            .unwrap_or_default()
    }

    /// Every operation performed so far, in order.
    pub fn operations(&self) -> Vec<StoreOp> {
        self.inner
            .lock()
            .map(|inner| inner.log.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| StoreError::Unreachable("memory store poisoned".into()))?;
        if inner.faults.unreachable {
            return Err(StoreError::Unreachable("store offline".into()));
        }
        Ok(inner)
    }
}

#[async_trait::async_trait]
impl SheetStore for MemoryStore {
    async fn open(&self, sheet_name: &str) -> Result<Arc<dyn Worksheet>, StoreError> {
        let mut inner = self.lock()?;
        inner.sheets.entry(sheet_name.to_string()).or_default();
        Ok(Arc::new(MemorySheet {
            name: sheet_name.to_string(),
            store: self.clone(),
        }))
    }
}

pub struct MemorySheet {
    name: String,
    store: MemoryStore,
}

#[async_trait::async_trait]
impl Worksheet for MemorySheet {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_all(&self) -> Result<SheetTable, StoreError> {
        let mut inner = self.store.lock()?;
        inner.log.push(StoreOp::Read(self.name.clone()));
        Ok(inner.sheets.get(&self.name).cloned().unwrap_or_default())
    }

    async fn append_rows(&self, rows: &[Vec<String>]) -> Result<usize, StoreError> {
        let mut inner = self.store.lock()?;
        let persisted = inner
            .faults
            .append_limit
            .map_or(rows.len(), |limit| limit.min(rows.len()));
        inner.log.push(StoreOp::Append {
            sheet: self.name.clone(),
            rows: persisted,
        });
        let table = inner.sheets.entry(self.name.clone()).or_default();
        for row in &rows[..persisted] {
            if table.header.is_empty() && table.rows.is_empty() {
                table.header = row.clone();
            } else {
                table.rows.push(row.clone());
            }
        }
        Ok(persisted)
    }

    async fn update_cell(&self, row: usize, col: usize, value: &str) -> Result<(), StoreError> {
        let mut inner = self.store.lock()?;
        if let Some(limit) = inner.faults.fail_updates_after {
            if inner.updates_done >= limit {
                return Err(StoreError::Unreachable("update rejected".into()));
            }
        }
        let table = inner.sheets.entry(self.name.clone()).or_default();
        let cells = match row {
            0 => None,
            1 => Some(&mut table.header),
            n => table.rows.get_mut(n - 2),
        };
        let Some(cells) = cells.filter(|_| col > 0) else {
            return Err(StoreError::OutOfRange {
                sheet: self.name.clone(),
                row,
                col,
            });
        };
        set_cell(cells, col, value);
        inner.updates_done += 1;
        inner.log.push(StoreOp::Update {
            sheet: self.name.clone(),
            row,
            col,
        });
        Ok(())
    }

    async fn find(&self, value: &str) -> Result<Option<CellRef>, StoreError> {
        let mut inner = self.store.lock()?;
        inner.log.push(StoreOp::Find(self.name.clone()));
        let Some(table) = inner.sheets.get(&self.name) else {
            return Ok(None);
        };
        Ok(find_in_rows(
            std::iter::once(&table.header).chain(table.rows.iter()),
            value,
        ))
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut inner = self.store.lock()?;
        inner.log.push(StoreOp::Clear(self.name.clone()));
        inner.sheets.insert(self.name.clone(), SheetTable::default());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn first_append_on_empty_sheet_becomes_header() {
        let store = MemoryStore::new();
        let sheet = store.open("orders").await.unwrap();
        let n = sheet
            .append_rows(&[row(&["product", "quantity"]), row(&["mug", "2"])])
            .await
            .unwrap();
        assert_eq!(n, 2);
        let table = sheet.read_all().await.unwrap();
        assert_eq!(table.header, row(&["product", "quantity"]));
        assert_eq!(table.rows, vec![row(&["mug", "2"])]);
    }

    #[tokio::test]
    async fn update_and_find_use_sheet_coordinates() {
        let store = MemoryStore::new().with_sheet("stock", &["product", "current_stock"], &[&["mug", "4"]]);
        let sheet = store.open("stock").await.unwrap();
        sheet.update_cell(2, 2, "1").await.unwrap();
        assert_eq!(store.snapshot("stock").rows[0], row(&["mug", "1"]));
        assert_eq!(sheet.find("mug").await.unwrap(), Some(CellRef { row: 2, col: 1 }));
        assert_eq!(sheet.find("product").await.unwrap(), Some(CellRef { row: 1, col: 1 }));
        assert_eq!(sheet.find("plate").await.unwrap(), None);
        assert!(matches!(
            sheet.update_cell(5, 1, "x").await,
            Err(StoreError::OutOfRange { row: 5, .. })
        ));
    }

    #[tokio::test]
    async fn faults_limit_appends_and_updates() {
        let store = MemoryStore::new().with_sheet("stock", &["product", "current_stock"], &[&["mug", "4"]]);
        store.set_faults(Faults {
            append_limit: Some(1),
            fail_updates_after: Some(1),
            ..Faults::default()
        });
        let sheet = store.open("stock").await.unwrap();
        let n = sheet.append_rows(&[row(&["a"]), row(&["b"])]).await.unwrap();
        assert_eq!(n, 1);
        sheet.update_cell(2, 2, "3").await.unwrap();
        assert!(sheet.update_cell(2, 2, "2").await.is_err());

        store.set_faults(Faults {
            unreachable: true,
            ..Faults::default()
        });
        assert!(matches!(sheet.read_all().await, Err(StoreError::Unreachable(_))));
    }

    #[tokio::test]
    async fn clear_empties_the_sheet() {
        let store = MemoryStore::new().with_sheet("options", &["name"], &[&["red"]]);
        let sheet = store.open("options").await.unwrap();
        sheet.clear().await.unwrap();
        assert!(sheet.read_all().await.unwrap().is_empty());
        assert_eq!(store.operations().last(), Some(&StoreOp::Read("options".into())));
    }
}
