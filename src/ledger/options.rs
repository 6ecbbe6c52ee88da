use crate::model::StoreError;
use crate::storage::{SheetTable, Worksheet};
use std::sync::Arc;
use tracing::{info, warn};

/// Free-form option sheet edited as a whole and saved back in one go.
pub struct OptionSheet {
    sheet: Arc<dyn Worksheet>,
}

impl OptionSheet {
    pub fn new(sheet: Arc<dyn Worksheet>) -> Self {
        Self { sheet }
    }

    pub async fn load(&self) -> Result<SheetTable, StoreError> {
        self.sheet.read_all().await
    }

    /// Clears the sheet and writes `table` back, header first. Returns how many
    /// data rows the store persisted.
    pub async fn save(&self, table: &SheetTable) -> Result<usize, StoreError> {
        self.sheet.clear().await?;
        if table.header.is_empty() {
            return Ok(0);
        }
        let mut rows = Vec::with_capacity(table.rows.len() + 1);
        rows.push(table.header.clone());
        rows.extend(table.rows.iter().cloned());

        let persisted = self.sheet.append_rows(&rows).await?.saturating_sub(1);
        if persisted < table.rows.len() {
            warn!(
                "Option sheet '{}' saved {} of {} rows",
                self.sheet.name(),
                persisted,
                table.rows.len()
            );
        } else {
            info!("Option sheet '{}' saved ({} rows)", self.sheet.name(), persisted);
        }
        Ok(persisted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::StoreOp;
    use crate::storage::{MemoryStore, SheetStore};

    fn table(header: &[&str], rows: &[&[&str]]) -> SheetTable {
        SheetTable::new(
            header.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    #[tokio::test]
    async fn save_replaces_the_whole_sheet() {
        let store = MemoryStore::new().with_sheet(
            "options",
            &["option", "price"],
            &[&["gift wrap", "2000"], &["engraving", "5000"], &["rush", "3000"]],
        );
        let options = OptionSheet::new(store.open("options").await.unwrap());
        let mut edited = options.load().await.unwrap();
        edited.rows.remove(1);
        edited.header.push("active".into());
        for row in &mut edited.rows {
            row.push("yes".into());
        }

        assert_eq!(options.save(&edited).await.unwrap(), 2);
        let saved = store.snapshot("options");
        assert_eq!(saved.header, vec!["option", "price", "active"]);
        assert_eq!(saved.rows, vec![vec!["gift wrap", "2000", "yes"], vec!["rush", "3000", "yes"]]);

        let ops = store.operations();
        let clear = ops.iter().position(|op| matches!(op, StoreOp::Clear(_))).unwrap();
        let append = ops.iter().position(|op| matches!(op, StoreOp::Append { .. })).unwrap();
        assert!(clear < append);
    }

    #[tokio::test]
    async fn saving_an_empty_table_leaves_the_sheet_empty() {
        let store = MemoryStore::new().with_sheet("options", &["option"], &[&["gift wrap"]]);
        let options = OptionSheet::new(store.open("options").await.unwrap());
        assert_eq!(options.save(&table(&[], &[])).await.unwrap(), 0);
        assert!(store.snapshot("options").is_empty());
    }
}
