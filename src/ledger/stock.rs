use crate::model::{columns, CanonicalProduct, DecrementOutcome, StoreError};
use crate::normalizer::{NormalizedTable, Normalizer};
use crate::storage::{SheetTable, Worksheet};
use crate::utils::coerce_int;
use std::sync::Arc;
use tracing::{info, warn};

/// Current and safety quantities per canonical product, read from and
/// written back to the stock sheet. Every call re-reads the sheet; nothing
/// is cached between calls.
pub struct StockLedger {
    sheet: Arc<dyn Worksheet>,
    normalizer: Normalizer,
}

impl StockLedger {
    pub fn new(sheet: Arc<dyn Worksheet>, normalizer: Normalizer) -> Self {
        Self { sheet, normalizer }
    }

    async fn table(&self) -> Result<NormalizedTable, StoreError> {
        Ok(self.normalizer.normalize(&self.sheet.read_all().await?))
    }

    /// Products in sheet order. Rows with a blank product name are skipped.
    pub async fn products(&self) -> Result<Vec<CanonicalProduct>, StoreError> {
        let table = self.table().await?;
        Ok(table
            .rows
            .iter()
            .filter(|row| !table.cell(row, columns::PRODUCT).trim().is_empty())
            .map(|row| CanonicalProduct {
                canonical_name: table.cell(row, columns::PRODUCT).to_string(),
                keyword_group: table.cell(row, columns::KEYWORDS).to_string(),
                current_stock: coerce_int(table.cell(row, columns::CURRENT_STOCK)),
                safety_stock: coerce_int(table.cell(row, columns::SAFETY_STOCK)),
            })
            .collect())
    }

    /// Subtracts `quantity` from the first row whose trimmed name equals the
    /// trimmed `canonical_name`. Stock is allowed to go negative.
    pub async fn decrement(
        &self,
        canonical_name: &str,
        quantity: i64,
    ) -> Result<DecrementOutcome, StoreError> {
        let table = self.table().await?;
        let Some(col) = table.sheet_column(columns::CURRENT_STOCK) else {
            return Err(StoreError::MissingColumn {
                sheet: self.sheet.name().to_string(),
                column: columns::CURRENT_STOCK.to_string(),
            });
        };

        let wanted = canonical_name.trim();
        let found = table
            .rows
            .iter()
            .position(|row| table.cell(row, columns::PRODUCT).trim() == wanted);
        let Some(index) = found else {
            return Ok(DecrementOutcome::NotFound);
        };

        let before = coerce_int(table.cell(&table.rows[index], columns::CURRENT_STOCK));
        let Some(after) = before.checked_sub(quantity) else {
            warn!("Stock '{}': {} - {} overflows, left unchanged", wanted, before, quantity);
            return Ok(DecrementOutcome::Overflow { before });
        };
        self.sheet
            .update_cell(SheetTable::sheet_row(index), col, &after.to_string())
            .await?;
        info!("Stock '{}': {} -> {}", wanted, before, after);
        Ok(DecrementOutcome::Applied { before, after })
    }

    /// Products whose current stock is at or below their safety stock.
    pub async fn list_low_stock(&self) -> Result<Vec<CanonicalProduct>, StoreError> {
        Ok(self
            .products()
            .await?
            .into_iter()
            .filter(CanonicalProduct::is_low)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::storage::{MemoryStore, SheetStore};

    async fn ledger(store: &MemoryStore) -> StockLedger {
        let sheet = store.open("stock").await.unwrap();
        StockLedger::new(sheet, Normalizer::from_config(&AppConfig::default()))
    }

    fn seeded() -> MemoryStore {
        MemoryStore::new().with_sheet(
            "stock",
            &["상품명", "키워드", "현재재고", "안전재고"],
            &[
                &["Towel", "towel", "2", "1"],
                &[" Robe ", "robe", "9", "3"],
                &["Mug", "mug", "abc", ""],
            ],
        )
    }

    #[tokio::test]
    async fn products_coerce_stored_numbers() {
        let store = seeded();
        let products = ledger(&store).await.products().await.unwrap();
        assert_eq!(products.len(), 3);
        assert_eq!(products[0].current_stock, 2);
        assert_eq!(products[2].current_stock, 0);
        assert_eq!(products[2].safety_stock, 0);
    }

    #[tokio::test]
    async fn decrement_may_go_negative() {
        let store = seeded();
        let ledger = ledger(&store).await;
        let outcome = ledger.decrement("Towel", 5).await.unwrap();
        assert_eq!(outcome, DecrementOutcome::Applied { before: 2, after: -3 });
        assert_eq!(store.snapshot("stock").rows[0][2], "-3");

        let low = ledger.list_low_stock().await.unwrap();
        assert!(low.iter().any(|p| p.canonical_name == "Towel" && p.current_stock == -3));
    }

    #[tokio::test]
    async fn names_are_compared_trimmed() {
        let store = seeded();
        let ledger = ledger(&store).await;
        let outcome = ledger.decrement("Robe  ", 1).await.unwrap();
        assert_eq!(outcome, DecrementOutcome::Applied { before: 9, after: 8 });
        assert_eq!(ledger.decrement("Slippers", 1).await.unwrap(), DecrementOutcome::NotFound);
    }

    #[tokio::test]
    async fn low_stock_boundary_is_inclusive() {
        let store = MemoryStore::new().with_sheet(
            "stock",
            &["product", "keywords", "current_stock", "safety_stock"],
            &[&["AtSafety", "a", "3", "3"], &["AboveSafety", "b", "4", "3"], &["", "", "", ""]],
        );
        let low = ledger(&store).await.list_low_stock().await.unwrap();
        let names: Vec<_> = low.iter().map(|p| p.canonical_name.as_str()).collect();
        assert_eq!(names, vec!["AtSafety"]);
    }

    #[tokio::test]
    async fn overflowing_decrement_leaves_stock_alone() {
        let store = seeded();
        let ledger = ledger(&store).await;
        assert_eq!(
            ledger.decrement("Towel", i64::MAX).await.unwrap(),
            DecrementOutcome::Applied { before: 2, after: 2 - i64::MAX }
        );
        assert_eq!(
            ledger.decrement("Towel", i64::MAX).await.unwrap(),
            DecrementOutcome::Overflow { before: 2 - i64::MAX }
        );
        assert_eq!(store.snapshot("stock").rows[0][2], (2 - i64::MAX).to_string());
    }

    #[tokio::test]
    async fn missing_stock_column_is_a_store_error() {
        let store = MemoryStore::new().with_sheet("stock", &["product", "keywords"], &[&["Mug", "mug"]]);
        let result = ledger(&store).await.decrement("Mug", 1).await;
        assert!(matches!(result, Err(StoreError::MissingColumn { .. })));
    }
}
