//! Order ingestion: append the uploaded batch to the order ledger, take each
//! line out of stock, then raise one low-stock alert for the whole run.
//!
//! Side effects run strictly in that order, so the alert always sees
//! post-decrement stock. There is no rollback: once the ledger append has
//! happened it stays, and a store failure during the stock phase is returned
//! together with everything that was already applied.

use crate::ledger::{OrderLedger, StockLedger};
use crate::mapper::{map_with_case, MatchCase};
use crate::model::{
    AlertOutcome, DecrementFailure, DecrementOutcome, FailureReason, IngestError, IngestResult,
    OrderRecord, StockChange,
};
use crate::normalizer::Normalizer;
use crate::notifier::Notifier;
use crate::storage::SheetTable;
use std::sync::Arc;
use tracing::{info, warn};

pub struct Ingestor {
    orders: OrderLedger,
    stock: StockLedger,
    normalizer: Normalizer,
    notifier: Option<Arc<dyn Notifier>>,
    match_case: MatchCase,
}

impl Ingestor {
    pub fn new(orders: OrderLedger, stock: StockLedger, normalizer: Normalizer) -> Self {
        Self {
            orders,
            stock,
            normalizer,
            notifier: None,
            match_case: MatchCase::Sensitive,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_match_case(mut self, match_case: MatchCase) -> Self {
        self.match_case = match_case;
        self
    }

    pub async fn ingest(&self, batch: &SheetTable) -> Result<IngestResult, IngestError> {
        let mut result = IngestResult::default();

        let table = self.normalizer.normalize(batch);
        let mut valid: Vec<OrderRecord> = Vec::new();
        for line in self.normalizer.order_records(&table) {
            match line {
                Ok(record) => valid.push(record),
                Err(failure) => {
                    warn!("Skipping invalid order line '{}'", failure.raw_product_name);
                    result.decrement_failures.push(failure);
                }
            }
        }
        info!("Batch of {} lines, {} valid", table.rows.len(), valid.len());

        let persisted = self.orders.append(&valid).await.map_err(IngestError::Store)?;
        if persisted < valid.len() {
            return Err(IngestError::PartialAppend {
                expected: valid.len(),
                persisted,
            });
        }
        result.appended_count = persisted;

        let products = match self.stock.products().await {
            Ok(p) => p,
            Err(source) => return Err(interrupted(result, source)),
        };

        for record in &valid {
            let name = &record.raw_product_name;
            let Some(product) = map_with_case(name, &products, self.match_case) else {
                warn!("No stock item matches '{}'", name);
                result
                    .decrement_failures
                    .push(DecrementFailure::new(name.as_str(), FailureReason::Unmapped));
                continue;
            };
            match self.stock.decrement(&product.canonical_name, record.quantity).await {
                Ok(DecrementOutcome::Applied { before, after }) => {
                    result.decremented.push(StockChange {
                        canonical_name: product.canonical_name.clone(),
                        before,
                        after,
                    });
                }
                Ok(DecrementOutcome::Overflow { .. }) => {
                    result
                        .decrement_failures
                        .push(DecrementFailure::new(name.as_str(), FailureReason::InvalidLine));
                }
                Ok(DecrementOutcome::NotFound) => {
                    warn!("Stock row '{}' vanished before decrement", product.canonical_name);
                    result
                        .decrement_failures
                        .push(DecrementFailure::new(name.as_str(), FailureReason::NotFound));
                }
                Err(source) => return Err(interrupted(result, source)),
            }
        }

        let low = match self.stock.list_low_stock().await {
            Ok(low) => low,
            Err(source) => return Err(interrupted(result, source)),
        };
        result.alert = if low.is_empty() {
            AlertOutcome::NotNeeded
        } else if let Some(notifier) = &self.notifier {
            match notifier.notify_low_stock(&low).await {
                Ok(()) => AlertOutcome::Sent,
                Err(e) => {
                    // stock changes stay committed regardless
                    warn!("Low-stock alert failed: {}", e);
                    AlertOutcome::Failed(e.to_string())
                }
            }
        } else {
            info!("{} items low on stock, no notifier configured", low.len());
            AlertOutcome::Disabled
        };
        result.low_stock = low;

        info!(
            "Ingestion done: {} appended, {} stock changes, {} failures, {} low",
            result.appended_count,
            result.decremented.len(),
            result.decrement_failures.len(),
            result.low_stock.len()
        );
        Ok(result)
    }
}

fn interrupted(partial: IngestResult, source: crate::model::StoreError) -> IngestError {
    warn!("Ingestion interrupted: {}", source);
    IngestError::Interrupted {
        partial: Box::new(partial),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::notifier::RecordingNotifier;
    use crate::storage::memory::{Faults, StoreOp};
    use crate::storage::{MemoryStore, SheetStore};

    const STOCK_HEADER: &[&str] = &["product", "keywords", "current_stock", "safety_stock"];

    fn batch(rows: &[&[&str]]) -> SheetTable {
        SheetTable::new(
            ["product", "quantity", "buyer"].iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    async fn ingestor(store: &MemoryStore, notifier: Option<Arc<RecordingNotifier>>) -> Ingestor {
        let normalizer = Normalizer::from_config(&AppConfig::default());
        let orders = OrderLedger::new(store.open("orders").await.unwrap(), normalizer.clone());
        let stock = StockLedger::new(store.open("stock").await.unwrap(), normalizer.clone());
        let ingestor = Ingestor::new(orders, stock, normalizer);
        match notifier {
            Some(n) => ingestor.with_notifier(n),
            None => ingestor,
        }
    }

    #[tokio::test]
    async fn invalid_line_is_skipped_and_valid_ones_appended() {
        let store = MemoryStore::new().with_sheet(
            "stock",
            STOCK_HEADER,
            &[&["Towel", "towel", "50", "1"], &["Mug", "mug", "50", "1"]],
        );
        let result = ingestor(&store, None)
            .await
            .ingest(&batch(&[
                &["bath towel", "1", "Kim"],
                &["", "2", "Lee"],
                &["mug large", "1", "Park"],
                &["towel set", "3", "Choi"],
            ]))
            .await
            .unwrap();

        assert_eq!(result.appended_count, 3);
        assert_eq!(result.decrement_failures, vec![DecrementFailure::new("", FailureReason::InvalidLine)]);
        assert_eq!(store.snapshot("orders").rows.len(), 3);
        assert_eq!(store.snapshot("stock").rows[0][2], "46");
        assert_eq!(store.snapshot("stock").rows[1][2], "49");
        assert_eq!(result.alert, AlertOutcome::NotNeeded);
    }

    #[tokio::test]
    async fn unmapped_line_is_reported_not_raised() {
        let store = MemoryStore::new().with_sheet("stock", STOCK_HEADER, &[&["Towel", "towel", "5", "1"]]);
        let result = ingestor(&store, None)
            .await
            .ingest(&batch(&[&["Unrelated Gadget", "1", "Kim"], &["towel", "1", "Lee"]]))
            .await
            .unwrap();
        assert_eq!(
            result.decrement_failures,
            vec![DecrementFailure::new("Unrelated Gadget", FailureReason::Unmapped)]
        );
        assert_eq!(result.decrement_failures[0].reason.to_string(), "unmapped");
        assert_eq!(result.decremented.len(), 1);
    }

    #[tokio::test]
    async fn one_alert_lists_every_low_item() {
        let store = MemoryStore::new().with_sheet(
            "stock",
            STOCK_HEADER,
            &[&["Towel", "towel", "3", "2"], &["Mug", "mug", "4", "2"], &["Plate", "plate", "9", "2"]],
        );
        let notifier = Arc::new(RecordingNotifier::new());
        let result = ingestor(&store, Some(notifier.clone()))
            .await
            .ingest(&batch(&[&["towel", "2", "Kim"], &["mug", "3", "Lee"], &["plate", "1", "Park"]]))
            .await
            .unwrap();

        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Towel: current 1 | safety 2"));
        assert!(messages[0].contains("Mug: current 1 | safety 2"));
        assert!(!messages[0].contains("Plate"));
        assert_eq!(result.alert, AlertOutcome::Sent);
        assert_eq!(result.low_stock.len(), 2);
    }

    #[tokio::test]
    async fn overflowing_quantity_is_an_invalid_line() {
        let store = MemoryStore::new().with_sheet("stock", STOCK_HEADER, &[&["Mug", "mug", "5", "1"]]);
        let max = i64::MAX.to_string();
        let max = max.as_str();
        let result = ingestor(&store, None)
            .await
            .ingest(&batch(&[&["mug", max, "Kim"], &["mug", max, "Lee"]]))
            .await
            .unwrap();
        assert_eq!(result.appended_count, 2);
        assert_eq!(result.decremented.len(), 1);
        assert_eq!(result.decremented[0].after, 5 - i64::MAX);
        assert_eq!(result.decrement_failures, vec![DecrementFailure::new("mug", FailureReason::InvalidLine)]);
        assert_eq!(store.snapshot("stock").rows[0][2], (5 - i64::MAX).to_string());
    }

    #[tokio::test]
    async fn failed_alert_keeps_stock_changes() {
        let store = MemoryStore::new().with_sheet("stock", STOCK_HEADER, &[&["Towel", "towel", "2", "1"]]);
        let notifier = Arc::new(RecordingNotifier::failing());
        let result = ingestor(&store, Some(notifier.clone()))
            .await
            .ingest(&batch(&[&["towel", "5", "Kim"]]))
            .await
            .unwrap();
        assert!(matches!(result.alert, AlertOutcome::Failed(_)));
        assert_eq!(store.snapshot("stock").rows[0][2], "-3");
        assert_eq!(notifier.messages().len(), 1);
    }

    #[tokio::test]
    async fn ledger_append_precedes_stock_updates() {
        let store = MemoryStore::new().with_sheet("stock", STOCK_HEADER, &[&["Towel", "towel", "9", "1"]]);
        ingestor(&store, None)
            .await
            .ingest(&batch(&[&["towel", "1", "Kim"], &["towel", "1", "Lee"]]))
            .await
            .unwrap();
        let ops = store.operations();
        let append = ops.iter().position(|op| matches!(op, StoreOp::Append { .. })).unwrap();
        let first_update = ops.iter().position(|op| matches!(op, StoreOp::Update { .. })).unwrap();
        let last_read = ops.iter().rposition(|op| matches!(op, StoreOp::Read(s) if s == "stock")).unwrap();
        let last_update = ops.iter().rposition(|op| matches!(op, StoreOp::Update { .. })).unwrap();
        assert!(append < first_update);
        assert!(last_update < last_read);
        assert_eq!(store.snapshot("stock").rows[0][2], "7");
    }

    #[tokio::test]
    async fn short_append_is_an_error_before_any_stock_change() {
        let store = MemoryStore::new().with_sheet("stock", STOCK_HEADER, &[&["Towel", "towel", "9", "1"]]);
        store.set_faults(Faults {
            append_limit: Some(2),
            ..Faults::default()
        });
        // empty ledger: header + 2 records submitted, only 2 rows persisted
        let err = ingestor(&store, None)
            .await
            .ingest(&batch(&[&["towel", "1", "Kim"], &["towel", "1", "Lee"]]))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::PartialAppend { expected: 2, persisted: 1 }));
        assert_eq!(store.snapshot("stock").rows[0][2], "9");
    }

    #[tokio::test]
    async fn store_failure_mid_run_returns_partial_result() {
        let store = MemoryStore::new().with_sheet("stock", STOCK_HEADER, &[&["Towel", "towel", "9", "1"]]);
        store.set_faults(Faults {
            fail_updates_after: Some(1),
            ..Faults::default()
        });
        let err = ingestor(&store, None)
            .await
            .ingest(&batch(&[&["towel", "1", "Kim"], &["towel", "1", "Lee"]]))
            .await
            .unwrap_err();
        match err {
            IngestError::Interrupted { partial, .. } => {
                assert_eq!(partial.appended_count, 2);
                assert_eq!(partial.decremented.len(), 1);
            }
            other => panic!("expected interrupted run, got {other:?}"),
        }
        assert_eq!(store.snapshot("orders").rows.len(), 2);
        assert_eq!(store.snapshot("stock").rows[0][2], "8");
    }

    #[tokio::test]
    async fn unreachable_store_fails_the_run() {
        let store = MemoryStore::new();
        let ingestor = ingestor(&store, None).await;
        store.set_faults(Faults {
            unreachable: true,
            ..Faults::default()
        });
        let err = ingestor.ingest(&batch(&[&["towel", "1", "Kim"]])).await.unwrap_err();
        assert!(matches!(err, IngestError::Store(_)));
    }
}
