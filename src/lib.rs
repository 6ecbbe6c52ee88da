pub mod analyzer;
pub mod assistant;
pub mod config;
pub mod ingest;
pub mod ledger;
pub mod mapper;
pub mod model;
pub mod normalizer;
pub mod notifier;
pub mod parser;
pub mod storage;
pub mod utils;

pub use ingest::Ingestor;
pub use mapper::map_to_canonical;
pub use model::{CanonicalProduct, DecrementFailure, FailureReason, IngestError, IngestResult, OrderRecord};

use config::AppConfig;
use ledger::{OrderLedger, StockLedger};
use mapper::MatchCase;
use model::StoreError;
use normalizer::{NormalizedTable, Normalizer};
use notifier::Notifier;
use std::sync::Arc;
use storage::SheetStore;

/// Opens a worksheet and returns its normalized contents.
pub async fn load_sheet(
    store: &dyn SheetStore,
    sheet_name: &str,
    normalizer: &Normalizer,
) -> Result<NormalizedTable, StoreError> {
    let sheet = store.open(sheet_name).await?;
    Ok(normalizer.normalize(&sheet.read_all().await?))
}

/// Wires the order and stock sheets named in the config into an ingestor.
pub async fn build_ingestor(
    cfg: &AppConfig,
    store: &dyn SheetStore,
    notifier: Option<Arc<dyn Notifier>>,
) -> Result<Ingestor, StoreError> {
    let normalizer = Normalizer::from_config(cfg);
    let orders = OrderLedger::new(store.open(&cfg.sheets.orders).await?, normalizer.clone());
    let stock = StockLedger::new(store.open(&cfg.sheets.stock).await?, normalizer.clone());
    let match_case = if cfg.case_insensitive_keywords {
        MatchCase::Insensitive
    } else {
        MatchCase::Sensitive
    };
    let ingestor = Ingestor::new(orders, stock, normalizer).with_match_case(match_case);
    Ok(match notifier {
        Some(n) => ingestor.with_notifier(n),
        None => ingestor,
    })
}
