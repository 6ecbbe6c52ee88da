use order_desk::build_ingestor;
use order_desk::config::{load_config, AppConfig};
use order_desk::model::IngestError;
use order_desk::notifier::{EmailRelay, Notifier};
use order_desk::parser::{OrderUploadParser, Parser};
use order_desk::storage::SqliteStore;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Set panic hook to log details about any panic
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("😱 Panic occurred: {:?}", panic_info);
    }));

    let Some(upload_path) = std::env::args().nth(1) else {
        error!("Usage: order-desk <order-export.csv>");
        return;
    };

    let config: AppConfig = match load_config("config.json") {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Config load error: {}", e);
            return;
        }
    };

    let store = match SqliteStore::new(&config.database_path) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to initialize sheet store: {}", e);
            return;
        }
    };

    let notifier: Option<Arc<dyn Notifier>> = match config.alert.as_ref().map(EmailRelay::new) {
        Some(Ok(relay)) => Some(Arc::new(relay)),
        Some(Err(e)) => {
            warn!("Alert mail disabled: {}", e);
            None
        }
        None => {
            info!("No alert block in config, low-stock alerts disabled");
            None
        }
    };

    let data = match tokio::fs::read(&upload_path).await {
        Ok(d) => d,
        Err(e) => {
            error!("Cannot read upload '{}': {}", upload_path, e);
            return;
        }
    };
    let batch = match OrderUploadParser::new(config.upload_columns.clone()).parse(&data) {
        Ok(b) => b,
        Err(e) => {
            error!("Upload rejected: {}", e);
            return;
        }
    };

    let ingestor = match build_ingestor(&config, &store, notifier).await {
        Ok(i) => i,
        Err(e) => {
            error!("Cannot open sheets: {}", e);
            return;
        }
    };

    info!("Ingesting {} rows from {}", batch.rows.len(), upload_path);
    match ingestor.ingest(&batch).await {
        Ok(result) => {
            info!("✅ {} orders appended", result.appended_count);
            for change in &result.decremented {
                info!("📦 {}: {} -> {}", change.canonical_name, change.before, change.after);
            }
            for failure in &result.decrement_failures {
                warn!("⚠️ '{}': {}", failure.raw_product_name, failure.reason);
            }
            info!("Alert: {:?}", result.alert);
            if let Ok(json) = serde_json::to_string(&result) {
                info!("Result: {}", json);
            }
        }
        Err(IngestError::Interrupted { partial, source }) => {
            error!(
                "❌ Run interrupted ({}); {} orders appended, {} stock changes applied before the failure",
                source,
                partial.appended_count,
                partial.decremented.len()
            );
            for change in &partial.decremented {
                error!("Applied: {} {} -> {}", change.canonical_name, change.before, change.after);
            }
        }
        Err(e) => error!("❌ Ingestion failed: {}", e),
    }
}
