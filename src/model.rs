// Core structs: OrderRecord, CanonicalProduct, IngestResult and the error enums
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Canonical column names every sheet is renamed onto.
pub mod columns {
    pub const ORDER_ID: &str = "order_id";
    pub const DATE: &str = "date";
    pub const BUYER: &str = "buyer";
    pub const PHONE: &str = "phone";
    pub const ADDRESS: &str = "address";
    pub const PRODUCT: &str = "product";
    pub const QUANTITY: &str = "quantity";
    pub const AMOUNT: &str = "amount";
    pub const NOTE: &str = "note";
    pub const STATUS: &str = "status";
    pub const CHANNEL: &str = "channel";
    pub const DESIGN_FILE: &str = "design_file";
    pub const KEYWORDS: &str = "keywords";
    pub const CURRENT_STOCK: &str = "current_stock";
    pub const SAFETY_STOCK: &str = "safety_stock";
    pub const START_DATE: &str = "start_date";
    pub const END_DATE: &str = "end_date";
    pub const TIME: &str = "time";
    pub const TITLE: &str = "title";
    pub const DETAILS: &str = "details";

    /// Header written to an empty order ledger.
    pub const LEDGER: [&str; 11] = [
        ORDER_ID, DATE, BUYER, PHONE, ADDRESS, PRODUCT, QUANTITY, AMOUNT, NOTE, STATUS, CHANNEL,
    ];

    /// Header written to an empty schedule sheet.
    pub const SCHEDULE: [&str; 5] = [START_DATE, END_DATE, TIME, TITLE, DETAILS];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRecord {
    pub order_id: String,
    pub order_date: String,
    pub buyer_name: String,
    pub phone: String,
    pub address: String,
    pub raw_product_name: String,
    pub quantity: i64,
    pub amount: String,
    pub note: String,
    pub status: String,
    pub source_channel: String,
}

impl OrderRecord {
    /// Value of the given canonical column, empty for unknown columns.
    pub fn field(&self, column: &str) -> String {
        match column {
            columns::ORDER_ID => self.order_id.clone(),
            columns::DATE => self.order_date.clone(),
            columns::BUYER => self.buyer_name.clone(),
            columns::PHONE => self.phone.clone(),
            columns::ADDRESS => self.address.clone(),
            columns::PRODUCT => self.raw_product_name.clone(),
            columns::QUANTITY => self.quantity.to_string(),
            columns::AMOUNT => self.amount.clone(),
            columns::NOTE => self.note.clone(),
            columns::STATUS => self.status.clone(),
            columns::CHANNEL => self.source_channel.clone(),
            _ => String::new(),
        }
    }
}

/// One row of the stock sheet: a stock-keeping unit and the aliases that
/// recognize it inside marketplace product names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalProduct {
    pub canonical_name: String,
    /// Raw comma-separated keyword field as stored in the sheet.
    pub keyword_group: String,
    pub current_stock: i64,
    pub safety_stock: i64,
}

impl CanonicalProduct {
    /// Trimmed, non-empty keyword tokens in their stored order.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.keyword_group
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn is_low(&self) -> bool {
        self.current_stock <= self.safety_stock
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureReason {
    InvalidLine,
    Unmapped,
    NotFound,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FailureReason::InvalidLine => "invalid line",
            FailureReason::Unmapped => "unmapped",
            FailureReason::NotFound => "not found",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecrementFailure {
    pub raw_product_name: String,
    pub reason: FailureReason,
}

impl DecrementFailure {
    pub fn new(raw_product_name: impl Into<String>, reason: FailureReason) -> Self {
        Self {
            raw_product_name: raw_product_name.into(),
            reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockChange {
    pub canonical_name: String,
    pub before: i64,
    pub after: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecrementOutcome {
    Applied { before: i64, after: i64 },
    NotFound,
    /// The subtraction would leave the integer range; stock was not touched.
    Overflow { before: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AlertOutcome {
    /// No product at or below its safety stock.
    NotNeeded,
    /// Low stock found but no notifier is configured.
    Disabled,
    Sent,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestResult {
    pub appended_count: usize,
    pub decrement_failures: Vec<DecrementFailure>,
    pub decremented: Vec<StockChange>,
    pub low_stock: Vec<CanonicalProduct>,
    pub alert: AlertOutcome,
}

impl Default for IngestResult {
    fn default() -> Self {
        Self {
            appended_count: 0,
            decrement_failures: Vec::new(),
            decremented: Vec::new(),
            low_stock: Vec::new(),
            alert: AlertOutcome::NotNeeded,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unreachable: {0}")]
    Unreachable(String),
    #[error("Cell ({row}, {col}) is outside sheet '{sheet}'")]
    OutOfRange { sheet: String, row: usize, col: usize },
    #[error("Column '{column}' missing from sheet '{sheet}'")]
    MissingColumn { sheet: String, column: String },
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Row encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("Upload has no header row at row index 1")]
    MissingHeader,
    #[error("Malformed upload: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Notification endpoint unreachable")]
    Unreachable,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Store failure before any stock change: {0}")]
    Store(#[source] StoreError),
    #[error("Order ledger persisted {persisted} of {expected} rows")]
    PartialAppend { expected: usize, persisted: usize },
    #[error("Ingestion interrupted after {} stock changes: {source}", .partial.decremented.len())]
    Interrupted {
        partial: Box<IngestResult>,
        #[source]
        source: StoreError,
    },
}
