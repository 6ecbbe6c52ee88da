pub mod email;

pub use email::{Attachment, EmailRelay};

use crate::model::{CanonicalProduct, NotifyError};
use std::sync::Mutex;

/// Receives the consolidated low-stock alert at the end of an ingestion run.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_low_stock(&self, items: &[CanonicalProduct]) -> Result<(), NotifyError>;
}

/// One message body listing every low item with its current and safety stock.
pub fn low_stock_message(items: &[CanonicalProduct]) -> String {
    let mut msg = format!("⚠️ {} item(s) at or below safety stock:\n", items.len());
    for item in items {
        msg.push_str(&format!(
            "🔸 {}: current {} | safety {}\n",
            item.canonical_name.trim(),
            item.current_stock,
            item.safety_stock
        ));
    }
    msg
}

/// Keeps every alert it receives; optionally fails each send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Messages passed to the notifier, including ones whose send failed.
    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_low_stock(&self, items: &[CanonicalProduct]) -> Result<(), NotifyError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(low_stock_message(items));
        }
        if self.fail {
            return Err(NotifyError::Unreachable);
        }
        Ok(())
    }
}
