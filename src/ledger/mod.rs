// Ledger module: the order, stock, schedule and option sheets.

pub mod options;
pub mod orders;
pub mod schedule;
pub mod stock;

pub use options::OptionSheet;
pub use orders::{OrderLedger, StatusUpdate};
pub use schedule::{ScheduleBook, ScheduleEntry};
pub use stock::StockLedger;
