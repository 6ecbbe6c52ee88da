// Analyzer module: dashboard figures computed from the normalized order ledger.

pub mod proofs;
pub mod sales;

pub use proofs::{proof_queue, ProofJob, ProofQueue};
pub use sales::{daily_summary, recent_orders, top_buyers, DailySummary};
