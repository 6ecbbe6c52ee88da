use crate::model::columns;
use crate::normalizer::NormalizedTable;
use crate::utils::drive_file_id;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProofJob {
    pub buyer: String,
    pub product: String,
    pub date: String,
    pub request: String,
    pub design_file: String,
    /// Drive file id when `design_file` is a Drive share link.
    pub drive_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProofQueue {
    pub pending: Vec<ProofJob>,
    pub done: Vec<ProofJob>,
}

/// Splits ledger orders into design proofs still waiting and those whose
/// status equals `done_status`. Sheet order is kept in both lists.
pub fn proof_queue(table: &NormalizedTable, done_status: &str) -> ProofQueue {
    let mut queue = ProofQueue::default();
    for row in &table.rows {
        let design_file = table.cell(row, columns::DESIGN_FILE).trim().to_string();
        let job = ProofJob {
            buyer: table.cell(row, columns::BUYER).to_string(),
            product: table.cell(row, columns::PRODUCT).to_string(),
            date: table.cell(row, columns::DATE).to_string(),
            request: table.cell(row, columns::NOTE).to_string(),
            drive_id: drive_file_id(&design_file),
            design_file,
        };
        if table.cell(row, columns::STATUS).trim() == done_status {
            queue.done.push(job);
        } else {
            queue.pending.push(job);
        }
    }
    queue
}
