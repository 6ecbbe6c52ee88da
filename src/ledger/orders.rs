use crate::model::{columns, ExportError, OrderRecord, StoreError};
use crate::normalizer::{NormalizedTable, Normalizer};
use crate::storage::{SheetTable, Worksheet};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdate {
    Updated,
    OrderNotFound,
    StatusColumnMissing,
}

pub struct OrderLedger {
    sheet: Arc<dyn Worksheet>,
    normalizer: Normalizer,
}

impl OrderLedger {
    pub fn new(sheet: Arc<dyn Worksheet>, normalizer: Normalizer) -> Self {
        Self { sheet, normalizer }
    }

    pub async fn table(&self) -> Result<NormalizedTable, StoreError> {
        Ok(self.normalizer.normalize(&self.sheet.read_all().await?))
    }

    /// Appends all records in a single write, laid out to match the sheet's
    /// existing header. An empty sheet gets the canonical ledger header first.
    /// Returns how many of `records` the store reports as persisted.
    pub async fn append(&self, records: &[OrderRecord]) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        let existing = self.sheet.read_all().await?.header;
        let write_header = existing.is_empty();
        let header: Vec<String> = if write_header {
            columns::LEDGER.iter().map(|c| c.to_string()).collect()
        } else {
            existing
        };

        // only the first column carrying a canonical name receives its value
        let mut seen = HashSet::new();
        let targets: Vec<Option<String>> = header
            .iter()
            .map(|h| {
                let name = self.normalizer.canonical(h.trim()).to_string();
                seen.insert(name.clone()).then_some(name)
            })
            .collect();

        let mut rows = Vec::with_capacity(records.len() + 1);
        if write_header {
            rows.push(header.clone());
        }
        for record in records {
            rows.push(
                targets
                    .iter()
                    .map(|t| t.as_deref().map(|c| record.field(c)).unwrap_or_default())
                    .collect(),
            );
        }

        let persisted = self.sheet.append_rows(&rows).await?;
        let appended = persisted.saturating_sub(usize::from(write_header));
        info!("Appended {} of {} orders to '{}'", appended, records.len(), self.sheet.name());
        Ok(appended)
    }

    /// Sets the status of the first order with this exact buyer and product.
    pub async fn update_status(
        &self,
        buyer: &str,
        product: &str,
        new_status: &str,
    ) -> Result<StatusUpdate, StoreError> {
        let table = self.table().await?;
        let found = table.rows.iter().position(|row| {
            table.cell(row, columns::BUYER) == buyer && table.cell(row, columns::PRODUCT) == product
        });
        let Some(index) = found else {
            return Ok(StatusUpdate::OrderNotFound);
        };
        let Some(col) = table.sheet_column(columns::STATUS) else {
            return Ok(StatusUpdate::StatusColumnMissing);
        };
        self.sheet
            .update_cell(SheetTable::sheet_row(index), col, new_status)
            .await?;
        debug!("Order {} / {} set to '{}'", buyer, product, new_status);
        Ok(StatusUpdate::Updated)
    }

    /// Normalized ledger as CSV with a UTF-8 byte-order mark.
    pub async fn export_csv(&self) -> Result<Vec<u8>, ExportError> {
        let table = self.table().await?;
        Ok(to_csv(&table)?)
    }
}

pub fn to_csv(table: &NormalizedTable) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer("\u{feff}".as_bytes().to_vec());
    writer.write_record(&table.header)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.into_inner().map_err(|e| e.into_error().into())
}
