use crate::model::{columns, StoreError};
use crate::normalizer::{NormalizedTable, Normalizer};
use crate::storage::Worksheet;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleEntry {
    pub start_date: String,
    pub end_date: String,
    pub time: String,
    pub title: String,
    pub details: String,
}

impl ScheduleEntry {
    /// A single-day entry.
    pub fn on(day: NaiveDate, time: &str, title: &str, details: &str) -> Self {
        let date = day.format("%Y-%m-%d").to_string();
        Self {
            start_date: date.clone(),
            end_date: date,
            time: time.to_string(),
            title: title.to_string(),
            details: details.to_string(),
        }
    }

    fn field(&self, column: &str) -> String {
        match column {
            columns::START_DATE => self.start_date.clone(),
            columns::END_DATE => self.end_date.clone(),
            columns::TIME => self.time.clone(),
            columns::TITLE => self.title.clone(),
            columns::DETAILS => self.details.clone(),
            _ => String::new(),
        }
    }

    fn from_row(table: &NormalizedTable, row: &[String]) -> Self {
        Self {
            start_date: table.cell(row, columns::START_DATE).to_string(),
            end_date: table.cell(row, columns::END_DATE).to_string(),
            time: table.cell(row, columns::TIME).to_string(),
            title: table.cell(row, columns::TITLE).to_string(),
            details: table.cell(row, columns::DETAILS).to_string(),
        }
    }
}

/// The schedule sheet: one row per entry, dates cleaned on read.
pub struct ScheduleBook {
    sheet: Arc<dyn Worksheet>,
    normalizer: Normalizer,
}

impl ScheduleBook {
    pub fn new(sheet: Arc<dyn Worksheet>, normalizer: Normalizer) -> Self {
        Self { sheet, normalizer }
    }

    pub async fn entries(&self) -> Result<Vec<ScheduleEntry>, StoreError> {
        let table = self.normalizer.normalize(&self.sheet.read_all().await?);
        Ok(table
            .rows
            .iter()
            .map(|row| ScheduleEntry::from_row(&table, row))
            .collect())
    }

    /// Entries starting on `day`, in sheet order.
    pub async fn todays_entries(&self, day: NaiveDate) -> Result<Vec<ScheduleEntry>, StoreError> {
        let wanted = day.format("%Y-%m-%d").to_string();
        Ok(self
            .entries()
            .await?
            .into_iter()
            .filter(|e| e.start_date == wanted)
            .collect())
    }

    /// Appends one entry in the sheet's column order. An empty sheet gets the
    /// schedule header first.
    pub async fn add_entry(&self, entry: &ScheduleEntry) -> Result<(), StoreError> {
        let existing = self.sheet.read_all().await?.header;
        let mut rows = Vec::with_capacity(2);
        let header: Vec<String> = if existing.is_empty() {
            let header: Vec<String> = columns::SCHEDULE.iter().map(|c| c.to_string()).collect();
            rows.push(header.clone());
            header
        } else {
            existing
        };
        rows.push(
            header
                .iter()
                .map(|h| entry.field(self.normalizer.canonical(h.trim())))
                .collect(),
        );
        self.sheet.append_rows(&rows).await?;
        info!("Scheduled '{}' on {}", entry.title, entry.start_date);
        Ok(())
    }
}
