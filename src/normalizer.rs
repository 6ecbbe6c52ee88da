use crate::config::AppConfig;
use crate::model::{columns, DecrementFailure, FailureReason, OrderRecord};
use crate::storage::SheetTable;
use crate::utils::{clean_date_str, parse_quantity};
use std::collections::{HashMap, HashSet};

/// A sheet after header cleanup: canonical column names, first occurrence of
/// each name kept, status and channel always present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// 0-based column in the source sheet for each normalized column;
    /// `None` for columns filled in with defaults.
    pub source_columns: Vec<Option<usize>>,
}

impl NormalizedTable {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    /// 1-based column of `name` in the stored sheet, if it exists there.
    pub fn sheet_column(&self, name: &str) -> Option<usize> {
        self.column(name)
            .and_then(|i| self.source_columns[i])
            .map(|c| c + 1)
    }

    /// Cell value, empty when the row or column is missing.
    pub fn cell<'a>(&'a self, row: &'a [String], name: &str) -> &'a str {
        self.column(name)
            .and_then(|i| row.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    synonyms: HashMap<String, String>,
    date_columns: HashSet<String>,
    default_status: String,
    default_channel: String,
}

impl Normalizer {
    pub fn new(
        synonyms: HashMap<String, String>,
        date_columns: impl IntoIterator<Item = String>,
        default_status: impl Into<String>,
        default_channel: impl Into<String>,
    ) -> Self {
        Self {
            synonyms,
            date_columns: date_columns.into_iter().collect(),
            default_status: default_status.into(),
            default_channel: default_channel.into(),
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.column_synonyms.clone(),
            cfg.date_columns.iter().cloned(),
            cfg.default_status.clone(),
            cfg.default_channel.clone(),
        )
    }

    /// Canonical name for a (trimmed) header; unknown headers map to themselves.
    pub fn canonical<'a>(&'a self, header: &'a str) -> &'a str {
        self.synonyms
            .get(header)
            .map(String::as_str)
            .unwrap_or(header)
    }

    pub fn normalize(&self, table: &SheetTable) -> NormalizedTable {
        if table.header.is_empty() {
            return NormalizedTable::default();
        }

        let mut header = Vec::new();
        let mut source_columns = Vec::new();
        let mut is_date = Vec::new();
        let mut seen = HashSet::new();
        for (i, raw) in table.header.iter().enumerate() {
            let trimmed = raw.trim();
            let name = self.canonical(trimmed);
            // a later column renamed onto an existing name is dropped
            if !seen.insert(name.to_string()) {
                continue;
            }
            is_date.push(self.date_columns.contains(trimmed) || name == columns::DATE);
            header.push(name.to_string());
            source_columns.push(Some(i));
        }

        let mut rows: Vec<Vec<String>> = table
            .rows
            .iter()
            .map(|raw| {
                source_columns
                    .iter()
                    .zip(&is_date)
                    .map(|(src, &date)| {
                        let value = src.and_then(|i| raw.get(i)).map(String::as_str).unwrap_or("");
                        if date { clean_date_str(value) } else { value.to_string() }
                    })
                    .collect()
            })
            .collect();

        for (column, default) in [
            (columns::CHANNEL, &self.default_channel),
            (columns::STATUS, &self.default_status),
        ] {
            if seen.insert(column.to_string()) {
                header.push(column.to_string());
                source_columns.push(None);
                for row in rows.iter_mut() {
                    row.push(default.clone());
                }
            }
        }

        NormalizedTable {
            header,
            rows,
            source_columns,
        }
    }

    /// Turns normalized rows into order records. Lines without a product name
    /// or with a missing, non-numeric or non-positive quantity come back as
    /// invalid-line failures in their original position.
    pub fn order_records(&self, table: &NormalizedTable) -> Vec<Result<OrderRecord, DecrementFailure>> {
        table
            .rows
            .iter()
            .map(|row| {
                let product = table.cell(row, columns::PRODUCT).trim();
                let quantity = parse_quantity(table.cell(row, columns::QUANTITY));
                match quantity {
                    Some(q) if q > 0 && !product.is_empty() => Ok(OrderRecord {
                        order_id: table.cell(row, columns::ORDER_ID).trim().to_string(),
                        order_date: table.cell(row, columns::DATE).to_string(),
                        buyer_name: table.cell(row, columns::BUYER).trim().to_string(),
                        phone: table.cell(row, columns::PHONE).trim().to_string(),
                        address: table.cell(row, columns::ADDRESS).trim().to_string(),
                        raw_product_name: product.to_string(),
                        quantity: q,
                        amount: table.cell(row, columns::AMOUNT).trim().to_string(),
                        note: table.cell(row, columns::NOTE).trim().to_string(),
                        status: table.cell(row, columns::STATUS).to_string(),
                        source_channel: table.cell(row, columns::CHANNEL).to_string(),
                    }),
                    _ => Err(DecrementFailure::new(product, FailureReason::InvalidLine)),
                }
            })
            .collect()
    }
}
