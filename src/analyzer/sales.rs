use crate::model::columns;
use crate::normalizer::NormalizedTable;
use crate::utils::digits_amount;
use chrono::NaiveDate;
use std::cmp::Reverse;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySummary {
    pub order_count: usize,
    pub day_sales: i64,
    pub total_sales: i64,
}

fn parse_day(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Orders placed on `day` and their sales, next to all-time sales.
/// Amounts are read digits-only; unreadable amounts count as 0.
pub fn daily_summary(table: &NormalizedTable, day: NaiveDate) -> DailySummary {
    let mut summary = DailySummary {
        order_count: 0,
        day_sales: 0,
        total_sales: 0,
    };
    for row in &table.rows {
        let amount = digits_amount(table.cell(row, columns::AMOUNT));
        summary.total_sales = summary.total_sales.saturating_add(amount);
        if parse_day(table.cell(row, columns::DATE)) == Some(day) {
            summary.order_count += 1;
            summary.day_sales = summary.day_sales.saturating_add(amount);
        }
    }
    summary
}

/// Buyers ranked by total spend, highest first. Ties keep first-seen order.
pub fn top_buyers(table: &NormalizedTable, limit: usize) -> Vec<(String, i64)> {
    if table.column(columns::BUYER).is_none() {
        return Vec::new();
    }
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, i64> = HashMap::new();
    for row in &table.rows {
        let buyer = table.cell(row, columns::BUYER).to_string();
        let amount = digits_amount(table.cell(row, columns::AMOUNT));
        if !totals.contains_key(&buyer) {
            order.push(buyer.clone());
        }
        let total = totals.entry(buyer).or_default();
        *total = total.saturating_add(amount);
    }

    let mut ranked: Vec<(String, i64)> = order
        .into_iter()
        .map(|b| {
            let total = totals[&b];
            (b, total)
        })
        .collect();
    ranked.sort_by_key(|(_, total)| Reverse(*total));
    ranked.truncate(limit);
    ranked
}

/// Newest orders first as (date, buyer, product, status). Undated rows sort last.
pub fn recent_orders(table: &NormalizedTable, limit: usize) -> Vec<[String; 4]> {
    let mut rows: Vec<&Vec<String>> = table.rows.iter().collect();
    rows.sort_by_key(|row| Reverse(parse_day(table.cell(row, columns::DATE))));
    rows.into_iter()
        .take(limit)
        .map(|row| {
            [columns::DATE, columns::BUYER, columns::PRODUCT, columns::STATUS]
                .map(|c| table.cell(row, c).to_string())
        })
        .collect()
}
