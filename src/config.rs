use crate::model::columns;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetNames {
    #[serde(default = "default_orders_sheet")]
    pub orders: String,
    #[serde(default = "default_stock_sheet")]
    pub stock: String,
    #[serde(default = "default_schedule_sheet")]
    pub schedule: String,
    #[serde(default = "default_options_sheet")]
    pub options: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            orders: default_orders_sheet(),
            stock: default_stock_sheet(),
            schedule: default_schedule_sheet(),
            options: default_options_sheet(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    pub endpoint: String,
    pub api_key: String,
    pub sender: String,
    pub recipients: Vec<String>,
    #[serde(default = "default_alert_subject")]
    pub subject: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_assistant_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default)]
    pub sheets: SheetNames,
    pub alert: Option<AlertConfig>,
    pub assistant: Option<AssistantConfig>,
    #[serde(default = "default_column_synonyms")]
    pub column_synonyms: HashMap<String, String>,
    #[serde(default = "default_upload_columns")]
    pub upload_columns: HashMap<String, String>,
    #[serde(default = "default_date_columns")]
    pub date_columns: Vec<String>,
    #[serde(default = "default_status")]
    pub default_status: String,
    #[serde(default = "default_channel")]
    pub default_channel: String,
    /// Status that marks a design proof as finished.
    #[serde(default = "default_done_status")]
    pub done_status: String,
    /// Keyword matching is literal and case-sensitive unless this is set.
    #[serde(default)]
    pub case_insensitive_keywords: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            sheets: SheetNames::default(),
            alert: None,
            assistant: None,
            column_synonyms: default_column_synonyms(),
            upload_columns: default_upload_columns(),
            date_columns: default_date_columns(),
            default_status: default_status(),
            default_channel: default_channel(),
            done_status: default_done_status(),
            case_insensitive_keywords: false,
        }
    }
}

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_json::from_str(content)?;
    Ok(config)
}

fn default_database_path() -> String {
    "sheets.db".into()
}

fn default_orders_sheet() -> String {
    "orders".into()
}

fn default_stock_sheet() -> String {
    "stock".into()
}

fn default_schedule_sheet() -> String {
    "schedule".into()
}

fn default_options_sheet() -> String {
    "options".into()
}

fn default_alert_subject() -> String {
    "[Stock alert] items at or below safety stock".into()
}

fn default_assistant_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}

fn default_status() -> String {
    "new".into()
}

fn default_channel() -> String {
    "storefront".into()
}

fn default_done_status() -> String {
    "done".into()
}

fn default_date_columns() -> Vec<String> {
    [
        "날짜", "시작일", "종료일", "주문일시", "주문일", "date", "order_date", "start_date", "end_date",
    ]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Sheet header aliases seen across the ledger tabs, keyed by alias.
pub fn default_column_synonyms() -> HashMap<String, String> {
    let groups: [(&str, &[&str]); 20] = [
        (columns::DATE, &["주문일시", "주문일", "일자", "날짜", "order_date", "ordered_at"]),
        (columns::AMOUNT, &["금액", "예상견적", "결제금액", "total_amount"]),
        (columns::BUYER, &["성함", "고객명", "이름", "구매자명", "buyer_name", "recipient"]),
        (columns::PRODUCT, &["상품", "품목", "상품명", "product_name"]),
        (columns::DESIGN_FILE, &["디자인파일", "첨부파일"]),
        (columns::STATUS, &["상태", "진행상태"]),
        (columns::CHANNEL, &["주문처", "source_channel"]),
        (columns::NOTE, &["요청사항", "배송메세지", "delivery_message"]),
        (columns::QUANTITY, &["수량", "qty"]),
        (columns::ORDER_ID, &["주문번호", "상품주문번호", "order_number"]),
        (columns::PHONE, &["연락처", "수취인연락처1", "phone_number"]),
        (columns::ADDRESS, &["주소", "배송지", "통합배송지"]),
        (columns::KEYWORDS, &["키워드", "매칭키워드", "keyword_group"]),
        (columns::CURRENT_STOCK, &["현재재고", "재고", "stock"]),
        (columns::SAFETY_STOCK, &["안전재고", "safety"]),
        (columns::START_DATE, &["시작일"]),
        (columns::END_DATE, &["종료일"]),
        (columns::TIME, &["시간"]),
        (columns::TITLE, &["일정명"]),
        (columns::DETAILS, &["상세내용"]),
    ];
    alias_map(&groups)
}

/// Marketplace order-export headers, matched by exact name.
pub fn default_upload_columns() -> HashMap<String, String> {
    let groups: [(&str, &[&str]); 9] = [
        (columns::ORDER_ID, &["상품주문번호", "Order Number"]),
        (columns::DATE, &["주문일시", "Order Timestamp"]),
        (columns::BUYER, &["수취인명", "Recipient Name"]),
        (columns::PHONE, &["수취인연락처1", "Recipient Phone"]),
        (columns::ADDRESS, &["통합배송지", "Address"]),
        (columns::PRODUCT, &["상품명", "Product Name"]),
        (columns::QUANTITY, &["수량", "Quantity"]),
        (columns::AMOUNT, &["최종 상품별 총 주문금액", "Total Amount"]),
        (columns::NOTE, &["배송메세지", "Delivery Message"]),
    ];
    alias_map(&groups)
}

fn alias_map(groups: &[(&str, &[&str])]) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for (canonical, aliases) in groups {
        for alias in aliases.iter() {
            map.insert(alias.to_string(), canonical.to_string());
        }
    }
    map
}
