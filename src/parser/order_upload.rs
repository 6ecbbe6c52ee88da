// Marketplace order-export parsing
use crate::model::ParserError;
use crate::storage::SheetTable;
use std::collections::HashMap;

pub trait Parser {
    fn parse(&self, data: &[u8]) -> Result<SheetTable, ParserError>;
}

/// Reads a marketplace CSV export. The first physical line of the export is a
/// banner (possibly blank) and is ignored; the header is the second line. Known headers are renamed
/// to canonical columns by exact name, the rest are kept as-is.
pub struct OrderUploadParser {
    columns: HashMap<String, String>,
}

impl OrderUploadParser {
    pub fn new(columns: HashMap<String, String>) -> Self {
        Self { columns }
    }
}

impl Parser for OrderUploadParser {
    fn parse(&self, data: &[u8]) -> Result<SheetTable, ParserError> {
        let data = data.strip_prefix("\u{feff}".as_bytes()).unwrap_or(data);
        // csv skips empty lines, so the banner is cut by position, not by record
        let Some(banner_end) = data.iter().position(|b| *b == b'\n') else {
            return Err(ParserError::MissingHeader);
        };
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(&data[banner_end + 1..]);

        let mut records = reader.records();
        let header: Vec<String> = match records.next() {
            Some(record) => {
                let record = record?;
                if record.position().map(|p| p.line()) != Some(1) {
                    return Err(ParserError::MissingHeader);
                }
                record
                    .iter()
                    .map(|h| self.columns.get(h).cloned().unwrap_or_else(|| h.to_string()))
                    .collect()
            }
            None => return Err(ParserError::MissingHeader),
        };
        if header.iter().all(|h| h.is_empty()) {
            return Err(ParserError::MissingHeader);
        }

        let mut rows = Vec::new();
        for record in records {
            let row: Vec<String> = record?.iter().map(str::to_string).collect();
            if row.iter().all(|c| c.is_empty()) {
                continue;
            }
            rows.push(row);
        }

        Ok(SheetTable::new(header, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_upload_columns;

    fn parser() -> OrderUploadParser {
        OrderUploadParser::new(default_upload_columns())
    }

    #[test]
    fn header_is_taken_from_second_line() {
        let csv = "\u{feff}발주발송관리 다운로드,,\n\
                   상품주문번호,상품명,수량,배송메세지,옵션정보\n\
                   2024050112345,바스 타월 세트,2,문 앞,White\n\
                   ,,,,\n\
                   2024050112346,머그컵,1,,\n";
        let table = parser().parse(csv.as_bytes()).unwrap();
        assert_eq!(table.header, vec!["order_id", "product", "quantity", "note", "옵션정보"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][1], "바스 타월 세트");
        assert_eq!(table.rows[1], vec!["2024050112346", "머그컵", "1", "", ""]);
    }

    #[test]
    fn english_export_headers_are_recognized() {
        let csv = "Orders\nOrder Number,Order Timestamp,Product Name,Quantity,Total Amount\nA1,2024-05-01 10:00,Mug,1,\"12,000\"\n";
        let table = parser().parse(csv.as_bytes()).unwrap();
        assert_eq!(table.header, vec!["order_id", "date", "product", "quantity", "amount"]);
        assert_eq!(table.rows[0][4], "12,000");
    }

    #[test]
    fn single_line_upload_has_no_header() {
        let result = parser().parse("상품명,수량\n".as_bytes());
        assert!(matches!(result, Err(ParserError::MissingHeader)));
        assert!(matches!(parser().parse(b""), Err(ParserError::MissingHeader)));
    }

    #[test]
    fn blank_banner_line_keeps_the_header() {
        let table = parser().parse("\n상품명,수량\n머그컵,1\n타월,2\n".as_bytes()).unwrap();
        assert_eq!(table.header, vec!["product", "quantity"]);
        assert_eq!(table.rows, vec![vec!["머그컵", "1"], vec!["타월", "2"]]);

        let table = parser().parse("\r\n상품명,수량\r\n머그컵,1\r\n".as_bytes()).unwrap();
        assert_eq!(table.header, vec!["product", "quantity"]);
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn blank_header_line_is_rejected() {
        let result = parser().parse("banner\n\n머그컵,1\n".as_bytes());
        assert!(matches!(result, Err(ParserError::MissingHeader)));
    }
}
