use super::{find_in_rows, set_cell, CellRef, SheetStore, SheetTable, Worksheet};
use crate::model::StoreError;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Sheet store backed by a local SQLite file. Each worksheet row is kept as a
/// JSON array of cell strings keyed by its 1-based row number.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens the database and creates the tables if needed.
    pub fn new(db_path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        Self::migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn migrate(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS sheets (
                name TEXT PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS sheet_rows (
                sheet TEXT NOT NULL,
                row_idx INTEGER NOT NULL,
                cells TEXT NOT NULL,
                PRIMARY KEY (sheet, row_idx)
            );
            ",
        )?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl SheetStore for SqliteStore {
    async fn open(&self, sheet_name: &str) -> Result<Arc<dyn Worksheet>, StoreError> {
        self.conn.lock().await.execute(
            "INSERT OR IGNORE INTO sheets (name) VALUES (?1)",
            params![sheet_name],
        )?;
        Ok(Arc::new(SqliteSheet {
            name: sheet_name.to_string(),
            conn: self.conn.clone(),
        }))
    }
}

pub struct SqliteSheet {
    name: String,
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSheet {
    fn load_rows(conn: &Connection, sheet: &str) -> Result<Vec<(usize, Vec<String>)>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT row_idx, cells FROM sheet_rows WHERE sheet = ?1 ORDER BY row_idx ASC",
        )?;
        let rows = stmt.query_map(params![sheet], |row| {
            let idx: i64 = row.get(0)?;
            let cells: String = row.get(1)?;
            Ok((idx, cells))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (idx, cells) = row?;
            result.push((idx as usize, serde_json::from_str(&cells)?));
        }
        Ok(result)
    }
}

#[async_trait::async_trait]
impl Worksheet for SqliteSheet {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_all(&self) -> Result<SheetTable, StoreError> {
        let conn = self.conn.lock().await;
        let mut rows = Self::load_rows(&conn, &self.name)?
            .into_iter()
            .map(|(_, cells)| cells);
        let Some(header) = rows.next() else {
            return Ok(SheetTable::default());
        };
        Ok(SheetTable::new(header, rows.collect()))
    }

    async fn append_rows(&self, rows: &[Vec<String>]) -> Result<usize, StoreError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        let last: i64 = tx.query_row(
            "SELECT COALESCE(MAX(row_idx), 0) FROM sheet_rows WHERE sheet = ?1",
            params![&self.name],
            |row| row.get(0),
        )?;
        for (offset, row) in rows.iter().enumerate() {
            tx.execute(
                "INSERT INTO sheet_rows (sheet, row_idx, cells) VALUES (?1, ?2, ?3)",
                params![&self.name, last + 1 + offset as i64, serde_json::to_string(row)?],
            )?;
        }
        tx.commit()?;
        debug!("Appended {} rows to '{}'", rows.len(), self.name);
        Ok(rows.len())
    }

    async fn update_cell(&self, row: usize, col: usize, value: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        let out_of_range = || StoreError::OutOfRange {
            sheet: self.name.clone(),
            row,
            col,
        };
        if row == 0 || col == 0 {
            return Err(out_of_range());
        }
        let stored: Option<String> = conn
            .query_row(
                "SELECT cells FROM sheet_rows WHERE sheet = ?1 AND row_idx = ?2",
                params![&self.name, row as i64],
                |r| r.get(0),
            )
            .optional()?;
        let Some(stored) = stored else {
            return Err(out_of_range());
        };
        let mut cells: Vec<String> = serde_json::from_str(&stored)?;
        set_cell(&mut cells, col, value);
        conn.execute(
            "UPDATE sheet_rows SET cells = ?3 WHERE sheet = ?1 AND row_idx = ?2",
            params![&self.name, row as i64, serde_json::to_string(&cells)?],
        )?;
        Ok(())
    }

    async fn find(&self, value: &str) -> Result<Option<CellRef>, StoreError> {
        let conn = self.conn.lock().await;
        let rows = Self::load_rows(&conn, &self.name)?;
        // stored row numbers are contiguous from 1, so position equals row - 1
        Ok(find_in_rows(rows.iter().map(|(_, cells)| cells), value))
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.conn.lock().await.execute(
            "DELETE FROM sheet_rows WHERE sheet = ?1",
            params![&self.name],
        )?;
        Ok(())
    }
}
