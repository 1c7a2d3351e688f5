use promptlog_core::domain::Table;
use promptlog_core::error::StoreError;
use promptlog_core::ports::TableStore;
use rusqlite::{params, Connection, OpenFlags, Row};
use tracing::debug;

/// SQLite implementation of the TableStore trait.
///
/// Each worksheet is a set of rows in `worksheet_rows`; row 0 is the header
/// and every row's cells are stored as a JSON array.
pub struct SqliteTableStore {
    db_path: String,
    worksheet: String,
}

impl SqliteTableStore {
    /// Creates a new SqliteTableStore for one worksheet in the given database file
    pub fn new(db_path: impl Into<String>, worksheet: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            worksheet: worksheet.into(),
        }
    }

    fn open(&self) -> rusqlite::Result<Connection> {
        Connection::open(&self.db_path)
    }

    /// Reads never create the database file; a missing file is a read error.
    fn open_existing(&self) -> rusqlite::Result<Connection> {
        Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
    }

    fn decode_row(row: &Row) -> rusqlite::Result<Vec<String>> {
        let cells: String = row.get(0)?;
        serde_json::from_str(&cells).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
    }

    fn write_grid(&self, conn: &mut Connection, grid: &[Vec<String>]) -> rusqlite::Result<()> {
        let tx = conn.transaction()?;
        tx.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS worksheet_rows (
                worksheet TEXT NOT NULL,
                row_index INTEGER NOT NULL,
                cells TEXT NOT NULL,
                PRIMARY KEY (worksheet, row_index)
            );
            "#,
        )?;
        tx.execute(
            "DELETE FROM worksheet_rows WHERE worksheet = ?1",
            params![self.worksheet],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO worksheet_rows (worksheet, row_index, cells) VALUES (?1, ?2, ?3)",
            )?;
            for (index, row) in grid.iter().enumerate() {
                let cells = serde_json::to_string(row)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                stmt.execute(params![self.worksheet, index as i64, cells])?;
            }
        }
        tx.commit()
    }
}

impl TableStore for SqliteTableStore {
    fn read(&self) -> Result<Table, StoreError> {
        let read = || -> rusqlite::Result<Vec<Vec<String>>> {
            let conn = self.open_existing()?;
            let mut stmt = conn.prepare(
                "SELECT cells FROM worksheet_rows WHERE worksheet = ?1 ORDER BY row_index ASC",
            )?;
            let rows = stmt
                .query_map(params![self.worksheet], |row| Self::decode_row(row))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        };

        let grid = read().map_err(|e| StoreError::Read(e.to_string()))?;
        debug!(db = %self.db_path, worksheet = %self.worksheet, rows = grid.len(), "sqlite read");
        Ok(Table::from_grid(grid))
    }

    fn write(&self, table: &Table) -> Result<(), StoreError> {
        let grid = table.to_grid();
        let mut conn = self.open().map_err(|e| StoreError::Write(e.to_string()))?;
        self.write_grid(&mut conn, &grid)
            .map_err(|e| StoreError::Write(e.to_string()))?;
        debug!(db = %self.db_path, worksheet = %self.worksheet, rows = grid.len(), "sqlite overwrite");
        Ok(())
    }
}
