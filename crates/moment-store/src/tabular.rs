use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::cell::Cell;

/// Row-oriented tabular collaborator: named tables of ordered scalar rows
/// within one store.
///
/// The first row of a table is its header. Rows are append-only; `scan`
/// returns them in append order, header included.
pub trait TabularStore: Send + Sync {
    fn table_exists(&self, name: &str) -> Result<bool>;

    /// Create a table whose first row is the given header. Fails if the
    /// table already exists.
    fn create_table(&self, name: &str, header: &[Cell]) -> Result<()>;

    fn append_row(&self, name: &str, row: &[Cell]) -> Result<()>;

    /// Every row in append order, header first. A missing table scans empty.
    fn scan(&self, name: &str) -> Result<Vec<Vec<Cell>>>;
}

/// SQLite-backed tabular store. One database file is one store; an explicit
/// position column preserves append order, and each row's cells are stored
/// as a JSON array.
pub struct SqliteTabularStore {
    conn: Mutex<Connection>,
}

impl SqliteTabularStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        run_migrations(&conn)?;

        info!("Tabular store opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("store lock poisoned: {}", e))?;
        f(&conn)
    }
}

fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS tables (
            name        TEXT PRIMARY KEY,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS rows (
            table_name  TEXT NOT NULL REFERENCES tables(name),
            position    INTEGER NOT NULL,
            cells       TEXT NOT NULL,
            PRIMARY KEY (table_name, position)
        );
        ",
    )?;
    Ok(())
}

impl TabularStore for SqliteTabularStore {
    fn table_exists(&self, name: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<String> = conn
                .query_row("SELECT name FROM tables WHERE name = ?1", [name], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(found.is_some())
        })
    }

    fn create_table(&self, name: &str, header: &[Cell]) -> Result<()> {
        let header_json = serde_json::to_string(header)?;
        self.with_conn(|conn| {
            conn.execute("INSERT INTO tables (name) VALUES (?1)", [name])?;
            conn.execute(
                "INSERT INTO rows (table_name, position, cells) VALUES (?1, 0, ?2)",
                rusqlite::params![name, header_json],
            )?;
            Ok(())
        })
    }

    fn append_row(&self, name: &str, row: &[Cell]) -> Result<()> {
        let cells_json = serde_json::to_string(row)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO rows (table_name, position, cells)
                 SELECT ?1, COALESCE(MAX(position), -1) + 1, ?2
                 FROM rows WHERE table_name = ?1",
                rusqlite::params![name, cells_json],
            )?;
            Ok(())
        })
    }

    fn scan(&self, name: &str) -> Result<Vec<Vec<Cell>>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT cells FROM rows WHERE table_name = ?1 ORDER BY position")?;
            let rows = stmt.query_map([name], |row| row.get::<_, String>(0))?;

            let mut out = Vec::new();
            for cells_json in rows {
                out.push(serde_json::from_str(&cells_json?)?);
            }
            Ok(out)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_db() -> PathBuf {
        std::env::temp_dir().join(format!("moment-tabular-{}.db", uuid::Uuid::new_v4()))
    }

    fn header() -> Vec<Cell> {
        vec![Cell::text("ID"), Cell::text("Name")]
    }

    #[test]
    fn create_append_scan_preserves_order() {
        let path = temp_db();
        let store = SqliteTabularStore::open(&path).unwrap();

        assert!(!store.table_exists("Moments").unwrap());
        store.create_table("Moments", &header()).unwrap();
        assert!(store.table_exists("Moments").unwrap());

        store
            .append_row("Moments", &[Cell::Int(1), Cell::text("A")])
            .unwrap();
        store
            .append_row("Moments", &[Cell::Int(2), Cell::text("B")])
            .unwrap();

        let rows = store.scan("Moments").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], header());
        assert_eq!(rows[1], vec![Cell::Int(1), Cell::text("A")]);
        assert_eq!(rows[2], vec![Cell::Int(2), Cell::text("B")]);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_table_scans_empty() {
        let path = temp_db();
        let store = SqliteTabularStore::open(&path).unwrap();
        assert!(store.scan("Nowhere").unwrap().is_empty());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn append_to_missing_table_is_rejected() {
        let path = temp_db();
        let store = SqliteTabularStore::open(&path).unwrap();
        assert!(store.append_row("Nowhere", &[Cell::Int(1)]).is_err());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn rows_survive_reopen() {
        let path = temp_db();
        {
            let store = SqliteTabularStore::open(&path).unwrap();
            store.create_table("Moments", &header()).unwrap();
            store
                .append_row("Moments", &[Cell::Int(1), Cell::text("A")])
                .unwrap();
        }
        let store = SqliteTabularStore::open(&path).unwrap();
        assert_eq!(store.scan("Moments").unwrap().len(), 2);
        let _ = std::fs::remove_file(path);
    }
}
