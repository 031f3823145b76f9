//! Database connection management
//!
//! This module provides the engine handle used by the manager and the table
//! wrappers: opening and creating database files, tuning pragmas, statement
//! execution and schema introspection.

use rusqlite::{params_from_iter, Connection, OpenFlags};
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

use super::ident::{quote_identifier, validate_identifier};
use super::value::{CellValue, Row};
use crate::database::error::{DatabaseError, DbResult};

static NEXT_EPOCH: AtomicU64 = AtomicU64::new(1);

/// Engine-specific tuning applied right after a connection is opened
///
/// Every field is optional; `None`/`false` leaves the SQLite default in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineTuning {
    /// `PRAGMA journal_mode`, e.g. `WAL` or `DELETE`
    pub journal_mode: Option<String>,
    /// `PRAGMA synchronous`, e.g. `NORMAL` or `FULL`
    pub synchronous: Option<String>,
    /// `PRAGMA cache_size`
    pub cache_size: Option<i64>,
    /// `PRAGMA foreign_keys=ON`
    pub foreign_keys: bool,
}

/// Snapshot of a connection's mutation counters
///
/// Caches record the generation they were computed at; any later schema or
/// row mutation through a table wrapper makes the generations differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation {
    /// Unique per opened connection, so a reconnect never looks fresh
    pub epoch: u64,
    pub schema: u64,
    pub data: u64,
}

/// Core database connection wrapper
///
/// `DatabaseConn` owns the `rusqlite` connection for one database file.
/// It is owned by the `DatabaseManager`; table wrappers only ever hold a
/// weak reference to it.
pub struct DatabaseConn {
    pub conn: Connection,
    path: PathBuf,
    verbose: bool,
    epoch: u64,
    schema_generation: Cell<u64>,
    data_generation: Cell<u64>,
}

impl DatabaseConn {
    /// Open an existing database file
    ///
    /// Never creates the file: a missing path is an error from the engine.
    pub fn open_existing(path: &Path, tuning: &EngineTuning, verbose: bool) -> DbResult<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)?;

        let db = DatabaseConn {
            conn,
            path: path.to_path_buf(),
            verbose,
            epoch: NEXT_EPOCH.fetch_add(1, Ordering::Relaxed),
            schema_generation: Cell::new(0),
            data_generation: Cell::new(0),
        };
        db.configure(tuning)?;
        debug!("Opened database at '{}'", path.display());
        Ok(db)
    }

    /// Create an empty database file at `path`
    ///
    /// The text encoding can only be chosen before anything is written, so it
    /// is applied here. The handle is closed again before returning.
    pub fn create_file(path: &Path, encoding: Option<&str>) -> DbResult<()> {
        let conn = Connection::open(path)?;

        if let Some(encoding) = encoding {
            let encoding = normalize_encoding(encoding)?;
            conn.execute_batch(&format!("PRAGMA encoding = '{}'", encoding))?;
        }

        // writing the header makes the file a real, non-empty database
        conn.execute_batch("PRAGMA user_version = 0")?;
        conn.close().map_err(|(_, e)| DatabaseError::from(e))?;

        debug!("Created database file '{}'", path.display());
        Ok(())
    }

    /// Apply the tuning pragmas
    fn configure(&self, tuning: &EngineTuning) -> DbResult<()> {
        if let Some(mode) = &tuning.journal_mode {
            let mode = validate_identifier(mode)?;
            let _: String =
                self.conn
                    .query_row(&format!("PRAGMA journal_mode={}", mode), [], |row| {
                        row.get(0)
                    })?;
        }

        if let Some(sync) = &tuning.synchronous {
            let sync = validate_identifier(sync)?;
            self.conn
                .execute(&format!("PRAGMA synchronous={}", sync), [])?;
        }

        if let Some(size) = tuning.cache_size {
            self.conn
                .execute(&format!("PRAGMA cache_size={}", size), [])?;
        }

        if tuning.foreign_keys {
            self.conn.execute("PRAGMA foreign_keys=ON", [])?;
        }

        Ok(())
    }

    /// Close the connection, reporting any error from the engine
    pub fn close(self) -> DbResult<()> {
        let path = self.path;
        self.conn.close().map_err(|(_, e)| DatabaseError::from(e))?;
        debug!("Closed database at '{}'", path.display());
        Ok(())
    }

    fn trace_sql(&self, sql: &str) {
        if self.verbose {
            trace!(target: "sqlt::sql", "{}", sql);
        }
    }

    /// Execute a statement with positional parameters
    pub fn execute(&self, sql: &str, params: &[CellValue]) -> DbResult<usize> {
        self.trace_sql(sql);
        Ok(self.conn.execute(sql, params_from_iter(params.iter()))?)
    }

    /// Execute one or more statements without parameters
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.trace_sql(sql);
        Ok(self.conn.execute_batch(sql)?)
    }

    /// Run a query and collect every row as an ordered field/value record
    pub fn query_rows(&self, sql: &str, params: &[CellValue]) -> DbResult<Vec<Row>> {
        self.trace_sql(sql);
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let values = (0..columns.len())
                .map(|i| row.get_ref(i).map(CellValue::from))
                .collect::<Result<Vec<_>, _>>()?;
            records.push(Row::new(columns.clone(), values));
        }
        Ok(records)
    }

    /// Names of every table in the schema catalog, in catalog order
    pub fn table_names(&self) -> DbResult<Vec<String>> {
        let sql = "SELECT name FROM sqlite_master WHERE type='table'";
        self.trace_sql(sql);
        let mut stmt = self.conn.prepare(sql)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Number of tables in the schema catalog
    pub fn count_tables(&self) -> DbResult<usize> {
        let sql = "SELECT COUNT(*) FROM sqlite_master WHERE type='table'";
        self.trace_sql(sql);
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Column names of a table, in declaration order
    ///
    /// An unknown table yields an empty list, as `PRAGMA table_info` does.
    pub fn table_columns(&self, table_name: &str) -> DbResult<Vec<String>> {
        let sql = format!("PRAGMA table_info({})", quote_identifier(table_name));
        self.trace_sql(&sql);
        let mut stmt = self.conn.prepare(&sql)?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    pub fn generation(&self) -> Generation {
        Generation {
            epoch: self.epoch,
            schema: self.schema_generation.get(),
            data: self.data_generation.get(),
        }
    }

    pub(crate) fn bump_schema(&self) {
        self.schema_generation.set(self.schema_generation.get() + 1);
    }

    pub(crate) fn bump_data(&self) {
        self.data_generation.set(self.data_generation.get() + 1);
    }
}

/// Map the short encoding names callers use (`utf8`) to SQLite's spelling
fn normalize_encoding(encoding: &str) -> DbResult<&'static str> {
    match encoding.to_ascii_lowercase().replace('-', "").as_str() {
        "utf8" => Ok("UTF-8"),
        "utf16" => Ok("UTF-16"),
        "utf16le" => Ok("UTF-16le"),
        "utf16be" => Ok("UTF-16be"),
        _ => Err(DatabaseError::InvalidType(encoding.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_db(dir: &tempfile::TempDir) -> DatabaseConn {
        let path = dir.path().join("scratch.db");
        DatabaseConn::create_file(&path, Some("utf8")).unwrap();
        DatabaseConn::open_existing(&path, &EngineTuning::default(), true).unwrap()
    }

    #[test]
    fn test_open_existing_never_creates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");
        let db = DatabaseConn::open_existing(&path, &EngineTuning::default(), false);
        assert!(db.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.db");
        DatabaseConn::create_file(&path, None).unwrap();
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_tuning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tuned.db");
        DatabaseConn::create_file(&path, None).unwrap();

        let tuning = EngineTuning {
            journal_mode: Some("DELETE".to_string()),
            synchronous: Some("NORMAL".to_string()),
            cache_size: Some(2000),
            foreign_keys: true,
        };
        let db = DatabaseConn::open_existing(&path, &tuning, false).unwrap();
        let fk: i64 = db
            .conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);

        let bad = EngineTuning {
            journal_mode: Some("WAL; DROP TABLE x".to_string()),
            ..Default::default()
        };
        assert!(DatabaseConn::open_existing(&path, &bad, false).is_err());
    }

    #[test]
    fn test_catalog_and_introspection() {
        let dir = tempfile::tempdir().unwrap();
        let db = scratch_db(&dir);
        assert_eq!(db.count_tables().unwrap(), 0);

        db.execute_batch("CREATE TABLE t (a TEXT, b INTEGER)").unwrap();
        db.execute_batch("CREATE TABLE u (id INTEGER)").unwrap();

        assert_eq!(db.count_tables().unwrap(), 2);
        assert_eq!(db.table_names().unwrap(), vec!["t", "u"]);
        assert_eq!(db.table_columns("t").unwrap(), vec!["a", "b"]);
        assert!(db.table_columns("v").unwrap().is_empty());

        db.execute_batch("CREATE TABLE \"my \"\"odd\"\" table\" (\"col 1\" TEXT)")
            .unwrap();
        assert_eq!(db.table_columns("my \"odd\" table").unwrap(), vec!["col 1"]);
    }

    #[test]
    fn test_query_rows() {
        let dir = tempfile::tempdir().unwrap();
        let db = scratch_db(&dir);
        db.execute_batch("CREATE TABLE t (a TEXT, b INTEGER)").unwrap();
        db.execute(
            "INSERT INTO t (a, b) VALUES (?1, ?2)",
            &[CellValue::Text("x".into()), CellValue::Integer(1)],
        )
        .unwrap();

        let rows = db.query_rows("SELECT * FROM t", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(rows[0].get("a"), Some(&CellValue::Text("x".into())));
        assert_eq!(rows[0].get("b"), Some(&CellValue::Integer(1)));
    }

    #[test]
    fn test_generations() {
        let dir = tempfile::tempdir().unwrap();
        let db = scratch_db(&dir);
        let before = db.generation();
        db.bump_data();
        db.bump_schema();
        let after = db.generation();
        assert_eq!(before.epoch, after.epoch);
        assert_eq!(after.schema, before.schema + 1);
        assert_eq!(after.data, before.data + 1);

        let other_dir = tempfile::tempdir().unwrap();
        let other = scratch_db(&other_dir);
        assert_ne!(other.generation().epoch, before.epoch);
    }

    #[test]
    fn test_normalize_encoding() {
        assert_eq!(normalize_encoding("utf8").unwrap(), "UTF-8");
        assert_eq!(normalize_encoding("UTF-16le").unwrap(), "UTF-16le");
        assert!(normalize_encoding("latin1").is_err());
    }
}
