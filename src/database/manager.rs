//! Database connection lifecycle
//!
//! [`DatabaseManager`] owns the single engine handle for one database file and
//! moves between two states: disconnected (no handle) and connected. Missing
//! or already-present files are not errors here; outcomes go to the
//! [`Notifier`] and the manager stays in a consistent state.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::database::common_table::collect_table_stats;
use crate::database::core::{DatabaseConn, EngineTuning, Generation};
use crate::database::error::{DatabaseError, DbResult};
use crate::database::notify::{Notice, Notifier};

/// File extension of database files
pub const DATABASE_EXTENSION: &str = "db";

/// Where the database lives and how the engine is opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseOptions {
    /// Directory holding the database file
    pub base_dir: PathBuf,
    /// Database name; the file is `<base_dir>/<name>.db`
    pub name: String,
    /// Trace every SQL statement issued
    pub verbose: bool,
    /// Text encoding applied when the file is created
    pub encoding: Option<String>,
    pub tuning: EngineTuning,
}

impl DatabaseOptions {
    pub fn new(base_dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            name: name.into(),
            verbose: false,
            encoding: None,
            tuning: EngineTuning::default(),
        }
    }

    pub fn with_tuning(mut self, tuning: EngineTuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Full path of the database file
    pub fn path(&self) -> PathBuf {
        database_path(&self.base_dir, &self.name)
    }
}

/// `<base_dir>/<name>.db`
pub fn database_path(base_dir: &Path, name: &str) -> PathBuf {
    base_dir.join(format!("{}.{}", name, DATABASE_EXTENSION))
}

/// Table list and count cached on the manager
///
/// Refreshed on connect and by [`DatabaseManager::recache`]; stale otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ManagerCache {
    /// `None` until the first count
    pub table_count: Option<usize>,
    pub tables: Vec<String>,
    #[serde(skip)]
    generation: Option<Generation>,
}

/// Totals gathered at connect time in debug mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DebugAggregate {
    pub table_count: usize,
    pub row_count: usize,
    pub column_count: usize,
}

impl DebugAggregate {
    /// One-line summary used by status displays
    pub fn summary(&self) -> String {
        format!(
            "Loaded {} tables, {} columns, and {} rows.",
            self.table_count, self.column_count, self.row_count
        )
    }
}

/// Pending background removal of a database file
pub struct Removal {
    path: PathBuf,
    handle: JoinHandle<DbResult<()>>,
}

impl Removal {
    /// Block until the removal completes
    pub fn wait(self) -> DbResult<()> {
        let path = self.path;
        self.handle
            .join()
            .unwrap_or(Err(DatabaseError::RemovalAborted { path }))
    }
}

/// Owner of the connection to one database file
pub struct DatabaseManager {
    database: Option<Rc<DatabaseConn>>,
    connected: bool,
    options: DatabaseOptions,
    debug_mode: bool,
    notifier: Arc<dyn Notifier>,
    cached: ManagerCache,
    debug: DebugAggregate,
}

impl DatabaseManager {
    /// Create a disconnected manager
    pub fn new(options: DatabaseOptions, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            database: None,
            connected: false,
            options,
            debug_mode: false,
            notifier,
            cached: ManagerCache::default(),
            debug: DebugAggregate::default(),
        }
    }

    /// Enable per-table diagnostics and the debug aggregate on connect
    pub fn with_debug_mode(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Connect to the configured database file.
    ///
    /// The file must already exist. Any previous connection is closed first.
    /// `callback` runs exactly once, after the outcome has been notified.
    /// Returns whether the manager ended up connected.
    pub fn connect_database<F>(&mut self, callback: F) -> bool
    where
        F: FnOnce(&Self),
    {
        self.connect();
        callback(self);
        self.connected
    }

    fn connect(&mut self) {
        self.disconnect_database();
        let path = self.options.path();

        if !path.is_file() {
            self.notifier.notify(Notice::ConnectFailed);
            if self.debug_mode {
                error!(
                    "Database '{}' does not exist or could not be found.",
                    path.display()
                );
            }
            return;
        }

        match self.open(&path) {
            Ok(()) => {
                info!("Connected to database '{}'", path.display());
                self.notifier.notify(Notice::Connected);
            }
            Err(e) => {
                self.disconnect_database();
                self.notifier.notify(Notice::ConnectFailed);
                if self.debug_mode {
                    error!("Failed to open database '{}': {}", path.display(), e);
                }
            }
        }
    }

    fn open(&mut self, path: &Path) -> DbResult<()> {
        let conn = DatabaseConn::open_existing(path, &self.options.tuning, self.options.verbose)?;
        self.database = Some(Rc::new(conn));
        self.connected = true;

        self.recache()?;
        if self.debug_mode {
            // diagnostics only; a failed count never decides the connection
            if let Err(e) = self.aggregate_debug() {
                warn!("Could not aggregate table statistics: {}", e);
            }
        }
        Ok(())
    }

    /// Close the connection if there is one. Safe to call repeatedly.
    pub fn disconnect_database(&mut self) {
        if let Some(database) = self.database.take() {
            match Rc::try_unwrap(database) {
                Ok(conn) => {
                    if let Err(e) = conn.close() {
                        warn!("Error while closing database: {}", e);
                    }
                }
                Err(_) => {
                    warn!("Database handle still in use; it will close once released");
                }
            }
        }
        self.connected = false;
    }

    /// Disconnect, then connect again
    pub fn reconnect<F>(&mut self, callback: F) -> bool
    where
        F: FnOnce(&Self),
    {
        self.disconnect_database();
        self.connect_database(callback)
    }

    /// Create a new, empty database file and connect to it.
    ///
    /// `options` becomes the manager's configuration when the file is created.
    /// If a file is already present nothing changes and
    /// [`Notice::AlreadyExists`] is reported. `callback` runs exactly once.
    pub fn create_database<F>(&mut self, options: DatabaseOptions, callback: F) -> bool
    where
        F: FnOnce(&Self),
    {
        let path = options.path();

        if path.exists() {
            self.notifier.notify(Notice::AlreadyExists);
            if self.debug_mode {
                error!("Database '{}' already exists.", path.display());
            }
            callback(self);
            return false;
        }

        if let Err(e) = create_database_file(&options) {
            self.notifier.notify(Notice::CreateFailed(e.to_string()));
            if self.debug_mode {
                error!("{}", e);
            }
            callback(self);
            return false;
        }

        self.notifier.notify(Notice::Created);
        self.options = options;
        self.connect_database(callback)
    }

    /// Close any connection and remove `<base_dir>/<name>.db`.
    ///
    /// Returns `None` (after reporting [`Notice::DestroyFailed`]) when there is
    /// no such file. Otherwise the removal runs on a background thread; its
    /// outcome is notified when it finishes and is available from
    /// [`Removal::wait`]. `callback` runs once the removal has started.
    pub fn destroy_database<F>(&mut self, base_dir: &Path, name: &str, callback: F) -> Option<Removal>
    where
        F: FnOnce(&Self),
    {
        let path = database_path(base_dir, name);

        if !path.is_file() {
            self.notifier
                .notify(Notice::DestroyFailed("database not found".to_string()));
            if self.debug_mode {
                error!("Database '{}' does not exist.", path.display());
            }
            return None;
        }

        // the engine must release the file before it can be removed
        self.disconnect_database();

        let notifier = Arc::clone(&self.notifier);
        let debug_mode = self.debug_mode;
        let target = path.clone();
        let handle =
            thread::spawn(move || remove_database_file(target, notifier.as_ref(), debug_mode));

        callback(self);
        Some(Removal { path, handle })
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Number of tables, from the cache unless `force_recache` is set or the
    /// count was never taken.
    pub fn table_count(&mut self, force_recache: bool) -> DbResult<usize> {
        match self.cached.table_count {
            Some(count) if !force_recache => Ok(count),
            _ => {
                let count = match &self.database {
                    Some(db) => db.count_tables()?,
                    None => 0,
                };
                self.cached.table_count = Some(count);
                Ok(count)
            }
        }
    }

    /// Names of all tables, read live from the catalog.
    ///
    /// Does not touch the cache; see [`cached`](Self::cached).
    pub fn tables(&self) -> DbResult<Vec<String>> {
        match &self.database {
            Some(db) => db.table_names(),
            None => Ok(Vec::new()),
        }
    }

    /// Refresh the cached table list and count
    pub fn recache(&mut self) -> DbResult<&ManagerCache> {
        self.cached.tables = self.tables()?;
        self.table_count(true)?;
        self.cached.generation = self.database.as_ref().map(|db| db.generation());
        Ok(&self.cached)
    }

    /// True when the cache predates the current connection or any mutation
    /// made through it.
    pub fn cache_is_stale(&self) -> bool {
        match (&self.database, self.cached.generation) {
            (Some(db), Some(recorded)) => recorded != db.generation(),
            _ => true,
        }
    }

    /// Recount rows and columns of every cached table into [`debug`](Self::debug)
    pub fn aggregate_debug(&mut self) -> DbResult<DebugAggregate> {
        let names = self.cached.tables.clone();
        let stats = collect_table_stats(self, &names)?;

        let mut aggregate = DebugAggregate::default();
        for (name, table) in &stats {
            debug!(
                "Table \"{}\" has {} rows and {} columns.",
                name, table.row_count, table.column_count
            );
            aggregate.row_count += table.row_count;
            aggregate.column_count += table.column_count;
        }
        aggregate.table_count = self.table_count(true)?;

        self.debug = aggregate;
        Ok(aggregate)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// The live connection, if any
    pub fn database(&self) -> Option<&DatabaseConn> {
        self.database.as_deref()
    }

    /// Non-owning reference to the live connection for table wrappers
    pub fn handle(&self) -> Weak<DatabaseConn> {
        self.database
            .as_ref()
            .map(Rc::downgrade)
            .unwrap_or_default()
    }

    pub fn options(&self) -> &DatabaseOptions {
        &self.options
    }

    pub fn cached(&self) -> &ManagerCache {
        &self.cached
    }

    pub fn debug(&self) -> &DebugAggregate {
        &self.debug
    }

    pub fn debug_mode(&self) -> bool {
        self.debug_mode
    }
}

impl Drop for DatabaseManager {
    fn drop(&mut self) {
        self.disconnect_database();
    }
}

/// Delete the database file and report the outcome
fn remove_database_file(
    path: PathBuf,
    notifier: &dyn Notifier,
    debug_mode: bool,
) -> DbResult<()> {
    match std::fs::remove_file(&path) {
        Ok(()) => {
            notifier.notify(Notice::Destroyed);
            Ok(())
        }
        Err(e) => {
            notifier.notify(Notice::DestroyFailed(e.to_string()));
            if debug_mode {
                error!("Failed to remove '{}': {}", path.display(), e);
            }
            Err(DatabaseError::io(path, e))
        }
    }
}

fn create_database_file(options: &DatabaseOptions) -> DbResult<()> {
    std::fs::create_dir_all(&options.base_dir)
        .map_err(|e| DatabaseError::io(&options.base_dir, e))?;
    DatabaseConn::create_file(&options.path(), options.encoding.as_deref())
}
