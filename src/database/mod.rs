//! Database module
//!
//! This module provides all database functionality for sqlt, organized into:
//!
//! - **core**: SQLite connection wrapper, values and identifier checks
//! - **table**: `Table`, the generic read-through wrapper for one table
//! - **common_table**: `CommonTable`, existing tables with cached metadata
//! - **manager**: `DatabaseManager`, the connection lifecycle
//! - **notify**: the notification boundary for lifecycle outcomes
//!
//! # Architecture
//!
//! ```text
//! database/
//! ├── core/            # Foundation
//! │   ├── connection   # DatabaseConn wrapper, tuning, introspection
//! │   ├── ident        # identifier / type tag checks
//! │   └── value        # CellValue and Row
//! ├── table            # Table, TableOptions, FlatTable
//! ├── common_table     # CommonTable and its cache
//! ├── manager          # DatabaseManager state machine
//! └── notify           # Notice / Notifier
//! ```
//!
//! # Ownership
//!
//! The manager owns the connection. Tables only hold a weak reference, so a
//! table that outlives a disconnect keeps working as a no-op instead of
//! touching a closed handle.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sqlt::database::*;
//!
//! let options = DatabaseOptions::new("/path/to/vault", "sqlite_tables");
//! let mut manager = DatabaseManager::new(options.clone(), Arc::new(LogNotifier));
//! if !manager.connect_database(|_| {}) {
//!     manager.create_database(options, |_| {});
//! }
//!
//! let notes = Table::new(
//!     TableOptions::named("notes")
//!         .with_column("title", ColumnType::Text)
//!         .with_column("stars", ColumnType::Integer),
//!     &manager,
//! )?;
//! notes.insert(&[CellValue::from("hello"), CellValue::from(5)])?;
//!
//! manager.recache()?;
//! let common = CommonTable::new(TableOptions::named("notes"), &manager)?;
//! println!("{} rows, {} columns", common.size()?, common.length());
//! ```

pub mod common_table;
pub mod core;
pub mod error;
pub mod manager;
pub mod notify;
pub mod table;

pub use common_table::{collect_table_stats, CommonTable, CommonTableCache, TableStats};
pub use self::core::{CellValue, DatabaseConn, EngineTuning, Generation, Row, WILDCARD};
pub use error::{DatabaseError, DbResult};
pub use manager::{
    database_path, DatabaseManager, DatabaseOptions, DebugAggregate, ManagerCache, Removal,
    DATABASE_EXTENSION,
};
pub use notify::{LogNotifier, Notice, NoticeLog, Notifier};
pub use table::{ColumnType, FlatTable, Table, TableOptions, DEFAULT_ENCODING};
