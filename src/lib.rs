#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! sqlt - table storage on an embedded SQLite database
//!
//! sqlt manages one on-disk SQLite file per data directory and exposes its
//! tables through a small CRUD wrapper. It can be used as a library or through
//! the `sqlt` command-line tool.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | (none) | Connection lifecycle, tables, notifications | `rusqlite` |
//! | `lens` | Status and embed lenses, table rendering | `regex`, `tabled` |
//! | `cli` | The `sqlt` binary | All above + `clap`, `tracing-subscriber` |
//!
//! ```toml
//! # Library only
//! sqlt = { version = "0.3", default-features = false }
//!
//! # Default (CLI binary)
//! sqlt = "0.3"
//! ```
//!
//! # Architecture
//!
//! - **[`database`]**: always available
//!   - `manager`: `DatabaseManager`, connect / create / destroy / disconnect
//!   - `table`: `Table`, insert / select / update / delete / drop / flatten
//!   - `common_table`: `CommonTable`, existing tables with cached metadata
//!   - `notify`: lifecycle outcomes reported to a `Notifier`
//!
//! - **[`lens`]**: status report and table embedding (requires `lens`)
//!
//! - **[`config`]**: configuration file and environment handling
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sqlt::database::*;
//!
//! let options = DatabaseOptions::new("/path/to/vault", "sqlite_tables");
//! let mut manager = DatabaseManager::new(options.clone(), Arc::new(LogNotifier));
//! manager.create_database(options, |_| {});
//!
//! let people = Table::new(
//!     TableOptions::named("people")
//!         .with_columns(["name", "age"])
//!         .with_types(["TEXT", "INTEGER"]),
//!     &manager,
//! )?;
//! people
//!     .insert(&["Ada".into(), 36.into()])?
//!     .update("age", 37.into(), "name = 'Ada'")?;
//!
//! for row in people.select(&["name", "age"])? {
//!     println!("{:?}", row.get("age"));
//! }
//! ```

pub mod config;
pub mod database;

// Lens module - feature gated
#[cfg(feature = "lens")]
pub mod lens;

// =============================================================================
// Configuration (always available)
// =============================================================================

pub use config::SqltConfig;

// =============================================================================
// Database Module - Re-export commonly used types
// =============================================================================

pub use database::{
    CellValue, ColumnType, CommonTable, DatabaseError, DatabaseManager, DatabaseOptions, DbResult,
    FlatTable, LogNotifier, Notice, NoticeLog, Notifier, Row, Table, TableOptions,
};

// =============================================================================
// Lens Module - Feature-gated exports
// =============================================================================

#[cfg(feature = "lens")]
pub use lens::utils::OutputFormat;
