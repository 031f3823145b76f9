//! Error types for the database layer

use std::path::PathBuf;

/// Errors surfaced by the database layer.
///
/// Precondition failures on connect/create/destroy are not errors: they are
/// reported through the [`Notifier`](crate::database::Notifier) and leave the
/// manager untouched. Everything here is something the caller has to handle.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// The table is not present in the manager's cached table list
    #[error("Table \"{name}\" does not exist in the database. CommonTable cannot be created.")]
    TableNotFound { name: String },

    /// A table or column name that is not a plain SQL identifier
    #[error("invalid identifier {0:?}: expected letters, digits or '_' and a non-digit first character")]
    InvalidIdentifier(String),

    /// A column type tag containing characters outside of a type declaration
    #[error("invalid column type {0:?}")]
    InvalidType(String),

    /// Error reported by the SQLite engine
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Filesystem failure on the database file
    #[error("failed to access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The background removal of a database file never reported back
    #[error("removal of '{}' was aborted", path.display())]
    RemovalAborted { path: PathBuf },
}

impl DatabaseError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DatabaseError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this is the missing-table failure raised by `CommonTable::new`
    pub fn is_table_not_found(&self) -> bool {
        matches!(self, DatabaseError::TableNotFound { .. })
    }
}

/// Result type for database operations
pub type DbResult<T> = Result<T, DatabaseError>;
