//! Read-oriented wrapper around existing tables
//!
//! [`CommonTable`] only binds to tables the manager already knows about, and
//! takes its columns from the engine rather than from the caller. It carries a
//! [`CommonTableCache`] that is filled on request and never refreshed behind
//! the caller's back.

use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Deref;

use crate::database::core::{Generation, WILDCARD};
use crate::database::error::{DatabaseError, DbResult};
use crate::database::manager::DatabaseManager;
use crate::database::table::{Table, TableOptions};

/// Row and column counts of one table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableStats {
    pub column_count: usize,
    pub row_count: usize,
}

/// Count rows and columns for each named table.
///
/// This is the one place table statistics are gathered; both the manager's
/// debug aggregate and [`CommonTableCache`] use it.
pub fn collect_table_stats(
    manager: &DatabaseManager,
    names: &[String],
) -> DbResult<BTreeMap<String, TableStats>> {
    names
        .iter()
        .map(|name| {
            let table = CommonTable::new(TableOptions::named(name.as_str()), manager)?;
            let stats = TableStats {
                column_count: table.length(),
                row_count: table.size()?,
            };
            Ok((name.clone(), stats))
        })
        .collect()
}

/// Aggregate metadata held by a [`CommonTable`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommonTableCache {
    pub table_count: usize,
    pub table_names: Vec<String>,
    pub row_count: usize,
    pub column_count: usize,
    pub all: BTreeMap<String, TableStats>,
    #[serde(skip)]
    generation: Option<Generation>,
}

impl CommonTableCache {
    /// Whether [`recompute`](CommonTable::recompute_cache) has ever run
    pub fn is_populated(&self) -> bool {
        self.generation.is_some()
    }
}

/// A [`Table`] bound to an existing table, with introspected columns
#[derive(Debug, Clone)]
pub struct CommonTable {
    table: Table,
    cache: CommonTableCache,
}

impl CommonTable {
    /// Bind to an existing table.
    ///
    /// Fails with [`DatabaseError::TableNotFound`] unless `options.name` is in
    /// the manager's cached table list. Any `columns` in `options` are replaced
    /// by the columns the engine reports.
    pub fn new(options: TableOptions, manager: &DatabaseManager) -> DbResult<Self> {
        if !manager.cached().tables.iter().any(|t| *t == options.name) {
            return Err(DatabaseError::TableNotFound { name: options.name });
        }

        let mut table = Table::bind_catalog(
            TableOptions {
                columns: None,
                types: None,
                ..options
            },
            manager.handle(),
        )?;

        let columns = match table.connection() {
            Some(db) => db.table_columns(table.name())?,
            None => Vec::new(),
        };
        table.set_columns(columns);

        Ok(Self {
            table,
            cache: CommonTableCache::default(),
        })
    }

    /// Number of rows, measured by selecting every row
    pub fn size(&self) -> DbResult<usize> {
        Ok(self.table.select(&[WILDCARD])?.len())
    }

    /// Number of columns
    pub fn length(&self) -> usize {
        self.table.columns().len()
    }

    pub fn cache(&self) -> &CommonTableCache {
        &self.cache
    }

    /// Refill the cache from the engine.
    ///
    /// Per-table figures cover the manager's cached table list.
    pub fn recompute_cache(&mut self, manager: &DatabaseManager) -> DbResult<&CommonTableCache> {
        let table_names = manager.cached().tables.clone();
        let all = collect_table_stats(manager, &table_names)?;

        self.cache = CommonTableCache {
            table_count: table_names.len(),
            table_names,
            row_count: self.size()?,
            column_count: self.length(),
            all,
            generation: self.table.connection().map(|db| db.generation()),
        };
        Ok(&self.cache)
    }

    /// True when the cache was never filled, or the connection has seen any
    /// mutation (or been replaced) since it was.
    pub fn cache_is_stale(&self) -> bool {
        match (self.cache.generation, self.table.connection()) {
            (Some(recorded), Some(db)) => recorded != db.generation(),
            _ => true,
        }
    }
}

impl Deref for CommonTable {
    type Target = Table;

    fn deref(&self) -> &Table {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::core::CellValue;
    use crate::database::table::ColumnType;
    use crate::database::{DatabaseOptions, NoticeLog};
    use std::sync::Arc;

    fn manager_with_table(dir: &tempfile::TempDir) -> DatabaseManager {
        let options = DatabaseOptions::new(dir.path(), "common");
        let mut manager = DatabaseManager::new(options.clone(), Arc::new(NoticeLog::new()));
        assert!(manager.create_database(options, |_| {}));

        let t = Table::new(
            TableOptions::named("t")
                .with_column("a", ColumnType::Text)
                .with_column("b", ColumnType::Integer),
            &manager,
        )
        .unwrap();
        t.insert(&[CellValue::from("x"), CellValue::from(1)]).unwrap();
        manager.recache().unwrap();
        manager
    }

    #[test]
    fn test_missing_table_fails() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_table(&dir);

        let err = CommonTable::new(TableOptions::named("nope"), &manager).unwrap_err();
        assert!(err.is_table_not_found());
        assert!(err.to_string().contains("\"nope\""));
    }

    #[test]
    fn test_cached_list_is_authoritative() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_table(&dir);

        // created after the last recount: live, but not in the cached list
        Table::new(
            TableOptions::named("late").with_column("c", ColumnType::Real),
            &manager,
        )
        .unwrap();
        assert!(manager.tables().unwrap().contains(&"late".to_string()));
        assert!(CommonTable::new(TableOptions::named("late"), &manager)
            .unwrap_err()
            .is_table_not_found());
    }

    #[test]
    fn test_size_length_and_introspected_columns() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_table(&dir);

        let ct = CommonTable::new(
            TableOptions::named("t").with_columns(["ignored"]),
            &manager,
        )
        .unwrap();
        assert_eq!(ct.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(ct.size().unwrap(), 1);
        assert_eq!(ct.length(), 2);
        assert_eq!(
            ct.flatten().unwrap().row_data,
            vec![vec![CellValue::Text("x".into()), CellValue::Integer(1)]]
        );
    }

    #[test]
    fn test_cache_is_explicit() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_table(&dir);

        let mut ct = CommonTable::new(TableOptions::named("t"), &manager).unwrap();
        assert!(!ct.cache().is_populated());
        assert!(ct.cache_is_stale());

        ct.recompute_cache(&manager).unwrap();
        assert!(!ct.cache_is_stale());
        assert_eq!(ct.cache().row_count, 1);
        assert_eq!(ct.cache().column_count, 2);
        assert_eq!(ct.cache().table_count, 1);
        assert_eq!(
            ct.cache().all.get("t"),
            Some(&TableStats {
                column_count: 2,
                row_count: 1
            })
        );

        // a mutation marks the cache stale but leaves its figures alone
        ct.insert(&[CellValue::from("y"), CellValue::from(2)]).unwrap();
        assert!(ct.cache_is_stale());
        assert_eq!(ct.cache().row_count, 1);
        assert_eq!(ct.size().unwrap(), 2);

        ct.recompute_cache(&manager).unwrap();
        assert_eq!(ct.cache().row_count, 2);
        assert!(!ct.cache_is_stale());
    }

    #[test]
    fn test_collect_table_stats() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_with_table(&dir);
        Table::new(
            TableOptions::named("u")
                .with_column("id", ColumnType::Integer)
                .with_column("v", ColumnType::Text)
                .with_column("w", ColumnType::Blob),
            &manager,
        )
        .unwrap();
        manager.recache().unwrap();

        let names = manager.cached().tables.clone();
        let stats = collect_table_stats(&manager, &names).unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats["t"].row_count, 1);
        assert_eq!(stats["u"].column_count, 3);
        assert_eq!(stats["u"].row_count, 0);
    }

    #[test]
    fn test_after_disconnect() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager_with_table(&dir);
        let ct = CommonTable::new(TableOptions::named("t"), &manager).unwrap();

        manager.disconnect_database();
        assert_eq!(ct.size().unwrap(), 0);
        assert_eq!(ct.length(), 2);
        assert!(ct.cache_is_stale());
    }
}
