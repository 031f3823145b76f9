//! Generic table wrapper
//!
//! A [`Table`] is bound to one table name and a weak reference to the
//! manager's connection. It keeps no cached state: every operation reads
//! through to the engine. Once the manager disconnects, the reference no
//! longer resolves and every operation quietly does nothing (selects come
//! back empty, mutations are no-ops).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;

use crate::database::core::{
    quote_identifier, quote_selector, validate_column_selector, validate_identifier,
    validate_type_tag, CellValue, DatabaseConn, Row, WILDCARD,
};
use crate::database::error::DbResult;
use crate::database::manager::DatabaseManager;

/// Encoding recorded on tables that don't specify one
pub const DEFAULT_ENCODING: &str = "utf8";

/// Column types offered when creating a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    Blob,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Blob => "BLOB",
        }
    }

    pub fn all() -> [ColumnType; 4] {
        [
            ColumnType::Text,
            ColumnType::Integer,
            ColumnType::Real,
            ColumnType::Blob,
        ]
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TEXT" => Ok(ColumnType::Text),
            "INTEGER" | "INT" => Ok(ColumnType::Integer),
            "REAL" => Ok(ColumnType::Real),
            "BLOB" => Ok(ColumnType::Blob),
            _ => Err(format!(
                "Unknown column type '{}'. Valid types: TEXT, INTEGER, REAL, BLOB",
                s
            )),
        }
    }
}

/// Construction-time descriptor for a [`Table`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableOptions {
    pub name: String,
    pub columns: Option<Vec<String>>,
    pub types: Option<Vec<String>>,
    pub encoding: Option<String>,
}

impl TableOptions {
    /// Options naming an existing table, with no columns or types
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Append one column together with its type
    pub fn with_column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.columns.get_or_insert_with(Vec::new).push(name.into());
        self.types
            .get_or_insert_with(Vec::new)
            .push(column_type.as_str().to_string());
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }
}

/// A table as a fixed-order grid, the shape renderers consume
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FlatTable {
    pub column_key: Vec<String>,
    pub row_data: Vec<Vec<CellValue>>,
    pub length: usize,
}

/// Handle on one named table
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    types: Option<Vec<String>>,
    encoding: String,
    database: Weak<DatabaseConn>,
}

impl Table {
    /// Bind a table to the manager's current connection.
    ///
    /// When both `columns` and `types` are given and have the same length, the
    /// table is created if it doesn't exist yet. Otherwise nothing is issued
    /// and later operations assume the table is already there.
    pub fn new(options: TableOptions, manager: &DatabaseManager) -> DbResult<Self> {
        validate_identifier(&options.name)?;
        Self::bind_catalog(options, manager.handle())
    }

    /// Bind to a name read from the schema catalog, which may hold characters
    /// a caller-supplied name can't.
    pub(crate) fn bind_catalog(
        options: TableOptions,
        database: Weak<DatabaseConn>,
    ) -> DbResult<Self> {
        let columns = options.columns.unwrap_or_default();
        for column in &columns {
            validate_identifier(column)?;
        }
        if let Some(types) = &options.types {
            for tag in types {
                validate_type_tag(tag)?;
            }
        }

        let table = Table {
            name: options.name,
            columns,
            types: options.types,
            encoding: options
                .encoding
                .unwrap_or_else(|| DEFAULT_ENCODING.to_string()),
            database,
        };

        if let Some(types) = &table.types {
            if !table.columns.is_empty() && types.len() == table.columns.len() {
                table.create_if_absent(types)?;
            }
        }

        Ok(table)
    }

    fn create_if_absent(&self, types: &[String]) -> DbResult<()> {
        let Some(db) = self.connection() else {
            return Ok(());
        };

        let definitions = self
            .columns
            .iter()
            .zip(types)
            .map(|(column, tag)| format!("{} {}", quote_identifier(column), tag))
            .collect::<Vec<_>>()
            .join(", ");
        db.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.quoted_name(),
            definitions
        ))?;
        db.bump_schema();
        Ok(())
    }

    fn quoted_name(&self) -> String {
        quote_identifier(&self.name)
    }

    pub(crate) fn connection(&self) -> Option<Rc<DatabaseConn>> {
        self.database.upgrade()
    }

    /// Whether the connection this table was bound to is still open
    pub fn is_bound(&self) -> bool {
        self.database.strong_count() > 0
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub(crate) fn set_columns(&mut self, columns: Vec<String>) {
        self.columns = columns;
    }

    pub fn types(&self) -> Option<&[String]> {
        self.types.as_deref()
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// Append a row. `values` line up index-for-index with [`columns`](Self::columns).
    ///
    /// Values are bound as statement parameters, never spliced into SQL.
    pub fn insert(&self, values: &[CellValue]) -> DbResult<&Self> {
        let Some(db) = self.connection() else {
            return Ok(self);
        };

        let placeholders = (1..=values.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = if self.columns.is_empty() {
            format!("INSERT INTO {} VALUES ({})", self.quoted_name(), placeholders)
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.quoted_name(),
                self.columns
                    .iter()
                    .map(|c| quote_identifier(c))
                    .collect::<Vec<_>>()
                    .join(", "),
                placeholders
            )
        };

        db.execute(&sql, values)?;
        db.bump_data();
        Ok(self)
    }

    /// Every row, projected onto `columns` (`"*"` selects all of them).
    ///
    /// An empty list is treated as `"*"`.
    pub fn select<S: AsRef<str>>(&self, columns: &[S]) -> DbResult<Vec<Row>> {
        let projection = if columns.is_empty() {
            WILDCARD.to_string()
        } else {
            columns
                .iter()
                .map(|c| validate_column_selector(c.as_ref()).map(quote_selector))
                .collect::<DbResult<Vec<_>>>()?
                .join(", ")
        };

        let Some(db) = self.connection() else {
            return Ok(Vec::new());
        };

        db.query_rows(
            &format!("SELECT {} FROM {}", projection, self.quoted_name()),
            &[],
        )
    }

    /// Set `column` to `value` on every row matching `condition`.
    ///
    /// `condition` is a raw SQL predicate supplied by the caller.
    pub fn update(&self, column: &str, value: CellValue, condition: &str) -> DbResult<&Self> {
        validate_identifier(column)?;
        let Some(db) = self.connection() else {
            return Ok(self);
        };

        db.execute(
            &format!(
                "UPDATE {} SET {} = ?1 WHERE {}",
                self.quoted_name(),
                quote_identifier(column),
                condition
            ),
            &[value],
        )?;
        db.bump_data();
        Ok(self)
    }

    /// Remove every row matching the raw SQL predicate `condition`
    pub fn delete(&self, condition: &str) -> DbResult<&Self> {
        let Some(db) = self.connection() else {
            return Ok(self);
        };

        db.execute(
            &format!("DELETE FROM {} WHERE {}", self.quoted_name(), condition),
            &[],
        )?;
        db.bump_data();
        Ok(self)
    }

    /// Drop the table if it exists
    pub fn drop(&self) -> DbResult<()> {
        let Some(db) = self.connection() else {
            return Ok(());
        };

        db.execute_batch(&format!("DROP TABLE IF EXISTS {}", self.quoted_name()))?;
        db.bump_schema();
        db.bump_data();
        Ok(())
    }

    /// Every row reduced to [`columns`](Self::columns), in that order.
    ///
    /// Fields missing from a row come back as `NULL`.
    pub fn flatten(&self) -> DbResult<FlatTable> {
        let rows = self.select(&[WILDCARD])?;

        let row_data: Vec<Vec<CellValue>> = rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .map(|column| row.get(column).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();

        Ok(FlatTable {
            column_key: self.columns.clone(),
            length: row_data.len(),
            row_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{DatabaseError, DatabaseOptions, NoticeLog};
    use std::sync::Arc;

    fn connected_manager(dir: &tempfile::TempDir) -> DatabaseManager {
        let options = DatabaseOptions::new(dir.path(), "tables");
        let mut manager = DatabaseManager::new(options.clone(), Arc::new(NoticeLog::new()));
        assert!(manager.create_database(options, |_| {}));
        manager
    }

    fn sample_table(manager: &DatabaseManager) -> Table {
        Table::new(
            TableOptions::named("t")
                .with_column("a", ColumnType::Text)
                .with_column("b", ColumnType::Integer),
            manager,
        )
        .unwrap()
    }

    #[test]
    fn test_column_type_parse() {
        assert_eq!("text".parse::<ColumnType>().unwrap(), ColumnType::Text);
        assert_eq!("INT".parse::<ColumnType>().unwrap(), ColumnType::Integer);
        assert!("VARCHAR".parse::<ColumnType>().is_err());
        assert_eq!(ColumnType::all().len(), 4);
    }

    #[test]
    fn test_create_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let manager = connected_manager(&dir);

        let t = sample_table(&manager);
        t.insert(&[CellValue::from("x"), CellValue::from(1)]).unwrap();

        // binding again must not recreate or wipe the table
        let again = sample_table(&manager);
        assert_eq!(again.select(&["*"]).unwrap().len(), 1);
        assert_eq!(again.encoding(), DEFAULT_ENCODING);
    }

    #[test]
    fn test_mismatched_types_skip_creation() {
        let dir = tempfile::tempdir().unwrap();
        let manager = connected_manager(&dir);

        let t = Table::new(
            TableOptions::named("partial")
                .with_columns(["a", "b"])
                .with_types(["TEXT"]),
            &manager,
        )
        .unwrap();
        assert_eq!(t.columns(), &["a".to_string(), "b".to_string()]);
        assert!(manager.tables().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_identifiers_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let manager = connected_manager(&dir);

        let err = Table::new(TableOptions::named("bad name"), &manager).unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidIdentifier(_)));

        let err = Table::new(
            TableOptions::named("ok").with_types(["TEXT); --"]),
            &manager,
        )
        .unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidType(_)));

        let t = sample_table(&manager);
        assert!(t.select(&["a; DROP TABLE t"]).is_err());
        assert!(t.update("b c", CellValue::Null, "1").is_err());
    }

    #[test]
    fn test_crud() {
        let dir = tempfile::tempdir().unwrap();
        let manager = connected_manager(&dir);
        let t = sample_table(&manager);

        t.insert(&[CellValue::from("x"), CellValue::from(1)])
            .unwrap()
            .insert(&[CellValue::from("y"), CellValue::from(2)])
            .unwrap();

        let rows = t.select(&["b"]).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].columns(), &["b".to_string()]);

        t.update("a", CellValue::from("z"), "b = 2").unwrap();
        let rows = t.select(&["a", "b"]).unwrap();
        assert_eq!(rows[1].get("a"), Some(&CellValue::Text("z".into())));

        t.delete("b = 1").unwrap();
        assert_eq!(t.select(&["*"]).unwrap().len(), 1);

        t.drop().unwrap();
        assert!(manager.tables().unwrap().is_empty());
        // dropping an absent table is a no-op
        t.drop().unwrap();
    }

    #[test]
    fn test_literal_values_keep_their_meaning() {
        let dir = tempfile::tempdir().unwrap();
        let manager = connected_manager(&dir);
        let t = sample_table(&manager);

        let values: Vec<CellValue> = ["'x'", "1"].iter().map(|l| CellValue::from_literal(l)).collect();
        t.insert(&values).unwrap();

        let flat = t.flatten().unwrap();
        assert_eq!(
            flat.row_data,
            vec![vec![CellValue::Text("x".into()), CellValue::Integer(1)]]
        );
    }

    #[test]
    fn test_flatten_shape_and_idempotence() {
        let dir = tempfile::tempdir().unwrap();
        let manager = connected_manager(&dir);
        let t = sample_table(&manager);
        for i in 0..3 {
            t.insert(&[CellValue::from(format!("r{}", i)), CellValue::from(i)])
                .unwrap();
        }

        let first = t.flatten().unwrap();
        assert_eq!(first.column_key, vec!["a", "b"]);
        assert_eq!(first.length, 3);
        assert!(first.row_data.iter().all(|r| r.len() == 2));
        assert_eq!(first.row_data[2][0], CellValue::Text("r2".into()));
        assert_eq!(first, t.flatten().unwrap());

        let json = serde_json::to_value(&first).unwrap();
        assert_eq!(json["column_key"][1], "b");
        assert_eq!(json["length"], 3);
        assert_eq!(json["row_data"][0][1], 0);
    }

    #[test]
    fn test_flatten_restricted_columns() {
        let dir = tempfile::tempdir().unwrap();
        let manager = connected_manager(&dir);
        let t = sample_table(&manager);
        t.insert(&[CellValue::from("x"), CellValue::from(1)]).unwrap();

        // a wrapper that only knows about one column flattens to one column
        let narrow = Table::new(TableOptions::named("t").with_columns(["b"]), &manager).unwrap();
        let flat = narrow.flatten().unwrap();
        assert_eq!(flat.column_key, vec!["b"]);
        assert_eq!(flat.row_data, vec![vec![CellValue::Integer(1)]]);
    }

    #[test]
    fn test_disconnected_degrades_quietly() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = connected_manager(&dir);
        let t = sample_table(&manager);
        t.insert(&[CellValue::from("x"), CellValue::from(1)]).unwrap();

        manager.disconnect_database();
        assert!(!t.is_bound());
        assert!(t.select(&["*"]).unwrap().is_empty());
        t.insert(&[CellValue::from("y"), CellValue::from(2)]).unwrap();
        t.update("a", CellValue::from("q"), "1 = 1").unwrap();
        t.delete("1 = 1").unwrap();
        t.drop().unwrap();
        assert_eq!(t.flatten().unwrap().length, 0);

        // nothing above reached the file
        assert!(manager.connect_database(|_| {}));
        let t = sample_table(&manager);
        let rows = t.select(&["a"]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("a"), Some(&CellValue::Text("x".into())));
    }

    #[test]
    fn test_table_on_never_connected_manager() {
        let dir = tempfile::tempdir().unwrap();
        let manager = DatabaseManager::new(
            DatabaseOptions::new(dir.path(), "nothing"),
            Arc::new(NoticeLog::new()),
        );
        let t = sample_table(&manager);
        assert!(!t.is_bound());
        assert!(t.select(&["*"]).unwrap().is_empty());
        t.insert(&[CellValue::from("x"), CellValue::from(1)]).unwrap();
        assert!(!dir.path().join("nothing.db").exists());
    }
}
