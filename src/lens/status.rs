//! Status lens
//!
//! Reports where the database lives, whether it is connected, and the size of
//! each table. Used by the `status` and `tables` commands.

use anyhow::Result;
use serde::Serialize;
use tracing::warn;

use crate::database::{collect_table_stats, DatabaseManager, DebugAggregate};
use crate::lens::utils::{format_size, render_grid, OutputFormat};

/// Row and column counts for one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub name: String,
    pub rows: usize,
    pub columns: usize,
}

/// Snapshot of a database and its tables
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStatus {
    pub name: String,
    pub path: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    pub connected: bool,
    pub table_count: usize,
    pub tables: Vec<TableSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugAggregate>,
}

impl DatabaseStatus {
    /// "Loaded N tables, C columns, and R rows." over the listed tables
    pub fn summary_line(&self) -> String {
        DebugAggregate {
            table_count: self.table_count,
            row_count: self.tables.iter().map(|t| t.rows).sum(),
            column_count: self.tables.iter().map(|t| t.columns).sum(),
        }
        .summary()
    }
}

pub struct StatusLens<'a> {
    manager: &'a DatabaseManager,
}

impl<'a> StatusLens<'a> {
    pub fn new(manager: &'a DatabaseManager) -> Self {
        Self { manager }
    }

    /// Gather the current status.
    ///
    /// Tables are listed live from the catalog. Names missing from the
    /// manager's cached list are skipped, since they cannot be opened as
    /// common tables until the next recount.
    pub fn status(&self) -> Result<DatabaseStatus> {
        let options = self.manager.options();
        let path = options.path();
        let metadata = std::fs::metadata(&path).ok();

        let modified = metadata
            .as_ref()
            .and_then(|m| m.modified().ok())
            .map(|t| chrono::DateTime::<chrono::Utc>::from(t).to_rfc3339());

        let mut tables = Vec::new();
        if self.manager.is_connected() {
            let cached = &self.manager.cached().tables;
            let names: Vec<String> = self
                .manager
                .tables()?
                .into_iter()
                .filter(|name| {
                    let known = cached.contains(name);
                    if !known {
                        warn!("Table \"{}\" is not in the cached table list yet", name);
                    }
                    known
                })
                .collect();

            for (name, stats) in collect_table_stats(self.manager, &names)? {
                tables.push(TableSummary {
                    name,
                    rows: stats.row_count,
                    columns: stats.column_count,
                });
            }
        }

        Ok(DatabaseStatus {
            name: options.name.clone(),
            path: path.to_string_lossy().to_string(),
            exists: metadata.is_some(),
            size_bytes: metadata.map(|m| m.len()),
            modified,
            connected: self.manager.is_connected(),
            table_count: tables.len(),
            tables,
            debug: self.manager.debug_mode().then_some(*self.manager.debug()),
        })
    }

    /// Per-table listing in the requested format
    pub fn format_tables(&self, status: &DatabaseStatus, format: OutputFormat) -> String {
        match format {
            OutputFormat::Json => serde_json::to_string(&status.tables).unwrap_or_default(),
            OutputFormat::JsonPretty => {
                serde_json::to_string_pretty(&status.tables).unwrap_or_default()
            }
            _ => render_grid(
                ["table", "rows", "columns"],
                status.tables.iter().map(|t| {
                    [t.name.clone(), t.rows.to_string(), t.columns.to_string()]
                }),
                format,
            ),
        }
    }

    /// Full status report in the requested format
    pub fn format_status(&self, status: &DatabaseStatus, format: OutputFormat) -> String {
        match format {
            OutputFormat::Json => serde_json::to_string(status).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(status).unwrap_or_default(),
            _ => {
                let mut lines = vec![
                    format!("Database:       {}", status.name),
                    format!("Path:           {}", status.path),
                    format!(
                        "Status:         {}",
                        match (status.exists, status.connected) {
                            (_, true) => "connected",
                            (true, false) => "not connected",
                            (false, false) => "not created",
                        }
                    ),
                ];
                if let Some(size) = status.size_bytes {
                    lines.push(format!("Size:           {}", format_size(size)));
                }
                if let Some(modified) = &status.modified {
                    lines.push(format!("Modified:       {}", modified));
                }

                if status.connected {
                    lines.push(String::new());
                    lines.push(status.summary_line());
                    if !status.tables.is_empty() {
                        lines.push(self.format_tables(status, format));
                    }
                }
                lines.join("\n")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{
        CellValue, ColumnType, DatabaseOptions, NoticeLog, Table, TableOptions,
    };
    use std::sync::Arc;

    fn populated(dir: &tempfile::TempDir) -> DatabaseManager {
        let options = DatabaseOptions::new(dir.path(), "status");
        let mut manager = DatabaseManager::new(options.clone(), Arc::new(NoticeLog::new()));
        manager.create_database(options, |_| {});

        let t = Table::new(
            TableOptions::named("t")
                .with_column("a", ColumnType::Text)
                .with_column("b", ColumnType::Integer),
            &manager,
        )
        .unwrap();
        t.insert(&[CellValue::from("x"), CellValue::from(1)]).unwrap();
        t.insert(&[CellValue::from("y"), CellValue::from(2)]).unwrap();
        Table::new(
            TableOptions::named("u").with_column("id", ColumnType::Integer),
            &manager,
        )
        .unwrap();
        manager.recache().unwrap();
        manager
    }

    #[test]
    fn test_status_connected() {
        let dir = tempfile::tempdir().unwrap();
        let manager = populated(&dir);
        let lens = StatusLens::new(&manager);

        let status = lens.status().unwrap();
        assert!(status.exists);
        assert!(status.connected);
        assert!(status.modified.is_some());
        assert_eq!(status.table_count, 2);
        assert_eq!(
            status.tables,
            vec![
                TableSummary {
                    name: "t".into(),
                    rows: 2,
                    columns: 2
                },
                TableSummary {
                    name: "u".into(),
                    rows: 0,
                    columns: 1
                },
            ]
        );
        assert_eq!(
            status.summary_line(),
            "Loaded 2 tables, 3 columns, and 2 rows."
        );
        assert!(status.debug.is_none());
    }

    #[test]
    fn test_status_skips_uncached_tables() {
        let dir = tempfile::tempdir().unwrap();
        let manager = populated(&dir);
        Table::new(
            TableOptions::named("late").with_column("c", ColumnType::Real),
            &manager,
        )
        .unwrap();

        let status = StatusLens::new(&manager).status().unwrap();
        assert_eq!(status.table_count, 2);
        assert!(status.tables.iter().all(|t| t.name != "late"));
    }

    #[test]
    fn test_status_lists_quoted_table_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = populated(&dir);
        manager
            .database()
            .unwrap()
            .execute_batch("CREATE TABLE \"odd name\" (\"first col\" TEXT, x INTEGER)")
            .unwrap();
        manager.recache().unwrap();

        let status = StatusLens::new(&manager).status().unwrap();
        assert_eq!(status.table_count, 3);
        assert!(status.tables.contains(&TableSummary {
            name: "odd name".into(),
            rows: 0,
            columns: 2
        }));
    }

    #[test]
    fn test_status_missing_database() {
        let dir = tempfile::tempdir().unwrap();
        let manager = DatabaseManager::new(
            DatabaseOptions::new(dir.path(), "absent"),
            Arc::new(NoticeLog::new()),
        );
        let lens = StatusLens::new(&manager);

        let status = lens.status().unwrap();
        assert!(!status.exists);
        assert!(!status.connected);
        assert!(status.tables.is_empty());

        let text = lens.format_status(&status, OutputFormat::Table);
        assert!(text.contains("not created"));
        assert!(!text.contains("Loaded"));
    }

    #[test]
    fn test_format_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let manager = populated(&dir);
        let lens = StatusLens::new(&manager);
        let status = lens.status().unwrap();

        let psv = lens.format_tables(&status, OutputFormat::Psv);
        assert_eq!(psv, "table|rows|columns\nt|2|2\nu|0|1");

        let json: serde_json::Value =
            serde_json::from_str(&lens.format_status(&status, OutputFormat::Json)).unwrap();
        assert_eq!(json["name"], "status");
        assert_eq!(json["table_count"], 2);
        assert_eq!(json["tables"][0]["rows"], 2);

        let text = lens.format_status(&status, OutputFormat::Markdown);
        assert!(text.contains("Loaded 2 tables, 3 columns, and 2 rows."));
        assert!(text.contains("| t "));
    }
}
