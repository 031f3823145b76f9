//! Embed lens
//!
//! Expands `[[sqlt("name")]]` markers in a document into a rendering of the
//! named table. Only tables the manager already knows about can be embedded.

use anyhow::{anyhow, Result};
use regex::{Captures, Regex};
use tracing::warn;

use crate::database::{CommonTable, DatabaseManager, DbResult, TableOptions};
use crate::lens::utils::{render_flat_table, OutputFormat};

const EMBED_MARKER: &str = r#"\[\[sqlt\("([A-Za-z0-9_]+)"\)\]\]"#;

pub struct EmbedLens<'a> {
    manager: &'a DatabaseManager,
    marker: Regex,
    format: OutputFormat,
}

impl<'a> EmbedLens<'a> {
    /// Embeds render as markdown unless told otherwise
    pub fn new(manager: &'a DatabaseManager) -> Result<Self> {
        let marker =
            Regex::new(EMBED_MARKER).map_err(|e| anyhow!("Failed to create regex: {}", e))?;
        Ok(Self {
            manager,
            marker,
            format: OutputFormat::Markdown,
        })
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Table names referenced by markers, in order of appearance
    pub fn references(&self, text: &str) -> Vec<String> {
        self.marker
            .captures_iter(text)
            .map(|c| c[1].to_string())
            .collect()
    }

    /// Render one existing table with its column names as the header row
    pub fn render_table(&self, name: &str) -> DbResult<String> {
        let table = CommonTable::new(TableOptions::named(name), self.manager)?;
        let flat = table.flatten()?;
        Ok(match self.format {
            OutputFormat::Json => serde_json::to_string(&flat).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(&flat).unwrap_or_default(),
            format => render_flat_table(&flat, format),
        })
    }

    /// Replace every marker in `text`.
    ///
    /// A marker whose table cannot be rendered is left as written.
    pub fn render(&self, text: &str) -> String {
        self.marker
            .replace_all(text, |caps: &Captures| {
                let name = &caps[1];
                match self.render_table(name) {
                    Ok(rendered) => rendered,
                    Err(e) => {
                        warn!("Cannot embed table \"{}\": {}", name, e);
                        caps[0].to_string()
                    }
                }
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{CellValue, ColumnType, DatabaseOptions, NoticeLog, Table};
    use std::sync::Arc;

    fn populated(dir: &tempfile::TempDir) -> DatabaseManager {
        let options = DatabaseOptions::new(dir.path(), "embed");
        let mut manager = DatabaseManager::new(options.clone(), Arc::new(NoticeLog::new()));
        manager.create_database(options, |_| {});

        let t = Table::new(
            TableOptions::named("books")
                .with_column("title", ColumnType::Text)
                .with_column("year", ColumnType::Integer),
            &manager,
        )
        .unwrap();
        t.insert(&[CellValue::from("Dune"), CellValue::from(1965)])
            .unwrap();
        manager.recache().unwrap();
        manager
    }

    #[test]
    fn test_references() {
        let dir = tempfile::tempdir().unwrap();
        let manager = populated(&dir);
        let lens = EmbedLens::new(&manager).unwrap();

        let text = "a [[sqlt(\"one\")]] b [[sqlt(\"2024_log\")]] [[sqlt(\"bad name\")]]";
        assert_eq!(lens.references(text), vec!["one", "2024_log"]);
        assert!(lens.references("no markers").is_empty());
    }

    #[test]
    fn test_render_replaces_markers() {
        let dir = tempfile::tempdir().unwrap();
        let manager = populated(&dir);
        let lens = EmbedLens::new(&manager).unwrap().with_format(OutputFormat::Psv);

        let out = lens.render("Reading list:\n[[sqlt(\"books\")]]\nend");
        assert_eq!(out, "Reading list:\ntitle|year\nDune|1965\nend");
    }

    #[test]
    fn test_render_digit_leading_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = populated(&dir);
        manager
            .database()
            .unwrap()
            .execute_batch(
                "CREATE TABLE \"2024_log\" (entry TEXT); \
                 INSERT INTO \"2024_log\" VALUES ('ok');",
            )
            .unwrap();
        manager.recache().unwrap();

        let lens = EmbedLens::new(&manager).unwrap().with_format(OutputFormat::Psv);
        assert_eq!(lens.render("[[sqlt(\"2024_log\")]]"), "entry\nok");
    }

    #[test]
    fn test_unknown_table_keeps_marker() {
        let dir = tempfile::tempdir().unwrap();
        let manager = populated(&dir);
        let lens = EmbedLens::new(&manager).unwrap();

        let text = "see [[sqlt(\"missing\")]]";
        assert_eq!(lens.render(text), text);
        assert!(lens.render_table("missing").unwrap_err().is_table_not_found());
    }

    #[test]
    fn test_default_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let manager = populated(&dir);
        let out = EmbedLens::new(&manager)
            .unwrap()
            .render_table("books")
            .unwrap();
        assert!(out.lines().next().unwrap().contains("title"));
        assert!(out.contains("Dune"));
        assert!(out.contains("|"));
    }

    #[test]
    fn test_json_embed() {
        let dir = tempfile::tempdir().unwrap();
        let manager = populated(&dir);
        let out = EmbedLens::new(&manager)
            .unwrap()
            .with_format(OutputFormat::Json)
            .render_table("books")
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["column_key"][0], "title");
        assert_eq!(json["row_data"][0][1], 1965);
        assert_eq!(json["length"], 1);
    }
}
