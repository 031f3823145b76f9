//! Common utility functions for lens modules
//!
//! Output format selection and grid rendering shared by the status and embed
//! lenses and by the CLI.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::database::FlatTable;

/// Unified output format for all lens commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Pretty table with borders (default)
    #[default]
    Table,
    /// Markdown table format
    Markdown,
    /// Compact JSON
    Json,
    /// Pretty-printed JSON with indentation
    JsonPretty,
    /// Pipe-separated values with header
    Psv,
}

impl OutputFormat {
    /// Check if this is a JSON variant
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json | Self::JsonPretty)
    }

    /// Check if this is a table variant
    pub fn is_table(&self) -> bool {
        matches!(self, Self::Table | Self::Markdown)
    }

    /// Get a list of all format names for help text
    pub fn all_names() -> &'static [&'static str] {
        &["table", "markdown", "json", "json-pretty", "psv"]
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Markdown => write!(f, "markdown"),
            Self::Json => write!(f, "json"),
            Self::JsonPretty => write!(f, "json-pretty"),
            Self::Psv => write!(f, "psv"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "pretty" => Ok(Self::Table),
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "json-pretty" | "jsonpretty" => Ok(Self::JsonPretty),
            "psv" | "pipe" => Ok(Self::Psv),
            _ => Err(format!(
                "Unknown output format '{}'. Valid formats: {}",
                s,
                Self::all_names().join(", ")
            )),
        }
    }
}

/// Render a header row plus records as text.
///
/// JSON formats are not handled here; callers serialize their own types.
/// They fall back to the bordered table.
pub fn render_grid<H, R, C>(header: H, records: R, format: OutputFormat) -> String
where
    H: IntoIterator,
    H::Item: Into<String>,
    R: IntoIterator<Item = C>,
    C: IntoIterator,
    C::Item: ToString,
{
    let header: Vec<String> = header.into_iter().map(Into::into).collect();
    let records: Vec<Vec<String>> = records
        .into_iter()
        .map(|r| r.into_iter().map(|c| c.to_string()).collect())
        .collect();

    if format == OutputFormat::Psv {
        let mut output = header.join("|");
        for record in &records {
            output.push('\n');
            output.push_str(&record.join("|"));
        }
        return output;
    }

    let mut builder = Builder::default();
    builder.push_record(header);
    for record in records {
        builder.push_record(record);
    }
    let mut table = builder.build();

    match format {
        OutputFormat::Markdown => table.with(Style::markdown()).to_string(),
        _ => table.with(Style::rounded()).to_string(),
    }
}

/// Render a flattened table as text
pub fn render_flat_table(flat: &FlatTable, format: OutputFormat) -> String {
    render_grid(
        flat.column_key.iter().cloned(),
        flat.row_data.iter().map(|row| row.iter()),
        format,
    )
}

/// Human-readable byte size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
