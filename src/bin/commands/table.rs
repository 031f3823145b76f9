use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use sqlt::database::{
    CellValue, ColumnType, CommonTable, DatabaseManager, Row, Table, TableOptions,
};
use sqlt::lens::utils::{render_flat_table, render_grid, OutputFormat};
use sqlt::SqltConfig;

use super::{confirm, open_manager, report_notices};

/// Arguments for the Table command
#[derive(Args)]
pub struct TableArgs {
    #[clap(subcommand)]
    pub command: TableCommands,
}

/// Table subcommands
#[derive(Subcommand)]
pub enum TableCommands {
    /// Create a table if it does not exist yet
    Create {
        /// Table name
        #[clap(value_name = "TABLE")]
        name: String,

        /// Column as NAME:TYPE, TYPE one of TEXT, INTEGER, REAL, BLOB (repeatable)
        #[clap(short, long = "column", value_name = "NAME:TYPE", required = true)]
        columns: Vec<String>,

        /// Text encoding recorded for the table
        #[clap(short, long)]
        encoding: Option<String>,
    },

    /// Insert one row; values are SQL literals such as 'text', 42, 1.5 or NULL
    Insert {
        /// Table name
        #[clap(value_name = "TABLE")]
        name: String,

        /// Values in column order
        #[clap(value_name = "VALUE", required = true, allow_hyphen_values = true)]
        values: Vec<String>,
    },

    /// Select rows
    Select {
        /// Table name
        #[clap(value_name = "TABLE")]
        name: String,

        /// Columns to return, defaults to all
        #[clap(short, long = "column", value_name = "COLUMN")]
        columns: Vec<String>,
    },

    /// Set one column on rows matching a condition
    Update {
        /// Table name
        #[clap(value_name = "TABLE")]
        name: String,

        /// Column to set
        #[clap(value_name = "COLUMN")]
        column: String,

        /// New value as an SQL literal
        #[clap(value_name = "VALUE", allow_hyphen_values = true)]
        value: String,

        /// SQL condition, e.g. "id = 3"
        #[clap(short = 'w', long = "where", value_name = "CONDITION")]
        condition: String,
    },

    /// Delete rows matching a condition
    Delete {
        /// Table name
        #[clap(value_name = "TABLE")]
        name: String,

        /// SQL condition, e.g. "id = 3"
        #[clap(short = 'w', long = "where", value_name = "CONDITION")]
        condition: String,
    },

    /// Drop a table
    Drop {
        /// Table name
        #[clap(value_name = "TABLE")]
        name: String,

        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },

    /// Show a table as a grid, one row per record in column order
    Show {
        /// Table name
        #[clap(value_name = "TABLE")]
        name: String,
    },
}

pub fn run(config: &SqltConfig, args: TableArgs, output_format: OutputFormat) {
    let (manager, log) = open_manager(config);
    if !manager.is_connected() {
        report_notices(&log, output_format);
        std::process::exit(1);
    }
    log.drain();

    if let Err(e) = dispatch(&manager, args.command, output_format) {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }
}

fn dispatch(
    manager: &DatabaseManager,
    command: TableCommands,
    output_format: OutputFormat,
) -> Result<()> {
    match command {
        TableCommands::Create {
            name,
            columns,
            encoding,
        } => {
            let mut options = TableOptions::named(name.as_str());
            for spec in &columns {
                let (column, column_type) = parse_column_spec(spec)?;
                options = options.with_column(column, column_type);
            }
            if let Some(encoding) = encoding {
                options = options.with_encoding(encoding);
            }
            Table::new(options, manager)?;
            eprintln!("Table \"{}\" ready.", name);
        }
        TableCommands::Insert { name, values } => {
            let table = CommonTable::new(TableOptions::named(name.as_str()), manager)?;
            let values: Vec<CellValue> =
                values.iter().map(|v| CellValue::from_literal(v)).collect();
            table.insert(&values)?;
            eprintln!("Inserted 1 row into \"{}\".", name);
        }
        TableCommands::Select { name, columns } => {
            let table = CommonTable::new(TableOptions::named(name.as_str()), manager)?;
            let rows = table.select(columns.as_slice())?;
            println!("{}", format_rows(&rows, table.columns(), &columns, output_format)?);
        }
        TableCommands::Update {
            name,
            column,
            value,
            condition,
        } => {
            let table = CommonTable::new(TableOptions::named(name.as_str()), manager)?;
            table.update(&column, CellValue::from_literal(&value), &condition)?;
            eprintln!("Updated \"{}\".", name);
        }
        TableCommands::Delete { name, condition } => {
            let table = CommonTable::new(TableOptions::named(name.as_str()), manager)?;
            table.delete(&condition)?;
            eprintln!("Deleted matching rows from \"{}\".", name);
        }
        TableCommands::Drop { name, yes } => {
            let table = CommonTable::new(TableOptions::named(name.as_str()), manager)?;
            if !yes
                && !output_format.is_json()
                && !confirm(&format!(
                    "This will drop table \"{}\" and its {} rows",
                    name,
                    table.size()?
                ))
            {
                return Ok(());
            }
            table.drop()?;
            eprintln!("Dropped table \"{}\".", name);
        }
        TableCommands::Show { name } => {
            let table = CommonTable::new(TableOptions::named(name.as_str()), manager)?;
            let flat = table.flatten()?;
            let output = match output_format {
                OutputFormat::Json => serde_json::to_string(&flat)?,
                OutputFormat::JsonPretty => serde_json::to_string_pretty(&flat)?,
                format => render_flat_table(&flat, format),
            };
            println!("{}", output);
        }
    }
    Ok(())
}

/// Parse `name:TYPE`
fn parse_column_spec(spec: &str) -> Result<(String, ColumnType)> {
    let (name, column_type) = spec
        .split_once(':')
        .ok_or_else(|| anyhow!("Column '{}' must be given as NAME:TYPE", spec))?;
    let column_type = column_type.parse::<ColumnType>().map_err(|e| anyhow!(e))?;
    Ok((name.trim().to_string(), column_type))
}

fn format_rows(
    rows: &[Row],
    table_columns: &[String],
    requested: &[String],
    output_format: OutputFormat,
) -> Result<String> {
    Ok(match output_format {
        OutputFormat::Json => serde_json::to_string(rows)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(rows)?,
        format => {
            let header: Vec<String> = match rows.first() {
                Some(row) => row.columns().to_vec(),
                None if requested.is_empty() => table_columns.to_vec(),
                None => requested.to_vec(),
            };
            render_grid(header, rows.iter().map(|r| r.values().iter()), format)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_column_spec() {
        assert_eq!(
            parse_column_spec("title:text").unwrap(),
            ("title".to_string(), ColumnType::Text)
        );
        assert_eq!(
            parse_column_spec("n:INT").unwrap(),
            ("n".to_string(), ColumnType::Integer)
        );
        assert!(parse_column_spec("title").is_err());
        assert!(parse_column_spec("title:DATE").is_err());
    }
}
