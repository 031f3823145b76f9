//! Core database infrastructure
//!
//! This module provides the foundational pieces the table wrappers and the
//! manager are built on:
//! - `DatabaseConn`: SQLite connection wrapper with tuning and introspection
//! - `CellValue` / `Row`: engine-native values and ordered result rows
//! - identifier checks and quoting applied before any SQL text is assembled

mod connection;
mod ident;
mod value;

pub use connection::{DatabaseConn, EngineTuning, Generation};
pub use ident::{
    quote_identifier, quote_selector, validate_column_selector, validate_identifier,
    validate_type_tag, WILDCARD,
};
pub use value::{CellValue, Row};
