//! Identifier and type-tag checks applied before SQL text is built

use crate::database::error::{DatabaseError, DbResult};

/// Column list sentinel selecting every column
pub const WILDCARD: &str = "*";

/// Check that `name` is a plain SQL identifier (`[A-Za-z_][A-Za-z0-9_]*`)
pub fn validate_identifier(name: &str) -> DbResult<&str> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(name)
    } else {
        Err(DatabaseError::InvalidIdentifier(name.to_string()))
    }
}

/// Like [`validate_identifier`] but also accepts [`WILDCARD`]
pub fn validate_column_selector(name: &str) -> DbResult<&str> {
    if name == WILDCARD {
        Ok(name)
    } else {
        validate_identifier(name)
    }
}

/// Quote `name` as an SQL identifier, doubling any embedded `"`.
///
/// Names read back from the schema catalog can hold anything the engine
/// accepts, so every identifier spliced into SQL text goes through here.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Like [`quote_identifier`] but leaves [`WILDCARD`] bare
pub fn quote_selector(name: &str) -> String {
    if name == WILDCARD {
        name.to_string()
    } else {
        quote_identifier(name)
    }
}

/// Check a column type declaration such as `TEXT`, `VARCHAR(20)` or
/// `INTEGER PRIMARY KEY`.
pub fn validate_type_tag(tag: &str) -> DbResult<&str> {
    let valid = !tag.trim().is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ' ' | '(' | ')' | ','));

    if valid {
        Ok(tag)
    } else {
        Err(DatabaseError::InvalidType(tag.to_string()))
    }
}
