//! Safety checks to prevent clobbering collector data.
//!
//! The unified table is written by drop-and-recreate, so a wrong `--table`
//! would silently destroy a source table. Report files are plain overwrites,
//! so a wrong `--report` could destroy the database itself.

use std::path::Path;

use crate::error::{Error, Result};

/// File extensions that belong to databases, never to report output.
const DATABASE_EXTENSIONS: &[&str] = &["db", "sqlite", "sqlite3"];

/// A plain SQL identifier: letters, digits and underscores, not starting
/// with a digit.
pub fn validate_table_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::unsafe_output(format!(
            "table name '{}' must be a plain identifier",
            name
        )));
    }
    Ok(())
}

/// Validates that an output table is safe to drop and recreate.
///
/// Checks:
/// - Name is a plain identifier
/// - Name is not one of the source tables (case-insensitive, as SQLite compares them)
/// - Name is not in SQLite's reserved `sqlite_` namespace
pub fn validate_output_table(table: &str, source_tables: &[&str]) -> Result<()> {
    validate_table_name(table)?;

    let lower = table.to_ascii_lowercase();
    if let Some(source) = source_tables.iter().find(|s| s.eq_ignore_ascii_case(table)) {
        return Err(Error::unsafe_output(format!(
            "output table '{}' cannot be the source table '{}'",
            table, source
        )));
    }
    if lower.starts_with("sqlite_") {
        return Err(Error::unsafe_output(format!(
            "output table '{}' is reserved by SQLite",
            table
        )));
    }
    Ok(())
}

/// Validates that a report/JSON output file is safe to overwrite.
///
/// The output cannot be any of the source paths and cannot carry a database
/// extension.
pub fn validate_output_path(output: &Path, source_paths: &[&Path]) -> Result<()> {
    for source in source_paths {
        if output == *source {
            return Err(Error::unsafe_output(format!(
                "output '{}' cannot be the same as source '{}'",
                output.display(),
                source.display()
            )));
        }
    }

    let extension = output
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if DATABASE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(Error::unsafe_output(format!(
            "output '{}' looks like a database file",
            output.display()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const SOURCES: &[&str] = &["chart_data", "youtube_videos"];

    #[test]
    fn test_valid_output_table() {
        assert!(validate_output_table("cleaned_music_data", SOURCES).is_ok());
        assert!(validate_output_table("_unified2", SOURCES).is_ok());
    }

    #[test]
    fn test_output_table_equals_source() {
        let result = validate_output_table("Chart_Data", SOURCES);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("cannot be the source table 'chart_data'"));
    }

    #[test]
    fn test_reserved_and_malformed_names() {
        assert!(validate_output_table("sqlite_master", SOURCES).is_err());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("2fast").is_err());
        assert!(validate_table_name("clean data").is_err());
        assert!(validate_table_name("x\"y").is_err());
    }

    #[test]
    fn test_valid_output_path() {
        let output = PathBuf::from("/tmp/report.json");
        let source = PathBuf::from("/data/music_data.db");
        assert!(validate_output_path(&output, &[&source]).is_ok());
    }

    #[test]
    fn test_output_path_equals_source() {
        let path = PathBuf::from("/data/music_data.json");
        let result = validate_output_path(&path, &[&path]);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("cannot be the same as source"));
    }

    #[test]
    fn test_database_extension_blocked() {
        let source = PathBuf::from("/data/music_data.db");
        for name in ["/tmp/other.db", "/tmp/other.SQLITE3", "/tmp/x.sqlite"] {
            assert!(validate_output_path(&PathBuf::from(name), &[&source]).is_err(), "{name}");
        }
    }
}
