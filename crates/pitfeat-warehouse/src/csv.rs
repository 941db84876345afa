//! CSV reading through DuckDB's `read_csv_auto`.

use std::path::{Path, PathBuf};

use ::duckdb::Connection;
use serde::Serialize;

use crate::{escape_sql_string, WarehouseError};

/// Outcome of importing one CSV file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub path: PathBuf,
    pub rows_read: usize,
    pub rows_written: usize,
    /// Rows that failed domain validation and were left out.
    pub rows_rejected: usize,
}

/// A file that was not imported because required columns are missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub missing: Vec<String>,
}

/// `read_csv_auto('<path>', header = true)` with the path escaped.
pub(crate) fn csv_source(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\\', "/");
    format!(
        "read_csv_auto('{}', header = true, all_varchar = true)",
        escape_sql_string(&path)
    )
}

/// Lower-cased header names of a CSV file.
pub(crate) fn csv_columns(connection: &Connection, path: &Path) -> Result<Vec<String>, WarehouseError> {
    let sql = format!("DESCRIBE SELECT * FROM {}", csv_source(path));
    let mut statement = connection.prepare(&sql)?;
    let names = statement
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names.into_iter().map(|name| name.trim().to_ascii_lowercase()).collect())
}

/// Required columns absent from `columns`, in `required` order.
pub(crate) fn missing_columns(columns: &[String], required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|name| !columns.iter().any(|column| column == *name))
        .map(|name| (*name).to_owned())
        .collect()
}

/// Fail with [`WarehouseError::MissingColumns`] unless every required column is present.
pub(crate) fn require_columns(
    path: &Path,
    columns: &[String],
    required: &[&str],
) -> Result<(), WarehouseError> {
    let missing = missing_columns(columns, required);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(WarehouseError::MissingColumns {
            path: path.to_path_buf(),
            missing,
        })
    }
}

/// Quote a CSV header for use as an identifier.
pub(crate) fn column_ref(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_missing_columns_in_required_order() {
        let columns = vec![String::from("sid"), String::from("close")];
        assert_eq!(
            missing_columns(&columns, &["sid", "date", "close", "volume"]),
            vec![String::from("date"), String::from("volume")]
        );
    }

    #[test]
    fn path_quotes_are_escaped() {
        let source = csv_source(Path::new("/tmp/o'brien/prices.csv"));
        assert!(source.contains("o''brien"));
    }

    #[test]
    fn reads_lower_cased_headers() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("prices.csv");
        std::fs::write(&path, "SID,Date,Close\nBBCA,2024-01-02,9000\n").expect("write csv");

        let connection = Connection::open_in_memory().expect("db");
        let columns = csv_columns(&connection, &path).expect("columns");
        assert_eq!(columns, vec!["sid", "date", "close"]);
    }
}
