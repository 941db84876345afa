//! Guarded ad-hoc SQL.

use std::time::{Duration, Instant};

use ::duckdb::types::Value as DuckValue;
use ::duckdb::{Connection, Row};
use pitfeat_core::format_date;
use serde::Serialize;
use serde_json::{Number, Value};
use time::Date;

use crate::{AccessMode, Warehouse, WarehouseError};

/// Limits applied to [`Warehouse::execute_query`].
#[derive(Debug, Clone, Copy)]
pub struct QueryGuardrails {
    pub max_rows: usize,
    pub query_timeout_ms: u64,
}

impl Default for QueryGuardrails {
    fn default() -> Self {
        Self {
            max_rows: 10_000,
            query_timeout_ms: 5_000,
        }
    }
}

impl QueryGuardrails {
    fn timeout(self) -> Duration {
        Duration::from_millis(self.query_timeout_ms.max(1))
    }

    fn validate(self) -> Result<(), WarehouseError> {
        if self.max_rows == 0 {
            return Err(WarehouseError::QueryRejected(String::from(
                "--max-rows must be greater than zero",
            )));
        }
        if self.query_timeout_ms == 0 {
            return Err(WarehouseError::QueryRejected(String::from(
                "--query-timeout-ms must be greater than zero",
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SqlColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub r#type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub columns: Vec<SqlColumn>,
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
    /// True when `max_rows` cut the result short.
    pub truncated: bool,
}

impl Warehouse {
    /// Run one SQL statement under `guardrails`.
    ///
    /// Without `allow_write` only a single `SELECT`/`WITH`/`EXPLAIN`/`SHOW`/`DESCRIBE`
    /// statement is accepted, and it may not contain a data-changing or DDL keyword
    /// or be an `EXPLAIN ANALYZE`.
    pub fn execute_query(
        &self,
        sql: &str,
        guardrails: QueryGuardrails,
        allow_write: bool,
    ) -> Result<QueryResult, WarehouseError> {
        guardrails.validate()?;
        let sql = normalize_sql(sql)?;
        if !allow_write {
            enforce_read_only_query(sql)?;
        }

        let mode = if allow_write {
            AccessMode::ReadWrite
        } else {
            AccessMode::ReadOnly
        };
        let connection = self.acquire(mode)?;
        let started = Instant::now();

        if is_select_like(sql) {
            return select_rows(&connection, sql, guardrails, started);
        }

        connection.execute_batch(sql)?;
        ensure_timeout(started, guardrails.timeout())?;
        Ok(QueryResult {
            columns: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
            truncated: false,
        })
    }
}

fn select_rows(
    connection: &Connection,
    sql: &str,
    guardrails: QueryGuardrails,
    started: Instant,
) -> Result<QueryResult, WarehouseError> {
    let mut statement = connection.prepare(sql)?;
    let mut cursor = statement.query([])?;

    let mut rows = Vec::new();
    let mut truncated = false;
    while let Some(row) = cursor.next()? {
        ensure_timeout(started, guardrails.timeout())?;
        if rows.len() >= guardrails.max_rows {
            truncated = true;
            break;
        }
        rows.push(read_row(row)?);
    }
    drop(cursor);
    ensure_timeout(started, guardrails.timeout())?;

    // Column metadata is only populated once the statement has run.
    let columns = (0..statement.column_count())
        .map(|index| SqlColumn {
            name: statement
                .column_name(index)
                .map_or_else(|_| format!("column{index}"), ToString::to_string),
            r#type: statement.column_type(index).to_string(),
        })
        .collect();

    Ok(QueryResult {
        columns,
        row_count: rows.len(),
        rows,
        truncated,
    })
}

fn read_row(row: &Row<'_>) -> Result<Vec<Value>, ::duckdb::Error> {
    let column_count = row.as_ref().column_count();
    (0..column_count)
        .map(|index| row.get::<_, DuckValue>(index).map(to_json_value))
        .collect()
}

fn to_json_value(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(value) => Value::Bool(value),
        DuckValue::TinyInt(value) => Value::Number(Number::from(value)),
        DuckValue::SmallInt(value) => Value::Number(Number::from(value)),
        DuckValue::Int(value) => Value::Number(Number::from(value)),
        DuckValue::BigInt(value) => Value::Number(Number::from(value)),
        DuckValue::UTinyInt(value) => Value::Number(Number::from(value)),
        DuckValue::USmallInt(value) => Value::Number(Number::from(value)),
        DuckValue::UInt(value) => Value::Number(Number::from(value)),
        DuckValue::UBigInt(value) => Value::Number(Number::from(value)),
        DuckValue::Float(value) => number_from_f64(f64::from(value)),
        DuckValue::Double(value) => number_from_f64(value),
        // Feature columns are fixed-precision; JSON consumers get them as numbers.
        DuckValue::Decimal(value) => value
            .to_string()
            .parse::<f64>()
            .map_or(Value::Null, number_from_f64),
        DuckValue::Date32(days) => date_from_epoch_days(days)
            .map_or_else(|| Value::String(days.to_string()), |date| {
                Value::String(format_date(date))
            }),
        DuckValue::Text(value) => Value::String(value),
        DuckValue::Blob(value) => Value::String(hex::encode(value)),
        other => Value::String(format!("{other:?}")),
    }
}

fn date_from_epoch_days(days: i32) -> Option<Date> {
    const UNIX_EPOCH_JULIAN_DAY: i32 = 2_440_588;
    Date::from_julian_day(UNIX_EPOCH_JULIAN_DAY.checked_add(days)?).ok()
}

fn number_from_f64(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

fn normalize_sql(sql: &str) -> Result<&str, WarehouseError> {
    let normalized = sql.trim().trim_end_matches(';').trim();
    if normalized.is_empty() {
        return Err(WarehouseError::QueryRejected(String::from(
            "query must not be empty",
        )));
    }
    Ok(normalized)
}

const READ_KEYWORDS: &[&str] = &["SELECT", "WITH", "EXPLAIN", "SHOW", "DESCRIBE"];

/// Keywords that change data, schema, settings or attached databases. None of them
/// may appear anywhere in a read-only query, including after a `WITH`.
const WRITE_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "MERGE", "TRUNCATE", "CREATE", "DROP", "ALTER", "COPY",
    "ATTACH", "DETACH", "INSTALL", "LOAD", "PRAGMA", "SET", "RESET", "CALL", "CHECKPOINT",
    "VACUUM", "EXPORT", "IMPORT", "USE", "BEGIN", "COMMIT", "ROLLBACK", "ABORT", "GRANT",
    "REVOKE",
];

fn enforce_read_only_query(sql: &str) -> Result<(), WarehouseError> {
    let words = sql_words(sql);
    if !starts_select_like(&words) {
        return Err(WarehouseError::QueryRejected(String::from(
            "read-only mode accepts only SELECT/CTE queries; use --write for write statements",
        )));
    }
    if words.split(|word| word == ";").filter(|part| !part.is_empty()).count() > 1 {
        return Err(WarehouseError::QueryRejected(String::from(
            "multiple SQL statements are not allowed in read-only mode",
        )));
    }
    // EXPLAIN ANALYZE runs the statement it explains.
    if words[0] == "EXPLAIN"
        && matches!(words.get(1).map(String::as_str), Some("ANALYZE" | "ANALYSE"))
    {
        return Err(WarehouseError::QueryRejected(String::from(
            "EXPLAIN ANALYZE executes its statement; use --write to run it",
        )));
    }
    if let Some(keyword) = words
        .iter()
        .find(|word| WRITE_KEYWORDS.contains(&word.as_str()))
    {
        return Err(WarehouseError::QueryRejected(format!(
            "read-only mode does not accept {keyword}; use --write for write statements"
        )));
    }
    Ok(())
}

fn is_select_like(sql: &str) -> bool {
    starts_select_like(&sql_words(sql))
}

fn starts_select_like(words: &[String]) -> bool {
    words
        .first()
        .is_some_and(|word| READ_KEYWORDS.contains(&word.as_str()))
}

/// Upper-cased bare words of `sql`, with `;` kept as its own entry.
///
/// String literals, quoted identifiers and comments are dropped, so a keyword or a
/// semicolon inside them is not seen.
fn sql_words(sql: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut chars = sql.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch.is_alphanumeric() || ch == '_' {
            current.extend(ch.to_uppercase());
            continue;
        }
        if !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        match ch {
            '\'' | '"' => {
                while let Some(next) = chars.next() {
                    if next == ch {
                        // A doubled quote is an escaped quote, not the end.
                        if chars.peek() == Some(&ch) {
                            chars.next();
                            continue;
                        }
                        break;
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut previous = ' ';
                for next in chars.by_ref() {
                    if previous == '*' && next == '/' {
                        break;
                    }
                    previous = next;
                }
            }
            ';' => words.push(String::from(";")),
            _ => {}
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn ensure_timeout(started: Instant, timeout: Duration) -> Result<(), WarehouseError> {
    if started.elapsed() > timeout {
        return Err(WarehouseError::QueryTimeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{bars, count, open_temp};
    use time::macros::date;

    fn seeded() -> (tempfile::TempDir, Warehouse) {
        let (temp, warehouse) = open_temp();
        warehouse
            .ingest_prices("test", "req-1", &bars("BBCA.JK", date!(2024 - 01 - 01), 5))
            .expect("prices");
        (temp, warehouse)
    }

    #[test]
    fn read_only_mode_rejects_write_query() {
        let (_temp, warehouse) = open_temp();
        let error = warehouse
            .execute_query("DELETE FROM prices", QueryGuardrails::default(), false)
            .expect_err("should reject");
        assert!(matches!(error, WarehouseError::QueryRejected(_)));
    }

    #[test]
    fn read_only_mode_rejects_explain_analyze_of_a_write() {
        let (_temp, warehouse) = seeded();
        let error = warehouse
            .execute_query(
                "EXPLAIN ANALYZE DELETE FROM prices",
                QueryGuardrails::default(),
                false,
            )
            .expect_err("should reject");
        assert!(matches!(error, WarehouseError::QueryRejected(_)));
        assert_eq!(count(&warehouse, "SELECT COUNT(*) FROM prices"), 5);
    }

    #[test]
    fn read_only_mode_rejects_write_after_cte() {
        let (_temp, warehouse) = seeded();
        let error = warehouse
            .execute_query(
                "WITH x AS (SELECT 1) DELETE FROM prices",
                QueryGuardrails::default(),
                false,
            )
            .expect_err("should reject");
        assert!(matches!(error, WarehouseError::QueryRejected(_)));
        assert_eq!(count(&warehouse, "SELECT COUNT(*) FROM prices"), 5);
    }

    #[test]
    fn read_only_mode_allows_explain_of_a_select() {
        let (_temp, warehouse) = seeded();
        warehouse
            .execute_query(
                "EXPLAIN SELECT * FROM prices",
                QueryGuardrails::default(),
                false,
            )
            .expect("plain explain is read-only");
    }

    #[test]
    fn keywords_inside_literals_and_comments_are_not_statements() {
        let (_temp, warehouse) = seeded();
        let result = warehouse
            .execute_query(
                "-- DROP TABLE prices\nSELECT 'it''s; DELETE' AS \"update\" /* ; INSERT */",
                QueryGuardrails::default(),
                false,
            )
            .expect("query");
        assert_eq!(result.rows[0][0], Value::String(String::from("it's; DELETE")));
        assert_eq!(
            sql_words("SELECT 'a;b' AS \"drop\"; -- x\n"),
            vec!["SELECT", "AS", ";"]
        );
    }

    #[test]
    fn write_mode_runs_what_read_only_mode_refuses() {
        let (_temp, warehouse) = seeded();
        warehouse
            .execute_query(
                "DELETE FROM prices WHERE sid = 'BBCA.JK'",
                QueryGuardrails::default(),
                true,
            )
            .expect("write allowed");
        assert_eq!(count(&warehouse, "SELECT COUNT(*) FROM prices"), 0);
    }

    #[test]
    fn read_only_mode_rejects_stacked_statements() {
        let (_temp, warehouse) = open_temp();
        let error = warehouse
            .execute_query(
                "SELECT 1; DROP TABLE prices",
                QueryGuardrails::default(),
                false,
            )
            .expect_err("should reject");
        assert!(matches!(error, WarehouseError::QueryRejected(_)));
    }

    #[test]
    fn max_rows_truncates_result() {
        let (_temp, warehouse) = open_temp();
        let result = warehouse
            .execute_query(
                "SELECT range AS n FROM range(5)",
                QueryGuardrails {
                    max_rows: 2,
                    query_timeout_ms: 5_000,
                },
                false,
            )
            .expect("query");
        assert_eq!(result.row_count, 2);
        assert!(result.truncated);
        assert_eq!(result.columns[0].name, "n");
    }

    #[test]
    fn decimals_and_dates_render_as_json_scalars() {
        let (_temp, warehouse) = open_temp();
        let result = warehouse
            .execute_query(
                "SELECT CAST(12.5 AS DECIMAL(12,6)) AS d, DATE '2024-08-30' AS day",
                QueryGuardrails::default(),
                false,
            )
            .expect("query");
        assert_eq!(result.rows[0][0], serde_json::json!(12.5));
        assert_eq!(result.rows[0][1], Value::String(String::from("2024-08-30")));
    }

    #[test]
    fn zero_guardrails_are_rejected() {
        let (_temp, warehouse) = open_temp();
        let error = warehouse
            .execute_query(
                "SELECT 1",
                QueryGuardrails {
                    max_rows: 0,
                    query_timeout_ms: 10,
                },
                false,
            )
            .expect_err("should reject");
        assert!(matches!(error, WarehouseError::QueryRejected(_)));
    }

    #[test]
    fn empty_query_is_rejected() {
        assert!(matches!(
            normalize_sql("  ;  "),
            Err(WarehouseError::QueryRejected(_))
        ));
    }
}
