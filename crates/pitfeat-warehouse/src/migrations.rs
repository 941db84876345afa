//! Versioned schema migrations, applied once each and recorded in `schema_migrations`.

use ::duckdb::Connection;

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_market_tables",
        sql: r#"
CREATE TABLE IF NOT EXISTS prices (
    sid VARCHAR(16) NOT NULL,
    date DATE NOT NULL,
    open DOUBLE NOT NULL,
    high DOUBLE NOT NULL,
    low DOUBLE NOT NULL,
    close DOUBLE NOT NULL,
    adj_close DOUBLE NOT NULL,
    volume BIGINT NOT NULL,
    source TEXT,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY(sid, date)
);

CREATE TABLE IF NOT EXISTS fundamentals (
    sid VARCHAR(16) NOT NULL,
    period_end DATE NOT NULL,
    announce_date DATE NOT NULL,
    roe DOUBLE,
    roa DOUBLE,
    npm DOUBLE,
    der DOUBLE,
    dar DOUBLE,
    per DOUBLE,
    pbv DOUBLE,
    eps DOUBLE,
    sales_growth DOUBLE,
    profit_growth DOUBLE,
    source TEXT,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY(sid, period_end)
);

CREATE TABLE IF NOT EXISTS calendar (
    trading_date DATE PRIMARY KEY,
    is_open BOOLEAN NOT NULL DEFAULT TRUE
);

CREATE TABLE IF NOT EXISTS ingest_log (
    request_id TEXT NOT NULL,
    sid TEXT,
    source TEXT NOT NULL,
    dataset TEXT NOT NULL,
    status TEXT NOT NULL,
    row_count BIGINT,
    timestamp TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    },
    Migration {
        version: "0002_features_daily",
        sql: r#"
CREATE TABLE IF NOT EXISTS features_daily (
    sid VARCHAR(16) NOT NULL,
    date DATE NOT NULL,
    logret_1d DECIMAL(12,6),
    logret_5d DECIMAL(12,6),
    logret_20d DECIMAL(12,6),
    rv20d DECIMAL(12,6),
    rsi14 DECIMAL(8,4),
    atr14 DECIMAL(12,6),
    macd DECIMAL(12,6),
    macd_signal DECIMAL(12,6),
    macd_hist DECIMAL(12,6),
    stoch_k DECIMAL(12,6),
    stoch_d DECIMAL(12,6),
    vol_z60 DECIMAL(12,6),
    dow SMALLINT,
    eom BOOLEAN,
    roe DECIMAL(12,6),
    roa DECIMAL(12,6),
    npm DECIMAL(12,6),
    der DECIMAL(12,6),
    dar DECIMAL(12,6),
    per DECIMAL(12,6),
    pbv DECIMAL(12,6),
    eps DECIMAL(18,6),
    sales_growth DECIMAL(12,6),
    profit_growth DECIMAL(12,6),
    PRIMARY KEY(sid, date)
);
"#,
    },
    Migration {
        // Upserted tables stay index-free beyond their primary keys: DuckDB refuses
        // `INSERT OR REPLACE` into columns referenced by a secondary index.
        version: "0003_ingest_log_index",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_ingest_log_dataset_ts ON ingest_log(dataset, timestamp);
"#,
    },
];

/// Apply every migration not yet recorded.
pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let applied: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            [migration.version],
            |row| row.get(0),
        )?;
        if applied > 0 {
            continue;
        }

        connection.execute_batch(migration.sql)?;
        connection.execute(
            "INSERT INTO schema_migrations (version) VALUES (?)",
            [migration.version],
        )?;
        tracing::debug!(version = migration.version, "applied migration");
    }

    Ok(())
}

/// Versions known to this build, oldest first.
pub fn known_versions() -> impl Iterator<Item = &'static str> {
    MIGRATIONS.iter().map(|migration| migration.version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applying_twice_records_each_version_once() {
        let connection = Connection::open_in_memory().expect("in-memory db");
        apply_migrations(&connection).expect("first run");
        apply_migrations(&connection).expect("second run");

        let recorded: i64 = connection
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .expect("count");
        assert_eq!(recorded, known_versions().count() as i64);
    }
}
