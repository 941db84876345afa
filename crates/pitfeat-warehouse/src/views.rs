//! Analytical views over the stored tables.

use ::duckdb::Connection;

/// Create or refresh the views:
/// - `vw_returns_daily`: simple daily return of adjusted close per security
/// - `vw_feature_coverage`: feature rows per security, first/last date and rows carrying fundamentals
pub fn create_views(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r"
CREATE OR REPLACE VIEW vw_returns_daily AS
SELECT
    sid,
    date,
    CASE
        WHEN LAG(adj_close) OVER (PARTITION BY sid ORDER BY date) IS NULL THEN NULL
        WHEN LAG(adj_close) OVER (PARTITION BY sid ORDER BY date) = 0 THEN NULL
        ELSE (adj_close / LAG(adj_close) OVER (PARTITION BY sid ORDER BY date)) - 1.0
    END AS return_pct
FROM prices;

CREATE OR REPLACE VIEW vw_feature_coverage AS
SELECT
    sid,
    COUNT(*) AS feature_rows,
    MIN(date) AS first_date,
    MAX(date) AS last_date,
    COUNT(*) FILTER (
        WHERE COALESCE(roe, roa, npm, der, dar, per, pbv, eps, sales_growth, profit_growth) IS NOT NULL
    ) AS rows_with_fundamentals
FROM features_daily
GROUP BY sid;
",
    )?;

    Ok(())
}
