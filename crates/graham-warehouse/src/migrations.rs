use ::duckdb::{params, Connection};

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_reference_tables",
        sql: r#"
CREATE TABLE IF NOT EXISTS sectors (
    id BIGINT PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS stocks (
    id BIGINT PRIMARY KEY,
    ticker TEXT NOT NULL UNIQUE,
    sector_id BIGINT,
    eps_ttm DOUBLE,
    bvps DOUBLE,
    roe DOUBLE,
    der DOUBLE,
    npm DOUBLE,
    graham_number DOUBLE,
    last_price DOUBLE,
    market_cap DOUBLE,
    daily_volume DOUBLE,
    per DOUBLE,
    pbv DOUBLE,
    margin_of_safety DOUBLE,
    valuation_status TEXT,
    updated_at TIMESTAMP
);

CREATE TABLE IF NOT EXISTS daily_stock_prices (
    stock_id BIGINT NOT NULL,
    date DATE NOT NULL,
    open DOUBLE,
    high DOUBLE,
    low DOUBLE,
    close DOUBLE,
    volume BIGINT,
    PRIMARY KEY(stock_id, date)
);
"#,
    },
    Migration {
        version: "0002_derived_tables",
        sql: r#"
CREATE TABLE IF NOT EXISTS sector_performance_summary (
    sector_id BIGINT PRIMARY KEY,
    sector_name TEXT NOT NULL,
    avg_daily_change DOUBLE NOT NULL,
    avg_weekly_change DOUBLE NOT NULL,
    avg_monthly_change DOUBLE NOT NULL
);

CREATE TABLE IF NOT EXISTS pipeline_runs (
    run_id TEXT PRIMARY KEY,
    worker TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    total BIGINT NOT NULL,
    updated BIGINT NOT NULL,
    skipped_derivative BIGINT NOT NULL,
    skipped_no_data BIGINT NOT NULL,
    failed BIGINT NOT NULL,
    cancelled BOOLEAN NOT NULL
);
"#,
    },
];

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
        let applied_count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            params![migration.version],
            |row| row.get(0),
        )?;

        if applied_count == 0 {
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                params![migration.version],
            )?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let connection = Connection::open_in_memory().expect("open");
        apply_migrations(&connection).expect("first pass");
        apply_migrations(&connection).expect("second pass");

        let applied: i64 = connection
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .expect("count");
        assert_eq!(applied, MIGRATIONS.len() as i64);
    }
}
