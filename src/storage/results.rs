//! The `bin_packing_results` table.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use thiserror::Error;

/// Rows buffered before a bulk insert.
pub const BATCH_SIZE: usize = 20;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS bin_packing_results (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    count               INTEGER,
    center              INTEGER,
    variability         INTEGER,
    lower_bound         INTEGER,
    algorithm           TEXT,
    solution_bin_count  INTEGER,
    solution_time       REAL,
    solution_optimality REAL
);
"#;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Opening or creating the database file failed.
    #[error("Failed to open store: {0}")]
    OpenFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(#[from] sqlx::Error),
}

/// One persisted benchmark outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    /// Item count decoded from the instance name.
    pub count: i64,
    /// Size center decoded from the instance name.
    pub center: i64,
    /// Variability decoded from the instance name.
    pub variability: i64,
    /// Lower bound from the instance payload.
    pub lower_bound: i64,
    /// Algorithm from the instance payload.
    pub algorithm: String,
    /// Bins used by the solver.
    pub solution_bin_count: i64,
    /// Solver wall-clock time.
    pub solution_time: f64,
    /// `solution_bin_count / lower_bound`, rounded to 5 decimals.
    pub solution_optimality: f64,
}

/// Computes the optimality ratio, rounded to 5 decimals.
///
/// Callers must ensure `lower_bound > 0`.
pub fn solution_optimality(solution_bin_count: i64, lower_bound: i64) -> f64 {
    let ratio = solution_bin_count as f64 / lower_bound as f64;
    (ratio * 100_000.0).round() / 100_000.0
}

/// SQLite store for aggregated benchmark results.
pub struct ResultStore {
    pool: SqlitePool,
}

impl ResultStore {
    /// Opens (creating if missing) the store at `path` and bootstraps the
    /// schema.
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::from_str(&format!("sqlite://{}", path))
            .map_err(|e| StoreError::OpenFailed(e.to_string()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .map_err(|e| StoreError::OpenFailed(e.to_string()))?;

        sqlx::query(SCHEMA_SQL).execute(&pool).await?;

        tracing::info!(path, "Result store opened");
        Ok(Self { pool })
    }

    /// Inserts a whole batch as a single bulk statement.
    pub async fn insert_batch(&self, records: &[ResultRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO bin_packing_results (
                count, center, variability, lower_bound, algorithm,
                solution_bin_count, solution_time, solution_optimality
            ) ",
        );
        builder.push_values(records, |mut b, r| {
            b.push_bind(r.count)
                .push_bind(r.center)
                .push_bind(r.variability)
                .push_bind(r.lower_bound)
                .push_bind(r.algorithm.clone())
                .push_bind(r.solution_bin_count)
                .push_bind(r.solution_time)
                .push_bind(r.solution_optimality);
        });
        builder.build().execute(&self.pool).await?;
        Ok(())
    }

    /// Number of rows in the table.
    pub async fn count(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM bin_packing_results")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// All rows in insertion order.
    pub async fn fetch_all(&self) -> Result<Vec<ResultRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT count, center, variability, lower_bound, algorithm,
                    solution_bin_count, solution_time, solution_optimality
             FROM bin_packing_results ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ResultRecord {
                count: row.get("count"),
                center: row.get("center"),
                variability: row.get("variability"),
                lower_bound: row.get("lower_bound"),
                algorithm: row.get("algorithm"),
                solution_bin_count: row.get("solution_bin_count"),
                solution_time: row.get("solution_time"),
                solution_optimality: row.get("solution_optimality"),
            })
            .collect())
    }
}
