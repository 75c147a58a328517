use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;

/// Type alias for the PostgreSQL connection pool
pub type DbPool = PgPool;

/// Creates and configures a PostgreSQL connection pool
///
/// # Arguments
/// * `database_url` - PostgreSQL connection string
/// * `max_connections` - Upper bound on pooled connections
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    tracing::debug!("Creating database connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await?;

    tracing::info!("Database connection pool created successfully");
    Ok(pool)
}

/// Runs the embedded SQL migrations
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Migrations completed successfully");
    Ok(())
}

/// Allocates the next number for `prefix` from the counter table and formats
/// it as `PREFIX-000042`.
///
/// The upsert increments and returns in one statement, so concurrent callers
/// never observe the same value. Call it inside the transaction that inserts
/// the numbered row; a rollback gives the number back.
pub async fn next_sequence_number(
    tx: &mut Transaction<'_, Postgres>,
    prefix: &str,
) -> Result<String, sqlx::Error> {
    let value: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO sequences (prefix, last_value)
        VALUES ($1, 1)
        ON CONFLICT (prefix)
        DO UPDATE SET last_value = sequences.last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(prefix)
    .fetch_one(&mut **tx)
    .await?;

    Ok(format_sequence(prefix, value))
}

/// Formats a sequence value with its prefix
pub fn format_sequence(prefix: &str, value: i64) -> String {
    format!("{}-{:06}", prefix, value)
}
