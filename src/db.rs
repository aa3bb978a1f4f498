use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS attendance (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        date TEXT NOT NULL,
        image_path TEXT NOT NULL
    )
    "#,
    // One attendance per name per calendar day.
    "CREATE UNIQUE INDEX IF NOT EXISTS attendance_name_date ON attendance (name, date)",
    "CREATE INDEX IF NOT EXISTS attendance_timestamp ON attendance (timestamp)",
];

pub async fn init_db(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("invalid DATABASE_URL {}", database_url))?
        .create_if_missing(true);

    // In-memory databases are per connection, keep them on a single one.
    let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    create_schema(&pool).await?;
    Ok(pool)
}

pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("Failed to create attendance schema")?;
    }
    Ok(())
}
