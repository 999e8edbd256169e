//! PostgreSQL record store (requires `database` feature)

use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};

use super::{
    GreetingId, GreetingRecord, GreetingStore, NewGreeting, StoreError, StoreOperation,
    StoreResult,
};
use crate::config::DatabaseConfig;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS greeting_logs (
    id      SERIAL PRIMARY KEY,
    name    TEXT    NOT NULL,
    age     INTEGER NOT NULL,
    city    TEXT    NOT NULL,
    message TEXT    NOT NULL
)
"#;

const COLUMNS: &str = "id, name, age, city, message";

#[derive(Debug, FromRow)]
struct GreetingRow {
    id: i32,
    name: String,
    age: i32,
    city: String,
    message: String,
}

impl From<GreetingRow> for GreetingRecord {
    fn from(row: GreetingRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            age: row.age,
            city: row.city,
            message: row.message,
        }
    }
}

/// Greeting store backed by a `greeting_logs` table
#[derive(Debug, Clone)]
pub struct PgGreetingStore {
    pool: PgPool,
}

impl PgGreetingStore {
    /// Wrap an existing pool; the schema is assumed to exist
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with retries and create the schema if missing
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = create_pool_with_retries(config).await?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Create the `greeting_logs` table if it does not exist
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_sqlx(StoreOperation::Connect, e))?;
        Ok(())
    }
}

impl GreetingStore for PgGreetingStore {
    async fn insert(&self, record: NewGreeting) -> StoreResult<GreetingRecord> {
        let sql = format!(
            "INSERT INTO greeting_logs (name, age, city, message) VALUES ($1, $2, $3, $4) RETURNING {}",
            COLUMNS
        );
        let row: GreetingRow = sqlx::query_as(&sql)
            .bind(&record.name)
            .bind(record.age)
            .bind(&record.city)
            .bind(&record.message)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::from_sqlx(StoreOperation::Insert, e))?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: GreetingId) -> StoreResult<Option<GreetingRecord>> {
        let sql = format!("SELECT {} FROM greeting_logs WHERE id = $1", COLUMNS);
        let row: Option<GreetingRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::from_sqlx(StoreOperation::FindById, e))?;
        Ok(row.map(Into::into))
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Option<GreetingRecord>> {
        let sql = format!(
            "SELECT {} FROM greeting_logs WHERE name = $1 ORDER BY id LIMIT 1",
            COLUMNS
        );
        let row: Option<GreetingRow> = sqlx::query_as(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::from_sqlx(StoreOperation::FindByName, e))?;
        Ok(row.map(Into::into))
    }

    async fn scan(&self, limit: usize) -> StoreResult<Vec<GreetingRecord>> {
        let sql = format!("SELECT {} FROM greeting_logs ORDER BY id LIMIT $1", COLUMNS);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<GreetingRow> = sqlx::query_as(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::from_sqlx(StoreOperation::Scan, e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update(&self, record: &GreetingRecord) -> StoreResult<GreetingRecord> {
        let sql = format!(
            "UPDATE greeting_logs SET name = $2, age = $3, city = $4, message = $5 WHERE id = $1 RETURNING {}",
            COLUMNS
        );
        let row: Option<GreetingRow> = sqlx::query_as(&sql)
            .bind(record.id)
            .bind(&record.name)
            .bind(record.age)
            .bind(&record.city)
            .bind(&record.message)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::from_sqlx(StoreOperation::Update, e))?;
        row.map(Into::into)
            .ok_or_else(|| StoreError::not_found(StoreOperation::Update, record.id))
    }

    async fn delete(&self, id: GreetingId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM greeting_logs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_sqlx(StoreOperation::Delete, e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM greeting_logs")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::from_sqlx(StoreOperation::Count, e))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

/// Create a PostgreSQL connection pool, retrying with exponential backoff
async fn create_pool_with_retries(config: &DatabaseConfig) -> StoreResult<PgPool> {
    let mut attempt = 0;
    let base_delay = Duration::from_secs(config.retry_delay_secs);

    loop {
        match try_create_pool(config).await {
            Ok(pool) => {
                tracing::info!(
                    attempts = attempt + 1,
                    max_connections = config.max_connections,
                    "Database connection pool created for {}",
                    sanitize_connection_url(&config.url)
                );
                return Ok(pool);
            }
            Err(e) => {
                attempt += 1;

                if attempt > config.max_retries {
                    tracing::error!(
                        "Failed to connect to database after {} attempts: {}",
                        config.max_retries + 1,
                        e
                    );
                    return Err(e);
                }

                let delay = base_delay * 2_u32.pow(attempt.saturating_sub(1));

                tracing::warn!(
                    "Database connection attempt {} failed: {}. Retrying in {:?}...",
                    attempt,
                    e,
                    delay
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

async fn try_create_pool(config: &DatabaseConfig) -> StoreResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
        .connect(&config.url)
        .await
        .map_err(|e| {
            StoreError::connection_failed(format!(
                "Failed to connect to database at '{}': {}",
                sanitize_connection_url(&config.url),
                e
            ))
        })
}

/// Sanitize connection URL for safe logging (remove password)
fn sanitize_connection_url(url: &str) -> String {
    if let (Some(at_pos), Some(scheme_end)) = (url.find('@'), url.find("://")) {
        let credentials = &url[scheme_end + 3..at_pos];
        if let Some(colon_pos) = credentials.find(':') {
            return format!(
                "{}{}:***{}",
                &url[..scheme_end + 3],
                &credentials[..colon_pos],
                &url[at_pos..]
            );
        }
    }
    url.to_string()
}
