//! PostgreSQL destination.

use super::{UserTable, USERS_TABLE};
use crate::error::DatabaseError;
use crate::record::UserRecord;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

const UPSERT_USER: &str = r#"
    INSERT INTO Users (ID, Name, Age)
    VALUES ($1, $2, $3)
    ON CONFLICT (ID)
    DO UPDATE SET
        Name = EXCLUDED.Name,
        Age = EXCLUDED.Age
"#;

const TABLE_EXISTS: &str = r#"
    SELECT EXISTS (
        SELECT 1 FROM information_schema.tables
        WHERE table_schema = current_schema()
          AND lower(table_name) = lower($1)
    )
"#;

/// `Users` in PostgreSQL.
#[derive(Debug, Clone)]
pub struct PostgresUserTable {
    pool: PgPool,
}

impl PostgresUserTable {
    /// Build a pool without connecting. Connection problems surface on the
    /// first run instead of at startup.
    pub fn connect_lazy(
        url: &str,
        max_connections: u32,
        connect_timeout: Duration,
    ) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(connect_timeout)
            .connect_lazy(url)
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl UserTable for PostgresUserTable {
    async fn table_exists(&self) -> Result<bool, DatabaseError> {
        sqlx::query_scalar::<_, bool>(TABLE_EXISTS)
            .bind(USERS_TABLE)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)
    }

    async fn upsert_batch(&self, records: &[UserRecord]) -> Result<u64, DatabaseError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;

        let mut applied = 0;
        for record in records {
            let result = sqlx::query(UPSERT_USER)
                .bind(record.id)
                .bind(record.name.as_str())
                .bind(record.age)
                .execute(&mut *tx)
                .await
                .map_err(DatabaseError::from_sqlx)?;
            applied += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::Transaction(e.to_string()))?;
        Ok(applied)
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
