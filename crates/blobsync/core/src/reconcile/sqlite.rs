//! SQLite destination for local runs.

use super::{UserTable, USERS_TABLE};
use crate::error::DatabaseError;
use crate::record::UserRecord;
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

const UPSERT_USER: &str = r#"
    INSERT INTO Users (ID, Name, Age)
    VALUES (?1, ?2, ?3)
    ON CONFLICT (ID)
    DO UPDATE SET
        Name = excluded.Name,
        Age = excluded.Age
"#;

const TABLE_EXISTS: &str =
    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE";

/// `Users` in a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteUserTable {
    pool: SqlitePool,
}

impl SqliteUserTable {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, DatabaseError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserTable for SqliteUserTable {
    async fn table_exists(&self) -> Result<bool, DatabaseError> {
        let count: i64 = sqlx::query_scalar(TABLE_EXISTS)
            .bind(USERS_TABLE)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        Ok(count > 0)
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
        "sqlite"
    }
}
