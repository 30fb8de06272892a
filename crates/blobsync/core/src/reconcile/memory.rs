//! In-memory table for development and testing

use super::{UserTable, USERS_TABLE};
use crate::error::DatabaseError;
use crate::record::UserRecord;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// `Users` held in a map behind a lock.
#[derive(Debug)]
pub struct InMemoryUserTable {
    rows: RwLock<BTreeMap<i64, UserRecord>>,
    present: bool,
}

impl Default for InMemoryUserTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserTable {
    /// An empty, provisioned table.
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            present: true,
        }
    }

    /// A table that was never provisioned; every upsert fails.
    pub fn missing() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            present: false,
        }
    }

    /// All rows ordered by id.
    pub async fn snapshot(&self) -> Vec<UserRecord> {
        self.rows.read().await.values().cloned().collect()
    }

    pub async fn get(&self, id: i64) -> Option<UserRecord> {
        self.rows.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl UserTable for InMemoryUserTable {
    async fn table_exists(&self) -> Result<bool, DatabaseError> {
        Ok(self.present)
    }

    async fn upsert_batch(&self, records: &[UserRecord]) -> Result<u64, DatabaseError> {
        if !self.present {
            return Err(DatabaseError::Query(format!("no such table: {}", USERS_TABLE)));
        }

        let mut rows = self.rows.write().await;
        let mut staged = rows.clone();
        for record in records {
            staged.insert(record.id, record.clone());
        }
        *rows = staged;
        Ok(records.len() as u64)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, name: &str, age: i64) -> UserRecord {
        UserRecord {
            id,
            name: name.to_string(),
            age,
        }
    }

    #[tokio::test]
    async fn upsert_inserts_then_updates() {
        let table = InMemoryUserTable::new();
        table
            .upsert_batch(&[user(1, "Ann", 30), user(2, "Bo", 25)])
            .await
            .unwrap();
        table.upsert_batch(&[user(1, "Annie", 31)]).await.unwrap();

        assert_eq!(table.get(1).await, Some(user(1, "Annie", 31)));
        assert_eq!(table.get(2).await, Some(user(2, "Bo", 25)));
    }

    #[tokio::test]
    async fn duplicate_ids_resolve_to_a_whole_row() {
        let table = InMemoryUserTable::new();
        let first = user(5, "Eve", 20);
        let second = user(5, "Eva", 21);
        table
            .upsert_batch(&[first.clone(), second.clone()])
            .await
            .unwrap();

        let row = table.get(5).await.unwrap();
        assert!(row == first || row == second);
    }

    #[tokio::test]
    async fn missing_table_rejects_writes() {
        let table = InMemoryUserTable::missing();
        assert!(!table.table_exists().await.unwrap());
        assert!(table.upsert_batch(&[user(1, "Ann", 30)]).await.is_err());
        assert!(table.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_batches_never_interleave() {
        let table = std::sync::Arc::new(InMemoryUserTable::new());
        let batch = |name: &str| (1..=50).map(|id| user(id, name, 40)).collect::<Vec<_>>();

        let (a, b) = (batch("a"), batch("b"));
        let (ta, tb) = (table.clone(), table.clone());
        let first = tokio::spawn(async move { ta.upsert_batch(&a).await });
        let second = tokio::spawn(async move { tb.upsert_batch(&b).await });
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        let rows = table.snapshot().await;
        assert_eq!(rows.len(), 50);
        assert!(rows.iter().all(|r| r.name == rows[0].name));
    }
}
