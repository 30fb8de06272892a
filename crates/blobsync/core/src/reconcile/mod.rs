//! Upsert reconciliation into the `Users` table.
//!
//! Every backend applies a batch inside one transaction: all rows commit or
//! none do. Rows absent from the batch are never touched. The table itself is
//! an external precondition and is never created here.

mod memory;
mod postgres;
mod sqlite;

pub use memory::InMemoryUserTable;
pub use postgres::PostgresUserTable;
pub use sqlite::SqliteUserTable;

use crate::error::DatabaseError;
use crate::notify::Notifier;
use crate::record::UserRecord;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// Destination table name.
pub const USERS_TABLE: &str = "Users";

/// A relational destination keyed by record id.
#[async_trait]
pub trait UserTable: Send + Sync {
    /// Whether the destination table exists. Diagnostic only.
    async fn table_exists(&self) -> Result<bool, DatabaseError>;

    /// Insert-or-update every record in a single transaction.
    /// Returns the number of rows written.
    async fn upsert_batch(&self, records: &[UserRecord]) -> Result<u64, DatabaseError>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

/// Result of a committed batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub backend: &'static str,
    pub rows_applied: u64,
    /// `None` when the existence check itself failed or was not needed.
    pub table_present: Option<bool>,
}

/// Applies a record batch and reports failures to the operator.
#[derive(Clone)]
pub struct Reconciler {
    table: Arc<dyn UserTable>,
    notifier: Arc<dyn Notifier>,
}

impl Reconciler {
    pub fn new(table: Arc<dyn UserTable>, notifier: Arc<dyn Notifier>) -> Self {
        Self { table, notifier }
    }

    /// Upsert the batch. `None` means nothing was committed; the failure has
    /// already been logged and reported.
    pub async fn reconcile(&self, records: &[UserRecord]) -> Option<ReconcileReport> {
        let backend = self.table.backend();

        if records.is_empty() {
            tracing::info!(backend, "Document contained no records, nothing to upsert");
            return Some(ReconcileReport {
                backend,
                rows_applied: 0,
                table_present: None,
            });
        }

        for record in records {
            tracing::debug!(id = record.id, name = %record.name, age = record.age, "Staging record");
        }

        let table_present = match self.table.table_exists().await {
            Ok(true) => {
                tracing::info!(backend, table = USERS_TABLE, "Destination table exists");
                Some(true)
            }
            Ok(false) => {
                tracing::warn!(backend, table = USERS_TABLE, "Destination table does not exist");
                Some(false)
            }
            Err(e) => {
                tracing::warn!(backend, error = %e, "Table existence check failed");
                None
            }
        };

        match self.table.upsert_batch(records).await {
            Ok(rows_applied) => {
                tracing::info!(backend, rows = rows_applied, "Database updated successfully");
                Some(ReconcileReport {
                    backend,
                    rows_applied,
                    table_present,
                })
            }
            Err(e) => {
                tracing::error!(backend, error = %e, "Database update failed");
                self.notifier
                    .notify(&format!("Database update failed: {}", e))
                    .await;
                None
            }
        }
    }
}
