//! Blob-to-SQL record synchronization.
//!
//! One sync run is a three-step pipeline:
//! - fetch a JSON document from a blob container ([`fetch`])
//! - upsert its records into the `Users` table in one transaction ([`reconcile`])
//! - report any failure by email ([`notify`])
//!
//! Failures never escape a run. They are logged and sent to the operator once,
//! and the next trigger is the only recovery.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod error;
pub mod fetch;
pub mod notify;
mod pipeline;
pub mod reconcile;
mod record;

pub use error::{DatabaseError, FetchError, NotificationError};
pub use fetch::{AzureBlobSource, DocumentFetcher, DocumentSource, FileSource, StorageConnection};
pub use notify::{EmailSettings, Notifier, NotifyOutcome, SendGridNotifier};
pub use pipeline::{RunOutcome, SyncPipeline, Trigger};
pub use reconcile::{
    InMemoryUserTable, PostgresUserTable, ReconcileReport, Reconciler, SqliteUserTable, UserTable,
};
pub use record::{duplicate_ids, parse_document, UserRecord};

#[cfg(any(test, feature = "test-utils"))]
pub use notify::RecordingNotifier;
