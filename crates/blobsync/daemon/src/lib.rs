//! Blobsync daemon library
//!
//! Hosts the sync pipeline behind two entry points: a wall-clock timer and
//! an HTTP event endpoint. Exposed as a library so the router and wiring
//! can be exercised from integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod scheduler;
pub mod server;

pub use config::DaemonConfig;
pub use error::{ApiError, DaemonError, DaemonResult};
pub use pipeline::build_pipeline;
pub use scheduler::TimerTrigger;
pub use server::Server;
