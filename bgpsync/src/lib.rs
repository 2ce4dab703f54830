//! # bgpsync
//!
//! Keep an inventory of BGP sessions in step with what network devices
//! actually report.
//!
//! bgpsync logs into routers over SSH, runs the vendor's neighbor commands
//! in an interactive shell, parses the output into neighbor facts and
//! upserts them into a SQLite inventory keyed by neighbor address.
//!
//! ## Features
//!
//! - Async SSH sessions via russh, with bounded connection retry
//! - Vendor detection from the login prompt
//! - Cisco IOS-XR (table-style) and Nokia SR OS (block-style) parsers
//! - Transactional reconciliation: a device's facts land all or nothing
//! - Manual session entry and deletion for operators
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bgpsync::{Credentials, SqliteInventory, SshConnector, SyncConfig, SyncOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), bgpsync::Error> {
//!     let inventory = Arc::new(SqliteInventory::open("bgp_sessions.db").await?);
//!     let orchestrator = SyncOrchestrator::new(SshConnector, inventory, SyncConfig::default());
//!
//!     let report = orchestrator.sync_all(&Credentials::from_env()?).await?;
//!     for device in &report.devices {
//!         println!("{}: {}", device.device, if device.is_success() { "ok" } else { "failed" });
//!     }
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod inventory;
pub mod probe;
pub mod reconcile;
pub mod retry;
pub mod session;
pub mod sync;
pub mod transport;
pub mod vendor;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use config::{Credentials, ProbeConfig, SyncConfig};
pub use error::{Error, Result};
pub use inventory::{
    ConnectivityStatus, Inventory, ManualEntry, MemoryInventory, SessionId, SessionRecord,
    SqliteInventory,
};
pub use reconcile::{ReconcileOutcome, reconcile};
pub use retry::RetryPolicy;
pub use session::{Connector, Response, Session, SshConnector};
pub use sync::{DeviceReport, SyncOrchestrator, SyncReport};
pub use transport::HostKeyVerification;
pub use vendor::{FactSet, NeighborFact, Vendor};
