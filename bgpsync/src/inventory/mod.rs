//! Persisted BGP session inventory.
//!
//! [`Inventory`] is the store interface the sync core needs: lookups by the
//! unique neighbor address, inserts, in-place updates, deletes and listings,
//! all inside a transaction scoped to a closure. Two stores implement it:
//! [`SqliteInventory`] for durable use and [`MemoryInventory`] for tests
//! and embedding.

pub mod manual;
mod memory;
mod schema;
mod sqlite;

pub use manual::{ManualEntry, add_manual_session, delete_session};
pub use memory::MemoryInventory;
pub use sqlite::SqliteInventory;

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::InventoryError;

pub type Result<T, E = InventoryError> = std::result::Result<T, E>;

/// Store-assigned row identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether the last sync saw the neighbor.
///
/// Derived by this crate, not reported by the device: a neighbor observed
/// in `Idle` state is still `Up`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectivityStatus {
    Up,
    Down,
    #[default]
    Unknown,
}

impl ConnectivityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectivityStatus::Up => "Up",
            ConnectivityStatus::Down => "Down",
            ConnectivityStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ConnectivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectivityStatus {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Up" => Ok(ConnectivityStatus::Up),
            "Down" => Ok(ConnectivityStatus::Down),
            "Unknown" => Ok(ConnectivityStatus::Unknown),
            other => Err(InventoryError::Corrupt(format!(
                "unknown connectivity status '{}'",
                other
            ))),
        }
    }
}

/// One persisted BGP peering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    /// Unique across the whole inventory.
    pub neighbor_address: String,
    pub remote_as: u32,
    pub local_as: u32,
    pub local_address: String,
    pub description: String,
    /// Hostname or FQDN of the device reporting this peering.
    pub device_identifier: String,
    /// Tag of the vendor profile that last synced the row.
    pub device_vendor: String,
    pub connectivity: ConnectivityStatus,
    pub session_state: String,
    pub last_updated: DateTime<Utc>,
}

/// A row to insert; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub neighbor_address: String,
    pub remote_as: u32,
    pub local_as: u32,
    pub local_address: String,
    pub description: String,
    pub device_identifier: String,
    pub device_vendor: String,
    pub connectivity: ConnectivityStatus,
    pub session_state: String,
    pub last_updated: DateTime<Utc>,
}

impl NewSession {
    pub(crate) fn into_record(self, id: SessionId) -> SessionRecord {
        SessionRecord {
            id,
            neighbor_address: self.neighbor_address,
            remote_as: self.remote_as,
            local_as: self.local_as,
            local_address: self.local_address,
            description: self.description,
            device_identifier: self.device_identifier,
            device_vendor: self.device_vendor,
            connectivity: self.connectivity,
            session_state: self.session_state,
            last_updated: self.last_updated,
        }
    }
}

/// Fields a sync overwrites on an existing row. Address, id and
/// description are left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUpdate {
    pub remote_as: u32,
    pub local_as: u32,
    pub local_address: String,
    pub device_identifier: String,
    pub device_vendor: String,
    pub connectivity: ConnectivityStatus,
    pub session_state: String,
    pub last_updated: DateTime<Utc>,
}

impl SessionUpdate {
    pub(crate) fn apply(&self, record: &mut SessionRecord) {
        record.remote_as = self.remote_as;
        record.local_as = self.local_as;
        record.local_address = self.local_address.clone();
        record.device_identifier = self.device_identifier.clone();
        record.device_vendor = self.device_vendor.clone();
        record.connectivity = self.connectivity;
        record.session_state = self.session_state.clone();
        record.last_updated = self.last_updated;
    }
}

/// Operations available inside a transaction.
pub trait InventoryTx {
    fn find_by_neighbor_address(&mut self, neighbor_address: &str) -> Result<Option<SessionRecord>>;

    /// Insert a row. A taken neighbor address is [`InventoryError::Conflict`].
    fn insert(&mut self, session: &NewSession) -> Result<SessionId>;

    /// Overwrite sync-owned fields. Unknown ids are [`InventoryError::NotFound`].
    fn update(&mut self, id: SessionId, update: &SessionUpdate) -> Result<()>;

    /// Remove a row, returning whether it existed.
    fn delete(&mut self, id: SessionId) -> Result<bool>;

    /// All rows ordered by id.
    fn list_all(&mut self) -> Result<Vec<SessionRecord>>;

    /// Distinct device identifiers, sorted.
    fn list_device_identifiers(&mut self) -> Result<Vec<String>>;
}

/// A session store with closure-scoped transactions.
pub trait Inventory: Send + Sync {
    /// Run `f` in a transaction: committed when it returns `Ok`, rolled
    /// back when it returns `Err` or unwinds.
    ///
    /// `f` may run on a store-owned thread, so it must own what it uses.
    fn transaction<T, F>(&self, f: F) -> impl Future<Output = Result<T>> + Send
    where
        F: FnOnce(&mut dyn InventoryTx) -> Result<T> + Send + 'static,
        T: Send + 'static;

    fn list_all(&self) -> impl Future<Output = Result<Vec<SessionRecord>>> + Send {
        self.transaction(|tx| tx.list_all())
    }

    fn list_device_identifiers(&self) -> impl Future<Output = Result<Vec<String>>> + Send {
        self.transaction(|tx| tx.list_device_identifiers())
    }

    fn find_by_neighbor_address(
        &self,
        neighbor_address: &str,
    ) -> impl Future<Output = Result<Option<SessionRecord>>> + Send {
        let neighbor_address = neighbor_address.to_string();
        self.transaction(move |tx| tx.find_by_neighbor_address(&neighbor_address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            ConnectivityStatus::Up,
            ConnectivityStatus::Down,
            ConnectivityStatus::Unknown,
        ] {
            assert_eq!(status.as_str().parse::<ConnectivityStatus>().unwrap(), status);
        }
        assert!("up".parse::<ConnectivityStatus>().is_err());
    }
}
