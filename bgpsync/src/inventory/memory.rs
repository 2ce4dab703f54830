//! In-memory inventory.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use super::{Inventory, InventoryTx, NewSession, Result, SessionId, SessionRecord, SessionUpdate};
use crate::error::InventoryError;

#[derive(Debug, Clone, Default)]
struct State {
    next_id: i64,
    rows: BTreeMap<SessionId, SessionRecord>,
}

/// Inventory held in process memory.
///
/// Transactions work on a copy of the state which replaces the original
/// only on success, so a failed batch leaves no trace. Transactions are
/// serialized by a mutex.
#[derive(Debug, Default)]
pub struct MemoryInventory {
    state: Mutex<State>,
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inventory for MemoryInventory {
    async fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn InventoryTx) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        // The shared state is only written after `f` succeeds, so a panic
        // inside `f` cannot leave it half-updated.
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let mut working = state.clone();
        let value = f(&mut MemoryTx { state: &mut working })?;
        *state = working;
        Ok(value)
    }
}

struct MemoryTx<'a> {
    state: &'a mut State,
}

impl InventoryTx for MemoryTx<'_> {
    fn find_by_neighbor_address(&mut self, neighbor_address: &str) -> Result<Option<SessionRecord>> {
        Ok(self
            .state
            .rows
            .values()
            .find(|r| r.neighbor_address == neighbor_address)
            .cloned())
    }

    fn insert(&mut self, session: &NewSession) -> Result<SessionId> {
        if self
            .state
            .rows
            .values()
            .any(|r| r.neighbor_address == session.neighbor_address)
        {
            return Err(InventoryError::Conflict {
                neighbor_address: session.neighbor_address.clone(),
            });
        }

        self.state.next_id += 1;
        let id = SessionId(self.state.next_id);
        self.state.rows.insert(id, session.clone().into_record(id));
        Ok(id)
    }

    fn update(&mut self, id: SessionId, update: &SessionUpdate) -> Result<()> {
        let record = self
            .state
            .rows
            .get_mut(&id)
            .ok_or(InventoryError::NotFound(id))?;
        update.apply(record);
        Ok(())
    }

    fn delete(&mut self, id: SessionId) -> Result<bool> {
        Ok(self.state.rows.remove(&id).is_some())
    }

    fn list_all(&mut self) -> Result<Vec<SessionRecord>> {
        Ok(self.state.rows.values().cloned().collect())
    }

    fn list_device_identifiers(&mut self) -> Result<Vec<String>> {
        let mut devices: Vec<String> = self
            .state
            .rows
            .values()
            .map(|r| r.device_identifier.clone())
            .collect();
        devices.sort();
        devices.dedup();
        Ok(devices)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::inventory::ConnectivityStatus;

    fn new_session(address: &str, device: &str) -> NewSession {
        NewSession {
            neighbor_address: address.to_string(),
            remote_as: 65001,
            local_as: 0,
            local_address: String::new(),
            description: String::new(),
            device_identifier: device.to_string(),
            device_vendor: "unknown".to_string(),
            connectivity: ConnectivityStatus::Unknown,
            session_state: "Unknown".to_string(),
            last_updated: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let inventory = MemoryInventory::new();
        let id = inventory
            .transaction(|tx| tx.insert(&new_session("10.0.0.1", "r1")))
            .await
            .unwrap();

        let found = inventory
            .find_by_neighbor_address("10.0.0.1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.device_identifier, "r1");
        assert!(
            inventory
                .find_by_neighbor_address("10.0.0.2")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_duplicate_address_conflicts() {
        let inventory = MemoryInventory::new();
        inventory
            .transaction(|tx| tx.insert(&new_session("10.0.0.1", "r1")))
            .await
            .unwrap();

        let err = inventory
            .transaction(|tx| tx.insert(&new_session("10.0.0.1", "r2")))
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::Conflict { .. }));
        assert_eq!(inventory.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_transaction_rolls_back() {
        let inventory = MemoryInventory::new();
        let result: Result<()> = inventory
            .transaction(|tx| {
                tx.insert(&new_session("10.0.0.1", "r1"))?;
                tx.insert(&new_session("10.0.0.2", "r1"))?;
                Err(InventoryError::Unavailable("disk full".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert!(inventory.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ids_not_reused_after_delete() {
        let inventory = MemoryInventory::new();
        let first = inventory
            .transaction(|tx| tx.insert(&new_session("10.0.0.1", "r1")))
            .await
            .unwrap();
        assert!(inventory.transaction(move |tx| tx.delete(first)).await.unwrap());
        assert!(!inventory.transaction(move |tx| tx.delete(first)).await.unwrap());

        let second = inventory
            .transaction(|tx| tx.insert(&new_session("10.0.0.1", "r1")))
            .await
            .unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_device_identifiers_distinct_sorted() {
        let inventory = MemoryInventory::new();
        inventory
            .transaction(|tx| {
                tx.insert(&new_session("10.0.0.1", "r2"))?;
                tx.insert(&new_session("10.0.0.2", "r1"))?;
                tx.insert(&new_session("10.0.0.3", "r2"))
            })
            .await
            .unwrap();

        assert_eq!(
            inventory.list_device_identifiers().await.unwrap(),
            vec!["r1", "r2"]
        );
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let inventory = MemoryInventory::new();
        let update = SessionUpdate {
            remote_as: 1,
            local_as: 2,
            local_address: String::new(),
            device_identifier: "r1".to_string(),
            device_vendor: "cisco_xr".to_string(),
            connectivity: ConnectivityStatus::Up,
            session_state: "Idle".to_string(),
            last_updated: Utc::now(),
        };
        let err = inventory
            .transaction(move |tx| tx.update(SessionId(42), &update))
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::NotFound(SessionId(42))));
    }
}
