//! Operator edits: manual session entry and deletion.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use log::info;

use super::{ConnectivityStatus, Inventory, NewSession, Result, SessionId};
use crate::error::InventoryError;
use crate::vendor::{UNKNOWN_STATE, UNKNOWN_VENDOR};

/// A session typed in by an operator, fields as entered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualEntry {
    pub neighbor_address: String,
    pub remote_as: String,
    pub device_identifier: String,
    /// Optional; blank means 0.
    pub local_as: String,
    pub local_address: String,
    pub description: String,
}

impl ManualEntry {
    /// Check the entry and turn it into an insertable row stamped `now`.
    ///
    /// The row has no vendor yet and unknown status and state; the first
    /// sync of its device fills those in.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<NewSession> {
        let neighbor_address = required("neighbor_address", &self.neighbor_address)?;
        if neighbor_address.parse::<IpAddr>().is_err() {
            return Err(invalid(
                "neighbor_address",
                format!("'{}' is not an IP address", neighbor_address),
            ));
        }

        let remote_as = parse_as("remote_as", required("remote_as", &self.remote_as)?)?;
        let device_identifier = required("device_identifier", &self.device_identifier)?;

        let local_as = match self.local_as.trim() {
            "" => 0,
            value => parse_as("local_as", value)?,
        };

        Ok(NewSession {
            neighbor_address: neighbor_address.to_string(),
            remote_as,
            local_as,
            local_address: self.local_address.trim().to_string(),
            description: self.description.trim().to_string(),
            device_identifier: device_identifier.to_string(),
            device_vendor: UNKNOWN_VENDOR.to_string(),
            connectivity: ConnectivityStatus::Unknown,
            session_state: UNKNOWN_STATE.to_string(),
            last_updated: now,
        })
    }
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str> {
    match value.trim() {
        "" => Err(invalid(field, "is required")),
        value => Ok(value),
    }
}

fn parse_as(field: &'static str, value: &str) -> Result<u32> {
    value
        .parse()
        .map_err(|_| invalid(field, format!("'{}' is not an AS number", value)))
}

fn invalid(field: &'static str, message: impl Into<String>) -> InventoryError {
    InventoryError::Invalid {
        field,
        message: message.into(),
    }
}

/// Validate `entry` and insert it.
///
/// A neighbor address already in the inventory is
/// [`InventoryError::Conflict`] and nothing is written.
pub async fn add_manual_session<I: Inventory>(
    inventory: &I,
    entry: &ManualEntry,
    now: DateTime<Utc>,
) -> Result<SessionId> {
    let session = entry.validate(now)?;
    let (address, device) = (
        session.neighbor_address.clone(),
        session.device_identifier.clone(),
    );
    let id = inventory
        .transaction(move |tx| tx.insert(&session))
        .await?;
    info!("added session {} for {} on {}", id, address, device);
    Ok(id)
}

/// Delete one session by id.
pub async fn delete_session<I: Inventory>(inventory: &I, id: SessionId) -> Result<()> {
    if !inventory.transaction(move |tx| tx.delete(id)).await? {
        return Err(InventoryError::NotFound(id));
    }
    info!("deleted session {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::MemoryInventory;

    fn entry() -> ManualEntry {
        ManualEntry {
            neighbor_address: "10.2.2.2".to_string(),
            remote_as: "65002".to_string(),
            device_identifier: "pe1.example.com".to_string(),
            ..Default::default()
        }
    }

    fn field_of(err: InventoryError) -> &'static str {
        match err {
            InventoryError::Invalid { field, .. } => field,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_defaults() {
        let now = Utc::now();
        let session = entry().validate(now).unwrap();

        assert_eq!(session.neighbor_address, "10.2.2.2");
        assert_eq!(session.remote_as, 65002);
        assert_eq!(session.local_as, 0);
        assert_eq!(session.device_vendor, "unknown");
        assert_eq!(session.connectivity, ConnectivityStatus::Unknown);
        assert_eq!(session.session_state, "Unknown");
        assert_eq!(session.last_updated, now);
    }

    #[test]
    fn test_validate_trims_and_accepts_ipv6() {
        let session = ManualEntry {
            neighbor_address: " 2001:db8::1 ".to_string(),
            local_as: " 65000 ".to_string(),
            description: " upstream ".to_string(),
            ..entry()
        }
        .validate(Utc::now())
        .unwrap();

        assert_eq!(session.neighbor_address, "2001:db8::1");
        assert_eq!(session.local_as, 65000);
        assert_eq!(session.description, "upstream");
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let now = Utc::now();

        let missing = ManualEntry { neighbor_address: "  ".to_string(), ..entry() };
        assert_eq!(field_of(missing.validate(now).unwrap_err()), "neighbor_address");

        let not_ip = ManualEntry { neighbor_address: "router-1".to_string(), ..entry() };
        assert_eq!(field_of(not_ip.validate(now).unwrap_err()), "neighbor_address");

        let bad_as = ManualEntry { remote_as: "AS65002".to_string(), ..entry() };
        assert_eq!(field_of(bad_as.validate(now).unwrap_err()), "remote_as");

        let no_device = ManualEntry { device_identifier: String::new(), ..entry() };
        assert_eq!(field_of(no_device.validate(now).unwrap_err()), "device_identifier");

        let bad_local = ManualEntry { local_as: "-1".to_string(), ..entry() };
        assert_eq!(field_of(bad_local.validate(now).unwrap_err()), "local_as");
    }

    #[tokio::test]
    async fn test_add_then_conflict() {
        let inventory = MemoryInventory::new();
        let id = add_manual_session(&inventory, &entry(), Utc::now()).await.unwrap();

        let err = add_manual_session(&inventory, &entry(), Utc::now()).await.unwrap_err();
        assert_eq!(err.to_string(), "neighbor address 10.2.2.2 already exists");

        let rows = inventory.list_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
    }

    #[tokio::test]
    async fn test_invalid_entry_writes_nothing() {
        let inventory = MemoryInventory::new();
        let bad = ManualEntry { remote_as: String::new(), ..entry() };

        assert!(add_manual_session(&inventory, &bad, Utc::now()).await.is_err());
        assert!(inventory.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_session() {
        let inventory = MemoryInventory::new();
        let id = add_manual_session(&inventory, &entry(), Utc::now()).await.unwrap();

        delete_session(&inventory, id).await.unwrap();
        assert!(inventory.list_all().await.unwrap().is_empty());
        assert!(matches!(
            delete_session(&inventory, id).await,
            Err(InventoryError::NotFound(missing)) if missing == id
        ));
    }
}
