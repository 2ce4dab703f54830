//! Merging observed neighbor facts into the inventory.

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;

use crate::error::InventoryError;
use crate::inventory::{ConnectivityStatus, Inventory, InventoryTx, NewSession, SessionUpdate};
use crate::vendor::{FactSet, Vendor};

/// Counts of rows written by one reconcile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub inserted: usize,
    pub updated: usize,
}

impl ReconcileOutcome {
    /// Rows inserted or updated.
    pub fn touched(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Upsert one device's facts, keyed by neighbor address.
///
/// Runs in a single transaction: either every fact lands or none does.
/// A row found under the same address is overwritten even when another
/// device reported it before, since addresses are unique across the
/// inventory. Rows the facts do not mention are left as they are, and
/// every observed row is marked [`ConnectivityStatus::Up`] whatever its
/// session state.
pub async fn reconcile<I: Inventory>(
    inventory: &I,
    device: &str,
    vendor: Vendor,
    facts: FactSet,
    observed_at: DateTime<Utc>,
) -> Result<ReconcileOutcome, InventoryError> {
    let observed = facts.len();
    let owner = device.to_string();
    let outcome = inventory
        .transaction(move |tx| upsert_all(tx, &owner, vendor, &facts, observed_at))
        .await?;

    info!(
        "{}: reconciled {} neighbor(s), {} new, {} updated",
        device, observed, outcome.inserted, outcome.updated
    );
    Ok(outcome)
}

fn upsert_all(
    tx: &mut dyn InventoryTx,
    device: &str,
    vendor: Vendor,
    facts: &FactSet,
    observed_at: DateTime<Utc>,
) -> Result<ReconcileOutcome, InventoryError> {
    let mut outcome = ReconcileOutcome::default();

    for fact in facts.values() {
        match tx.find_by_neighbor_address(&fact.neighbor_address)? {
            Some(existing) => {
                if existing.device_identifier != device {
                    debug!(
                        "{}: moving {} from {}",
                        device, fact.neighbor_address, existing.device_identifier
                    );
                }
                tx.update(
                    existing.id,
                    &SessionUpdate {
                        remote_as: fact.remote_as,
                        local_as: fact.local_as,
                        local_address: fact.local_address.clone(),
                        device_identifier: device.to_string(),
                        device_vendor: vendor.tag().to_string(),
                        connectivity: ConnectivityStatus::Up,
                        session_state: fact.session_state.clone(),
                        last_updated: observed_at,
                    },
                )?;
                outcome.updated += 1;
            }
            None => {
                tx.insert(&NewSession {
                    neighbor_address: fact.neighbor_address.clone(),
                    remote_as: fact.remote_as,
                    local_as: fact.local_as,
                    local_address: fact.local_address.clone(),
                    description: String::new(),
                    device_identifier: device.to_string(),
                    device_vendor: vendor.tag().to_string(),
                    connectivity: ConnectivityStatus::Up,
                    session_state: fact.session_state.clone(),
                    last_updated: observed_at,
                })?;
                outcome.inserted += 1;
            }
        }
    }

    Ok(outcome)
}
