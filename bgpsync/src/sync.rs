//! Device sync: scrape one device (or the whole inventory) and reconcile.

use std::sync::Arc;

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use log::{debug, error, info, warn};

use crate::config::{Credentials, SyncConfig};
use crate::error::{CommandError, Error, InventoryError, SyncError};
use crate::inventory::Inventory;
use crate::probe;
use crate::reconcile::{ReconcileOutcome, reconcile};
use crate::session::{Connector, Response, Session};
use crate::vendor::{FactSet, Vendor};

/// Result of syncing one device inside [`SyncOrchestrator::sync_all`].
#[derive(Debug)]
pub struct DeviceReport {
    pub device: String,
    pub result: Result<(Vendor, ReconcileOutcome), Error>,
}

impl DeviceReport {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-device results of a full sync, ordered by device identifier.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub devices: Vec<DeviceReport>,
}

impl SyncReport {
    pub fn succeeded(&self) -> usize {
        self.devices.iter().filter(|d| d.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.devices.len() - self.succeeded()
    }

    /// Rows inserted or updated across all devices.
    pub fn touched(&self) -> usize {
        self.devices
            .iter()
            .filter_map(|d| d.result.as_ref().ok())
            .map(|(_, outcome)| outcome.touched())
            .sum()
    }
}

/// Drives sessions against devices and feeds what they report into the
/// inventory.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use bgpsync::{Credentials, SqliteInventory, SshConnector, SyncConfig, SyncOrchestrator, Vendor};
///
/// # async fn example() -> bgpsync::Result<()> {
/// let inventory = Arc::new(SqliteInventory::open("bgp_sessions.db").await?);
/// let orchestrator = SyncOrchestrator::new(SshConnector, inventory, SyncConfig::default());
/// let creds = Credentials::from_env()?;
///
/// let outcome = orchestrator
///     .sync_device("r1.example.com", Vendor::CiscoXr, &creds)
///     .await?;
/// println!("{} rows touched", outcome.touched());
/// # Ok(())
/// # }
/// ```
pub struct SyncOrchestrator<C, I> {
    connector: C,
    inventory: Arc<I>,
    config: SyncConfig,
}

impl<C, I> SyncOrchestrator<C, I>
where
    C: Connector,
    I: Inventory + 'static,
{
    pub fn new(connector: C, inventory: Arc<I>, config: SyncConfig) -> Self {
        Self {
            connector,
            inventory,
            config,
        }
    }

    pub fn inventory(&self) -> &Arc<I> {
        &self.inventory
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Sync one device whose vendor is known.
    ///
    /// The session is closed before this returns, whatever happened on it.
    /// Dropping the future before then drops the session with it.
    /// When the summary command fails nothing is reconciled. A rejected
    /// detail command only leaves that neighbor's local side at its
    /// defaults; a detail that times out ends the detail commands for the
    /// whole session.
    pub async fn sync_device(
        &self,
        device: &str,
        vendor: Vendor,
        credentials: &Credentials,
    ) -> Result<ReconcileOutcome, SyncError> {
        info!("{}: syncing as {}", device, vendor);

        let params = self.config.sync_params(device, vendor, credentials);
        let mut session = self
            .config
            .retry
            .acquire(&self.connector, &params)
            .await
            .map_err(|source| SyncError::Connect {
                device: device.to_string(),
                source,
            })?;

        let collected = collect_facts(&mut session, device, vendor).await;
        if let Err(e) = session.close().await {
            debug!("{}: close failed: {}", device, e);
        }

        let facts = collected.map_err(|source| SyncError::Command {
            device: device.to_string(),
            source,
        })?;
        self.store(device, vendor, facts).await
    }

    /// Sync every device the inventory knows about.
    ///
    /// A device whose rows carry a known vendor tag is synced with that
    /// vendor; the rest go through detection first. Failures are recorded
    /// per device and never stop the batch. Only failing to read the device
    /// list is an error.
    pub async fn sync_all(&self, credentials: &Credentials) -> Result<SyncReport, InventoryError> {
        let targets = self.targets().await?;
        info!(
            "syncing {} device(s), {} at a time",
            targets.len(),
            self.config.concurrency.max(1)
        );

        let mut devices: Vec<DeviceReport> = stream::iter(targets)
            .map(|(device, hint)| self.sync_target(device, hint, credentials))
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;
        devices.sort_by(|a, b| a.device.cmp(&b.device));

        let report = SyncReport { devices };
        info!(
            "sync finished: {} ok, {} failed, {} row(s) touched",
            report.succeeded(),
            report.failed(),
            report.touched()
        );
        Ok(report)
    }

    async fn sync_target(
        &self,
        device: String,
        hint: Option<Vendor>,
        credentials: &Credentials,
    ) -> DeviceReport {
        let result = self.resolve_and_sync(&device, hint, credentials).await;
        if let Err(e) = &result {
            error!("{}: sync failed: {}", device, e);
        }
        DeviceReport { device, result }
    }

    async fn resolve_and_sync(
        &self,
        device: &str,
        hint: Option<Vendor>,
        credentials: &Credentials,
    ) -> Result<(Vendor, ReconcileOutcome), Error> {
        let vendor = match hint {
            Some(vendor) => vendor,
            None => probe::detect(&self.connector, device, credentials, &self.config).await?,
        };
        let outcome = self.sync_device(device, vendor, credentials).await?;
        Ok((vendor, outcome))
    }

    /// Device identifiers with the vendor their rows were last synced as.
    async fn targets(&self) -> Result<Vec<(String, Option<Vendor>)>, InventoryError> {
        self.inventory
            .transaction(|tx| {
                let devices = tx.list_device_identifiers()?;
                let rows = tx.list_all()?;
                Ok(devices
                    .into_iter()
                    .map(|device| {
                        let hint = rows
                            .iter()
                            .filter(|r| r.device_identifier == device)
                            .find_map(|r| r.device_vendor.parse::<Vendor>().ok());
                        (device, hint)
                    })
                    .collect())
            })
            .await
    }

    async fn store(
        &self,
        device: &str,
        vendor: Vendor,
        facts: FactSet,
    ) -> Result<ReconcileOutcome, SyncError> {
        reconcile(&*self.inventory, device, vendor, facts, Utc::now())
            .await
            .map_err(|source| SyncError::Inventory {
                device: device.to_string(),
                source,
            })
    }
}

/// Run the vendor's summary command and, where the vendor needs it, one
/// detail command per neighbor.
///
/// A detail command that times out may still answer later, and that output
/// would be read as the next neighbor's. The session is not trusted for
/// further details after that, so the neighbors left keep summary fields.
async fn collect_facts<S: Session>(
    session: &mut S,
    device: &str,
    vendor: Vendor,
) -> Result<FactSet, CommandError> {
    let summary = session
        .send_command(vendor.summary_command())
        .await?
        .into_result()?;
    let mut facts = vendor.parse_summary(&summary.result);
    debug!("{}: {} neighbor(s) in summary", device, facts.len());

    for fact in facts.values_mut() {
        let Some(command) = vendor.detail_command(&fact.neighbor_address) else {
            continue;
        };
        match session.send_command(&command).await.and_then(Response::into_result) {
            Ok(detail) => vendor.apply_detail(fact, &detail.result),
            Err(e @ CommandError::Transport { .. }) => {
                warn!(
                    "{}: detail for {} failed, skipping remaining details: {}",
                    device, fact.neighbor_address, e
                );
                break;
            }
            Err(e) => warn!(
                "{}: no detail for {}, keeping summary fields: {}",
                device, fact.neighbor_address, e
            ),
        }
    }

    Ok(facts)
}
