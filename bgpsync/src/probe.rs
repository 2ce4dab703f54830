//! Vendor detection by prompt inspection.

use log::{debug, info};

use crate::config::{Credentials, SyncConfig};
use crate::error::DetectionError;
use crate::session::{Connector, Session};
use crate::vendor::Vendor;

/// Work out which vendor profile a host answers to.
///
/// Profiles are tried in [`Vendor::PROBE_ORDER`], each with the probe's
/// short timeout and retry policy. The session is closed before the prompt
/// is judged, so no connection outlives its attempt. Connection failures
/// only rule out that one profile.
pub async fn detect<C: Connector>(
    connector: &C,
    host: &str,
    credentials: &Credentials,
    config: &SyncConfig,
) -> Result<Vendor, DetectionError> {
    info!("{}: detecting device type", host);

    for vendor in Vendor::PROBE_ORDER {
        let params = config.probe_params(host, vendor, credentials);
        let mut session = match config.probe.retry.acquire(connector, &params).await {
            Ok(session) => session,
            Err(e) => {
                debug!("{}: {} profile failed: {}", host, vendor, e);
                continue;
            }
        };

        let prompt = session.prompt().to_string();
        if let Err(e) = session.close().await {
            debug!("{}: close after {} probe failed: {}", host, vendor, e);
        }

        if vendor.matches_prompt(&prompt) {
            info!("{}: prompt '{}' identifies {}", host, prompt, vendor);
            return Ok(vendor);
        }
        debug!("{}: prompt '{}' is not {}", host, prompt, vendor);
    }

    Err(DetectionError::NoMatchingVendor {
        host: host.to_string(),
    })
}
