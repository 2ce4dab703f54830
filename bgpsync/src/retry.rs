//! Bounded retry around session acquisition.

use std::time::Duration;

use log::{info, warn};

use crate::error::ConnectError;
use crate::session::{ConnectParams, Connector};

/// How many times to try opening a session, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,

    /// Pause after each failed attempt except the last.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Open a session, retrying failed attempts.
    ///
    /// Blocks for at most `(max_attempts - 1) * delay` plus the transport's
    /// own timeouts. The error carries the last attempt's failure.
    pub async fn acquire<C: Connector>(
        &self,
        connector: &C,
        params: &ConnectParams<'_>,
    ) -> Result<C::Session, ConnectError> {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match connector.connect(params).await {
                Ok(session) => {
                    if attempt > 1 {
                        info!("{}: connected on attempt {}/{}", params.host, attempt, attempts);
                    }
                    return Ok(session);
                }
                Err(e) if attempt < attempts => {
                    warn!(
                        "{}: attempt {}/{} failed: {}; retrying in {:?}",
                        params.host, attempt, attempts, e, self.delay
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(ConnectError::Exhausted {
                        host: params.host.to_string(),
                        attempts,
                        source: e,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Credentials, SyncConfig};
    use crate::error::TransportError;
    use crate::testing::{FakeConnector, FakeDevice};
    use crate::vendor::Vendor;

    const HOST: &str = "r1.lab";

    fn device() -> FakeDevice {
        FakeDevice::new("RP/0/RSP0/CPU0:r1#")
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_succeeds() {
        let connector = FakeConnector::new().device(HOST, device());
        let config = SyncConfig::default();
        let creds = Credentials::new("admin", "secret");
        let params = config.sync_params(HOST, Vendor::CiscoXr, &creds);

        let start = tokio::time::Instant::now();
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        let result = policy.acquire(&connector, &params).await;

        tokio_test::assert_ok!(result);
        assert_eq!(connector.connects(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleeps_once_per_failed_attempt() {
        let config = SyncConfig::default();
        let creds = Credentials::new("admin", "secret");
        let params = config.sync_params(HOST, Vendor::CiscoXr, &creds);
        let delay = Duration::from_secs(5);

        for failures in 0..4u32 {
            for max_attempts in (failures + 1)..(failures + 3) {
                let mut connector = FakeConnector::new().device(HOST, device());
                for _ in 0..failures {
                    connector = connector.refuse(HOST);
                }
                let start = tokio::time::Instant::now();
                let policy = RetryPolicy::new(max_attempts, delay);

                tokio_test::assert_ok!(policy.acquire(&connector, &params).await);
                assert_eq!(connector.connects(), failures as usize + 1);
                assert_eq!(start.elapsed(), delay * failures);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_carries_last_failure() {
        let connector = FakeConnector::new()
            .refuse(HOST)
            .refuse(HOST)
            .refuse(HOST);
        let config = SyncConfig::default();
        let creds = Credentials::new("admin", "secret");
        let params = config.sync_params(HOST, Vendor::CiscoXr, &creds);

        let start = tokio::time::Instant::now();
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        let err = tokio_test::assert_err!(policy.acquire(&connector, &params).await);

        let ConnectError::Exhausted {
            host,
            attempts,
            source,
        } = err;
        assert_eq!(host, HOST);
        assert_eq!(attempts, 3);
        assert!(matches!(source, TransportError::ConnectionFailed { .. }));
        assert_eq!(connector.connects(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_means_one() {
        let connector = FakeConnector::new().refuse(HOST);
        let config = SyncConfig::default();
        let creds = Credentials::new("admin", "secret");
        let params = config.sync_params(HOST, Vendor::CiscoXr, &creds);

        let policy = RetryPolicy::new(0, Duration::from_secs(1));
        tokio_test::assert_err!(policy.acquire(&connector, &params).await);
        assert_eq!(connector.connects(), 1);
    }
}
