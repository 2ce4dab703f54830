//! Sync configuration and device credentials.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::error::ConfigError;
use crate::retry::RetryPolicy;
use crate::session::ConnectParams;
use crate::transport::HostKeyVerification;
use crate::vendor::Vendor;

/// Environment variable holding the device login name.
pub const USERNAME_VAR: &str = "BGP_USERNAME";

/// Environment variable holding the device password.
pub const PASSWORD_VAR: &str = "BGP_PASSWORD";

const DEFAULT_USERNAME: &str = "admin";

/// Login credentials for the device fleet.
///
/// The password is kept in a [`SecretString`] so it never shows up in
/// `Debug` output or log lines.
pub struct Credentials {
    username: String,
    password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Read credentials from `BGP_USERNAME` (default `admin`) and `BGP_PASSWORD`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let username = env::var(USERNAME_VAR)
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_USERNAME.to_string());
        let password = env::var(PASSWORD_VAR)
            .ok()
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::MissingVariable(PASSWORD_VAR))?;
        Ok(Self::new(username, password))
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Settings for the vendor detection probe.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Per-attempt connection and prompt timeout.
    pub timeout: Duration,

    /// Retry policy per vendor profile.
    pub retry: RetryPolicy,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::new(1, Duration::ZERO),
        }
    }
}

/// Configuration shared by the probe and the sync orchestrator.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use bgpsync::{RetryPolicy, SyncConfig};
///
/// let config = SyncConfig::default()
///     .port(2222)
///     .retry(RetryPolicy::new(5, Duration::from_secs(1)))
///     .concurrency(4);
/// assert_eq!(config.port, 2222);
/// ```
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// SSH port (default: 22).
    pub port: u16,

    /// Timeout for connecting and reading the first prompt.
    pub connect_timeout: Duration,

    /// Timeout for each command round trip.
    pub command_timeout: Duration,

    /// Retry policy for sync sessions.
    pub retry: RetryPolicy,

    /// Detection probe settings.
    pub probe: ProbeConfig,

    /// Devices synced at the same time by `sync_all`.
    pub concurrency: usize,

    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// Path to known_hosts file.
    pub known_hosts_path: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            port: 22,
            connect_timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            probe: ProbeConfig::default(),
            concurrency: 1,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }
}

impl SyncConfig {
    /// Set the SSH port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the per-command timeout.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set the sync retry policy.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the probe settings.
    pub fn probe(mut self, probe: ProbeConfig) -> Self {
        self.probe = probe;
        self
    }

    /// Set how many devices `sync_all` works on at once (at least 1).
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Set the host key verification mode.
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Use a known_hosts file other than the user's default.
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Connection parameters for a sync session.
    pub fn sync_params<'a>(
        &'a self,
        host: &'a str,
        vendor: Vendor,
        credentials: &'a Credentials,
    ) -> ConnectParams<'a> {
        ConnectParams {
            host,
            port: self.port,
            vendor,
            credentials,
            connect_timeout: self.connect_timeout,
            command_timeout: self.command_timeout,
            host_key_verification: &self.host_key_verification,
            known_hosts_path: self.known_hosts_path.as_deref(),
        }
    }

    /// Connection parameters for a detection attempt; both timeouts are the
    /// probe's short timeout.
    pub fn probe_params<'a>(
        &'a self,
        host: &'a str,
        vendor: Vendor,
        credentials: &'a Credentials,
    ) -> ConnectParams<'a> {
        ConnectParams {
            connect_timeout: self.probe.timeout,
            command_timeout: self.probe.timeout,
            ..self.sync_params(host, vendor, credentials)
        }
    }
}
