//! SSH connection configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::session::ConnectParams;

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Default)]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys.
    Strict,

    /// Accept and learn unknown keys, reject changed keys.
    #[default]
    AcceptNew,

    /// Accept all keys without checking. For lab use only.
    Disabled,
}

/// SSH connection configuration.
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// SSH port.
    pub port: u16,

    /// Connection timeout, also used as the inactivity timeout.
    pub timeout: Duration,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,

    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// Path to known_hosts file.
    pub known_hosts_path: Option<PathBuf>,
}

impl SshConfig {
    /// Build the transport configuration for one session.
    pub fn from_params(params: &ConnectParams<'_>) -> Self {
        Self {
            host: params.host.to_string(),
            port: params.port,
            timeout: params.connect_timeout,
            terminal_width: params.vendor.terminal_width(),
            terminal_height: 24,
            host_key_verification: params.host_key_verification.clone(),
            known_hosts_path: params.known_hosts_path.map(PathBuf::from),
        }
    }
}
