//! Error types for bgpsync.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::inventory::SessionId;

/// Main error type for bgpsync operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Session acquisition gave up
    #[error("Connect error: {0}")]
    Connect(#[from] ConnectError),

    /// Command execution errors
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// Vendor detection errors
    #[error("Detection error: {0}")]
    Detection(#[from] DetectionError),

    /// Device sync errors
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// Inventory errors
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Transport layer errors (SSH connection, authentication, PTY reads).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Server presented a different key than the one on record
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Strict verification and the host is not in known_hosts
    #[error("Host key for {host}:{port} is not known")]
    HostKeyUnknown { host: String, port: u16 },

    /// Reading or writing known_hosts failed
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Raised when every connection attempt to a device failed.
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("giving up on {host} after {attempts} attempt(s): {source}")]
    Exhausted {
        host: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },
}

/// Command execution errors on an open session.
#[derive(Error, Debug)]
pub enum CommandError {
    /// The transport failed while the command was in flight
    #[error("'{command}' failed: {source}")]
    Transport {
        command: String,
        #[source]
        source: TransportError,
    },

    /// The device answered with one of the vendor's failure markers
    #[error("'{command}' rejected by device: {message}")]
    Rejected { command: String, message: String },

    /// The session was already closed
    #[error("session is closed")]
    Closed,
}

/// Vendor detection errors.
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("no matching vendor for {host}")]
    NoMatchingVendor { host: String },
}

/// A single device sync failed; nothing was reconciled for it.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("{device}: {source}")]
    Connect {
        device: String,
        #[source]
        source: ConnectError,
    },

    #[error("{device}: {source}")]
    Command {
        device: String,
        #[source]
        source: CommandError,
    },

    #[error("{device}: {source}")]
    Inventory {
        device: String,
        #[source]
        source: InventoryError,
    },
}

impl SyncError {
    /// The device whose sync failed.
    pub fn device(&self) -> &str {
        match self {
            SyncError::Connect { device, .. }
            | SyncError::Command { device, .. }
            | SyncError::Inventory { device, .. } => device,
        }
    }
}

/// Persistence errors.
#[derive(Error, Debug)]
pub enum InventoryError {
    /// Unique-key violation on the neighbor address
    #[error("neighbor address {neighbor_address} already exists")]
    Conflict { neighbor_address: String },

    /// No session with that id
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// Operator input failed validation
    #[error("invalid {field}: {message}")]
    Invalid { field: &'static str, message: String },

    /// A stored value could not be decoded
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// The store could not be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The connection thread failed or has shut down
    #[error("database connection error: {0}")]
    Connection(#[from] tokio_rusqlite::Error),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingVariable(&'static str),
}

/// Result type alias using bgpsync's Error.
pub type Result<T> = std::result::Result<T, Error>;
