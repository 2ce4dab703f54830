//! SSH transport layer wrapping russh.
//!
//! Connection setup, password authentication, host key checks and PTY
//! channel creation. Prompt handling lives in [`crate::session`].

pub mod config;
mod ssh;

pub use config::{HostKeyVerification, SshConfig};
pub use ssh::SshTransport;
