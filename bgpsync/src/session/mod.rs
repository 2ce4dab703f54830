//! Interactive CLI sessions.
//!
//! A [`Connector`] opens a [`Session`] to one device using a vendor's
//! connection profile. [`SshConnector`] does this over SSH; the rest of the
//! crate only sees the traits.

mod response;
mod ssh;

pub use response::Response;
pub use ssh::{SshConnector, SshSession};

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use crate::config::Credentials;
use crate::error::{CommandError, TransportError};
use crate::transport::HostKeyVerification;
use crate::vendor::Vendor;

/// Everything needed to open one session.
///
/// Borrowed from the sync configuration and the caller's credentials, so
/// the password is never copied.
#[derive(Debug, Clone, Copy)]
pub struct ConnectParams<'a> {
    pub host: &'a str,
    pub port: u16,
    pub vendor: Vendor,
    pub credentials: &'a Credentials,
    /// Bound on connecting, authenticating and reading the first prompt.
    pub connect_timeout: Duration,
    /// Bound on each command round trip.
    pub command_timeout: Duration,
    pub host_key_verification: &'a HostKeyVerification,
    pub known_hosts_path: Option<&'a Path>,
}

/// Opens sessions to devices.
pub trait Connector: Send + Sync {
    type Session: Session;

    /// Open a session and read the initial prompt.
    ///
    /// On failure nothing is left open.
    fn connect(
        &self,
        params: &ConnectParams<'_>,
    ) -> impl Future<Output = Result<Self::Session, TransportError>> + Send;
}

/// One interactive CLI session.
pub trait Session: Send {
    /// The prompt read when the session was opened.
    fn prompt(&self) -> &str;

    /// Send a command and wait for the prompt.
    ///
    /// Output matching a vendor failure marker comes back as a failed
    /// [`Response`], not an error.
    fn send_command(
        &mut self,
        command: &str,
    ) -> impl Future<Output = Result<Response, CommandError>> + Send;

    /// Close the session. Closing twice is a no-op.
    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Strip the command echo and the trailing prompt line from raw output.
pub fn normalize_output(raw: &str, command: &str) -> String {
    let output = raw.trim_start_matches(['\r', '\n']);
    let output = output
        .strip_prefix(command)
        .unwrap_or(output)
        .trim_start_matches(['\r', '\n']);

    let body = match output.rfind('\n') {
        Some(pos) => &output[..pos],
        None => "",
    };
    body.replace('\r', "")
}

/// Last non-empty line of raw output, which is the prompt.
pub fn last_line(raw: &str) -> String {
    raw.lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_echo_and_prompt() {
        let raw = "show bgp neighbor 10.1.1.1\r\nLocal AS: 65000\r\nLocal host: 10.0.0.2\r\nRP/0/RSP0/CPU0:r1#";
        assert_eq!(
            normalize_output(raw, "show bgp neighbor 10.1.1.1"),
            "Local AS: 65000\nLocal host: 10.0.0.2"
        );
    }

    #[test]
    fn test_normalize_empty_output() {
        assert_eq!(normalize_output("show router bgp neighbor\r\nA:pe1# ", "show router bgp neighbor"), "");
    }

    #[test]
    fn test_normalize_prompt_only() {
        assert_eq!(normalize_output("A:pe1#", "environment no more"), "");
    }

    #[test]
    fn test_last_line() {
        assert_eq!(last_line("\r\nWelcome\r\nRP/0/RSP0/CPU0:r1#"), "RP/0/RSP0/CPU0:r1#");
        assert_eq!(last_line("[/]\r\nA:admin@pe1# "), "A:admin@pe1#");
        assert_eq!(last_line(""), "");
    }
}
