//! Scripted fake devices for tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{CommandError, TransportError};
use crate::session::{ConnectParams, Connector, Response, Session};

/// What a fake device answers.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeDevice {
    prompt: String,
    replies: HashMap<String, String>,
    broken: HashSet<String>,
    late: HashMap<String, String>,
    hung: HashSet<String>,
}

impl FakeDevice {
    pub(crate) fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Answer `command` with `output`.
    pub(crate) fn reply(mut self, command: impl Into<String>, output: impl Into<String>) -> Self {
        self.replies.insert(command.into(), output.into());
        self
    }

    /// Time out on `command`.
    pub(crate) fn timeout_on(mut self, command: impl Into<String>) -> Self {
        self.broken.insert(command.into());
        self
    }

    /// Time out on `command`, then hand its `output` to whatever command
    /// reads the session next.
    pub(crate) fn late_reply(
        mut self,
        command: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        self.late.insert(command.into(), output.into());
        self
    }

    /// Never answer `command`.
    pub(crate) fn hang_on(mut self, command: impl Into<String>) -> Self {
        self.hung.insert(command.into());
        self
    }
}

enum Script {
    Refuse,
    Open(FakeDevice),
}

#[derive(Default)]
struct Host {
    scripts: VecDeque<Script>,
    device: Option<FakeDevice>,
}

#[derive(Debug, Default)]
struct Stats {
    connects: AtomicUsize,
    closes: AtomicUsize,
    released: AtomicUsize,
    commands: Mutex<Vec<String>>,
}

/// Connector over scripted hosts.
///
/// Each connect to a host consumes the next queued script; once the queue
/// is empty the host's standing device answers, or the connection is
/// refused when there is none.
#[derive(Default)]
pub(crate) struct FakeConnector {
    hosts: Mutex<HashMap<String, Host>>,
    stats: Arc<Stats>,
}

impl FakeConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Standing device for `host`.
    pub(crate) fn device(self, host: &str, device: FakeDevice) -> Self {
        self.with_host(host, |h| h.device = Some(device))
    }

    /// Queue one refused connection.
    pub(crate) fn refuse(self, host: &str) -> Self {
        self.with_host(host, |h| h.scripts.push_back(Script::Refuse))
    }

    /// Queue one connection answered by `device`.
    pub(crate) fn once(self, host: &str, device: FakeDevice) -> Self {
        self.with_host(host, |h| h.scripts.push_back(Script::Open(device)))
    }

    fn with_host(self, host: &str, f: impl FnOnce(&mut Host)) -> Self {
        if let Ok(mut hosts) = self.hosts.lock() {
            f(hosts.entry(host.to_string()).or_default());
        }
        self
    }

    pub(crate) fn connects(&self) -> usize {
        self.stats.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn closes(&self) -> usize {
        self.stats.closes.load(Ordering::SeqCst)
    }

    /// Sessions dropped, closed or not.
    pub(crate) fn released(&self) -> usize {
        self.stats.released.load(Ordering::SeqCst)
    }

    /// Every command sent through any session, in order.
    pub(crate) fn commands(&self) -> Vec<String> {
        self.stats.commands.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn open(&self, params: &ConnectParams<'_>) -> Result<FakeSession, TransportError> {
        self.stats.connects.fetch_add(1, Ordering::SeqCst);

        let mut hosts = self.hosts.lock().map_err(|_| TransportError::Disconnected)?;
        let device = hosts.get_mut(params.host).and_then(|h| match h.scripts.pop_front() {
            Some(Script::Refuse) => None,
            Some(Script::Open(device)) => Some(device),
            None => h.device.clone(),
        });

        match device {
            Some(device) => Ok(FakeSession {
                device,
                open: true,
                unread: None,
                stats: self.stats.clone(),
            }),
            None => Err(TransportError::ConnectionFailed {
                host: params.host.to_string(),
                port: params.port,
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
            }),
        }
    }
}

impl Connector for FakeConnector {
    type Session = FakeSession;

    async fn connect(&self, params: &ConnectParams<'_>) -> Result<FakeSession, TransportError> {
        self.open(params)
    }
}

#[derive(Debug)]
pub(crate) struct FakeSession {
    device: FakeDevice,
    open: bool,
    /// Output of a timed-out command still sitting in the channel.
    unread: Option<String>,
    stats: Arc<Stats>,
}

impl Session for FakeSession {
    fn prompt(&self) -> &str {
        &self.device.prompt
    }

    async fn send_command(&mut self, command: &str) -> Result<Response, CommandError> {
        if !self.open {
            return Err(CommandError::Closed);
        }
        if let Ok(mut commands) = self.stats.commands.lock() {
            commands.push(command.to_string());
        }

        if self.device.hung.contains(command) {
            return std::future::pending().await;
        }
        if let Some(output) = self.device.late.get(command) {
            self.unread = Some(output.clone());
            return Err(timeout(command));
        }
        if self.device.broken.contains(command) {
            return Err(timeout(command));
        }
        if let Some(stale) = self.unread.take() {
            return Ok(Response::new(
                command,
                stale,
                self.device.prompt.clone(),
                Duration::ZERO,
            ));
        }
        match self.device.replies.get(command) {
            Some(output) => Ok(Response::new(
                command,
                output.clone(),
                self.device.prompt.clone(),
                Duration::ZERO,
            )),
            None => Ok(Response::failed(
                command,
                "% Invalid input detected at '^' marker.",
                self.device.prompt.clone(),
                Duration::ZERO,
                "% Invalid input detected",
            )),
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.open {
            self.open = false;
            self.stats.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        self.stats.released.fetch_add(1, Ordering::SeqCst);
    }
}

fn timeout(command: &str) -> CommandError {
    CommandError::Transport {
        command: command.to_string(),
        source: TransportError::Timeout(Duration::from_secs(30)),
    }
}
