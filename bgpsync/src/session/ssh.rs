//! SSH-backed sessions.

use std::time::{Duration, Instant};

use log::debug;
use russh::client::Msg;
use russh::{Channel, ChannelMsg};

use super::response::Response;
use super::{ConnectParams, Connector, Session, last_line, normalize_output};
use crate::channel::PatternBuffer;
use crate::error::{CommandError, TransportError};
use crate::transport::{SshConfig, SshTransport};
use crate::vendor::Vendor;

/// Opens [`SshSession`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct SshConnector;

impl Connector for SshConnector {
    type Session = SshSession;

    async fn connect(&self, params: &ConnectParams<'_>) -> Result<SshSession, TransportError> {
        SshSession::open(params).await
    }
}

/// An interactive PTY shell on a device, driven by the vendor's prompt pattern.
///
/// Dropping the session without calling [`Session::close`] still tears the
/// connection down, since the underlying SSH handle is dropped with it.
pub struct SshSession {
    /// SSH transport (None once closed).
    transport: Option<SshTransport>,

    /// The PTY shell channel.
    channel: Channel<Msg>,

    /// Output accumulated since the last prompt.
    buffer: PatternBuffer,

    vendor: Vendor,

    /// Prompt seen right after login.
    prompt: String,

    command_timeout: Duration,
}

impl SshSession {
    /// Connect, open a shell, wait for the first prompt and run the vendor's
    /// on-open commands.
    pub async fn open(params: &ConnectParams<'_>) -> Result<Self, TransportError> {
        let transport =
            SshTransport::connect(SshConfig::from_params(params), params.credentials).await?;

        let channel = match transport.open_channel().await {
            Ok(channel) => channel,
            Err(e) => {
                transport.close_quietly().await;
                return Err(e);
            }
        };

        let mut session = Self {
            transport: Some(transport),
            channel,
            buffer: PatternBuffer::default(),
            vendor: params.vendor,
            prompt: String::new(),
            command_timeout: params.command_timeout,
        };

        match session.read_until_prompt(params.connect_timeout).await {
            Ok(raw) => session.prompt = last_line(&String::from_utf8_lossy(&raw)),
            Err(e) => {
                if let Some(transport) = session.transport.take() {
                    transport.close_quietly().await;
                }
                return Err(e);
            }
        }
        debug!("{}: logged in, prompt '{}'", params.host, session.prompt);

        for command in params.vendor.on_open_commands() {
            match session.send_command(command).await {
                Ok(response) if !response.is_success() => {
                    debug!("{}: on-open '{}' rejected", params.host, command)
                }
                Ok(_) => {}
                Err(e) => debug!("{}: on-open '{}' failed: {}", params.host, command, e),
            }
        }

        Ok(session)
    }

    /// Read until the vendor prompt shows up in the buffer tail.
    async fn read_until_prompt(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let pattern = self.vendor.prompt_pattern();
        let read = async {
            loop {
                if self.buffer.tail_contains(pattern) {
                    return Ok(self.buffer.take());
                }
                match self.channel.wait().await {
                    Some(ChannelMsg::Data { data }) | Some(ChannelMsg::ExtendedData { data, .. }) => {
                        self.buffer.extend(&data)
                    }
                    Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                        return Err(TransportError::Disconnected);
                    }
                    Some(_) => {}
                }
            }
        };

        let outcome = tokio::time::timeout(timeout, read).await;
        match outcome {
            Ok(result) => result,
            Err(_) => {
                // Late output would be mistaken for the next command's
                self.buffer.clear();
                Err(TransportError::Timeout(timeout))
            }
        }
    }

    fn detect_failure(&self, output: &str) -> Option<&'static str> {
        self.vendor
            .failure_patterns()
            .iter()
            .copied()
            .find(|pattern| output.contains(pattern))
    }
}

impl Session for SshSession {
    fn prompt(&self) -> &str {
        &self.prompt
    }

    async fn send_command(&mut self, command: &str) -> Result<Response, CommandError> {
        if self.transport.is_none() {
            return Err(CommandError::Closed);
        }
        let failed = |source: TransportError| CommandError::Transport {
            command: command.to_string(),
            source,
        };

        let start = Instant::now();
        let line = format!("{}\n", command);
        self.channel
            .data(line.as_bytes())
            .await
            .map_err(|e| failed(TransportError::Ssh(e)))?;

        let data = self
            .read_until_prompt(self.command_timeout)
            .await
            .map_err(failed)?;
        let elapsed = start.elapsed();

        let raw = String::from_utf8_lossy(&data);
        let prompt = last_line(&raw);
        let result = normalize_output(&raw, command);

        if let Some(marker) = self.detect_failure(&result) {
            return Ok(Response::failed(command, result, prompt, elapsed, marker));
        }
        Ok(Response::new(command, result, prompt, elapsed))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self.transport.take() {
            Some(transport) => transport.close().await,
            None => Ok(()),
        }
    }
}
