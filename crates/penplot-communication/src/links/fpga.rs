//! FPGA link: bulk image exchange with the edge accelerator
//!
//! One exchange walks a fixed state machine:
//!
//! ```text
//! Idle -> Connected -> TriggerSent -> Sending -> AwaitingResponse -> Receiving -> Done
//!   any state -> Failed
//! ```
//!
//! The payload goes out in bounded bursts with a short pause between them
//! so the receiver's input buffer is never overrun. Whatever comes back is
//! written to the hex artifact, partial data included, before the outcome
//! is reported. Nothing is retried automatically.

use crate::communication::{ChannelOpener, ConnectionParams, SerialPortOpener, SerialSession};
use penplot_core::artifact;
use penplot_core::{CancelFlag, LinkError, ParameterError, Progress, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

const READ_CHUNK: usize = 4096;

/// How the receive phase ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiveMode {
    /// Stop at the expected length; a silent gap longer than the receive
    /// timeout ends the transfer short
    #[default]
    Fixed,
    /// Keep reading until the cancel flag is raised; succeeds only if the
    /// expected length arrived by then
    OpenEnded,
}

/// Exchange state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FpgaState {
    /// No exchange running
    Idle,
    /// Port open, buffers cleared
    Connected,
    /// Trigger byte written
    TriggerSent,
    /// Payload bursts in progress
    Sending,
    /// Waiting for the first response byte
    AwaitingResponse,
    /// Response bytes arriving
    Receiving,
    /// Response complete and persisted
    Done,
    /// Exchange aborted
    Failed,
}

impl fmt::Display for FpgaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connected => "connected",
            Self::TriggerSent => "trigger-sent",
            Self::Sending => "sending",
            Self::AwaitingResponse => "awaiting-response",
            Self::Receiving => "receiving",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// FPGA link settings
#[derive(Debug, Clone, PartialEq)]
pub struct FpgaConfig {
    /// Serial port parameters
    pub connection: ConnectionParams,
    /// Byte that starts an image intake
    pub trigger_byte: u8,
    /// Hardware settle time after opening the port
    pub settle: Duration,
    /// Pause after the trigger before the payload
    pub trigger_settle: Duration,
    /// Payload bytes per burst
    pub burst_size: usize,
    /// Pause between bursts
    pub burst_pause: Duration,
    /// Longest wait for the first response byte
    pub response_timeout: Duration,
    /// Longest silent gap once the response has started
    pub receive_timeout: Duration,
    /// Pause after an empty read
    pub poll_interval: Duration,
    /// Bytes the accelerator returns
    pub expected_len: usize,
    /// How receiving ends
    pub receive_mode: ReceiveMode,
}

impl Default for FpgaConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionParams::default(),
            trigger_byte: 0xAA,
            settle: Duration::from_secs(3),
            trigger_settle: Duration::from_millis(100),
            burst_size: 1500,
            burst_pause: Duration::from_millis(1),
            response_timeout: Duration::from_secs(10),
            receive_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(10),
            // Header byte plus a packed 170x240 frame
            expected_len: 1 + 5100,
            receive_mode: ReceiveMode::Fixed,
        }
    }
}

/// Outcome of a completed exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FpgaReport {
    /// Session id used in the log span
    pub session_id: Uuid,
    /// Payload bytes written, trigger excluded
    pub sent: usize,
    /// Response bytes received
    pub received: usize,
    /// Where the response was written
    pub artifact: PathBuf,
}

/// Bulk transfer link to the edge accelerator
pub struct FpgaLink {
    config: FpgaConfig,
    opener: Arc<dyn ChannelOpener>,
    state: FpgaState,
}

impl fmt::Debug for FpgaLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FpgaLink")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}

impl FpgaLink {
    /// Create a link that opens channels through `opener`
    pub fn new(config: FpgaConfig, opener: Arc<dyn ChannelOpener>) -> Result<Self> {
        if config.burst_size == 0 {
            return Err(ParameterError::out_of_range("burst_size", 0.0, ">= 1").into());
        }
        if config.expected_len == 0 {
            return Err(ParameterError::out_of_range("expected_len", 0.0, ">= 1").into());
        }
        Ok(Self {
            config,
            opener,
            state: FpgaState::Idle,
        })
    }

    /// Create a link on a hardware serial port
    pub fn with_serial_port(config: FpgaConfig) -> Result<Self> {
        Self::new(config, Arc::new(SerialPortOpener))
    }

    /// Active settings
    pub fn config(&self) -> &FpgaConfig {
        &self.config
    }

    /// Current state of the last or running exchange
    pub fn state(&self) -> FpgaState {
        self.state
    }

    fn enter(&mut self, next: FpgaState) {
        tracing::debug!("FPGA link {} -> {}", self.state, next);
        self.state = next;
    }

    /// Run one exchange: trigger, send `payload`, receive the response and
    /// write it to `artifact_path` as hex text.
    ///
    /// Progress is reported after every burst as sent/total payload bytes.
    /// Partial responses are persisted even though the exchange fails.
    pub fn exchange(
        &mut self,
        payload: &[u8],
        artifact_path: &Path,
        cancel: &CancelFlag,
        mut progress: impl FnMut(Progress),
    ) -> Result<FpgaReport> {
        self.state = FpgaState::Idle;

        let mut session = match SerialSession::open(self.opener.as_ref(), &self.config.connection)
        {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("FPGA link could not open port: {}", e);
                self.enter(FpgaState::Failed);
                return Err(e);
            }
        };

        let span = tracing::info_span!(
            "fpga_exchange",
            session = %session.id(),
            port = %session.port()
        );
        let _enter = span.enter();
        self.enter(FpgaState::Connected);

        let mut received = Vec::new();
        let outcome = self.run(&mut session, payload, &mut received, cancel, &mut progress);
        let closed = session.close();
        let persisted = if received.is_empty() {
            Ok(())
        } else {
            artifact::write_hex(artifact_path, &received)
        };

        let result = match outcome {
            Ok(()) => persisted.and(closed),
            Err(e) => {
                match persisted {
                    Ok(()) if !received.is_empty() => tracing::warn!(
                        "Kept {} partial bytes in {}",
                        received.len(),
                        artifact_path.display()
                    ),
                    Ok(()) => {}
                    Err(p) => tracing::warn!("Could not persist partial response: {}", p),
                }
                if let Err(c) = closed {
                    tracing::warn!("Failed to close {}: {}", session.port(), c);
                }
                Err(e)
            }
        };

        match result {
            Ok(()) => {
                self.enter(FpgaState::Done);
                tracing::info!(
                    "FPGA exchange complete: sent {} bytes, received {}",
                    payload.len(),
                    received.len()
                );
                Ok(FpgaReport {
                    session_id: session.id(),
                    sent: payload.len(),
                    received: received.len(),
                    artifact: artifact_path.to_path_buf(),
                })
            }
            Err(e) => {
                self.enter(FpgaState::Failed);
                if e.is_cancelled() {
                    tracing::info!("FPGA exchange cancelled");
                } else {
                    tracing::error!("FPGA exchange failed: {}", e);
                }
                Err(e)
            }
        }
    }

    fn run(
        &mut self,
        session: &mut SerialSession,
        payload: &[u8],
        received: &mut Vec<u8>,
        cancel: &CancelFlag,
        progress: &mut impl FnMut(Progress),
    ) -> Result<()> {
        pause(self.config.settle);
        session.clear_buffers()?;

        session.write_all(&[self.config.trigger_byte])?;
        session.flush()?;
        self.enter(FpgaState::TriggerSent);
        pause(self.config.trigger_settle);

        self.enter(FpgaState::Sending);
        self.send_payload(session, payload, cancel, progress)?;

        self.enter(FpgaState::AwaitingResponse);
        self.await_response(session, received, cancel)?;

        self.enter(FpgaState::Receiving);
        match self.config.receive_mode {
            ReceiveMode::Fixed => self.receive_fixed(session, received, cancel),
            ReceiveMode::OpenEnded => self.receive_open_ended(session, received, cancel),
        }
    }

    fn send_payload(
        &self,
        session: &mut SerialSession,
        payload: &[u8],
        cancel: &CancelFlag,
        progress: &mut impl FnMut(Progress),
    ) -> Result<()> {
        let total = payload.len() as u64;
        let mut sent = 0u64;
        for burst in payload.chunks(self.config.burst_size) {
            if cancel.is_cancelled() {
                return Err(LinkError::Cancelled.into());
            }
            session.write_all(burst)?;
            sent += burst.len() as u64;
            progress(Progress::new(sent, total));
            pause(self.config.burst_pause);
        }
        session.flush()?;
        tracing::debug!("Sent {} payload bytes", sent);
        Ok(())
    }

    fn read_limit(&self, received: usize) -> usize {
        match self.config.receive_mode {
            ReceiveMode::Fixed => self.config.expected_len.saturating_sub(received).min(READ_CHUNK),
            ReceiveMode::OpenEnded => READ_CHUNK,
        }
    }

    fn await_response(
        &self,
        session: &mut SerialSession,
        received: &mut Vec<u8>,
        cancel: &CancelFlag,
    ) -> Result<()> {
        let mut buf = vec![0u8; READ_CHUNK];
        let started = Instant::now();
        loop {
            if cancel.is_cancelled() {
                return Err(LinkError::Cancelled.into());
            }
            let limit = self.read_limit(received.len());
            let n = session.read(&mut buf[..limit])?;
            if n > 0 {
                received.extend_from_slice(&buf[..n]);
                return Ok(());
            }
            if started.elapsed() >= self.config.response_timeout {
                return Err(LinkError::NoResponse {
                    waiting_for: "FPGA response".to_string(),
                    timeout_ms: self.config.response_timeout.as_millis() as u64,
                }
                .into());
            }
            pause(self.config.poll_interval);
        }
    }

    fn receive_fixed(
        &self,
        session: &mut SerialSession,
        received: &mut Vec<u8>,
        cancel: &CancelFlag,
    ) -> Result<()> {
        let expected = self.config.expected_len;
        let mut buf = vec![0u8; READ_CHUNK];
        let mut last_data = Instant::now();

        while received.len() < expected {
            if cancel.is_cancelled() {
                return Err(LinkError::Cancelled.into());
            }
            let limit = self.read_limit(received.len());
            let n = session.read(&mut buf[..limit])?;
            if n > 0 {
                received.extend_from_slice(&buf[..n]);
                last_data = Instant::now();
                continue;
            }
            if last_data.elapsed() >= self.config.receive_timeout {
                return Err(LinkError::IncompleteTransfer {
                    received: received.len(),
                    expected,
                }
                .into());
            }
            pause(self.config.poll_interval);
        }
        Ok(())
    }

    fn receive_open_ended(
        &self,
        session: &mut SerialSession,
        received: &mut Vec<u8>,
        cancel: &CancelFlag,
    ) -> Result<()> {
        let expected = self.config.expected_len;
        let mut buf = vec![0u8; READ_CHUNK];

        while !cancel.is_cancelled() {
            let n = session.read(&mut buf)?;
            if n > 0 {
                received.extend_from_slice(&buf[..n]);
            } else {
                pause(self.config.poll_interval);
            }
        }

        tracing::debug!("Open-ended receive stopped at {} bytes", received.len());
        if received.len() >= expected {
            Ok(())
        } else {
            Err(LinkError::IncompleteTransfer {
                received: received.len(),
                expected,
            }
            .into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_names() {
        assert_eq!(FpgaState::AwaitingResponse.to_string(), "awaiting-response");
        assert_eq!(FpgaState::TriggerSent.to_string(), "trigger-sent");
    }

    #[test]
    fn test_default_expects_packed_frame() {
        let config = FpgaConfig::default();
        assert_eq!(config.expected_len, 5101);
        assert_eq!(config.trigger_byte, 0xAA);
        assert_eq!(config.receive_mode, ReceiveMode::Fixed);
    }

    #[test]
    fn test_rejects_zero_burst() {
        let config = FpgaConfig {
            burst_size: 0,
            ..FpgaConfig::default()
        };
        assert!(FpgaLink::with_serial_port(config).is_err());
    }
}
