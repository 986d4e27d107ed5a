//! Controller link: acknowledged command streaming
//!
//! Streams a command file line by line to the motion controller. The
//! controller answers every consumed command with a single acknowledgment
//! byte. Two disciplines are supported:
//!
//! - [`FlowControl::Sync`]: one command in flight, wait for its ack
//! - [`FlowControl::Pipelined`]: up to `capacity` commands in flight, each
//!   ack frees one slot
//!
//! Bytes other than the ack value are logged and discarded. The channel is
//! opened once per file and closed on every exit path.

use crate::communication::{
    AckWindow, ChannelOpener, ConnectionParams, SerialPortOpener, SerialSession,
};
use penplot_core::artifact;
use penplot_core::{CancelFlag, LinkError, ParameterError, Progress, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Bytes read per poll while pipelining
const PIPELINED_READ_CHUNK: usize = 64;

/// Flow-control discipline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FlowControl {
    /// Send one command, wait for its acknowledgment, repeat
    #[default]
    Sync,
    /// Keep up to `capacity` unacknowledged commands in flight
    Pipelined {
        /// Commands the controller can buffer
        capacity: usize,
    },
}

impl FlowControl {
    /// Window size implied by the discipline
    pub fn capacity(&self) -> usize {
        match self {
            Self::Sync => 1,
            Self::Pipelined { capacity } => *capacity,
        }
    }
}

impl fmt::Display for FlowControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync => write!(f, "sync"),
            Self::Pipelined { capacity } => write!(f, "pipelined x{capacity}"),
        }
    }
}

/// Controller link settings
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Serial port parameters
    pub connection: ConnectionParams,
    /// Byte the controller sends per consumed command
    pub ack_byte: u8,
    /// Flow-control discipline
    pub flow: FlowControl,
    /// Longest wait for the next acknowledgment; non-ack bytes do not reset it
    pub ack_timeout: Duration,
    /// Pause after an empty read
    pub poll_interval: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionParams::default(),
            ack_byte: 0xBB,
            flow: FlowControl::Sync,
            ack_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(1),
        }
    }
}

/// Outcome of a completed stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamReport {
    /// Session id used in the log span
    pub session_id: Uuid,
    /// Commands sent and acknowledged
    pub commands: usize,
    /// Most commands that were ever unacknowledged at once
    pub peak_outstanding: usize,
    /// Non-ack and surplus ack bytes that were dropped
    pub discarded_bytes: usize,
}

/// Streams command files to the motion controller
pub struct ControllerLink {
    config: ControllerConfig,
    opener: Arc<dyn ChannelOpener>,
}

impl fmt::Debug for ControllerLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerLink")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ControllerLink {
    /// Create a link that opens channels through `opener`
    pub fn new(config: ControllerConfig, opener: Arc<dyn ChannelOpener>) -> Result<Self> {
        if config.flow.capacity() == 0 {
            return Err(ParameterError::out_of_range("queue_capacity", 0.0, ">= 1").into());
        }
        if config.ack_timeout.is_zero() {
            return Err(ParameterError::out_of_range("ack_timeout_ms", 0.0, "> 0").into());
        }
        Ok(Self { config, opener })
    }

    /// Create a link on a hardware serial port
    pub fn with_serial_port(config: ControllerConfig) -> Result<Self> {
        Self::new(config, Arc::new(SerialPortOpener))
    }

    /// Active settings
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Stream every command in `path`.
    ///
    /// The file is read before any channel is opened; a missing, unreadable
    /// or empty file fails without touching the port.
    pub fn send_file(
        &self,
        path: &Path,
        cancel: &CancelFlag,
        progress: impl FnMut(Progress),
    ) -> Result<StreamReport> {
        let lines = artifact::read_lines(path)?;
        tracing::info!("Loaded {} commands from {}", lines.len(), path.display());
        self.send_lines(&lines, cancel, progress)
    }

    /// Stream pre-formatted command lines (without terminators).
    ///
    /// Progress is reported after every acknowledgment as acknowledged/total.
    pub fn send_lines(
        &self,
        lines: &[String],
        cancel: &CancelFlag,
        mut progress: impl FnMut(Progress),
    ) -> Result<StreamReport> {
        let mut window = AckWindow::new(self.config.flow.capacity())?;
        let mut session = SerialSession::open(self.opener.as_ref(), &self.config.connection)?;

        let span = tracing::info_span!(
            "controller_stream",
            session = %session.id(),
            port = %session.port()
        );
        let _enter = span.enter();
        tracing::info!(
            "Streaming {} commands ({})",
            lines.len(),
            self.config.flow
        );

        let outcome = self.stream(&mut session, lines, &mut window, cancel, &mut progress);
        let closed = session.close();

        match outcome {
            Ok(discarded_bytes) => {
                closed?;
                tracing::info!(
                    "All {} commands acknowledged (peak {} in flight)",
                    lines.len(),
                    window.peak()
                );
                Ok(StreamReport {
                    session_id: session.id(),
                    commands: lines.len(),
                    peak_outstanding: window.peak(),
                    discarded_bytes,
                })
            }
            Err(e) => {
                if e.is_cancelled() {
                    tracing::info!(
                        "Streaming cancelled after {} of {} commands",
                        window.acknowledged(),
                        lines.len()
                    );
                } else {
                    tracing::error!(
                        "Streaming failed after {} of {} commands: {}",
                        window.acknowledged(),
                        lines.len(),
                        e
                    );
                }
                if let Err(close_err) = closed {
                    tracing::warn!("Failed to close {}: {}", session.port(), close_err);
                }
                Err(e)
            }
        }
    }

    fn stream(
        &self,
        session: &mut SerialSession,
        lines: &[String],
        window: &mut AckWindow,
        cancel: &CancelFlag,
        progress: &mut impl FnMut(Progress),
    ) -> Result<usize> {
        let total = lines.len();
        let chunk = match self.config.flow {
            FlowControl::Sync => 1,
            FlowControl::Pipelined { .. } => PIPELINED_READ_CHUNK,
        };
        let mut buf = vec![0u8; chunk];
        let mut next = 0;
        let mut discarded = 0;
        let mut last_activity = Instant::now();

        loop {
            if cancel.is_cancelled() {
                return Err(LinkError::Cancelled.into());
            }

            while next < total && window.has_room() {
                if cancel.is_cancelled() {
                    return Err(LinkError::Cancelled.into());
                }
                let line = &lines[next];
                session.write_all(format!("{line}\n").as_bytes())?;
                window.mark_sent(next, line.as_str());
                tracing::debug!("Sent [{}/{}] {}", next + 1, total, line);
                next += 1;
                last_activity = Instant::now();
            }

            if next == total && window.is_drained() {
                return Ok(discarded);
            }

            // Only sends and matched acks count as activity; noise does not
            let n = session.read(&mut buf)?;
            for &byte in &buf[..n] {
                if byte != self.config.ack_byte {
                    tracing::warn!("Discarding byte 0x{:02X} while waiting for ack", byte);
                    discarded += 1;
                    continue;
                }
                match window.acknowledge() {
                    Some(cmd) => {
                        tracing::debug!("Ack for command {}", cmd.index + 1);
                        last_activity = Instant::now();
                        progress(Progress::new(window.acknowledged() as u64, total as u64));
                    }
                    None => {
                        tracing::warn!("Ack received with no command outstanding");
                        discarded += 1;
                    }
                }
            }

            if !window.is_drained() && last_activity.elapsed() >= self.config.ack_timeout {
                let waiting_for = match window.oldest() {
                    Some(cmd) => format!("acknowledgment of command {}", cmd.index + 1),
                    None => "acknowledgment".to_string(),
                };
                return Err(LinkError::NoResponse {
                    waiting_for,
                    timeout_ms: self.config.ack_timeout.as_millis() as u64,
                }
                .into());
            }
            if n == 0 && !self.config.poll_interval.is_zero() {
                std::thread::sleep(self.config.poll_interval);
            }
        }
    }
}
