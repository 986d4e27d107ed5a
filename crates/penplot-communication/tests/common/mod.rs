#![allow(dead_code)]

use parking_lot::Mutex;
use penplot_communication::{ChannelOpener, ConnectionParams, SerialChannel};
use penplot_core::{LinkError, Result};
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

/// Scripted peer behind a mock channel
pub trait Device: Send {
    /// Called with every chunk the host writes
    fn on_write(&mut self, data: &[u8], inbound: &mut VecDeque<u8>);

    /// Called when the host reads and nothing is pending
    fn on_idle_read(&mut self, _inbound: &mut VecDeque<u8>) {}
}

/// Everything the mock channel observed
#[derive(Debug, Default)]
pub struct ChannelLog {
    pub opens: usize,
    pub closes: usize,
    pub clears: usize,
    pub written: Vec<u8>,
    pub writes: usize,
}

impl ChannelLog {
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.written)
            .lines()
            .map(str::to_string)
            .collect()
    }
}

pub struct MockChannel {
    log: Arc<Mutex<ChannelLog>>,
    device: Box<dyn Device>,
    inbound: VecDeque<u8>,
    max_read: usize,
}

impl SerialChannel for MockChannel {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        {
            let mut log = self.log.lock();
            log.written.extend_from_slice(data);
            log.writes += 1;
        }
        self.device.on_write(data, &mut self.inbound);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.inbound.is_empty() {
            self.device.on_idle_read(&mut self.inbound);
        }
        let n = buf.len().min(self.max_read).min(self.inbound.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.inbound.pop_front().unwrap_or_default();
        }
        Ok(n)
    }

    fn clear_buffers(&mut self) -> io::Result<()> {
        self.inbound.clear();
        self.log.lock().clears += 1;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.log.lock().closes += 1;
        Ok(())
    }
}

/// Hands out one scripted channel
pub struct MockOpener {
    log: Arc<Mutex<ChannelLog>>,
    device: Mutex<Option<Box<dyn Device>>>,
    max_read: usize,
}

impl MockOpener {
    pub fn new(device: impl Device + 'static) -> (Arc<Self>, Arc<Mutex<ChannelLog>>) {
        Self::with_max_read(device, usize::MAX)
    }

    /// Limit how many bytes a single read may return
    pub fn with_max_read(
        device: impl Device + 'static,
        max_read: usize,
    ) -> (Arc<Self>, Arc<Mutex<ChannelLog>>) {
        let log = Arc::new(Mutex::new(ChannelLog::default()));
        let opener = Arc::new(Self {
            log: log.clone(),
            device: Mutex::new(Some(Box::new(device))),
            max_read,
        });
        (opener, log)
    }
}

impl ChannelOpener for MockOpener {
    fn open(&self, params: &ConnectionParams) -> Result<Box<dyn SerialChannel>> {
        let device = self.device.lock().take().ok_or_else(|| LinkError::FailedToOpen {
            port: params.port.clone(),
            reason: "mock already opened".to_string(),
        })?;
        self.log.lock().opens += 1;
        Ok(Box::new(MockChannel {
            log: self.log.clone(),
            device,
            inbound: VecDeque::new(),
            max_read: self.max_read,
        }))
    }
}

/// Peer that never answers
pub struct Silent;

impl Device for Silent {
    fn on_write(&mut self, _data: &[u8], _inbound: &mut VecDeque<u8>) {}
}

/// Opener whose port is always missing
pub struct Unplugged;

impl ChannelOpener for Unplugged {
    fn open(&self, params: &ConnectionParams) -> Result<Box<dyn SerialChannel>> {
        Err(LinkError::FailedToOpen {
            port: params.port.clone(),
            reason: "No such file or directory".to_string(),
        }
        .into())
    }
}
