//! One open channel for the duration of one transfer.
//!
//! The session is the only owner of its channel. It closes the channel
//! exactly once: on [`SerialSession::close`] or, if that never ran, on drop.
//! Every exit path of a link (success, error, cancellation) therefore
//! releases the port before control returns to the caller.

use crate::communication::{ChannelOpener, ConnectionParams, SerialChannel};
use penplot_core::{LinkError, Result};
use uuid::Uuid;

/// Owned serial channel plus a correlation id for logs
pub struct SerialSession {
    id: Uuid,
    port: String,
    channel: Option<Box<dyn SerialChannel>>,
}

impl std::fmt::Debug for SerialSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialSession")
            .field("id", &self.id)
            .field("port", &self.port)
            .field("open", &self.is_open())
            .finish()
    }
}

impl SerialSession {
    /// Open a channel through `opener`
    pub fn open(opener: &dyn ChannelOpener, params: &ConnectionParams) -> Result<Self> {
        let channel = opener.open(params)?;
        let session = Self {
            id: Uuid::new_v4(),
            port: params.port.clone(),
            channel: Some(channel),
        };
        tracing::debug!("Session {} opened on {}", session.id, session.port);
        Ok(session)
    }

    /// Session id used in log spans
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Port this session was opened on
    pub fn port(&self) -> &str {
        &self.port
    }

    /// True until the channel has been closed
    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    fn channel(&mut self) -> Result<&mut Box<dyn SerialChannel>> {
        self.channel.as_mut().ok_or_else(|| {
            LinkError::Io {
                reason: "session already closed".to_string(),
            }
            .into()
        })
    }

    /// Write every byte
    pub fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.channel()?
            .write_all(data)
            .map_err(|e| LinkError::io(&e).into())
    }

    /// Flush pending output
    pub fn flush(&mut self) -> Result<()> {
        self.channel()?.flush().map_err(|e| LinkError::io(&e).into())
    }

    /// Read available bytes; `Ok(0)` when the read window passed empty
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.channel()?.read(buf).map_err(|e| LinkError::io(&e).into())
    }

    /// Discard stale input and output
    pub fn clear_buffers(&mut self) -> Result<()> {
        self.channel()?
            .clear_buffers()
            .map_err(|e| LinkError::io(&e).into())
    }

    /// Close the channel. Later calls are no-ops.
    pub fn close(&mut self) -> Result<()> {
        match self.channel.take() {
            Some(mut channel) => {
                tracing::debug!("Session {} closing {}", self.id, self.port);
                channel.close().map_err(|e| LinkError::io(&e).into())
            }
            None => Ok(()),
        }
    }
}

impl Drop for SerialSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Session {} failed to close {}: {}", self.id, self.port, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingChannel {
        closes: Arc<AtomicUsize>,
    }

    impl SerialChannel for CountingChannel {
        fn write_all(&mut self, _data: &[u8]) -> io::Result<()> {
            Ok(())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
        fn clear_buffers(&mut self) -> io::Result<()> {
            Ok(())
        }
        fn close(&mut self) -> io::Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct CountingOpener {
        closes: Arc<AtomicUsize>,
    }

    impl ChannelOpener for CountingOpener {
        fn open(&self, _params: &ConnectionParams) -> Result<Box<dyn SerialChannel>> {
            Ok(Box::new(CountingChannel {
                closes: self.closes.clone(),
            }))
        }
    }

    fn opener() -> (CountingOpener, Arc<AtomicUsize>) {
        let closes = Arc::new(AtomicUsize::new(0));
        (
            CountingOpener {
                closes: closes.clone(),
            },
            closes,
        )
    }

    #[test]
    fn test_explicit_close_then_drop_closes_once() {
        let (opener, closes) = opener();
        let mut session = SerialSession::open(&opener, &ConnectionParams::default()).unwrap();
        session.close().unwrap();
        session.close().unwrap();
        assert!(!session.is_open());
        drop(session);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_closes() {
        let (opener, closes) = opener();
        {
            let _session = SerialSession::open(&opener, &ConnectionParams::default()).unwrap();
        }
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_io_after_close_fails() {
        let (opener, _) = opener();
        let mut session = SerialSession::open(&opener, &ConnectionParams::default()).unwrap();
        session.close().unwrap();
        assert!(session.write_all(b"x").unwrap_err().is_link_error());
    }
}
