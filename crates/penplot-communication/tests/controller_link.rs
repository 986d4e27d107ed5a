mod common;

use common::{Device, MockOpener, Silent, Unplugged};
use penplot_communication::{ControllerConfig, ControllerLink, FlowControl};
use penplot_core::{CancelFlag, Error, LinkError, Progress};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const ACK: u8 = 0xBB;

fn config(flow: FlowControl) -> ControllerConfig {
    ControllerConfig {
        flow,
        ack_timeout: Duration::from_millis(200),
        poll_interval: Duration::ZERO,
        ..ControllerConfig::default()
    }
}

fn commands(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| format!("x:{:05.1}y:000.0z:{}", i as f64, i % 2))
        .collect()
}

/// Acknowledges each line as soon as it is written
struct AckPerLine {
    noise: Vec<u8>,
}

impl Device for AckPerLine {
    fn on_write(&mut self, data: &[u8], inbound: &mut VecDeque<u8>) {
        for _ in data.iter().filter(|&&b| b == b'\n') {
            inbound.extend(self.noise.iter().copied());
            inbound.push_back(ACK);
        }
    }
}

/// Chatters without ever acknowledging
struct NoiseOnly;

impl Device for NoiseOnly {
    fn on_write(&mut self, _data: &[u8], _inbound: &mut VecDeque<u8>) {}

    fn on_idle_read(&mut self, inbound: &mut VecDeque<u8>) {
        std::thread::sleep(Duration::from_millis(2));
        inbound.push_back(0x00);
    }
}

/// Raises the cancel flag once a given number of lines has arrived
struct CancelAfterLines {
    lines: usize,
    after: usize,
    cancel: CancelFlag,
}

impl Device for CancelAfterLines {
    fn on_write(&mut self, data: &[u8], _inbound: &mut VecDeque<u8>) {
        self.lines += data.iter().filter(|&&b| b == b'\n').count();
        if self.lines >= self.after {
            self.cancel.cancel();
        }
    }
}

/// Holds acknowledgments back until the host stops sending, then frees
/// every slot at once
struct LazyAcker {
    total: usize,
    capacity: usize,
    lines_seen: usize,
    acked: usize,
    max_outstanding: Arc<AtomicUsize>,
}

impl Device for LazyAcker {
    fn on_write(&mut self, data: &[u8], _inbound: &mut VecDeque<u8>) {
        self.lines_seen += data.iter().filter(|&&b| b == b'\n').count();
        let outstanding = self.lines_seen - self.acked;
        self.max_outstanding.fetch_max(outstanding, Ordering::SeqCst);
    }

    fn on_idle_read(&mut self, inbound: &mut VecDeque<u8>) {
        let outstanding = self.lines_seen - self.acked;
        if outstanding > 0 && (outstanding >= self.capacity || self.lines_seen == self.total) {
            inbound.extend(std::iter::repeat(ACK).take(outstanding));
            self.acked += outstanding;
        }
    }
}

#[test]
fn test_sync_three_commands_reports_progress_and_closes_once() {
    let (opener, log) = MockOpener::new(AckPerLine { noise: Vec::new() });
    let link = ControllerLink::new(config(FlowControl::Sync), opener).unwrap();

    let mut percents = Vec::new();
    let report = link
        .send_lines(&commands(3), &CancelFlag::new(), |p: Progress| {
            percents.push(p.percent())
        })
        .unwrap();

    assert_eq!(percents, vec![33, 67, 100]);
    assert_eq!(report.commands, 3);
    assert_eq!(report.peak_outstanding, 1);

    let log = log.lock();
    assert_eq!(log.opens, 1);
    assert_eq!(log.closes, 1);
    assert_eq!(log.lines(), commands(3));
}

#[test]
fn test_sync_discards_noise_bytes() {
    let (opener, _log) = MockOpener::new(AckPerLine {
        noise: vec![0x00, b'O', b'K'],
    });
    let link = ControllerLink::new(config(FlowControl::Sync), opener).unwrap();

    let report = link
        .send_lines(&commands(4), &CancelFlag::new(), |_| {})
        .unwrap();
    assert_eq!(report.commands, 4);
    assert_eq!(report.discarded_bytes, 12);
}

#[test]
fn test_pipelined_never_exceeds_capacity() {
    let max_outstanding = Arc::new(AtomicUsize::new(0));
    let (opener, log) = MockOpener::new(LazyAcker {
        total: 5,
        capacity: 2,
        lines_seen: 0,
        acked: 0,
        max_outstanding: max_outstanding.clone(),
    });
    let link = ControllerLink::new(config(FlowControl::Pipelined { capacity: 2 }), opener).unwrap();

    let mut progress = Vec::new();
    let report = link
        .send_lines(&commands(5), &CancelFlag::new(), |p: Progress| progress.push(p.done))
        .unwrap();

    assert!(max_outstanding.load(Ordering::SeqCst) <= 2);
    assert_eq!(max_outstanding.load(Ordering::SeqCst), 2);
    assert_eq!(report.peak_outstanding, 2);
    assert_eq!(progress, vec![1, 2, 3, 4, 5]);
    assert_eq!(log.lock().closes, 1);
    assert_eq!(log.lock().lines().len(), 5);
}

#[test]
fn test_pipelined_overlaps_sends() {
    let (opener, _log) = MockOpener::new(AckPerLine { noise: Vec::new() });
    let link = ControllerLink::new(config(FlowControl::Pipelined { capacity: 64 }), opener).unwrap();

    // All 10 fit in the window before the first read
    let report = link
        .send_lines(&commands(10), &CancelFlag::new(), |_| {})
        .unwrap();
    assert_eq!(report.peak_outstanding, 10);
}

#[test]
fn test_missing_ack_times_out_and_closes() {
    let (opener, log) = MockOpener::new(Silent);
    let link = ControllerLink::new(config(FlowControl::Sync), opener).unwrap();

    let err = link
        .send_lines(&commands(2), &CancelFlag::new(), |_| {})
        .unwrap_err();
    assert!(err.is_timeout());
    assert!(!err.is_cancelled());
    assert_eq!(log.lock().closes, 1);
    assert_eq!(log.lock().lines().len(), 1);
}

#[test]
fn test_noise_does_not_extend_ack_timeout() {
    let (opener, log) = MockOpener::new(NoiseOnly);
    let link = ControllerLink::new(config(FlowControl::Sync), opener).unwrap();

    let started = std::time::Instant::now();
    let err = link
        .send_lines(&commands(2), &CancelFlag::new(), |_| {})
        .unwrap_err();

    assert!(matches!(err, Error::Link(LinkError::NoResponse { .. })));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(log.lock().lines().len(), 1);
    assert_eq!(log.lock().closes, 1);
}

#[test]
fn test_cancel_interrupts_pipelined_burst() {
    let cancel = CancelFlag::new();
    let (opener, log) = MockOpener::new(CancelAfterLines {
        lines: 0,
        after: 3,
        cancel: cancel.clone(),
    });
    let link = ControllerLink::new(config(FlowControl::Pipelined { capacity: 64 }), opener).unwrap();

    let err = link.send_lines(&commands(10), &cancel, |_| {}).unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(log.lock().lines().len(), 3);
    assert_eq!(log.lock().closes, 1);
}

#[test]
fn test_cancel_stops_streaming() {
    let (opener, log) = MockOpener::new(AckPerLine { noise: Vec::new() });
    let link = ControllerLink::new(config(FlowControl::Sync), opener).unwrap();
    let cancel = CancelFlag::new();
    let trigger = cancel.clone();

    let err = link
        .send_lines(&commands(5), &cancel, |p: Progress| {
            if p.done == 2 {
                trigger.cancel();
            }
        })
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(!err.is_timeout());
    assert_eq!(log.lock().lines().len(), 2);
    assert_eq!(log.lock().closes, 1);
}

#[test]
fn test_missing_file_fails_before_open() {
    let (opener, log) = MockOpener::new(AckPerLine { noise: Vec::new() });
    let link = ControllerLink::new(config(FlowControl::Sync), opener).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let err = link
        .send_file(&dir.path().join("missing.txt"), &CancelFlag::new(), |_| {})
        .unwrap_err();

    assert!(err.is_precondition_failed());
    assert_eq!(log.lock().opens, 0);
}

#[test]
fn test_send_file_trims_and_skips_blank_lines() {
    let (opener, log) = MockOpener::new(AckPerLine { noise: Vec::new() });
    let link = ControllerLink::new(config(FlowControl::Sync), opener).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("commands.txt");
    std::fs::write(&path, "x:000.0y:000.0z:1\n\n  x:001.0y:001.0z:0  \r\n").unwrap();

    let report = link.send_file(&path, &CancelFlag::new(), |_| {}).unwrap();
    assert_eq!(report.commands, 2);
    assert_eq!(
        String::from_utf8_lossy(&log.lock().written),
        "x:000.0y:000.0z:1\nx:001.0y:001.0z:0\n"
    );
}

#[test]
fn test_open_failure() {
    let link = ControllerLink::new(config(FlowControl::Sync), Arc::new(Unplugged)).unwrap();
    let err = link
        .send_lines(&commands(1), &CancelFlag::new(), |_| {})
        .unwrap_err();
    assert!(matches!(err, Error::Link(LinkError::FailedToOpen { .. })));
}
