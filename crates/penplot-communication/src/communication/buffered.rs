//! Acknowledgment window for command streaming
//!
//! Tracks commands that were written to the controller but not yet
//! acknowledged. The controller frees one queue slot per acknowledgment
//! byte, in send order, so the window is a FIFO bounded by `capacity`.
//! A capacity of one is plain stop-and-wait.

use penplot_core::ParameterError;
use std::collections::VecDeque;

/// Status of a command in the window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// Written, waiting for its acknowledgment
    Sent,
    /// Acknowledgment received
    Acknowledged,
}

/// A command that has been written to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommand {
    /// Position in the command file
    pub index: usize,
    /// The line that was sent, without terminator
    pub line: String,
    /// Current status
    pub status: CommandStatus,
}

/// Bounded FIFO of unacknowledged commands
#[derive(Debug, Clone)]
pub struct AckWindow {
    capacity: usize,
    outstanding: VecDeque<PendingCommand>,
    sent: usize,
    acknowledged: usize,
    peak: usize,
}

impl AckWindow {
    /// Create a window holding at most `capacity` unacknowledged commands
    pub fn new(capacity: usize) -> Result<Self, ParameterError> {
        if capacity == 0 {
            return Err(ParameterError::out_of_range(
                "queue_capacity",
                0.0,
                ">= 1",
            ));
        }
        Ok(Self {
            capacity,
            outstanding: VecDeque::with_capacity(capacity),
            sent: 0,
            acknowledged: 0,
            peak: 0,
        })
    }

    /// Maximum unacknowledged commands
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True while another command may be sent
    pub fn has_room(&self) -> bool {
        self.outstanding.len() < self.capacity
    }

    /// Record a command as written. Returns false, recording nothing,
    /// when the window is full.
    pub fn mark_sent(&mut self, index: usize, line: impl Into<String>) -> bool {
        if !self.has_room() {
            return false;
        }
        self.outstanding.push_back(PendingCommand {
            index,
            line: line.into(),
            status: CommandStatus::Sent,
        });
        self.sent += 1;
        self.peak = self.peak.max(self.outstanding.len());
        true
    }

    /// Consume one acknowledgment, releasing the oldest outstanding
    /// command. `None` when nothing was outstanding.
    pub fn acknowledge(&mut self) -> Option<PendingCommand> {
        let mut command = self.outstanding.pop_front()?;
        command.status = CommandStatus::Acknowledged;
        self.acknowledged += 1;
        Some(command)
    }

    /// Commands written but not yet acknowledged
    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    /// Oldest unacknowledged command
    pub fn oldest(&self) -> Option<&PendingCommand> {
        self.outstanding.front()
    }

    /// Total commands written
    pub fn sent(&self) -> usize {
        self.sent
    }

    /// Total acknowledgments consumed
    pub fn acknowledged(&self) -> usize {
        self.acknowledged
    }

    /// Largest number of commands ever outstanding at once
    pub fn peak(&self) -> usize {
        self.peak
    }

    /// True when every written command has been acknowledged
    pub fn is_drained(&self) -> bool {
        self.outstanding.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(AckWindow::new(0).is_err());
    }

    #[test]
    fn test_window_fills_and_drains_in_order() {
        let mut window = AckWindow::new(2).unwrap();
        assert!(window.mark_sent(0, "a"));
        assert!(window.mark_sent(1, "b"));
        assert!(!window.has_room());
        assert!(!window.mark_sent(2, "c"));
        assert_eq!(window.sent(), 2);

        let first = window.acknowledge().unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(first.status, CommandStatus::Acknowledged);
        assert!(window.has_room());
        assert_eq!(window.oldest().map(|c| c.index), Some(1));

        window.acknowledge();
        assert!(window.is_drained());
        assert_eq!(window.acknowledged(), 2);
        assert_eq!(window.peak(), 2);
    }

    #[test]
    fn test_surplus_ack_is_ignored() {
        let mut window = AckWindow::new(1).unwrap();
        assert!(window.acknowledge().is_none());
        assert_eq!(window.acknowledged(), 0);
    }
}
