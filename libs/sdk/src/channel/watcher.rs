//! Legacy acknowledgment watcher
//!
//! Tracks messages sent on the message channel until the gateway sends a
//! receipt. A periodic sweep re-sends the oldest pending message and gives
//! up on the channel once a message reaches the attempt limit.

use iofog_codec::IoMessage;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, warn};

use iofog_config::service::channels::{
    ACK_MAX_ATTEMPTS, ACK_QUEUE_CAPACITY, ACK_SWEEP_INTERVAL_SECS,
};

/// Retry limits for the watcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckRetryPolicy {
    /// Send attempts before the channel is closed
    pub max_attempts: u32,
    /// Time between sweeps
    pub sweep_interval: Duration,
    /// Pending messages kept at most; the oldest is dropped beyond this
    pub capacity: usize,
}

impl Default for AckRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: ACK_MAX_ATTEMPTS,
            sweep_interval: Duration::from_secs(ACK_SWEEP_INTERVAL_SECS),
            capacity: ACK_QUEUE_CAPACITY,
        }
    }
}

/// Outcome of a sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepAction {
    Idle,
    Resend(IoMessage),
    Close { attempts: u32 },
}

#[derive(Debug)]
struct PendingMessage {
    message: IoMessage,
    attempts: u32,
}

/// Bounded queue of unacknowledged messages
#[derive(Debug)]
pub struct AckWatcher {
    policy: AckRetryPolicy,
    pending: VecDeque<PendingMessage>,
}

impl AckWatcher {
    pub fn new(policy: AckRetryPolicy) -> Self {
        Self {
            policy,
            pending: VecDeque::new(),
        }
    }

    pub fn policy(&self) -> &AckRetryPolicy {
        &self.policy
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Record a send; a message with an already tracked non-empty id counts
    /// as another attempt
    pub fn track(&mut self, message: &IoMessage) {
        if !message.id.is_empty() {
            if let Some(entry) = self.pending.iter_mut().find(|p| p.message.id == message.id) {
                entry.attempts += 1;
                return;
            }
        }
        if self.pending.len() >= self.policy.capacity {
            warn!(
                "Acknowledgment queue full ({}), dropping oldest pending message",
                self.policy.capacity
            );
            self.pending.pop_front();
        }
        self.pending.push_back(PendingMessage {
            message: message.clone(),
            attempts: 1,
        });
    }

    /// Remove the message a receipt refers to
    ///
    /// Outbound messages carry no id, so a receipt for an unknown id settles
    /// the oldest pending message.
    pub fn acknowledge(&mut self, id: &str) -> Option<IoMessage> {
        let index = self
            .pending
            .iter()
            .position(|p| !id.is_empty() && p.message.id == id)
            .unwrap_or(0);
        let settled = self.pending.remove(index).map(|p| p.message);
        if settled.is_some() {
            debug!("Receipt {} settled a pending message", id);
        }
        settled
    }

    /// Inspect the oldest pending message
    pub fn sweep(&mut self) -> SweepAction {
        let max_attempts = self.policy.max_attempts;
        match self.pending.front_mut() {
            None => SweepAction::Idle,
            Some(entry) if entry.attempts >= max_attempts => SweepAction::Close {
                attempts: entry.attempts,
            },
            Some(entry) => {
                entry.attempts += 1;
                SweepAction::Resend(entry.message.clone())
            }
        }
    }
}
