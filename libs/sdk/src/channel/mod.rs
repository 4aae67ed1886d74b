//! # Socket Channel Manager
//!
//! ## Purpose
//!
//! Maintains the two persistent WebSocket connections to the gateway: the
//! control channel (configuration-change signals) and the message channel
//! (pushed messages, publish receipts, outbound messages).
//!
//! ## Architecture
//!
//! ```text
//! ChannelHandle ──commands──► channel task ──frames──► gateway
//!      │                          │
//!      └── Arc<RwLock<State>> ◄───┤
//!                                 └──► dispatch ──► Handlers
//! ```
//!
//! Each open channel is one spawned task owning its socket. Inbound frames,
//! outbound commands and backoff timers are multiplexed in a single
//! `select!` loop, so callbacks for one channel never run concurrently.
//!
//! ## State Machine
//!
//! ```text
//! Closed → Connecting → Open → Closing → Closed
//!              ↑          │
//!              └─backoff──┘ (unreachable endpoint, close code ≠ 1000)
//! ```

mod backoff;
mod dispatch;
mod registry;
mod session;
mod watcher;

pub use backoff::{Backoff, ReconnectPolicy};
pub use registry::ChannelRegistry;
pub use session::{ChannelHandle, OnOpen};
pub use watcher::{AckRetryPolicy, AckWatcher, SweepAction};

pub(crate) use session::spawn_channel;

use std::fmt;
use std::time::Duration;

use iofog_config::protocol::socket;
use iofog_config::service::channels;

/// Which gateway socket a channel is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelRole {
    Control,
    Message,
}

impl ChannelRole {
    /// Endpoint path prefix, completed with the publisher id
    pub fn path(self) -> &'static str {
        match self {
            ChannelRole::Control => socket::CONTROL,
            ChannelRole::Message => socket::MESSAGE,
        }
    }
}

impl fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelRole::Control => write!(f, "control"),
            ChannelRole::Message => write!(f, "message"),
        }
    }
}

/// Lifecycle state of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No socket, no pending reconnect
    Closed,
    /// Handshake in progress or waiting out a backoff delay
    Connecting,
    Open,
    /// Close frame sent
    Closing,
}

/// Per-channel behavior knobs
#[derive(Debug, Clone)]
pub struct ChannelOptions {
    pub reconnect: ReconnectPolicy,
    /// Upper bound on a single WebSocket handshake
    pub connect_timeout: Duration,
    /// Upper bound on waiting for the gateway's close echo
    pub close_timeout: Duration,
    /// Legacy acknowledgment watcher; message channel only, off by default
    pub ack_retry: Option<AckRetryPolicy>,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            reconnect: ReconnectPolicy::default(),
            connect_timeout: Duration::from_secs(10),
            close_timeout: Duration::from_millis(channels::CLOSE_TIMEOUT_MS),
            ack_retry: None,
        }
    }
}

impl ChannelOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    pub fn with_ack_retry(mut self, policy: AckRetryPolicy) -> Self {
        self.ack_retry = Some(policy);
        self
    }
}
