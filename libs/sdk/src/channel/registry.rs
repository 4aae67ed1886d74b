//! One live channel per role

use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::session::ChannelHandle;
use super::{ChannelRole, ChannelState};

struct RegisteredChannel {
    handle: ChannelHandle,
    task: JoinHandle<()>,
}

/// Channel handles owned by a client context
#[derive(Default)]
pub struct ChannelRegistry {
    channels: Mutex<HashMap<ChannelRole, RegisteredChannel>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly spawned channel, closing any previous one for the role
    pub(crate) fn insert(&self, handle: ChannelHandle, task: JoinHandle<()>) {
        let role = handle.role();
        let previous = self
            .channels
            .lock()
            .insert(role, RegisteredChannel { handle, task });
        if let Some(previous) = previous {
            warn!("Replacing existing {} channel", role);
            previous.handle.close();
        }
    }

    /// Live handle for a role; handles of channels that stopped on their own
    /// are dropped here
    pub fn get(&self, role: ChannelRole) -> Option<ChannelHandle> {
        let mut channels = self.channels.lock();
        let stopped = channels
            .get(&role)
            .map(|c| c.task.is_finished() || c.handle.state() == ChannelState::Closed)?;
        if stopped {
            debug!("Clearing stopped {} channel", role);
            channels.remove(&role);
            return None;
        }
        channels.get(&role).map(|c| c.handle.clone())
    }

    pub fn state(&self, role: ChannelRole) -> ChannelState {
        self.get(role)
            .map(|handle| handle.state())
            .unwrap_or(ChannelState::Closed)
    }

    /// Close a channel and wait for its task to finish
    pub async fn close(&self, role: ChannelRole) {
        let Some(channel) = self.channels.lock().remove(&role) else {
            debug!("No {} channel to close", role);
            return;
        };
        channel.handle.close();
        if let Err(e) = channel.task.await {
            warn!("{} channel task ended abnormally: {}", role, e);
        }
    }
}

impl Drop for ChannelRegistry {
    fn drop(&mut self) {
        for channel in self.channels.get_mut().values() {
            channel.handle.close();
        }
    }
}
