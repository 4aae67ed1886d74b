//! Caller callbacks for REST outcomes and channel events
//!
//! Every callback is optional; an unset callback turns its event into a
//! no-op. Handlers are cheap to clone and can be shared between the REST
//! facade and both channels.

use iofog_codec::IoMessage;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::SdkError;

type ErrorFn = Arc<dyn Fn(&SdkError) + Send + Sync>;
type BadRequestFn = Arc<dyn Fn(&str) + Send + Sync>;
type MessagesFn = Arc<dyn Fn(Vec<IoMessage>) + Send + Sync>;
type ReceiptFn = Arc<dyn Fn(&str, u64) + Send + Sync>;
type QueryFn = Arc<dyn Fn(u64, u64, Vec<IoMessage>) + Send + Sync>;
type ConfigFn = Arc<dyn Fn(Value) + Send + Sync>;
type SignalFn = Arc<dyn Fn() + Send + Sync>;

/// Optional callback per SDK event
#[derive(Clone, Default)]
pub struct Handlers {
    error: Option<ErrorFn>,
    bad_request: Option<BadRequestFn>,
    messages: Option<MessagesFn>,
    message_receipt: Option<ReceiptFn>,
    messages_query: Option<QueryFn>,
    new_config: Option<ConfigFn>,
    new_config_signal: Option<SignalFn>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport failures, malformed gateway data, rejected queries
    pub fn on_error(mut self, f: impl Fn(&SdkError) + Send + Sync + 'static) -> Self {
        self.error = Some(Arc::new(f));
        self
    }

    /// HTTP 400 responses, with the raw response body
    pub fn on_bad_request(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.bad_request = Some(Arc::new(f));
        self
    }

    /// Messages pushed on the message channel or fetched with `get_next_messages`
    pub fn on_messages(mut self, f: impl Fn(Vec<IoMessage>) + Send + Sync + 'static) -> Self {
        self.messages = Some(Arc::new(f));
        self
    }

    /// Gateway-assigned id and timestamp of a published message
    pub fn on_message_receipt(mut self, f: impl Fn(&str, u64) + Send + Sync + 'static) -> Self {
        self.message_receipt = Some(Arc::new(f));
        self
    }

    pub fn on_messages_query(
        mut self,
        f: impl Fn(u64, u64, Vec<IoMessage>) + Send + Sync + 'static,
    ) -> Self {
        self.messages_query = Some(Arc::new(f));
        self
    }

    /// Parsed service configuration
    pub fn on_new_config(mut self, f: impl Fn(Value) + Send + Sync + 'static) -> Self {
        self.new_config = Some(Arc::new(f));
        self
    }

    /// Control channel signal that new configuration is available
    pub fn on_new_config_signal(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.new_config_signal = Some(Arc::new(f));
        self
    }

    pub(crate) fn emit_error(&self, err: &SdkError) {
        if let Some(f) = &self.error {
            f(err);
        }
    }

    pub(crate) fn emit_bad_request(&self, body: &str) {
        if let Some(f) = &self.bad_request {
            f(body);
        }
    }

    pub(crate) fn emit_messages(&self, messages: Vec<IoMessage>) {
        if let Some(f) = &self.messages {
            f(messages);
        }
    }

    pub(crate) fn emit_message_receipt(&self, id: &str, timestamp: u64) {
        if let Some(f) = &self.message_receipt {
            f(id, timestamp);
        }
    }

    pub(crate) fn emit_messages_query(&self, start: u64, end: u64, messages: Vec<IoMessage>) {
        if let Some(f) = &self.messages_query {
            f(start, end, messages);
        }
    }

    pub(crate) fn emit_new_config(&self, config: Value) {
        if let Some(f) = &self.new_config {
            f(config);
        }
    }

    pub(crate) fn emit_new_config_signal(&self) {
        if let Some(f) = &self.new_config_signal {
            f();
        }
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("on_error", &self.error.is_some())
            .field("on_bad_request", &self.bad_request.is_some())
            .field("on_messages", &self.messages.is_some())
            .field("on_message_receipt", &self.message_receipt.is_some())
            .field("on_messages_query", &self.messages_query.is_some())
            .field("on_new_config", &self.new_config.is_some())
            .field("on_new_config_signal", &self.new_config_signal.is_some())
            .finish()
    }
}
