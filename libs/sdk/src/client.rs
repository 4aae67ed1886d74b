//! ioFog client context
//!
//! [`IoFogClient`] bundles the resolved configuration, the REST client and
//! the channel registry. REST outcomes and channel events are delivered
//! through [`Handlers`].

use iofog_codec::{parse_messages, IoMessage, PayloadEncoding, IO_MESSAGE_VERSION};
use iofog_config::protocol::rest;
use iofog_config::service::gateway::{REACHABILITY_TIMEOUT_MS, REQUEST_TIMEOUT_MS};
use iofog_config::{ClientConfig, ConfigSources, InitParams, Transport};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::channel::{
    spawn_channel, ChannelHandle, ChannelOptions, ChannelRegistry, ChannelRole, ChannelState,
    OnOpen,
};
use crate::error::{ChannelError, Result, SdkError};
use crate::handlers::Handlers;
use crate::reachability;
use crate::rest::{RestClient, RestOutcome};

/// Connection to the local gateway agent
pub struct IoFogClient {
    config: ClientConfig,
    rest: RestClient,
    channels: ChannelRegistry,
}

impl IoFogClient {
    /// Resolve configuration from the caller, process arguments and
    /// environment, then check that the gateway host is reachable
    pub async fn init(params: InitParams) -> Result<Self> {
        Self::init_with_sources(params, ConfigSources::from_process()).await
    }

    /// Like [`IoFogClient::init`] with explicit argument and environment sources
    pub async fn init_with_sources(params: InitParams, sources: ConfigSources) -> Result<Self> {
        let config = ClientConfig::load(&params, &sources)?;
        let limit = Duration::from_millis(REACHABILITY_TIMEOUT_MS);
        let config = reachability::resolve_host(config, limit).await;
        info!(
            "ioFog client ready: publisher '{}' at {}:{} (ssl: {})",
            config.publisher_id, config.host, config.port, config.ssl
        );
        Self::with_config(config)
    }

    /// Client for an already resolved configuration; no reachability check
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        Self::with_request_timeout(config, Duration::from_millis(REQUEST_TIMEOUT_MS))
    }

    pub fn with_request_timeout(config: ClientConfig, request_timeout: Duration) -> Result<Self> {
        let rest = RestClient::new(config.clone(), request_timeout)?;
        Ok(Self {
            config,
            rest,
            channels: ChannelRegistry::new(),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Absolute URL of a gateway endpoint
    pub fn url(&self, transport: Transport, path: &str) -> String {
        self.config.url(transport, path)
    }

    /// Empty message published by this service
    pub fn io_message(&self) -> IoMessage {
        self.io_message_from(IoMessage::default())
    }

    /// Caller-populated message prepared for publishing
    pub fn io_message_from(&self, message: IoMessage) -> IoMessage {
        IoMessage {
            id: String::new(),
            timestamp: 0,
            version: IO_MESSAGE_VERSION,
            publisher: self.config.publisher_id.clone(),
            ..message
        }
    }

    /// Publish a message through the REST API
    pub async fn send_new_message(&self, message: &IoMessage, handlers: &Handlers) {
        let mut message = message.clone();
        message.publisher = self.config.publisher_id.clone();
        let body = message.to_json(PayloadEncoding::Base64);

        let Some(body) = self.request(rest::MESSAGES_NEW, &body, handlers).await else {
            return;
        };
        let id = body.get("id").and_then(Value::as_str).unwrap_or_default();
        let timestamp = body.get("timestamp").and_then(Value::as_u64).unwrap_or(0);
        if !id.is_empty() && timestamp != 0 {
            handlers.emit_message_receipt(id, timestamp);
        } else {
            debug!("Publish response carried no receipt");
        }
    }

    /// Fetch messages queued for this service
    pub async fn get_next_messages(&self, handlers: &Handlers) {
        let body = json!({ "id": self.config.publisher_id });
        let Some(body) = self.request(rest::MESSAGES_NEXT, &body, handlers).await else {
            return;
        };
        if let Some(messages) = self.messages_field(&body, handlers) {
            handlers.emit_messages(messages);
        }
    }

    /// Fetch messages from `publishers` within a time frame
    ///
    /// `publishers` must serialize to a JSON array of strings; anything else
    /// is reported through `on_error` without contacting the gateway.
    pub async fn get_messages_by_query<P>(
        &self,
        start: u64,
        end: u64,
        publishers: &P,
        handlers: &Handlers,
    ) where
        P: Serialize + ?Sized,
    {
        let publishers = match publishers_array(publishers) {
            Ok(list) => list,
            Err(err) => {
                error!("Rejected message query: {}", err);
                handlers.emit_error(&err);
                return;
            }
        };

        let body = json!({
            "id": self.config.publisher_id,
            "timeframestart": start,
            "timeframeend": end,
            "publishers": publishers,
        });
        let Some(body) = self.request(rest::MESSAGES_QUERY, &body, handlers).await else {
            return;
        };
        if let Some(messages) = self.messages_field(&body, handlers) {
            let start = body.get("timeframestart").and_then(Value::as_u64).unwrap_or(start);
            let end = body.get("timeframeend").and_then(Value::as_u64).unwrap_or(end);
            handlers.emit_messages_query(start, end, messages);
        }
    }

    /// Fetch this service's configuration
    ///
    /// The gateway returns the configuration as JSON text; text that does not
    /// parse is logged and delivered as an empty object.
    pub async fn get_config(&self, handlers: &Handlers) {
        let body = json!({ "id": self.config.publisher_id });
        let Some(body) = self.request(rest::CONFIG_GET, &body, handlers).await else {
            return;
        };
        let Some(text) = body.get("config").and_then(Value::as_str) else {
            debug!("Config response carried no config field");
            return;
        };
        let config = serde_json::from_str(text).unwrap_or_else(|e| {
            error!("There was an error parsing config to JSON: {}", e);
            json!({})
        });
        handlers.emit_new_config(config);
    }

    /// Open the control channel
    pub fn open_control_channel(&self, handlers: Handlers) -> Result<ChannelHandle> {
        self.open_channel(ChannelRole::Control, handlers, ChannelOptions::default(), None)
    }

    /// Open the message channel; `on_open` runs after every successful
    /// handshake and may send an initial message
    pub fn open_message_channel(
        &self,
        on_open: Option<OnOpen>,
        handlers: Handlers,
        options: ChannelOptions,
    ) -> Result<ChannelHandle> {
        self.open_channel(ChannelRole::Message, handlers, options, on_open)
    }

    fn open_channel(
        &self,
        role: ChannelRole,
        handlers: Handlers,
        options: ChannelOptions,
        on_open: Option<OnOpen>,
    ) -> Result<ChannelHandle> {
        let path = format!("{}{}", role.path(), self.config.publisher_id);
        let url = self.config.url(Transport::WebSocket, &path);
        match spawn_channel(
            role,
            url,
            &self.config.publisher_id,
            handlers.clone(),
            options,
            on_open,
        ) {
            Ok((handle, task)) => {
                self.channels.insert(handle.clone(), task);
                Ok(handle)
            }
            Err(e) => {
                error!("Unable to open {} channel: {}", role, e);
                let err = SdkError::Channel(e);
                handlers.emit_error(&err);
                Err(err)
            }
        }
    }

    /// Close the control channel and wait for its socket to shut down
    pub async fn close_control_channel(&self) {
        self.channels.close(ChannelRole::Control).await;
    }

    /// Close the message channel and wait for its socket to shut down
    pub async fn close_message_channel(&self) {
        self.channels.close(ChannelRole::Message).await;
    }

    /// Send a message on the open message channel
    pub fn send_message(&self, message: &IoMessage) -> std::result::Result<(), ChannelError> {
        match self.channels.get(ChannelRole::Message) {
            Some(handle) => handle.send_message(message),
            None => {
                error!("Cannot send message: message channel is not open");
                Err(ChannelError::NotOpen {
                    role: ChannelRole::Message,
                })
            }
        }
    }

    pub fn channel_state(&self, role: ChannelRole) -> ChannelState {
        self.channels.state(role)
    }

    /// POST and route non-success outcomes to the handlers
    async fn request(&self, path: &str, body: &Value, handlers: &Handlers) -> Option<Value> {
        match self.rest.post(path, body).await {
            Ok(RestOutcome::Success(value)) => Some(value),
            Ok(RestOutcome::BadRequest(text)) => {
                warn!("Bad request to {}: {}", path, text);
                handlers.emit_bad_request(&text);
                None
            }
            Err(e) => {
                error!("Request to {} failed: {}", path, e);
                handlers.emit_error(&SdkError::Rest(e));
                None
            }
        }
    }

    fn messages_field(&self, body: &Value, handlers: &Handlers) -> Option<Vec<IoMessage>> {
        let Some(messages) = body.get("messages").and_then(Value::as_array) else {
            debug!("Response carried no messages array");
            return None;
        };
        match parse_messages(messages) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                error!("Unable to parse messages: {}", e);
                handlers.emit_error(&SdkError::Codec(e));
                None
            }
        }
    }
}

fn publishers_array<P: Serialize + ?Sized>(publishers: &P) -> Result<Vec<String>> {
    let value = serde_json::to_value(publishers)
        .map_err(|e| SdkError::InvalidQuery(format!("publishers not serializable: {}", e)))?;
    let Value::Array(items) = value else {
        return Err(SdkError::InvalidQuery(
            "publishers input is not an array".to_string(),
        ));
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            other => Err(SdkError::InvalidQuery(format!(
                "publisher entry {} is not a string",
                other
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> IoFogClient {
        let config = ClientConfig {
            publisher_id: "pub-1".to_string(),
            ..ClientConfig::default()
        };
        IoFogClient::with_config(config).unwrap()
    }

    #[test]
    fn test_io_message_constructor() {
        let client = client();
        let msg = client.io_message();
        assert_eq!(msg.publisher, "pub-1");
        assert_eq!(msg.version, 4);
        assert!(msg.id.is_empty());

        let mut populated = IoMessage::builder().tag("t").build();
        populated.id = "stale".to_string();
        populated.timestamp = 99;
        let msg = client.io_message_from(populated);
        assert_eq!(msg.tag, "t");
        assert_eq!(msg.publisher, "pub-1");
        assert!(msg.id.is_empty());
        assert_eq!(msg.timestamp, 0);
    }

    #[test]
    fn test_publishers_validation() {
        assert_eq!(
            publishers_array(&["a", "b"]).unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
        assert!(publishers_array(&Vec::<String>::new()).unwrap().is_empty());
        assert!(matches!(
            publishers_array("a"),
            Err(SdkError::InvalidQuery(_))
        ));
        assert!(publishers_array(&json!(["a", 1])).is_err());
    }

    #[test]
    fn test_urls() {
        let client = client();
        assert_eq!(
            client.url(Transport::WebSocket, "/v2/message/socket/id/pub-1"),
            "ws://iofog:54321/v2/message/socket/id/pub-1"
        );
        assert_eq!(client.channel_state(ChannelRole::Message), ChannelState::Closed);
    }

    #[test]
    fn test_send_without_channel() {
        let err = client().send_message(&IoMessage::default()).unwrap_err();
        assert!(matches!(err, ChannelError::NotOpen { .. }));
    }
}
