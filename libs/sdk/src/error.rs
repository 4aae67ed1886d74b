//! Error types for the SDK

use iofog_codec::CodecError;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

use crate::channel::ChannelRole;

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, SdkError>;

/// Top-level error delivered to `on_error` callbacks and returned by the facade
#[derive(Debug, Error)]
pub enum SdkError {
    /// Socket channel failure
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// REST request failure
    #[error(transparent)]
    Rest(#[from] RestError),

    /// Malformed frame or message from the gateway
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Query parameters rejected before any request was made
    #[error("Invalid message query: {0}")]
    InvalidQuery(String),

    /// Configuration could not be resolved
    #[error("Configuration error: {0:#}")]
    Config(#[from] anyhow::Error),

    /// HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Socket channel errors
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Send attempted while the channel is not open
    #[error("{role} channel is not open")]
    NotOpen { role: ChannelRole },

    /// Endpoint URL rejected before connecting
    #[error("Invalid {role} channel URL {url}: {reason}")]
    InvalidUrl {
        role: ChannelRole,
        url: String,
        reason: String,
    },

    /// WebSocket handshake did not complete in time
    #[error("{role} channel connect timeout after {timeout_ms}ms")]
    ConnectTimeout { role: ChannelRole, timeout_ms: u64 },

    /// Transport-level WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// Gateway closed the socket
    #[error("{role} channel closed by gateway with code {code}")]
    ClosedByPeer { role: ChannelRole, code: u16 },

    /// Legacy acknowledgment watcher gave up on a message
    #[error("No acknowledgment after {attempts} send attempts")]
    RetriesExhausted { attempts: u32 },

    /// Channel task is gone
    #[error("{role} channel task has stopped")]
    TaskStopped { role: ChannelRole },

    /// No tokio runtime to spawn the channel task on
    #[error("Channels must be opened from within a tokio runtime")]
    NoRuntime,
}

impl ChannelError {
    /// Check if this error means the endpoint is temporarily unreachable
    /// and a reconnect should be scheduled
    pub fn is_recoverable(&self) -> bool {
        match self {
            ChannelError::ConnectTimeout { .. } => true,
            ChannelError::ClosedByPeer { code, .. } => {
                *code != iofog_config::service::channels::NORMAL_CLOSURE_CODE
            }
            ChannelError::WebSocket(err) => is_unreachable(err),
            _ => false,
        }
    }
}

// Every handshake or transport failure is retried, including DNS errors
// and HTTP rejections while the gateway restarts. Only a malformed
// endpoint or a broken TLS setup will never succeed on a later attempt.
fn is_unreachable(err: &tungstenite::Error) -> bool {
    !matches!(err, tungstenite::Error::Url(_) | tungstenite::Error::Tls(_))
}

/// REST request errors
#[derive(Debug, Error)]
pub enum RestError {
    /// Request could not be sent or the response could not be read
    #[error("HTTP request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Response body is not the expected JSON document
    #[error("Invalid response body from {url} (status {status}): {reason}")]
    InvalidBody {
        url: String,
        status: u16,
        reason: String,
    },
}
