//! Gateway Local API endpoints
//!
//! Relative paths of the REST and socket endpoints exposed by the gateway.
//! Socket paths are completed with the publisher identity.

/// REST endpoints (POST, JSON body)
pub mod rest {
    pub const MESSAGES_NEW: &str = "/v2/messages/new";
    pub const MESSAGES_NEXT: &str = "/v2/messages/next";
    pub const MESSAGES_QUERY: &str = "/v2/messages/query";
    pub const CONFIG_GET: &str = "/v2/config/get";
}

/// Socket endpoint prefixes
pub mod socket {
    pub const CONTROL: &str = "/v2/control/socket/id/";
    pub const MESSAGE: &str = "/v2/message/socket/id/";
}

/// URL scheme for the REST or socket transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Http,
    WebSocket,
}

impl Transport {
    /// Scheme string, secure when `ssl` is set
    pub fn scheme(self, ssl: bool) -> &'static str {
        match (self, ssl) {
            (Transport::Http, false) => "http",
            (Transport::Http, true) => "https",
            (Transport::WebSocket, false) => "ws",
            (Transport::WebSocket, true) => "wss",
        }
    }
}
