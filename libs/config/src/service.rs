//! Service defaults
//!
//! Default values and constants shared by the SDK crates so that the
//! backoff policy, endpoints and identity defaults live in one place.

/// Gateway connection defaults
pub mod gateway {
    /// Hostname of the local gateway agent
    pub const DEFAULT_HOST: &str = "iofog";

    /// Local API port
    pub const DEFAULT_PORT: u16 = 54321;

    /// Publisher identity used until one is configured
    pub const DEFAULT_PUBLISHER_ID: &str = "NOT_DEFINED";

    /// Fallback host when the configured one cannot be reached
    pub const LOOPBACK_HOST: &str = "127.0.0.1";

    /// Upper bound on the host reachability check (milliseconds)
    pub const REACHABILITY_TIMEOUT_MS: u64 = 3_000;

    /// REST request timeout (milliseconds)
    pub const REQUEST_TIMEOUT_MS: u64 = 30_000;
}

/// Socket channel defaults
pub mod channels {
    /// Reconnection backoff base (milliseconds)
    pub const RECONNECT_BACKOFF_BASE_MS: u64 = 1_000;

    /// Attempts after which the backoff delay stops growing
    pub const RECONNECT_ATTEMPTS_LIMIT: u32 = 5;

    /// WebSocket normal-closure code
    pub const NORMAL_CLOSURE_CODE: u16 = 1000;

    /// How long an explicit close waits for the gateway to echo it (milliseconds)
    pub const CLOSE_TIMEOUT_MS: u64 = 1_000;

    /// Legacy acknowledgment watcher: seconds between sweeps
    pub const ACK_SWEEP_INTERVAL_SECS: u64 = 5;

    /// Legacy acknowledgment watcher: send attempts before the channel closes
    pub const ACK_MAX_ATTEMPTS: u32 = 10;

    /// Legacy acknowledgment watcher: pending messages kept at most
    pub const ACK_QUEUE_CAPACITY: usize = 1_000;
}
