//! # ioFog Client Configuration
//!
//! Configuration resolution and shared constants for the ioFog SDK crates.
//!
//! ## Features
//!
//! - **Client Configuration**: layered resolution of publisher identity,
//!   gateway host, port and TLS flag
//! - **Protocol Constants**: REST and socket endpoint paths, URL schemes
//! - **Service Defaults**: gateway defaults, reconnect backoff, legacy
//!   acknowledgment watcher limits
//!
//! ## Usage
//!
//! ```rust,no_run
//! use iofog_config::{ClientConfig, ConfigSources, InitParams, Transport};
//! use iofog_config::protocol::rest;
//!
//! let params = InitParams::new().publisher_id("sensor-1");
//! let config = ClientConfig::load(&params, &ConfigSources::from_process())?;
//! let url = config.url(Transport::Http, rest::CONFIG_GET);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod client_config;
pub mod protocol;
pub mod service;

// Re-export commonly used types
pub use client_config::{ClientConfig, ConfigSources, InitParams};
pub use protocol::Transport;
