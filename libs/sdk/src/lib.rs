//! # ioFog SDK - Gateway Client for Edge Services
//!
//! ## Purpose
//!
//! Lets an edge micro-service exchange ioMessages with its local gateway
//! agent: publish and query messages and fetch configuration over the REST
//! API, and keep the control and message WebSocket channels alive.
//!
//! ## Architecture Role
//!
//! ```text
//! libs/codec ──┐
//!              ├──► libs/sdk ──► services/*
//! libs/config ─┘     │
//!                    ├── client    IoFogClient context object
//!                    ├── rest      JSON POST to the Local API
//!                    ├── channel   reconnecting control/message sockets
//!                    ├── handlers  caller callbacks
//!                    └── reachability  gateway host fallback
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use iofog_sdk::{Handlers, InitParams, IoFogClient};
//!
//! # async fn run() -> iofog_sdk::Result<()> {
//! let client = IoFogClient::init(InitParams::new()).await?;
//! let handlers = Handlers::new()
//!     .on_new_config(|config| println!("config: {}", config))
//!     .on_error(|err| eprintln!("error: {}", err));
//! client.get_config(&handlers).await;
//! client.open_control_channel(handlers)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## What This Crate Does NOT Contain
//! - Wire formats (libs/codec)
//! - Configuration sources and defaults (libs/config)
//! - Logging subscriber setup (left to the embedding binary)

pub mod channel;
pub mod client;
pub mod error;
pub mod handlers;
pub mod reachability;
pub mod rest;

pub use channel::{
    AckRetryPolicy, ChannelHandle, ChannelOptions, ChannelRole, ChannelState, OnOpen,
    ReconnectPolicy,
};
pub use client::IoFogClient;
pub use error::{ChannelError, RestError, Result, SdkError};
pub use handlers::Handlers;
pub use rest::{RestClient, RestOutcome};

pub use iofog_codec::{IoMessage, IoMessageBuilder, PayloadEncoding};
pub use iofog_config::{ClientConfig, ConfigSources, InitParams, Transport};
