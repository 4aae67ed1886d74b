//! # ioFog Echo Service
//!
//! ## Architecture
//!
//! ```text
//! gateway ──message channel──► on_messages ──► event loop ──► send_message ──► gateway
//! gateway ──control channel──► on_new_config_signal ──► get_config (REST)
//! ```
//!
//! Every message pushed by the gateway is published back with the same
//! payload and descriptors. Configuration is fetched at startup and again on
//! each control signal.
//!
//! ## Configuration
//! - `--id=`, `--host=`, `--port=`, `--ssl=` override the gateway settings
//! - `--config <file>` adds a TOML file layer
//! - `SELFNAME`, `SSL`, `IOFOG_*` environment variables override everything
//! - `RUST_LOG` controls log verbosity (default `info`)
//! - `--json-logs` writes one JSON object per log line

use anyhow::{Context, Result};
use clap::Parser;
use iofog_sdk::{
    ChannelOptions, ConfigSources, Handlers, InitParams, IoFogClient, IoMessage, SdkError,
};
use serde_json::Value;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Echo every received ioMessage back to the gateway
#[derive(Parser, Debug)]
#[command(name = "iofog-echo")]
struct Args {
    /// Publisher identity of this service
    #[arg(long)]
    id: Option<String>,

    /// Gateway host
    #[arg(long)]
    host: Option<String>,

    /// Gateway port
    #[arg(long)]
    port: Option<u16>,

    /// Use https/wss
    #[arg(long)]
    ssl: Option<bool>,

    /// Optional TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit structured JSON log lines
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    /// Gateway flags in the `--key=value` form the configuration layer reads
    fn overrides(&self) -> Vec<String> {
        let mut overrides = Vec::new();
        if let Some(id) = &self.id {
            overrides.push(format!("--id={}", id));
        }
        if let Some(host) = &self.host {
            overrides.push(format!("--host={}", host));
        }
        if let Some(port) = self.port {
            overrides.push(format!("--port={}", port));
        }
        if let Some(ssl) = self.ssl {
            overrides.push(format!("--ssl={}", ssl));
        }
        overrides
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

enum Event {
    Messages(Vec<IoMessage>),
    ConfigSignal,
    Config(Value),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.json_logs);

    let mut params = InitParams::new();
    if let Some(path) = &args.config {
        params = params.config_file(path);
    }
    let sources = ConfigSources::from_process().with_args(args.overrides());

    let client = IoFogClient::init_with_sources(params, sources)
        .await
        .context("Failed to initialize ioFog client")?;
    info!(
        "Starting echo service as '{}'",
        client.config().publisher_id
    );

    let (events_tx, mut events) = mpsc::unbounded_channel();
    let handlers = event_handlers(events_tx);

    client.get_config(&handlers).await;
    client
        .open_control_channel(handlers.clone())
        .context("Failed to open control channel")?;
    client
        .open_message_channel(None, handlers.clone(), ChannelOptions::default())
        .context("Failed to open message channel")?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(Event::Messages(messages)) => echo(&client, messages),
                Some(Event::ConfigSignal) => client.get_config(&handlers).await,
                Some(Event::Config(config)) => info!("Configuration: {}", config),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    client.close_message_channel().await;
    client.close_control_channel().await;
    Ok(())
}

fn event_handlers(events: mpsc::UnboundedSender<Event>) -> Handlers {
    let (messages, signal, config) = (events.clone(), events.clone(), events);
    Handlers::new()
        .on_messages(move |msgs| {
            let _ = messages.send(Event::Messages(msgs));
        })
        .on_new_config_signal(move || {
            let _ = signal.send(Event::ConfigSignal);
        })
        .on_new_config(move |value| {
            let _ = config.send(Event::Config(value));
        })
        .on_message_receipt(|id, timestamp| info!("Message {} stored at {}", id, timestamp))
        .on_bad_request(|body| warn!("Gateway rejected request: {}", body))
        .on_error(|err: &SdkError| error!("ioFog error: {}", err))
}

fn echo(client: &IoFogClient, messages: Vec<IoMessage>) {
    for received in messages {
        info!(
            "Echoing message {} from '{}' ({} bytes)",
            received.id,
            received.publisher,
            received.content_data.len()
        );
        let reply = client.io_message_from(IoMessage {
            tag: received.tag,
            group_id: received.group_id,
            sequence_number: received.sequence_number,
            sequence_total: received.sequence_total,
            priority: received.priority,
            info_type: received.info_type,
            info_format: received.info_format,
            context_data: received.context_data,
            content_data: received.content_data,
            ..IoMessage::default()
        });
        if let Err(e) = client.send_message(&reply) {
            warn!("Echo dropped: {}", e);
        }
    }
}
