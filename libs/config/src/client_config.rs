//! Client Configuration Module
//!
//! Resolves the gateway connection settings (publisher identity, host, port,
//! TLS flag) from four layers. Later layers win:
//!
//! 1. caller-provided [`InitParams`] (blank host / zero port / blank id ignored)
//! 2. optional TOML file named by [`InitParams::config_file`]
//! 3. command-line-style overrides (`--id=`, `--host=`, `--port=`, `--ssl=`)
//! 4. environment (`IOFOG_HOST`, `IOFOG_PORT`, `IOFOG_PUBLISHER_ID`,
//!    `IOFOG_SSL`, then `SELFNAME` and `SSL`)
//!
//! The resolved [`ClientConfig`] is read-only for the lifetime of a client.

use anyhow::{Context, Result};
use config_crate::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::protocol::Transport;
use crate::service::gateway::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_PUBLISHER_ID};

/// Resolved gateway connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Publisher identity of this service instance
    pub publisher_id: String,
    pub host: String,
    pub port: u16,
    /// Use `https` / `wss`
    pub ssl: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            publisher_id: DEFAULT_PUBLISHER_ID.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            ssl: false,
        }
    }
}

impl ClientConfig {
    /// Absolute endpoint URL for a relative path
    pub fn url(&self, transport: Transport, path: &str) -> String {
        format!(
            "{}://{}:{}{}",
            transport.scheme(self.ssl),
            self.host,
            self.port,
            path
        )
    }

    /// Same settings pointed at another host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }
}

/// Parameters supplied by the embedding service
#[derive(Debug, Clone, Default)]
pub struct InitParams {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub publisher_id: Option<String>,
    /// Optional TOML file with `host`, `port`, `publisher_id`, `ssl`
    pub config_file: Option<PathBuf>,
}

impl InitParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn publisher_id(mut self, id: impl Into<String>) -> Self {
        self.publisher_id = Some(id.into());
        self
    }

    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }
}

/// Command-line arguments and environment the configuration is read from
///
/// Captured once so resolution is deterministic and testable without
/// touching the process environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

impl ConfigSources {
    /// Arguments (without the program name) and environment of this process
    pub fn from_process() -> Self {
        Self {
            args: std::env::args().skip(1).collect(),
            env: std::env::vars().collect(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// `--key=value` pairs mapped onto configuration keys
    fn arg_overrides(&self) -> Vec<(&'static str, String)> {
        let mut overrides = Vec::new();
        for arg in &self.args {
            let Some((key, value)) = arg.split_once('=') else {
                continue;
            };
            let target = match key {
                "--id" => "publisher_id",
                "--host" => "host",
                "--port" => "port",
                "--ssl" => "ssl",
                _ => continue,
            };
            overrides.push((target, value.to_string()));
        }
        overrides
    }

    /// Environment variables mapped onto configuration keys, lowest first
    fn env_overrides(&self) -> Vec<(&'static str, String)> {
        let mut overrides = Vec::new();
        for (var, key) in [
            ("IOFOG_HOST", "host"),
            ("IOFOG_PORT", "port"),
            ("IOFOG_PUBLISHER_ID", "publisher_id"),
            ("IOFOG_SSL", "ssl"),
            ("SELFNAME", "publisher_id"),
        ] {
            if let Some(value) = self.env.get(var) {
                overrides.push((key, value.clone()));
            }
        }
        // Presence alone enables TLS
        if self.env.contains_key("SSL") {
            overrides.push(("ssl", "true".to_string()));
        }
        overrides
    }
}

impl ClientConfig {
    /// Resolve configuration from all layers
    pub fn load(params: &InitParams, sources: &ConfigSources) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("host", DEFAULT_HOST)?
            .set_default("port", i64::from(DEFAULT_PORT))?
            .set_default("publisher_id", DEFAULT_PUBLISHER_ID)?
            .set_default("ssl", false)?;

        // Caller-provided values replace the built-in defaults
        if let Some(host) = params.host.as_deref().filter(|h| !h.trim().is_empty()) {
            builder = builder.set_default("host", host)?;
        }
        if let Some(port) = params.port.filter(|&p| p > 0) {
            builder = builder.set_default("port", i64::from(port))?;
        }
        if let Some(id) = params.publisher_id.as_deref().filter(|i| !i.trim().is_empty()) {
            builder = builder.set_default("publisher_id", id)?;
        }

        if let Some(path) = &params.config_file {
            info!("Loading client config: {:?}", path);
            builder = builder.add_source(
                File::from(path.as_path())
                    .format(FileFormat::Toml)
                    .required(true),
            );
        }

        for (key, value) in sources.arg_overrides() {
            debug!("Command-line override: {} = {}", key, value);
            builder = builder.set_override(key, value)?;
        }
        for (key, value) in sources.env_overrides() {
            debug!("Environment override: {} = {}", key, value);
            builder = builder.set_override(key, value)?;
        }

        let config = builder
            .build()
            .context("Failed to build client configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize client configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::load(&InitParams::new(), &ConfigSources::default()).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.host, "iofog");
        assert_eq!(config.port, 54321);
        assert_eq!(config.publisher_id, "NOT_DEFINED");
        assert!(!config.ssl);
    }

    #[test]
    fn test_blank_caller_values_are_ignored() {
        let params = InitParams::new().host("   ").port(0).publisher_id("");
        let config = ClientConfig::load(&params, &ConfigSources::default()).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_precedence_env_over_args_over_caller() {
        let params = InitParams::new()
            .host("caller-host")
            .port(1000)
            .publisher_id("caller-id");
        let sources = ConfigSources::default()
            .with_args(["--id=arg-id", "--port=2000", "stray", "--unknown=1"])
            .with_env("SELFNAME", "env-id");

        let config = ClientConfig::load(&params, &sources).unwrap();
        assert_eq!(config.publisher_id, "env-id");
        assert_eq!(config.port, 2000);
        assert_eq!(config.host, "caller-host");
    }

    #[test]
    fn test_ssl_presence_enables_tls() {
        let sources = ConfigSources::default().with_env("SSL", "");
        let config = ClientConfig::load(&InitParams::new(), &sources).unwrap();
        assert!(config.ssl);
        assert_eq!(
            config.url(Transport::WebSocket, "/v2/control/socket/id/x"),
            "wss://iofog:54321/v2/control/socket/id/x"
        );
        assert_eq!(config.url(Transport::Http, "/a"), "https://iofog:54321/a");
    }
}
