//! Configuration shared by the server and client binaries.
//!
//! Settings live in `config.toml` inside a config directory. A missing
//! file is created with the defaults; a file that cannot be read or
//! parsed is fatal at startup. Command-line flags override whatever the
//! file says.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

/// Name of the config file inside the config directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Port the server listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 29563;

/// Errors that can occur when loading or saving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the config file from disk.
    #[error("failed to read config: {0}")]
    ReadError(#[source] std::io::Error),

    /// Failed to write the config file to disk.
    #[error("failed to write config: {0}")]
    WriteError(#[source] std::io::Error),

    /// The file is not valid TOML, or has fields of the wrong type.
    #[error("failed to parse config: {0}")]
    ParseError(#[source] toml::de::Error),

    /// Failed to serialize the config to TOML.
    #[error("failed to serialize config: {0}")]
    SerializeError(#[source] toml::ser::Error),

    /// `host:port` does not form a socket address.
    #[error("invalid address {0}")]
    InvalidAddress(String),
}

/// Process configuration.
///
/// Keys in `config.toml` are `IsDebug`, `BindingHost`, and `Port`.
/// Missing keys take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Log at `debug` instead of `info` when `RUST_LOG` is unset.
    #[serde(rename = "IsDebug")]
    pub debug: bool,

    /// Address the server binds to, or the client dials.
    #[serde(rename = "BindingHost")]
    pub host: String,

    /// Port the server binds to, or the client dials.
    #[serde(rename = "Port")]
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

// --- Load / Save ---

impl Config {
    /// Load config from `config_dir`, or write and return the defaults if
    /// there is no config file yet.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .map_err(ConfigError::ReadError)?;
            let config: Config =
                toml::from_str(&contents).map_err(ConfigError::ParseError)?;
            tracing::info!(path = %config_path.display(), "loaded config");
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            tracing::info!(path = %config_path.display(), "created default config");
            Ok(config)
        }
    }

    /// Save config to `config_dir` as `config.toml`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;
        let serialized =
            toml::to_string_pretty(self).map_err(ConfigError::SerializeError)?;
        std::fs::write(config_dir.join(CONFIG_FILE), serialized)
            .map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// The `host:port` pair as a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::InvalidAddress(addr))
    }

    /// Default `tracing` filter directive for this config.
    pub fn log_filter(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }

    /// Apply command-line overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if args.debug {
            self.debug = true;
        }
        if let Some(ref host) = args.host {
            self.host = host.clone();
        }
        if let Some(port) = args.port {
            self.port = port;
        }
    }
}

// --- Command line ---

/// Command-line arguments of both binaries.
///
/// CLI values override settings loaded from `config.toml`.
#[derive(Parser, Debug)]
#[command(name = "roomlink", about = "Room lobby server and client")]
pub struct CliArgs {
    /// Log at debug level.
    #[arg(long)]
    pub debug: bool,

    /// Host to bind (server) or dial (client).
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (server) or dial (client).
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory holding config.toml. Defaults to the working directory.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Display name sent to the server (client only).
    #[arg(long)]
    pub name: Option<String>,

    /// What the client should do once connected (client only).
    #[command(subcommand)]
    pub action: Option<ClientAction>,
}

impl CliArgs {
    /// The directory to look for `config.toml` in.
    pub fn config_dir(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Room action requested on the client command line.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Create a room and print its code.
    Host,
    /// Join the room with this code.
    Join {
        /// The five-character room code.
        code: String,
    },
}
