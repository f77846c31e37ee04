//! Server configuration.
//!
//! Every setting can be given as a command-line flag or through the
//! corresponding environment variable:
//!
//! - `RELAYCHAT_BIND_ADDR`: listen address. Default: `0.0.0.0:8082`
//! - `RELAYCHAT_OUTBOUND_BUFFER`: frames queued per connection before
//!   deliveries to it fail. Default: `256`
//! - `RELAYCHAT_SEED_USERS`: pre-populate the identity directory. Default: `true`
//! - `RELAYCHAT_LOG_FORMAT`: `pretty` or `json`. Default: `pretty`
//!
//! # Examples
//!
//! ```bash
//! RELAYCHAT_BIND_ADDR=127.0.0.1:9000 cargo run -p relaychat-server
//! # or
//! cargo run -p relaychat-server -- --bind-addr 127.0.0.1:9000 --log-format json
//! ```

use std::fmt;
use std::net::SocketAddr;

use clap::{ArgAction, Parser, ValueEnum};
use relaychat_core::session::DEFAULT_OUTBOUND_BUFFER;
use relaychat_core::SessionConfig;
use tracing::info;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable multi-line output
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "relaychat-server", version, about = "Real-time message relay server")]
pub struct ServerConfig {
    /// Address to listen on for HTTP and WebSocket traffic
    #[arg(long, env = "RELAYCHAT_BIND_ADDR", default_value = "0.0.0.0:8082")]
    pub bind_addr: SocketAddr,

    /// Frames that may be queued per connection
    #[arg(
        long,
        env = "RELAYCHAT_OUTBOUND_BUFFER",
        default_value_t = DEFAULT_OUTBOUND_BUFFER,
        value_parser = parse_outbound_buffer
    )]
    pub outbound_buffer: usize,

    /// Pre-populate the identity directory with demo users
    #[arg(long, env = "RELAYCHAT_SEED_USERS", default_value_t = true, action = ArgAction::Set)]
    pub seed_users: bool,

    /// Log output format
    #[arg(long, env = "RELAYCHAT_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

fn parse_outbound_buffer(raw: &str) -> Result<usize, String> {
    let value: usize = raw
        .parse()
        .map_err(|e| format!("not a valid buffer size: {e}"))?;
    if value == 0 {
        return Err("outbound buffer must be greater than zero".to_string());
    }
    Ok(value)
}

impl ServerConfig {
    /// Session settings derived from this configuration.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            outbound_buffer: self.outbound_buffer,
        }
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        info!(
            bind_addr = %self.bind_addr,
            outbound_buffer = self.outbound_buffer,
            seed_users = self.seed_users,
            log_format = %self.log_format,
            "Server configuration"
        );
    }
}
