//! Command-line arguments and validated runtime configuration
//!
//! Every flag can also be supplied through a `TRAFFIC_MONITOR_*` environment
//! variable. Invalid values stop startup instead of being patched at runtime.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

/// Live traffic metrics for this HTTP server
#[derive(Parser, Debug, Clone)]
#[command(name = "traffic-monitor", version)]
pub struct Args {
    /// Host to bind to
    #[arg(long, env = "TRAFFIC_MONITOR_HOST", default_value = Config::DEFAULT_HOST)]
    pub host: String,

    /// HTTP server port
    #[arg(short, long, env = "TRAFFIC_MONITOR_PORT", default_value_t = Config::DEFAULT_PORT)]
    pub port: u16,

    /// Metrics refresh interval in seconds
    #[arg(short, long, env = "TRAFFIC_MONITOR_REFRESH", default_value_t = 1)]
    pub refresh: u64,

    /// Number of data points to retain
    #[arg(long, env = "TRAFFIC_MONITOR_HISTORY", default_value_t = Config::DEFAULT_HISTORY_SIZE)]
    pub history: usize,

    /// Directory served for the dashboard and other static files
    #[arg(long, env = "TRAFFIC_MONITOR_STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("refresh interval must be at least 1 second")]
    ZeroRefreshInterval,
    #[error("history size must be at least 1 data point")]
    ZeroHistorySize,
}

/// Validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub refresh_interval: Duration,
    pub history_size: usize,
    pub static_dir: PathBuf,
}

impl Config {
    pub const DEFAULT_HOST: &'static str = "0.0.0.0";
    pub const DEFAULT_PORT: u16 = 8080;
    pub const DEFAULT_HISTORY_SIZE: usize = 300;

    /// `host:port` string for the listener.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: Self::DEFAULT_HOST.to_owned(),
            port: Self::DEFAULT_PORT,
            refresh_interval: Duration::from_secs(1),
            history_size: Self::DEFAULT_HISTORY_SIZE,
            static_dir: PathBuf::from("static"),
        }
    }
}

impl TryFrom<Args> for Config {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        if args.refresh == 0 {
            return Err(ConfigError::ZeroRefreshInterval);
        }
        if args.history == 0 {
            return Err(ConfigError::ZeroHistorySize);
        }

        Ok(Self {
            host: args.host,
            port: args.port,
            refresh_interval: Duration::from_secs(args.refresh),
            history_size: args.history,
            static_dir: args.static_dir,
        })
    }
}
