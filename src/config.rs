//! Configuration types.
//!
//! Every setting is a command-line flag with an environment fallback:
//!
//! ```bash
//! progression-queue --workers 4 --logger-level prod --port 9090
//! PROGRESSION_WORKERS=4 PROGRESSION_LOG_PROFILE=prod progression-queue
//! ```

use std::str::FromStr;
use std::time::Duration;

use clap::Parser;

use crate::error::ConfigError;
use crate::worker::{DispatcherConfig, PoolConfig};

/// Log output profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogProfile {
    /// Human-readable output, debug level.
    Local,
    /// JSON output, debug level.
    Dev,
    /// JSON output, info level.
    Prod,
}

impl LogProfile {
    /// Default filter directive when `RUST_LOG` is not set.
    pub fn default_directive(&self) -> &'static str {
        match self {
            Self::Local | Self::Dev => "debug",
            Self::Prod => "info",
        }
    }
}

impl FromStr for LogProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            _ => Err(format!(
                "logger level '{s}' is not supported, available levels: local, dev, prod"
            )),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "progression-queue")]
#[command(about = "In-memory arithmetic progression task queue")]
#[command(version)]
pub struct Config {
    /// Number of pool workers
    #[arg(long, default_value = "1", env = "PROGRESSION_WORKERS")]
    pub workers: usize,

    /// HTTP bind host
    #[arg(long, default_value = "0.0.0.0", env = "PROGRESSION_HOST")]
    pub host: String,

    /// HTTP bind port
    #[arg(long, default_value = "8080", env = "PROGRESSION_PORT")]
    pub port: u16,

    /// Log output profile: local, dev or prod
    #[arg(long = "logger-level", default_value = "local", env = "PROGRESSION_LOG_PROFILE")]
    pub log_profile: LogProfile,

    /// Dispatcher back-off on an empty queue, in milliseconds
    #[arg(long = "idle-backoff-ms", default_value = "5000", env = "PROGRESSION_IDLE_BACKOFF_MS")]
    pub idle_backoff_ms: u64,

    /// Upper bound on graceful HTTP shutdown, in seconds
    #[arg(
        long = "shutdown-timeout-secs",
        default_value = "10",
        env = "PROGRESSION_SHUTDOWN_TIMEOUT_SECS"
    )]
    pub shutdown_timeout_secs: u64,
}

impl Config {
    /// Parse flags and environment, then validate. Exits with usage on
    /// unparseable input, like any clap binary.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Reject values clap accepts but the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidValue {
                key: "workers".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }
        Ok(())
    }

    /// `host:port` for the HTTP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Pool settings derived from this config.
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            workers: self.workers,
            dispatcher: DispatcherConfig {
                idle_backoff: self.idle_backoff(),
                ..DispatcherConfig::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config, clap::Error> {
        Config::try_parse_from(std::iter::once("progression-queue").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_when_unset() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.workers, 1);
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.log_profile, LogProfile::Local);
        assert_eq!(config.idle_backoff(), Duration::from_secs(5));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn reads_flags() {
        let config = parse(&[
            "--workers",
            "4",
            "--host",
            "127.0.0.1",
            "--port",
            "9090",
            "--logger-level",
            "prod",
            "--idle-backoff-ms",
            "250",
        ])
        .unwrap();
        assert_eq!(config.workers, 4);
        assert_eq!(config.bind_addr(), "127.0.0.1:9090");
        assert_eq!(config.log_profile, LogProfile::Prod);

        let pool = config.pool_config();
        assert_eq!(pool.workers, 4);
        assert_eq!(pool.dispatcher.idle_backoff, Duration::from_millis(250));
    }

    #[test]
    fn rejects_zero_workers() {
        let config = parse(&["--workers", "0"]).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "workers"));
    }

    #[test]
    fn rejects_unknown_log_profile() {
        let err = parse(&["--logger-level", "verbose"]).unwrap_err();
        assert!(err.to_string().contains("not supported"));
    }

    #[test]
    fn rejects_unparseable_port() {
        assert!(parse(&["--port", "eighty"]).is_err());
    }
}
