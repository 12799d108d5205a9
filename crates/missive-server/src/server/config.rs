use anyhow::bail;
use clap::{ArgAction, Parser, ValueEnum};
use core::fmt;
use core::time::Duration;
use missive::DEFAULT_TABLE;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Lowest port the service will listen on (start of the dynamic range).
pub const MIN_PORT: u16 = 49152;

/// Runtime configuration for the `missive-server` binary.
///
/// All values are parsed from CLI arguments or environment variables. A
/// `.env` file in the working directory is loaded before parsing.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "missive-server",
    version,
    about = "An HTTP message store with cursor pagination",
    args_override_self = true
)]
pub struct CliArgs {
    /// Path of the database file. Parent directories are created on start.
    ///
    /// Environment variable: `DB_PATH`
    #[arg(long, env = "DB_PATH", default_value = "missive.redb")]
    pub db_path: PathBuf,

    /// Name of the table holding the messages.
    ///
    /// Each table keeps its own identifier sequence, so two services pointed
    /// at the same file with different tables never share identifiers.
    ///
    /// Environment variable: `BUCKET`
    #[arg(long, env = "BUCKET", default_value_t = String::from(DEFAULT_TABLE))]
    pub bucket: String,

    /// Address to bind.
    ///
    /// Environment variable: `MISSIVE_HOST`
    #[arg(long, env = "MISSIVE_HOST", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    /// Port to listen on, within `49152..=65535`.
    ///
    /// Environment variable: `PORT`
    #[arg(long, env = "PORT", default_value_t = 54321)]
    pub port: u16,

    /// Keep messages in process memory instead of on disk. Nothing survives
    /// a restart.
    ///
    /// Environment variable: `MISSIVE_IN_MEMORY`
    #[arg(long, env = "MISSIVE_IN_MEMORY", default_value_t = false, action = ArgAction::Set)]
    pub in_memory: bool,

    /// Log one line per request.
    ///
    /// Environment variable: `MISSIVE_REQUEST_LOG`
    #[arg(long, env = "MISSIVE_REQUEST_LOG", default_value_t = true, action = ArgAction::Set)]
    pub request_log: bool,

    /// Log output format.
    ///
    /// Environment variable: `MISSIVE_LOG_FORMAT`
    #[arg(long, env = "MISSIVE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Seconds to wait for in-flight requests after a shutdown signal.
    ///
    /// Environment variable: `MISSIVE_SHUTDOWN_TIMEOUT_SECS`
    #[arg(long, env = "MISSIVE_SHUTDOWN_TIMEOUT_SECS", default_value_t = 3)]
    pub shutdown_timeout_secs: u64,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human readable output.
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Where messages are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Redb { path: PathBuf, table: String },
    Memory,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redb { path, table } => write!(f, "table `{}` in {}", table, path.display()),
            Self::Memory => f.write_str("process memory"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub backend: StoreBackend,
    pub request_log: bool,
    pub log_format: LogFormat,
    pub shutdown_timeout: Duration,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.port < MIN_PORT {
            bail!(
                "PORT ({}) must be within {}..=65535",
                args.port,
                MIN_PORT
            );
        }

        if args.shutdown_timeout_secs == 0 {
            bail!("MISSIVE_SHUTDOWN_TIMEOUT_SECS must be greater than 0");
        }

        let backend = if args.in_memory {
            StoreBackend::Memory
        } else {
            if args.db_path.as_os_str().is_empty() {
                bail!("DB_PATH must not be empty");
            }
            if args.bucket.trim().is_empty() {
                bail!("BUCKET must not be empty");
            }
            StoreBackend::Redb {
                path: args.db_path,
                table: args.bucket,
            }
        };

        Ok(Self {
            addr: SocketAddr::new(args.host, args.port),
            backend,
            request_log: args.request_log,
            log_format: args.log_format,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Every argument is passed explicitly so ambient environment variables
    // cannot leak into the result.
    fn parse(overrides: &[&str]) -> anyhow::Result<ServerConfig> {
        let mut argv = vec![
            "missive-server",
            "--db-path",
            "data/messages.redb",
            "--bucket",
            "messages",
            "--host",
            "127.0.0.1",
            "--port",
            "54321",
            "--in-memory",
            "false",
            "--request-log",
            "true",
            "--log-format",
            "pretty",
            "--shutdown-timeout-secs",
            "3",
        ];
        argv.extend_from_slice(overrides);
        ServerConfig::try_from(CliArgs::try_parse_from(argv)?)
    }

    #[test]
    fn explicit_arguments_build_a_redb_config() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.addr, "127.0.0.1:54321".parse().unwrap());
        assert_eq!(
            config.backend,
            StoreBackend::Redb {
                path: PathBuf::from("data/messages.redb"),
                table: "messages".to_string(),
            }
        );
        assert!(config.request_log);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(3));
    }

    #[test]
    fn later_arguments_override_earlier_ones() {
        let config = parse(&["--port", "65535", "--log-format", "json", "--request-log", "false"])
            .unwrap();
        assert_eq!(config.addr.port(), 65535);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(!config.request_log);
    }

    #[test]
    fn ports_below_the_dynamic_range_are_rejected() {
        let err = parse(&["--port", "8080"]).unwrap_err();
        assert!(err.to_string().contains("PORT"), "{err}");
        assert!(parse(&["--port", "49152"]).is_ok());
    }

    #[test]
    fn zero_shutdown_timeout_is_rejected() {
        assert!(parse(&["--shutdown-timeout-secs", "0"]).is_err());
    }

    #[test]
    fn blank_bucket_is_rejected_unless_in_memory() {
        assert!(parse(&["--bucket", " "]).is_err());

        let config = parse(&["--bucket", " ", "--in-memory", "true"]).unwrap();
        assert_eq!(config.backend, StoreBackend::Memory);
        assert_eq!(config.backend.to_string(), "process memory");
    }

    #[test]
    fn invalid_host_fails_to_parse() {
        assert!(parse(&["--host", "localhost:1"]).is_err());
    }
}
