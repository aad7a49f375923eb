use clap::{Parser, builder::BoolishValueParser};
use std::error::Error;
use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017/";
const DEFAULT_DB_NAME: &str = "stock_data";
const DEFAULT_COLLECTION_NAME: &str = "detailed_financials";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MCP_HTTP_ADDR: &str = mongo_mcp::server::DEFAULT_MCP_HTTP_ADDR;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Parser, Debug)]
#[command(name = "mongo-mcpd", version, about = "MongoDB MCP daemon.")]
#[allow(clippy::struct_excessive_bools)]
struct CliArgs {
    #[arg(long, env = "MONGO_URI", default_value = DEFAULT_MONGO_URI)]
    mongo_uri: String,

    #[arg(long, env = "DB_NAME", default_value = DEFAULT_DB_NAME)]
    db_name: String,

    #[arg(long, env = "COLLECTION_NAME", default_value = DEFAULT_COLLECTION_NAME)]
    collection_name: String,

    #[arg(
        long,
        env = "MONGO_CONNECT_TIMEOUT_SECS",
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS
    )]
    connect_timeout_secs: u64,

    #[arg(long, env = "HOST", default_value = DEFAULT_HOST)]
    host: String,

    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    #[arg(
        long,
        env = "HEALTH_SERVE",
        default_value_t = true,
        value_parser = BoolishValueParser::new()
    )]
    health_serve: bool,

    #[arg(
        long = "stdio",
        env = "MCP_STDIO",
        default_value_t = true,
        value_parser = BoolishValueParser::new()
    )]
    enable_stdio: bool,

    #[arg(
        long,
        env = "MCP_HTTP_SERVE",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    mcp_http_serve: bool,

    #[arg(long, env = "MCP_HTTP_ADDR", default_value = DEFAULT_MCP_HTTP_ADDR)]
    mcp_http_addr: SocketAddr,

    #[arg(
        long,
        env = "DB_IN_MEMORY",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    db_in_memory: bool,

    #[arg(long, env = "DB_SEED_FILE")]
    db_seed_file: Option<PathBuf>,

    #[arg(long, env = "LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,
}

/// Runtime configuration loaded from CLI arguments and environment variables.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct DaemonConfig {
    pub mongo_uri: String,
    pub db_name: String,
    pub collection_name: String,
    pub connect_timeout: Duration,
    pub health_addr: SocketAddr,
    pub health_serve: bool,
    pub enable_stdio: bool,
    pub mcp_http_serve: bool,
    pub mcp_http_addr: SocketAddr,
    pub db_in_memory: bool,
    pub db_seed_file: Option<PathBuf>,
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingSetting(&'static str),
    InvalidSetting { name: &'static str, value: String },
    NothingToServe,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSetting(name) => write!(f, "missing required setting: {name}"),
            Self::InvalidSetting { name, value } => {
                write!(f, "invalid {name} value: {value}")
            }
            Self::NothingToServe => write!(
                f,
                "no transport enabled; set MCP_STDIO, MCP_HTTP_SERVE or HEALTH_SERVE"
            ),
        }
    }
}

impl Error for ConfigError {}

impl DaemonConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::try_from(args)
    }
}

impl TryFrom<CliArgs> for DaemonConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let mongo_uri = args.mongo_uri.trim().to_string();
        if !args.db_in_memory && mongo_uri.is_empty() {
            return Err(ConfigError::MissingSetting("MONGO_URI"));
        }

        if args.db_name.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                name: "DB_NAME",
                value: args.db_name,
            });
        }
        if args.collection_name.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                name: "COLLECTION_NAME",
                value: args.collection_name,
            });
        }

        if args.connect_timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "MONGO_CONNECT_TIMEOUT_SECS",
                value: args.connect_timeout_secs.to_string(),
            });
        }

        if args.db_seed_file.is_some() && !args.db_in_memory {
            return Err(ConfigError::InvalidSetting {
                name: "DB_SEED_FILE",
                value: "a seed file requires DB_IN_MEMORY=true".to_string(),
            });
        }

        if !(args.enable_stdio || args.mcp_http_serve || args.health_serve) {
            return Err(ConfigError::NothingToServe);
        }

        let health_addr = resolve_addr(args.host.trim(), args.port)?;
        let log_level = if args.log_level.trim().is_empty() {
            DEFAULT_LOG_LEVEL.to_string()
        } else {
            args.log_level.trim().to_ascii_lowercase()
        };

        Ok(Self {
            mongo_uri,
            db_name: args.db_name,
            collection_name: args.collection_name,
            connect_timeout: Duration::from_secs(args.connect_timeout_secs),
            health_addr,
            health_serve: args.health_serve,
            enable_stdio: args.enable_stdio,
            mcp_http_serve: args.mcp_http_serve,
            mcp_http_addr: args.mcp_http_addr,
            db_in_memory: args.db_in_memory,
            db_seed_file: args.db_seed_file,
            log_level,
        })
    }
}

fn resolve_addr(host: &str, port: u16) -> Result<SocketAddr, ConfigError> {
    let invalid = || ConfigError::InvalidSetting {
        name: "HOST",
        value: host.to_string(),
    };
    (host, port)
        .to_socket_addrs()
        .map_err(|_| invalid())?
        .next()
        .ok_or_else(invalid)
}
