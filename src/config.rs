use crate::error::{RelayError, Result};
use crate::relay::{BroadcasterConfig, DeliveryPolicy};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Liveness probe route
pub const HEALTH_PATH: &str = "/health";
/// Relay status route
pub const STATUS_PATH: &str = "/api/status";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP/WebSocket server configuration
    pub server: ServerConfig,
    /// Relay core configuration
    pub relay: RelayConfig,
    /// Logging configuration
    pub log: LogConfig,
}

/// Which payloads the relay carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    /// Structured `{username, message}` chat records
    #[default]
    Chat,
    /// Opaque signaling frames
    Signal,
}

impl Variant {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "chat" => Ok(Self::Chat),
            "signal" | "signaling" | "signalling" => Ok(Self::Signal),
            other => Err(RelayError::InvalidConfig(format!(
                "RELAY_VARIANT must be chat or signal, got {}",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Signal => "signal",
        }
    }

    fn default_ws_path(&self) -> &'static str {
        match self {
            Self::Chat => "/",
            Self::Signal => "/ws",
        }
    }

    fn default_static_root(&self) -> &'static str {
        match self {
            Self::Chat => "",
            Self::Signal => ".",
        }
    }

    fn default_echo_sender(&self) -> bool {
        match self {
            Self::Chat => true,
            Self::Signal => false,
        }
    }
}

/// Which browser origins may open a relay connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginPolicy {
    /// Accept every origin. Development only.
    AllowAll,
    /// Origin host must match the Host header
    SameHost,
    /// Origin must be one of the listed `scheme://host[:port]` values
    AllowList(Vec<String>),
}

impl OriginPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllowAll => "allow_all",
            Self::SameHost => "same_host",
            Self::AllowList(_) => "allow_list",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to (default: 0.0.0.0)
    pub host: String,
    /// Port to listen on (default: 8081)
    pub port: u16,
    /// Path of the WebSocket endpoint (default: / for chat, /ws for signal)
    pub ws_path: String,
    /// Directory served for every other path (default: . for signal, none for chat)
    pub static_root: Option<PathBuf>,
    /// Origin check applied during the upgrade handshake
    pub origin_policy: OriginPolicy,
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Payload variant
    pub variant: Variant,
    /// Whether a payload is echoed back to its author
    pub delivery: DeliveryPolicy,
    /// Bound on a single send; none waits forever
    pub send_timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let variant = Variant::from_str(&get_env_or("RELAY_VARIANT", "chat"))?;

        let echo_sender = match env::var("RELAY_ECHO_SENDER") {
            Ok(raw) => raw.trim().parse().map_err(|_| {
                RelayError::InvalidConfig("RELAY_ECHO_SENDER must be true or false".into())
            })?,
            Err(_) => variant.default_echo_sender(),
        };

        let send_timeout_ms: u64 = get_env_or("RELAY_SEND_TIMEOUT_MS", "10000")
            .parse()
            .map_err(|_| {
                RelayError::InvalidConfig("RELAY_SEND_TIMEOUT_MS must be a valid number".into())
            })?;

        let ws_path = get_env_or("RELAY_WS_PATH", variant.default_ws_path());
        if !ws_path.starts_with('/') {
            return Err(RelayError::InvalidConfig(
                "RELAY_WS_PATH must start with /".into(),
            ));
        }
        if ws_path == HEALTH_PATH || ws_path == STATUS_PATH {
            return Err(RelayError::InvalidConfig(format!(
                "RELAY_WS_PATH cannot be {}, it is already served",
                ws_path
            )));
        }

        let static_root = get_env_or("RELAY_STATIC_ROOT", variant.default_static_root());
        let static_root = static_root.trim();

        Ok(Config {
            server: ServerConfig {
                host: get_env_or("RELAY_HOST", "0.0.0.0"),
                port: get_env_or("RELAY_PORT", "8081").parse().map_err(|_| {
                    RelayError::InvalidConfig("RELAY_PORT must be a valid port number".into())
                })?,
                ws_path,
                static_root: (!static_root.is_empty()).then(|| PathBuf::from(static_root)),
                origin_policy: parse_origin_policy()?,
            },
            relay: RelayConfig {
                variant,
                delivery: DeliveryPolicy::from_echo(echo_sender),
                send_timeout: (send_timeout_ms > 0).then(|| Duration::from_millis(send_timeout_ms)),
            },
            log: LogConfig {
                level: get_env_or("LOG_LEVEL", "info"),
                format: get_env_or("LOG_FORMAT", "json"),
            },
        })
    }

    /// Get the server listen address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Broadcaster settings derived from the relay section
    pub fn broadcaster(&self) -> BroadcasterConfig {
        BroadcasterConfig {
            delivery: self.relay.delivery,
            send_timeout: self.relay.send_timeout,
        }
    }
}

fn parse_origin_policy() -> Result<OriginPolicy> {
    let origins: Vec<String> = get_env_or("RELAY_ALLOWED_ORIGINS", "")
        .split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let default_policy = if origins.is_empty() {
        "same_host"
    } else {
        "allow_list"
    };

    match get_env_or("RELAY_ORIGIN_POLICY", default_policy)
        .trim()
        .to_lowercase()
        .as_str()
    {
        "allow_all" | "any" => Ok(OriginPolicy::AllowAll),
        "same_host" | "same_origin" => Ok(OriginPolicy::SameHost),
        "allow_list" => {
            if origins.is_empty() {
                return Err(RelayError::InvalidConfig(
                    "RELAY_ORIGIN_POLICY=allow_list requires RELAY_ALLOWED_ORIGINS".into(),
                ));
            }
            for origin in &origins {
                url::Url::parse(origin).map_err(|e| {
                    RelayError::InvalidConfig(format!(
                        "RELAY_ALLOWED_ORIGINS entry {} is not a valid origin: {}",
                        origin, e
                    ))
                })?;
            }
            Ok(OriginPolicy::AllowList(origins))
        }
        other => Err(RelayError::InvalidConfig(format!(
            "RELAY_ORIGIN_POLICY has unsupported value: {}",
            other
        ))),
    }
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
