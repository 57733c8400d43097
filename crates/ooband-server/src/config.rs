// ============================================
// File: crates/ooband-server/src/config.rs
// ============================================
//! # Server Configuration
//!
//! ## Creation Reason
//! Loads and validates the TOML file that decides which listeners run,
//! which domain they answer for, and how long sessions and captured
//! interactions are kept.
//!
//! ## Configuration File Format
//! ```toml
//! [network]
//! domain = "oob.example.com"
//! listen_ip = "0.0.0.0"
//! public_ip = "203.0.113.10"
//! protocols = ["dns", "http", "smtp"]
//! dns_port = 53
//! http_port = 80
//! smtp_ports = [25, 587]
//!
//! [identifier]
//! variant = "extended"
//!
//! [limits]
//! max_sessions = 10000
//! session_timeout_secs = 86400
//! callback_timeout_ms = 500
//! max_callbacks_per_session = 32
//! max_smtp_message_bytes = 1048576
//! max_http_body_bytes = 1048576
//!
//! [storage]
//! interaction_ttl_secs = 86400
//! max_interactions_per_session = 1000
//! cleanup_interval_secs = 60
//!
//! [logging]
//! level = "info"
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Every section and field has a default; an empty file is valid
//! - `identifier.variant` must match what clients mint with

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use ooband_core::protocol::{IdentifierVariant, Protocol};

use crate::error::{Result, ServerError};

// ============================================
// ServerConfig
// ============================================

/// Complete server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listeners and addressing.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Identifier layout.
    #[serde(default)]
    pub identifier: IdentifierConfig,

    /// Resource limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Interaction retention.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns `ConfigLoad` if the file cannot be read or parsed, or
    /// `ConfigInvalid` if validation fails.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        info!(path = %path_str, "Loading configuration");

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ServerError::config_load(&path_str, e.to_string()))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ServerError::config_load(&path_str, e.to_string()))?;
        config.validate()?;

        info!(domain = %config.network.domain, "Configuration loaded");
        Ok(config)
    }

    /// Validates every section.
    ///
    /// # Errors
    /// Returns the first `ConfigInvalid` found.
    pub fn validate(&self) -> Result<()> {
        self.network.validate()?;
        self.limits.validate()?;
        self.storage.validate()?;
        Ok(())
    }

    /// Serializes configuration to a TOML string.
    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Label length listeners match on.
    #[must_use]
    pub const fn identifier_len(&self) -> usize {
        self.identifier.variant.identifier_len()
    }
}

impl FromStr for ServerConfig {
    type Err = ServerError;

    fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ServerError::config_load("<string>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

// ============================================
// NetworkConfig
// ============================================

/// Listener addressing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Domain the server is authoritative for; planted hosts are `<id>.<domain>`.
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Address all listeners bind to.
    #[serde(default = "default_listen_ip")]
    pub listen_ip: IpAddr,

    /// Address returned in DNS `A` answers.
    #[serde(default = "default_public_ip")]
    pub public_ip: Ipv4Addr,

    /// Listeners to start.
    #[serde(default = "default_protocols")]
    pub protocols: Vec<Protocol>,

    /// DNS (UDP) port.
    #[serde(default = "default_dns_port")]
    pub dns_port: u16,

    /// HTTP port; also serves the client API.
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// SMTP ports.
    #[serde(default = "default_smtp_ports")]
    pub smtp_ports: Vec<u16>,
}

fn default_domain() -> String {
    "oob.localhost".to_string()
}

fn default_listen_ip() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_public_ip() -> Ipv4Addr {
    Ipv4Addr::LOCALHOST
}

fn default_protocols() -> Vec<Protocol> {
    vec![Protocol::Dns, Protocol::Http, Protocol::Smtp]
}

fn default_dns_port() -> u16 {
    53
}

fn default_http_port() -> u16 {
    80
}

fn default_smtp_ports() -> Vec<u16> {
    vec![25, 587]
}

impl NetworkConfig {
    fn validate(&self) -> Result<()> {
        let domain = self.domain.trim_matches('.');
        if domain.is_empty() {
            return Err(ServerError::config_invalid(
                "network.domain",
                "cannot be empty",
            ));
        }
        if domain.split('.').any(|label| label.is_empty() || label.len() > 63) {
            return Err(ServerError::config_invalid(
                "network.domain",
                "labels must be 1-63 characters",
            ));
        }

        if self.protocols.contains(&Protocol::Smtp) && self.smtp_ports.is_empty() {
            return Err(ServerError::config_invalid(
                "network.smtp_ports",
                "smtp is enabled but no ports are listed",
            ));
        }

        Ok(())
    }

    /// Returns `true` if `protocol` should be served.
    #[must_use]
    pub fn is_enabled(&self, protocol: Protocol) -> bool {
        self.protocols.contains(&protocol)
    }

    /// Lowercased domain without surrounding dots.
    #[must_use]
    pub fn normalized_domain(&self) -> String {
        self.domain.trim_matches('.').to_ascii_lowercase()
    }

    /// DNS bind address.
    #[must_use]
    pub const fn dns_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_ip, self.dns_port)
    }

    /// HTTP bind address.
    #[must_use]
    pub const fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_ip, self.http_port)
    }

    /// SMTP bind addresses.
    #[must_use]
    pub fn smtp_addrs(&self) -> Vec<SocketAddr> {
        self.smtp_ports
            .iter()
            .map(|&port| SocketAddr::new(self.listen_ip, port))
            .collect()
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            listen_ip: default_listen_ip(),
            public_ip: default_public_ip(),
            protocols: default_protocols(),
            dns_port: default_dns_port(),
            http_port: default_http_port(),
            smtp_ports: default_smtp_ports(),
        }
    }
}

// ============================================
// IdentifierConfig
// ============================================

/// Identifier layout shared with clients.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentifierConfig {
    /// `compact` (32 chars) or `extended` (33 chars).
    #[serde(default)]
    pub variant: IdentifierVariant,
}

// ============================================
// LimitsConfig
// ============================================

/// Resource limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum registered sessions.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Idle time after which a non-persistent session is dropped.
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,

    /// Budget for one predicate or action evaluation.
    #[serde(default = "default_callback_timeout_ms")]
    pub callback_timeout_ms: u64,

    /// Maximum callbacks one session may hold.
    #[serde(default = "default_max_callbacks_per_session")]
    pub max_callbacks_per_session: usize,

    /// Largest SMTP `DATA` section accepted.
    #[serde(default = "default_max_smtp_message_bytes")]
    pub max_smtp_message_bytes: usize,

    /// Largest HTTP request body read from a captured request.
    #[serde(default = "default_max_http_body_bytes")]
    pub max_http_body_bytes: usize,
}

fn default_max_sessions() -> usize {
    10_000
}

fn default_session_timeout_secs() -> u64 {
    86_400
}

fn default_callback_timeout_ms() -> u64 {
    500
}

fn default_max_callbacks_per_session() -> usize {
    32
}

fn default_max_smtp_message_bytes() -> usize {
    1024 * 1024
}

fn default_max_http_body_bytes() -> usize {
    1024 * 1024
}

impl LimitsConfig {
    fn validate(&self) -> Result<()> {
        if self.max_sessions == 0 {
            return Err(ServerError::config_invalid(
                "limits.max_sessions",
                "must be greater than 0",
            ));
        }
        if self.session_timeout_secs == 0 {
            return Err(ServerError::config_invalid(
                "limits.session_timeout_secs",
                "must be greater than 0",
            ));
        }
        if self.callback_timeout_ms == 0 {
            return Err(ServerError::config_invalid(
                "limits.callback_timeout_ms",
                "must be greater than 0",
            ));
        }
        if self.max_smtp_message_bytes < 1024 {
            return Err(ServerError::config_invalid(
                "limits.max_smtp_message_bytes",
                "must be at least 1024",
            ));
        }
        Ok(())
    }

    /// Session idle timeout.
    #[must_use]
    pub const fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    /// Callback evaluation budget.
    #[must_use]
    pub const fn callback_timeout(&self) -> Duration {
        Duration::from_millis(self.callback_timeout_ms)
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            session_timeout_secs: default_session_timeout_secs(),
            callback_timeout_ms: default_callback_timeout_ms(),
            max_callbacks_per_session: default_max_callbacks_per_session(),
            max_smtp_message_bytes: default_max_smtp_message_bytes(),
            max_http_body_bytes: default_max_http_body_bytes(),
        }
    }
}

// ============================================
// StorageConfig
// ============================================

/// Retention of captured interactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Age after which a stored interaction is dropped.
    #[serde(default = "default_interaction_ttl_secs")]
    pub interaction_ttl_secs: u64,

    /// Per-session cap; the oldest interaction is evicted first.
    #[serde(default = "default_max_interactions_per_session")]
    pub max_interactions_per_session: usize,

    /// Period of the expiry task.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

fn default_interaction_ttl_secs() -> u64 {
    86_400
}

fn default_max_interactions_per_session() -> usize {
    1000
}

fn default_cleanup_interval_secs() -> u64 {
    60
}

impl StorageConfig {
    fn validate(&self) -> Result<()> {
        if self.max_interactions_per_session == 0 {
            return Err(ServerError::config_invalid(
                "storage.max_interactions_per_session",
                "must be greater than 0",
            ));
        }
        if self.cleanup_interval_secs == 0 {
            return Err(ServerError::config_invalid(
                "storage.cleanup_interval_secs",
                "must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Interaction time-to-live.
    #[must_use]
    pub const fn interaction_ttl(&self) -> Duration {
        Duration::from_secs(self.interaction_ttl_secs)
    }

    /// Expiry task period.
    #[must_use]
    pub const fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            interaction_ttl_secs: default_interaction_ttl_secs(),
            max_interactions_per_session: default_max_interactions_per_session(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

// ============================================
// LoggingConfig
// ============================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.identifier_len(), 33);
        assert_eq!(config.network.smtp_ports, vec![25, 587]);
    }

    #[test]
    fn test_empty_file_is_valid() {
        let config = ServerConfig::from_str("").unwrap();
        assert_eq!(config.network.domain, "oob.localhost");
        assert!(config.network.is_enabled(Protocol::Dns));
    }

    #[test]
    fn test_full_config_format() {
        let toml = r#"
            [network]
            domain = "OOB.Example.com."
            listen_ip = "127.0.0.1"
            public_ip = "203.0.113.10"
            protocols = ["smtp", "http"]
            http_port = 8080
            smtp_ports = [2525]

            [identifier]
            variant = "compact"

            [limits]
            max_sessions = 50
            callback_timeout_ms = 250

            [storage]
            max_interactions_per_session = 10

            [logging]
            level = "debug"
        "#;

        let config = ServerConfig::from_str(toml).unwrap();
        assert_eq!(config.network.normalized_domain(), "oob.example.com");
        assert_eq!(config.network.public_ip, Ipv4Addr::new(203, 0, 113, 10));
        assert!(!config.network.is_enabled(Protocol::Dns));
        assert_eq!(config.network.http_addr().port(), 8080);
        assert_eq!(config.network.smtp_addrs().len(), 1);
        assert_eq!(config.identifier_len(), 32);
        assert_eq!(config.limits.callback_timeout(), Duration::from_millis(250));
        assert_eq!(config.storage.max_interactions_per_session, 10);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_validation_failures() {
        let empty_domain = "[network]\ndomain = \"\"";
        assert!(ServerConfig::from_str(empty_domain)
            .unwrap_err()
            .is_config_error());

        let no_smtp_ports = "[network]\nsmtp_ports = []";
        assert!(ServerConfig::from_str(no_smtp_ports).is_err());

        let smtp_disabled = "[network]\nprotocols = [\"dns\"]\nsmtp_ports = []";
        assert!(ServerConfig::from_str(smtp_disabled).is_ok());

        let zero_sessions = "[limits]\nmax_sessions = 0";
        assert!(ServerConfig::from_str(zero_sessions).is_err());
    }

    #[test]
    fn test_toml_roundtrip_through_defaults() {
        let rendered = ServerConfig::default().to_toml();
        let parsed = ServerConfig::from_str(&rendered).unwrap();
        assert_eq!(parsed.network.domain, "oob.localhost");
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[network]\ndomain = \"oob-config.test\"").unwrap();

        let config = ServerConfig::load(file.path()).await.unwrap();
        assert_eq!(config.network.domain, "oob-config.test");

        let missing = ServerConfig::load("/nonexistent/ooband.toml").await;
        assert!(matches!(missing, Err(ServerError::ConfigLoad { .. })));
    }
}
