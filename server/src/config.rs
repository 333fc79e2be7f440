//! Node configuration.
//!
//! Loaded from a TOML file; every section has defaults so an empty file
//! (or no file at all) yields a working single-node configuration.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Node configuration loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Listen and advertise addresses
    #[serde(default)]
    pub node: NodeConfig,

    /// Cache group configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Peer RPC configuration
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Membership (announce / heartbeat / prune) configuration
    #[serde(default)]
    pub membership: MembershipConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listen and advertise addresses.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    /// Address the admin/API server listens on
    #[serde(default = "default_api_addr")]
    pub api_addr: SocketAddr,

    /// Address the peer RPC server listens on
    #[serde(default = "default_groupcache_addr")]
    pub groupcache_addr: SocketAddr,

    /// Base URL peers use to reach the admin server. Defaults to
    /// `http://{api_addr}`; set it when the node is behind NAT or
    /// listening on a wildcard address.
    pub advertise_api_addr: Option<String>,

    /// Base URL peers use to reach the peer RPC server. Defaults to
    /// `http://{groupcache_addr}`.
    pub advertise_groupcache_addr: Option<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            api_addr: default_api_addr(),
            groupcache_addr: default_groupcache_addr(),
            advertise_api_addr: None,
            advertise_groupcache_addr: None,
        }
    }
}

/// Cache group configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Name of the cache group this node serves
    #[serde(default = "default_group_name")]
    pub group: String,

    /// Combined byte budget for the main and hot segments
    /// (e.g., "64MB", "1GB")
    #[serde(default = "default_cache_bytes", deserialize_with = "deserialize_size")]
    pub cache_bytes: u64,

    /// Probability of mirroring a peer-fetched value into the hot segment
    #[serde(default = "default_hot_sample_rate")]
    pub hot_sample_rate: f64,

    /// Evict hot first while `hot > main / ratio`
    #[serde(default = "default_hot_cap_ratio")]
    pub hot_cap_ratio: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            group: default_group_name(),
            cache_bytes: default_cache_bytes(),
            hot_sample_rate: default_hot_sample_rate(),
            hot_cap_ratio: default_hot_cap_ratio(),
        }
    }
}

/// Peer RPC configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpcConfig {
    /// URL prefix the peer RPC is mounted under
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Virtual nodes per peer on the consistent-hash ring
    #[serde(default = "default_replicas")]
    pub replicas: usize,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            replicas: default_replicas(),
        }
    }
}

/// Membership configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MembershipConfig {
    /// Admin base URLs of the initial contact points
    #[serde(default)]
    pub initial_peers: Vec<String>,

    /// Seconds a peer may stay silent before it is pruned
    #[serde(default = "default_peer_timeout_secs")]
    pub peer_timeout_secs: u64,

    /// Seconds between announces to the initial peers
    #[serde(default = "default_announce_interval_secs")]
    pub announce_interval_secs: u64,

    /// Seconds between heartbeats to known peers
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            initial_peers: Vec::new(),
            peer_timeout_secs: default_peer_timeout_secs(),
            announce_interval_secs: default_announce_interval_secs(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
        }
    }
}

impl MembershipConfig {
    pub fn peer_timeout(&self) -> Duration {
        Duration::from_secs(self.peer_timeout_secs)
    }

    pub fn announce_interval(&self) -> Duration {
        Duration::from_secs(self.announce_interval_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "server=debug,info")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,

    /// Include timestamps in output
    #[serde(default = "default_true")]
    pub timestamps: bool,

    /// Include the event's target module in output
    #[serde(default)]
    pub target: bool,

    /// Include thread names in output
    #[serde(default)]
    pub thread_names: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            timestamps: true,
            target: false,
            thread_names: false,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, colored output
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
    /// Single-line human-readable output
    Compact,
}

// Default value functions

fn default_api_addr() -> SocketAddr {
    "0.0.0.0:8080".parse().expect("static address")
}

fn default_groupcache_addr() -> SocketAddr {
    "0.0.0.0:8081".parse().expect("static address")
}

fn default_group_name() -> String {
    "default".to_string()
}

fn default_cache_bytes() -> u64 {
    64 * 1024 * 1024 // 64MB
}

fn default_hot_sample_rate() -> f64 {
    0.1
}

fn default_hot_cap_ratio() -> u64 {
    8
}

fn default_base_path() -> String {
    "/_groupcache/".to_string()
}

fn default_replicas() -> usize {
    50
}

fn default_peer_timeout_secs() -> u64 {
    15
}

fn default_announce_interval_secs() -> u64 {
    30
}

fn default_heartbeat_interval_secs() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// Deserialize a size string like "64MB" or "1GB" into bytes.
fn deserialize_size<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SizeValue {
        Number(u64),
        String(String),
    }

    match SizeValue::deserialize(deserializer)? {
        SizeValue::Number(n) => Ok(n),
        SizeValue::String(s) => parse_size(&s).map_err(D::Error::custom),
    }
}

/// Parse a size string like "64MB", "4GB" into bytes.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty size string".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| c.is_alphabetic()) {
        Some(idx) => (&s[..idx], s[idx..].to_uppercase()),
        None => (s, String::new()),
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("invalid number: {}", num_str))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "K" | "KB" | "KIB" => 1024,
        "M" | "MB" | "MIB" => 1024 * 1024,
        "G" | "GB" | "GIB" => 1024 * 1024 * 1024,
        "T" | "TB" | "TIB" => 1024 * 1024 * 1024 * 1024,
        _ => return Err(format!("unknown size suffix: {}", suffix)),
    };

    num.checked_mul(multiplier)
        .ok_or_else(|| "size overflow".to_string())
}

/// Format a size in bytes as a human-readable string.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB && bytes.is_multiple_of(GB) {
        format!("{} GB", bytes / GB)
    } else if bytes >= MB && bytes.is_multiple_of(MB) {
        format!("{} MB", bytes / MB)
    } else if bytes >= KB && bytes.is_multiple_of(KB) {
        format!("{} KB", bytes / KB)
    } else {
        format!("{} bytes", bytes)
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.cache.group.is_empty() {
            return Err("cache.group must not be empty".into());
        }

        if !(0.0..=1.0).contains(&self.cache.hot_sample_rate) {
            return Err(format!(
                "cache.hot_sample_rate must be within [0, 1], got {}",
                self.cache.hot_sample_rate
            )
            .into());
        }

        if self.cache.hot_cap_ratio == 0 {
            return Err("cache.hot_cap_ratio must be at least 1".into());
        }

        if !self.rpc.base_path.starts_with('/') || !self.rpc.base_path.ends_with('/') {
            return Err(format!(
                "rpc.base_path must start and end with '/', got {:?}",
                self.rpc.base_path
            )
            .into());
        }

        if self.rpc.replicas == 0 {
            return Err("rpc.replicas must be at least 1".into());
        }

        if self.membership.peer_timeout_secs == 0 {
            return Err("membership.peer_timeout_secs must be at least 1".into());
        }

        for peer in &self.membership.initial_peers {
            if !peer.starts_with("http://") && !peer.starts_with("https://") {
                return Err(format!("initial peer {peer:?} is not a base URL").into());
            }
        }

        Ok(())
    }

    /// The base URL other peers use to reach this node's admin server.
    pub fn advertise_api_addr(&self) -> String {
        self.node
            .advertise_api_addr
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.node.api_addr))
    }

    /// The base URL other peers use to reach this node's peer RPC server.
    pub fn advertise_groupcache_addr(&self) -> String {
        self.node
            .advertise_groupcache_addr
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.node.groupcache_addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1024").unwrap(), 1024);
        assert_eq!(parse_size("1K").unwrap(), 1024);
        assert_eq!(parse_size("64MB").unwrap(), 64 * 1024 * 1024);
        assert_eq!(parse_size("4GB").unwrap(), 4 * 1024 * 1024 * 1024);
        assert!(parse_size("").is_err());
        assert!(parse_size("12XB").is_err());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        config.validate().unwrap();
        assert_eq!(config.cache.group, "default");
        assert_eq!(config.cache.cache_bytes, 64 * 1024 * 1024);
        assert_eq!(config.rpc.base_path, "/_groupcache/");
        assert_eq!(config.rpc.replicas, 50);
        assert_eq!(config.membership.peer_timeout_secs, 15);
        assert_eq!(config.membership.announce_interval_secs, 30);
        assert_eq!(config.membership.heartbeat_interval_secs, 5);
    }

    #[test]
    fn test_size_strings() {
        let config: Config = toml::from_str(
            r#"
            [cache]
            cache_bytes = "1MB"
            "#,
        )
        .unwrap();
        assert_eq!(config.cache.cache_bytes, 1024 * 1024);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<Config, _> = toml::from_str("[cache]\nbogus = 1\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_rejects_bad_base_path() {
        let config: Config = toml::from_str(
            r#"
            [rpc]
            base_path = "nope"
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_sample_rate() {
        let config: Config = toml::from_str(
            r#"
            [cache]
            hot_sample_rate = 1.5
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_advertise_defaults_follow_listen_addrs() {
        let config: Config = toml::from_str(
            r#"
            [node]
            api_addr = "127.0.0.1:9000"
            groupcache_addr = "127.0.0.1:9001"
            "#,
        )
        .unwrap();
        assert_eq!(config.advertise_api_addr(), "http://127.0.0.1:9000");
        assert_eq!(config.advertise_groupcache_addr(), "http://127.0.0.1:9001");
    }
}
