//! Resolved settings for the persistence layer.
//!
//! The layer never parses configuration files itself; the host resolves
//! its own config format and hands over a [`StoreConfig`]. The structs
//! here derive [`serde::Deserialize`] with per-field defaults so hosts
//! can embed them directly in their own config files, mirroring how the
//! rest of the stack defines typed config sections.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Default maximum pool size for the client/server dialect.
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default minimum (eagerly held) pool size for the client/server dialect.
const DEFAULT_MIN_CONNECTIONS: u32 = 2;

/// Default maximum pool size for the embedded dialect.
///
/// WAL mode allows one writer and many readers; a small pool is enough
/// and keeps writer contention low.
const DEFAULT_EMBEDDED_MAX_CONNECTIONS: u32 = 4;

/// Default connection acquire timeout in seconds.
///
/// Doubles as a leak guard: a connection held past this while others
/// wait surfaces as a pool timeout rather than a silent hang.
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Default idle timeout in seconds before a pooled connection is closed.
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;

/// Default busy timeout for the embedded store in milliseconds.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Default page-cache size for the embedded store in KiB.
const DEFAULT_CACHE_SIZE_KIB: u64 = 2_048;

/// Which backing store dialect the layer runs against.
///
/// Everything outside the builders and the provider is dialect-blind;
/// this enum exists only so those three components can render the right
/// SQL and connection handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Single-file embedded store (SQLite).
    Embedded,
    /// Client/server relational store (MySQL).
    Server,
}

/// Resolved settings for the persistence layer, one variant per dialect.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "dialect", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Settings for the embedded single-file store.
    Embedded(EmbeddedConfig),
    /// Settings for the client/server store.
    Server(ServerConfig),
}

impl StoreConfig {
    /// The dialect this configuration selects.
    pub const fn dialect(&self) -> Dialect {
        match self {
            Self::Embedded(_) => Dialect::Embedded,
            Self::Server(_) => Dialect::Server,
        }
    }
}

/// Settings for the embedded single-file store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmbeddedConfig {
    /// Path of the store file. Parent directories are created on first
    /// construction; nothing else ever touches the physical file.
    pub path: PathBuf,

    /// Whether to enable write-ahead logging.
    #[serde(default = "default_true")]
    pub wal: bool,

    /// How long a statement waits on a locked store before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Page-cache size in KiB, applied per connection.
    #[serde(default = "default_cache_size_kib")]
    pub cache_size_kib: u64,

    /// Maximum number of pooled connections.
    #[serde(default = "default_embedded_max_connections")]
    pub max_connections: u32,
}

impl EmbeddedConfig {
    /// Create settings for a store file at `path` with defaults.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            wal: true,
            busy_timeout_ms: default_busy_timeout_ms(),
            cache_size_kib: default_cache_size_kib(),
            max_connections: default_embedded_max_connections(),
        }
    }
}

/// Settings for the client/server store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Server hostname.
    pub host: String,

    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database (schema) name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Maximum number of pooled connections. The worker pool that runs
    /// blocking driver work is sized to this bound.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connections opened eagerly at construction and kept warm.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Seconds before an idle pooled connection is closed.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Seconds to wait for a free connection before reporting a
    /// transient pool timeout. Serves as the leak-detection threshold.
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

impl ServerConfig {
    /// Idle timeout as a [`Duration`].
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Acquire timeout as a [`Duration`].
    pub const fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

const fn default_true() -> bool {
    true
}

const fn default_port() -> u16 {
    3306
}

const fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

const fn default_min_connections() -> u32 {
    DEFAULT_MIN_CONNECTIONS
}

const fn default_embedded_max_connections() -> u32 {
    DEFAULT_EMBEDDED_MAX_CONNECTIONS
}

const fn default_idle_timeout_secs() -> u64 {
    DEFAULT_IDLE_TIMEOUT_SECS
}

const fn default_acquire_timeout_secs() -> u64 {
    DEFAULT_ACQUIRE_TIMEOUT_SECS
}

const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

const fn default_cache_size_kib() -> u64 {
    DEFAULT_CACHE_SIZE_KIB
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults() {
        let config = EmbeddedConfig::new("/tmp/lore.db");
        assert!(config.wal);
        assert_eq!(config.busy_timeout_ms, 5_000);
        assert_eq!(config.cache_size_kib, 2_048);
        assert_eq!(config.max_connections, 4);
    }

    #[test]
    fn deserialize_embedded_variant() {
        let json = r#"{"dialect": "embedded", "path": "/var/lib/lore/lore.db"}"#;
        let config: Option<StoreConfig> = serde_json::from_str(json).ok();
        assert_eq!(config.map(|c| c.dialect()), Some(Dialect::Embedded));
    }

    #[test]
    fn deserialize_server_variant_with_defaults() {
        let json = r#"{
            "dialect": "server",
            "host": "db.internal",
            "database": "lorevault",
            "user": "lore"
        }"#;
        let config: Option<StoreConfig> = serde_json::from_str(json).ok();
        let Some(StoreConfig::Server(server)) = config else {
            assert!(false, "expected server config");
            return;
        };
        assert_eq!(server.port, 3306);
        assert_eq!(server.max_connections, 10);
        assert_eq!(server.min_connections, 2);
        assert_eq!(server.acquire_timeout(), Duration::from_secs(10));
    }
}
