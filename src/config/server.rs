use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

pub const DEFAULT_SITE_TITLE: &str = "Curation Studio";
pub const PUBLIC_CHANNELS_CACHE_SECS: u64 = 30;
const SESSION_TTL_HOURS: i64 = 24 * 14;
const MAX_SESSION_TTL_HOURS: i64 = 24 * 366;
const MAX_PUBLIC_CHANNELS_CACHE_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Title rendered into every page.
    pub site_title: String,
    /// How long the public channel listing is served from cache.
    pub public_channels_cache_secs: u64,
    /// Lifetime of a browser session issued by `/accounts/login`.
    pub session_ttl_hours: i64,
}

impl ServerConfig {
    /// Reads a TOML file. Keys missing from the file keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config
            .validate()
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Ok(config)
    }

    /// Rejects durations that are non-positive or too large to add to a timestamp.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&self.session_ttl_hours) {
            return Err(format!(
                "session_ttl_hours must be between 1 and {MAX_SESSION_TTL_HOURS}, got {}",
                self.session_ttl_hours
            ));
        }
        if self.public_channels_cache_secs > MAX_PUBLIC_CHANNELS_CACHE_SECS {
            return Err(format!(
                "public_channels_cache_secs must be at most {MAX_PUBLIC_CHANNELS_CACHE_SECS}, got {}",
                self.public_channels_cache_secs
            ));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("curation.db")
    }

    #[must_use]
    pub fn admin_token_path(&self) -> PathBuf {
        self.data_dir.join(".admin_token")
    }

    #[must_use]
    pub fn public_channels_ttl(&self) -> Duration {
        Duration::from_secs(self.public_channels_cache_secs)
    }

    #[must_use]
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::try_hours(self.session_ttl_hours)
            .unwrap_or_else(|| chrono::Duration::hours(SESSION_TTL_HOURS))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            site_title: DEFAULT_SITE_TITLE.to_string(),
            public_channels_cache_secs: PUBLIC_CHANNELS_CACHE_SECS,
            session_ttl_hours: SESSION_TTL_HOURS,
        }
    }
}
