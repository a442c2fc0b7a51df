//! Configuration management for aliddns.

use crate::error::{DdnsError, Result};
use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variables consulted for the access key id, in order.
pub const ACCESS_KEY_ID_VARS: [&str; 2] = ["AKID", "AccessKeyID"];

/// Environment variables consulted for the access key secret, in order.
pub const ACCESS_KEY_SECRET_VARS: [&str; 2] = ["AKSCT", "AccessKeySecret"];

/// Optional on-disk configuration. Every field can also come from flags or env.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub access_key_id: Option<String>,

    #[serde(default)]
    pub access_key_secret: Option<String>,

    /// Replacement list of IP echo services.
    #[serde(default)]
    pub ip_apis: Vec<String>,

    /// Replacement list of DNS upstreams (`ip:port`).
    #[serde(default)]
    pub dns_upstreams: Vec<SocketAddr>,

    /// Per-request timeout in seconds (default: 5).
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Get the default config file path.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| DdnsError::Config("Could not find config directory".to_string()))?;

        Ok(config_dir.join("aliddns").join("config.toml"))
    }

    /// Load configuration from a specific path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(5))
    }
}

/// Locate the config file: explicit path, else the first existing default.
pub fn config_path(cli_path: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli_path {
        return path;
    }

    let candidates = [
        dirs::config_dir().map(|p| p.join("aliddns/config.toml")),
        Some(PathBuf::from("/etc/aliddns/config.toml")),
        Some(PathBuf::from("config.toml")),
    ];

    for candidate in candidates.into_iter().flatten() {
        if candidate.exists() {
            return candidate;
        }
    }

    // Return default even if it doesn't exist
    Config::default_path().unwrap_or_else(|_| PathBuf::from("config.toml"))
}

/// Alibaba Cloud AccessKey pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub id: String,
    pub secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("id", &self.id)
            .field("secret", &"********")
            .finish()
    }
}

impl Credentials {
    /// Resolve credentials: flag, then environment, then config file.
    pub fn resolve(
        flag_id: Option<&str>,
        flag_secret: Option<&str>,
        config: &Config,
    ) -> Result<Self> {
        Self::resolve_with(flag_id, flag_secret, config, |var| std::env::var(var).ok())
    }

    fn resolve_with<F>(
        flag_id: Option<&str>,
        flag_secret: Option<&str>,
        config: &Config,
        env: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |flag: Option<&str>, vars: &[&str], file: Option<&String>| {
            flag.map(str::to_string)
                .into_iter()
                .chain(vars.iter().filter_map(|var| env(var)))
                .chain(file.cloned())
                .find(|value| !value.trim().is_empty())
        };

        let id = pick(flag_id, &ACCESS_KEY_ID_VARS, config.access_key_id.as_ref());
        let secret = pick(
            flag_secret,
            &ACCESS_KEY_SECRET_VARS,
            config.access_key_secret.as_ref(),
        );

        match (id, secret) {
            (Some(id), Some(secret)) => Ok(Self { id, secret }),
            _ => Err(DdnsError::Config("access-key is empty".to_string())),
        }
    }
}

/// Normalise user-supplied IP echo endpoints.
///
/// Entries without an http(s) scheme get `http://`; anything that then fails
/// to parse as an absolute URL with a host is dropped.
pub fn normalize_ip_apis<I, S>(entries: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .filter_map(|entry| {
            let entry = entry.as_ref().trim();
            let candidate = if entry.starts_with("http://") || entry.starts_with("https://") {
                entry.to_string()
            } else {
                format!("http://{}", entry)
            };

            match url::Url::parse(&candidate) {
                Ok(url) if url.has_host() && !entry.is_empty() => Some(candidate),
                _ => {
                    tracing::debug!("Dropping invalid IP API {:?}", entry);
                    None
                }
            }
        })
        .collect()
}
