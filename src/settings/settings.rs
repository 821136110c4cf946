use anyhow::{Result, anyhow, bail};
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub http: Http,
    pub log: Log,
    pub jwt: Jwt,
    #[serde(default)]
    pub cache: CacheSettings,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Deserialize)]
pub struct Jwt {
    pub secret: String,
    #[serde(default = "default_audience")]
    pub audience: String,
    #[serde(default = "default_access_ttl_secs")]
    pub access_ttl_secs: u64,
    /// 0 keeps refresh tokens until used or evicted.
    #[serde(default)]
    pub refresh_ttl_secs: u64,
}

impl std::fmt::Debug for Jwt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Jwt")
            .field("secret", &"<redacted>")
            .field("audience", &self.audience)
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_capacity_bytes")]
    pub capacity_bytes: usize,
    /// 0 disables the stats task.
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            capacity_bytes: default_capacity_bytes(),
            stats_interval_secs: default_stats_interval_secs(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub backend: String, // "memory" or "rest"
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub seed: Vec<SeedUser>,
}

#[derive(Deserialize)]
pub struct SeedUser {
    pub uuid: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for SeedUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedUser")
            .field("uuid", &self.uuid)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

fn default_audience() -> String {
    "users".to_string()
}

const MAX_ACCESS_TTL_SECS: u64 = 365 * 24 * 60 * 60;

fn default_access_ttl_secs() -> u64 {
    60 * 60
}

fn default_capacity_bytes() -> usize {
    100 * 1024 * 1024
}

fn default_stats_interval_secs() -> u64 {
    60
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.jwt.secret.is_empty() {
            bail!("jwt.secret must not be empty");
        }
        if self.jwt.access_ttl_secs == 0 {
            bail!("jwt.access_ttl_secs must be positive");
        }
        if self.jwt.access_ttl_secs > MAX_ACCESS_TTL_SECS {
            bail!("jwt.access_ttl_secs must not exceed {MAX_ACCESS_TTL_SECS}");
        }
        if self.cache.capacity_bytes == 0 {
            bail!("cache.capacity_bytes must be positive");
        }
        match self.user.backend.as_str() {
            "memory" => {}
            "rest" => {
                if self.user.url.as_deref().is_none_or(|u| u.trim().is_empty()) {
                    bail!("user.url is required for the rest backend");
                }
            }
            other => bail!("unknown user backend: {other:?}"),
        }
        Ok(())
    }
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

const ENV_PREFIX: &str = "APP";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    settings.validate()?;
    Ok(settings)
}
