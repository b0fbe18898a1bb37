use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub currency: CurrencyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API token for the day-ahead price provider. Empty means no source is
    /// configured and the cache serves previously stored data only.
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrencyConfig {
    /// SEK per EUR, applied when deriving local per-kWh prices.
    #[serde(default = "default_eur_sek_rate")]
    pub eur_sek_rate: f64,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("price_data.db")
}

fn default_base_url() -> String {
    "https://web-api.tp.entsoe.eu".to_string()
}

fn default_http_timeout() -> u64 {
    30
}

fn default_eur_sek_rate() -> f64 {
    11.5
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: String::new(),
            http_timeout_seconds: default_http_timeout(),
        }
    }
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            eur_sek_rate: default_eur_sek_rate(),
        }
    }
}

impl SourceConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    /// Whether credentials are present. Without them the cache runs in
    /// cache-only mode.
    pub fn has_credentials(&self) -> bool {
        !self.token.trim().is_empty()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("ELWATT__").split("__"));
        Ok(figment.extract()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_config_file() {
        let cfg: Config = Figment::new().extract().unwrap();
        assert_eq!(cfg.store.path, PathBuf::from("price_data.db"));
        assert_eq!(cfg.currency.eur_sek_rate, 11.5);
        assert!(!cfg.source.has_credentials());
        assert_eq!(cfg.source.http_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn token_with_whitespace_only_counts_as_absent() {
        let cfg = SourceConfig {
            token: "   ".into(),
            ..SourceConfig::default()
        };
        assert!(!cfg.has_credentials());
    }
}
