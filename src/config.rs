// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub countries_url: String,
    pub rates_url: String,
    pub database_url: String,
    pub cache_dir: PathBuf,
    pub output_dir: PathBuf,
    pub port: u16,
    pub fetch_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            countries_url:
                "https://restcountries.com/v2/all?fields=name,capital,region,population,flag,currencies"
                    .to_string(),
            rates_url: "https://open.er-api.com/v6/latest/USD".to_string(),
            database_url: "sqlite:countries.db".to_string(),
            cache_dir: PathBuf::from("cache"),
            output_dir: PathBuf::from("output"),
            port: 5000,
            fetch_timeout_secs: 15,
        }
    }
}

impl Config {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Location of the rendered summary chart.
    pub fn summary_path(&self) -> PathBuf {
        self.cache_dir.join("summary.png")
    }

    /// Environment variables win over whatever came from the file.
    fn apply_env(self) -> anyhow::Result<Self> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    fn apply_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        if let Some(url) = var("DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(port) = var("PORT") {
            self.port = port
                .parse()
                .with_context(|| format!("PORT must be a port number, got {:?}", port))?;
        }
        Ok(self)
    }
}

fn get_config_path() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("config.toml");
    path
}

pub fn load_config_from(path: &Path) -> anyhow::Result<Config> {
    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: Config = toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

/// Load `config.toml` (falling back to the built-in defaults when it does
/// not exist) and apply environment overrides. Call once at startup.
pub fn load_config() -> anyhow::Result<Config> {
    let path = get_config_path();
    let config = if path.exists() {
        load_config_from(&path)?
    } else {
        tracing::warn!("No config file at {}, using defaults", path.display());
        Config::default()
    };
    config.apply_env()
}
