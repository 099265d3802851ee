use crate::core::currency::Currency;
use crate::core::rates::FailurePolicy;
use crate::core::session::SessionOptions;
use crate::providers::uphold;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UpholdProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WalletProviderConfig {
    pub rpc_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub uphold: Option<UpholdProviderConfig>,
    pub wallet: Option<WalletProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            uphold: Some(UpholdProviderConfig {
                base_url: uphold::DEFAULT_BASE_URL.to_string(),
            }),
            wallet: None,
        }
    }
}

fn default_amount() -> String {
    "1.00".to_string()
}

fn default_base_currency() -> Currency {
    Currency::Usd
}

fn default_debounce_ms() -> u64 {
    300
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default = "default_base_currency")]
    pub base_currency: Currency,
    #[serde(default = "default_amount")]
    pub amount: String,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            providers: ProvidersConfig::default(),
            base_currency: default_base_currency(),
            amount: default_amount(),
            debounce_ms: default_debounce_ms(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl AppConfig {
    /// Loads the default config file, falling back to built-in defaults when
    /// it does not exist yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "fxview", "fxview")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn uphold_base_url(&self) -> &str {
        self.providers
            .uphold
            .as_ref()
            .map_or(uphold::DEFAULT_BASE_URL, |p| &p.base_url)
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            amount: self.amount.clone(),
            base: self.base_currency,
            debounce: Duration::from_millis(self.debounce_ms),
            failure_policy: self.failure_policy,
        }
    }
}
