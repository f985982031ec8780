use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Cache key used when none is configured.
pub const DEFAULT_CACHE_KEY: &str = "LOCALIZE_DEFAULT_LANGUAGE";

/// Where the chosen locale is remembered between sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheMechanism {
    None,
    KeyValueStore,
    Cookie,
}

impl CacheMechanism {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(CacheMechanism::None),
            "key-value" | "key-value-store" | "localstorage" => Ok(CacheMechanism::KeyValueStore),
            "cookie" => Ok(CacheMechanism::Cookie),
            other => bail!("Unknown cache mechanism: '{}'", other),
        }
    }
}

/// Localization settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Whether the default locale also gets a URL prefix
    pub always_set_prefix: bool,
    /// Whether a previously cached locale wins during detection
    pub use_cached_locale: bool,
    pub cache_mechanism: CacheMechanism,
    pub cache_key: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            always_set_prefix: true,
            use_cached_locale: true,
            cache_mechanism: CacheMechanism::KeyValueStore,
            cache_key: DEFAULT_CACHE_KEY.to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let defaults = Settings::default();

        Ok(Self {
            always_set_prefix: env_flag("LOCALIZE_ALWAYS_SET_PREFIX")?
                .unwrap_or(defaults.always_set_prefix),
            use_cached_locale: env_flag("LOCALIZE_USE_CACHED_LOCALE")?
                .unwrap_or(defaults.use_cached_locale),
            cache_mechanism: match std::env::var("LOCALIZE_CACHE_MECHANISM") {
                Ok(value) => CacheMechanism::parse(&value)
                    .context("LOCALIZE_CACHE_MECHANISM is invalid")?,
                Err(_) => defaults.cache_mechanism,
            },
            cache_key: std::env::var("LOCALIZE_CACHE_KEY").unwrap_or(defaults.cache_key),
        })
    }
}

/// Configuration of the command-line tool.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub settings: Settings,

    // Inputs
    pub routes_file: PathBuf,
    pub dictionary_dir: PathBuf,

    // Locales
    pub locales: Vec<String>,
    pub default_locale: String,

    // Environment
    pub storage_dir: Option<PathBuf>,
    pub initial_path: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let locales: Vec<String> = std::env::var("LOCALIZE_LOCALES")
            .unwrap_or_else(|_| "en".to_string())
            .split(',')
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty())
            .collect();

        let default_locale = std::env::var("LOCALIZE_DEFAULT_LOCALE")
            .ok()
            .or_else(|| locales.first().cloned())
            .unwrap_or_else(|| "en".to_string());

        Ok(Self {
            settings: Settings::from_env()?,
            routes_file: std::env::var("LOCALIZE_ROUTES_FILE")
                .context("LOCALIZE_ROUTES_FILE not set")?
                .into(),
            dictionary_dir: std::env::var("LOCALIZE_DICTIONARY_DIR")
                .unwrap_or_else(|_| "i18n".to_string())
                .into(),
            locales,
            default_locale,
            storage_dir: std::env::var("LOCALIZE_STORAGE_DIR").ok().map(PathBuf::from),
            initial_path: std::env::var("LOCALIZE_INITIAL_PATH").unwrap_or_else(|_| "/".to_string()),
        })
    }
}

fn env_flag(name: &str) -> Result<Option<bool>> {
    match std::env::var(name) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            other => bail!("{} must be a boolean, got '{}'", name, other),
        },
        Err(_) => Ok(None),
    }
}
