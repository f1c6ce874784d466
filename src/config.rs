use crate::i18n::Locale;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    pub rates: RatesConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatesConfig {
    pub primary_url: String,  // queried with ?base=..&symbols=..
    pub fallback_url: String, // queried as-is
    pub base: String,
    pub timeout_secs: u64,
    /// When false, whichever fetch finishes last wins even if it was started first.
    pub discard_stale_results: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub locale: Locale,
    pub width: i32,
    pub height: i32,
    pub fetch_on_startup: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            rates: RatesConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            primary_url: "https://api.fixer.io/latest".to_string(),
            fallback_url: "https://api.exchangerate-api.com/v4/latest/USD".to_string(),
            base: "USD".to_string(),
            timeout_secs: 10,
            discard_stale_results: true,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            width: 380,
            height: 500,
            fetch_on_startup: true,
        }
    }
}

impl RatesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Config {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calc_fx")
            .join("config.toml")
    }

    /// Reads the user's config file. A missing file is not an error and is not created.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.rates.base, "USD");
        assert!(config.rates.discard_stale_results);
        assert_eq!(config.ui.locale, Locale::ZhTw);
        assert_eq!(config.ui.width, 380);
        assert!(config.ui.fetch_on_startup);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = Config::parse(
            r#"
            log_level = "debug"

            [rates]
            fallback_url = "https://open.er-api.com/v6/latest/USD"
            discard_stale_results = false

            [ui]
            locale = "en"
            "#,
        )
        .unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.rates.fallback_url, "https://open.er-api.com/v6/latest/USD");
        assert_eq!(config.rates.primary_url, "https://api.fixer.io/latest");
        assert!(!config.rates.discard_stale_results);
        assert_eq!(config.ui.locale, Locale::En);
        assert_eq!(config.ui.height, 500);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        assert!(Config::parse("[rates\nbase = ").is_err());
        assert!(Config::parse("[ui]\nlocale = \"fr\"").is_err());
    }

    #[test]
    fn test_missing_file_is_default_and_not_created() {
        let path = std::env::temp_dir()
            .join(format!("calc_fx-missing-{}", std::process::id()))
            .join("config.toml");
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.rates.timeout_secs, 10);
        assert!(!path.exists());
    }

    #[test]
    fn test_timeout_never_zero() {
        let rates = RatesConfig {
            timeout_secs: 0,
            ..RatesConfig::default()
        };
        assert_eq!(rates.timeout(), Duration::from_secs(1));
    }
}
