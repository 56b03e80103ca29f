//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.flockbook.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".flockbook.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Calendar settings.
    #[serde(default)]
    pub calendar: CalendarConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// SMS provider settings.
    #[serde(default)]
    pub sms: SmsConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Data file or directory of JSON files.
    #[serde(default = "default_data_path")]
    pub data_path: String,

    /// Preferences store file.
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            store_path: default_store_path(),
            verbose: false,
        }
    }
}

fn default_data_path() -> String {
    "flockbook.json".to_string()
}

fn default_store_path() -> String {
    ".flockbook-store.json".to_string()
}

/// Calendar settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Months of upcoming events listed by default.
    #[serde(default = "default_lookahead_months")]
    pub lookahead_months: u32,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            lookahead_months: default_lookahead_months(),
        }
    }
}

fn default_lookahead_months() -> u32 {
    3
}

/// Dashboard report settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Period used when neither the CLI nor stored preferences choose one.
    #[serde(default = "default_period")]
    pub default_period: String,

    /// Months on the attendance chart.
    #[serde(default = "default_trailing_months")]
    pub trailing_months: u32,

    /// Months on the giving chart.
    #[serde(default = "default_giving_months")]
    pub giving_months: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_period: default_period(),
            trailing_months: default_trailing_months(),
            giving_months: default_giving_months(),
        }
    }
}

fn default_period() -> String {
    "30d".to_string()
}

fn default_trailing_months() -> u32 {
    6
}

fn default_giving_months() -> u32 {
    12
}

/// SMS provider settings.
///
/// Credentials left empty are read from `TWILIO_ACCOUNT_SID`,
/// `TWILIO_AUTH_TOKEN` and `TWILIO_PHONE_NUMBER`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    #[serde(default = "default_sms_base_url")]
    pub base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_sid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_number: Option<String>,

    /// Delay between bulk messages in milliseconds.
    #[serde(default = "default_bulk_delay_ms")]
    pub bulk_delay_ms: u64,

    /// Request timeout in seconds.
    #[serde(default = "default_sms_timeout")]
    pub timeout_seconds: u64,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            base_url: default_sms_base_url(),
            account_sid: None,
            auth_token: None,
            from_number: None,
            bulk_delay_ms: default_bulk_delay_ms(),
            timeout_seconds: default_sms_timeout(),
        }
    }
}

fn default_sms_base_url() -> String {
    "https://api.twilio.com/2010-04-01".to_string()
}

fn default_bulk_delay_ms() -> u64 {
    100
}

fn default_sms_timeout() -> u64 {
    30
}

impl SmsConfig {
    /// Fill unset credentials from the environment.
    pub fn with_env(mut self) -> Self {
        fn env(name: &str) -> Option<String> {
            std::env::var(name).ok().filter(|v| !v.trim().is_empty())
        }

        if self.account_sid.is_none() {
            self.account_sid = env("TWILIO_ACCOUNT_SID");
        }
        if self.auth_token.is_none() {
            self.auth_token = env("TWILIO_AUTH_TOKEN");
        }
        if self.from_number.is_none() {
            self.from_number = env("TWILIO_PHONE_NUMBER");
        }
        self
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref data) = args.data {
            self.general.data_path = data.display().to_string();
        }
        if let Some(ref store) = args.store {
            self.general.store_path = store.display().to_string();
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.data_path, "flockbook.json");
        assert_eq!(config.calendar.lookahead_months, 3);
        assert_eq!(config.report.default_period, "30d");
        assert_eq!(config.sms.bulk_delay_ms, 100);
        assert!(config.sms.account_sid.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
data_path = "data/"
verbose = true

[report]
default_period = "90d"
trailing_months = 12

[sms]
account_sid = "AC123"
bulk_delay_ms = 250
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.data_path, "data/");
        assert!(config.general.verbose);
        assert_eq!(config.report.default_period, "90d");
        assert_eq!(config.report.trailing_months, 12);
        assert_eq!(config.report.giving_months, 12);
        assert_eq!(config.sms.account_sid.as_deref(), Some("AC123"));
        assert_eq!(config.sms.bulk_delay_ms, 250);
        assert_eq!(config.sms.base_url, "https://api.twilio.com/2010-04-01");
    }

    #[test]
    fn test_env_does_not_override_file_credentials() {
        let sms = SmsConfig {
            account_sid: Some("ACfile".to_string()),
            ..SmsConfig::default()
        }
        .with_env();
        assert_eq!(sms.account_sid.as_deref(), Some("ACfile"));
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[calendar]"));
        assert!(toml_str.contains("[sms]"));
    }
}
