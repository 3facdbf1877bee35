//! Handles settings for the application.
//!
//! Settings are read from a TOML file (see `config/settings.example.toml`)
//! and can be overridden with `PENCATAT__SECTION__KEY` environment variables.
//! `TELEGRAM_BOT_TOKEN` and `GOOGLE_ACCESS_TOKEN` are honoured for the secrets.
use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("telegram token is missing (set TELEGRAM_BOT_TOKEN)")]
    MissingToken,
    #[error("ledger workbook name is missing")]
    MissingWorkbook,
    #[error("google_sheets storage needs an access token (set GOOGLE_ACCESS_TOKEN)")]
    MissingAccessToken,
    #[error("invalid timezone \"{0}\"")]
    InvalidTimezone(String),
}

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
            timezone: default_timezone(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_timezone() -> String {
    "Asia/Jakarta".to_string()
}

#[derive(Debug, Deserialize)]
pub struct Telegram {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub allowed_users: Vec<u64>,
}

#[derive(Debug, Deserialize)]
pub struct Ledger {
    pub workbook: String,
    #[serde(default = "default_rekap")]
    pub rekap: bool,
}

fn default_rekap() -> bool {
    true
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Storage {
    #[default]
    Memory,
    Sqlite(String),
    GoogleSheets,
}

#[derive(Debug, Deserialize)]
pub struct Google {
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub telegram: Telegram,
    pub ledger: Ledger,
    #[serde(default)]
    pub storage: Storage,
    pub google: Option<Google>,
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, SettingsError> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("PENCATAT").separator("__"))
            .set_override_option("telegram.token", std::env::var("TELEGRAM_BOT_TOKEN").ok())?
            .set_override_option(
                "google.access_token",
                std::env::var("GOOGLE_ACCESS_TOKEN").ok(),
            )?
            .build()?;

        let settings: Settings = settings.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.telegram.token.trim().is_empty() {
            return Err(SettingsError::MissingToken);
        }
        if self.ledger.workbook.trim().is_empty() {
            return Err(SettingsError::MissingWorkbook);
        }
        if self.storage == Storage::GoogleSheets
            && self
                .google
                .as_ref()
                .is_none_or(|g| g.access_token.trim().is_empty())
        {
            return Err(SettingsError::MissingAccessToken);
        }
        self.timezone()?;
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz, SettingsError> {
        self.app
            .timezone
            .parse::<Tz>()
            .map_err(|_| SettingsError::InvalidTimezone(self.app.timezone.clone()))
    }
}
