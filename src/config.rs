//! Environment configuration
//!
//! Both binaries call `dotenv::dotenv().ok()` first, then [`Config::from_env`].

use crate::error::AssistantError;
use crate::gemini::DEFAULT_MODEL;
use crate::Result;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:datos_del_usuario.db?mode=rwc";
pub const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct Config {
    /// Only the Telegram runner needs it, see [`Config::telegram_token`].
    pub telegram_token: Option<String>,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub database_url: String,
    pub generation_timeout: Duration,
    pub seed_demo_data: bool,
    pub api_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let gemini_api_key = get("GOOGLE_API_KEY")
            .or_else(|| get("GEMINI_API_KEY"))
            .ok_or_else(|| {
                AssistantError::Config("GOOGLE_API_KEY (or GEMINI_API_KEY) is not set".into())
            })?;

        let generation_timeout = match get("GENERATION_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                AssistantError::Config(format!("GENERATION_TIMEOUT_SECS is not a number: {}", raw))
            })?,
            None => DEFAULT_GENERATION_TIMEOUT_SECS,
        };

        let api_port = match get("PORT").or_else(|| get("API_PORT")) {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| AssistantError::Config(format!("Invalid port: {}", raw)))?,
            None => DEFAULT_PORT,
        };

        let seed_demo_data = matches!(
            get("SEED_DEMO_DATA").map(|v| v.to_lowercase()).as_deref(),
            Some("1" | "true" | "yes")
        );

        Ok(Self {
            telegram_token: get("TELEGRAM_BOT_TOKEN"),
            gemini_api_key,
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            generation_timeout: Duration::from_secs(generation_timeout),
            seed_demo_data,
            api_port,
        })
    }

    pub fn telegram_token(&self) -> Result<&str> {
        self.telegram_token
            .as_deref()
            .ok_or_else(|| AssistantError::Config("TELEGRAM_BOT_TOKEN is not set".into()))
    }
}
