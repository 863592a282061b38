//! Configuration management for PWICE
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{PwiceError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variables consulted for the model credential, in order
pub const API_KEY_ENV_VARS: [&str; 3] = ["PWICE_API_KEY", "GEMINI_API_KEY", "API_KEY"];

/// Main configuration structure for PWICE
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote model gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Lock screen settings
    #[serde(default)]
    pub access: AccessConfig,
    /// Chat screen settings
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Remote model gateway configuration
///
/// The credential is optional here: its absence only becomes an error when
/// a chat session is opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Model credential; falls back to the environment and the keyring
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL (overridable for tests and local mocks)
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature; above the provider default to favour variety
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Whole-request timeout for the HTTP client (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_temperature() -> f32 {
    0.9
}

fn default_top_k() -> u32 {
    64
}

fn default_top_p() -> f32 {
    0.95
}

fn default_request_timeout() -> u64 {
    120
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_api_base(),
            model: default_model(),
            temperature: default_temperature(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

/// Lock screen configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Shared numeric passcode
    #[serde(default = "default_passcode")]
    pub passcode: String,

    /// Digits accepted before the check fires automatically
    #[serde(default = "default_passcode_length")]
    pub passcode_length: usize,

    /// How long the "access denied" flag stays up (milliseconds)
    #[serde(default = "default_error_display_ms")]
    pub error_display_ms: u64,
}

fn default_passcode() -> String {
    "0829".to_string()
}

fn default_passcode_length() -> usize {
    4
}

fn default_error_display_ms() -> u64 {
    1500
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            passcode: default_passcode(),
            passcode_length: default_passcode_length(),
            error_display_ms: default_error_display_ms(),
        }
    }
}

/// Chat screen configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Scripted model line that opens every chat
    #[serde(default = "default_opening_line")]
    pub opening_line: String,

    /// Maximum wait for each reply fragment (seconds, 0 disables)
    #[serde(default = "default_reply_timeout")]
    pub reply_timeout_seconds: u64,

    /// Notice printed under a reply cut short by a transport failure
    #[serde(default = "default_interrupted_notice")]
    pub interrupted_notice: String,
}

fn default_opening_line() -> String {
    "(meets your eyes) ...What do you want?".to_string()
}

fn default_reply_timeout() -> u64 {
    60
}

fn default_interrupted_notice() -> String {
    "Secure channel interrupted. Try again.".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            opening_line: default_opening_line(),
            reply_timeout_seconds: default_reply_timeout(),
            interrupted_notice: default_interrupted_notice(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PwiceError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| PwiceError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if self.gateway.api_key.is_none() {
            if let Some((var, key)) = API_KEY_ENV_VARS
                .iter()
                .find_map(|var| std::env::var(var).ok().map(|key| (*var, key)))
            {
                tracing::debug!(var, "Env override: model credential");
                self.gateway.api_key = Some(key);
            }
        }

        if let Ok(api_base) = std::env::var("PWICE_API_BASE") {
            tracing::debug!(api_base = %api_base, "Env override: PWICE_API_BASE");
            self.gateway.api_base = api_base;
        }

        if let Ok(model) = std::env::var("PWICE_MODEL") {
            tracing::debug!(model = %model, "Env override: PWICE_MODEL");
            self.gateway.model = model;
        }

        if let Ok(temperature) = std::env::var("PWICE_TEMPERATURE") {
            match temperature.parse() {
                Ok(v) => self.gateway.temperature = v,
                Err(_) => tracing::warn!("Invalid PWICE_TEMPERATURE: {}", temperature),
            }
        }

        if let Ok(passcode) = std::env::var("PWICE_PASSCODE") {
            self.access.passcode = passcode;
            tracing::debug!("Env override: PWICE_PASSCODE");
        }

        if let Ok(timeout) = std::env::var("PWICE_REPLY_TIMEOUT_SECONDS") {
            match timeout.parse() {
                Ok(v) => self.chat.reply_timeout_seconds = v,
                Err(_) => tracing::warn!("Invalid PWICE_REPLY_TIMEOUT_SECONDS: {}", timeout),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(model) = &cli.model {
            tracing::debug!(model = %model, "CLI override: model");
            self.gateway.model = model.clone();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `PwiceError::Config` describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        let access = &self.access;
        if access.passcode_length == 0 {
            return Err(
                PwiceError::Config("access.passcode_length must be greater than 0".to_string())
                    .into(),
            );
        }

        if access.passcode.len() != access.passcode_length
            || !access.passcode.chars().all(|c| c.is_ascii_digit())
        {
            return Err(PwiceError::Config(format!(
                "access.passcode must be exactly {} digits",
                access.passcode_length
            ))
            .into());
        }

        let gateway = &self.gateway;
        if gateway.model.trim().is_empty() {
            return Err(PwiceError::Config("gateway.model cannot be empty".to_string()).into());
        }

        url::Url::parse(&gateway.api_base).map_err(|e| {
            PwiceError::Config(format!(
                "gateway.api_base is not a valid URL ({}): {}",
                gateway.api_base, e
            ))
        })?;

        if !(0.0..=2.0).contains(&gateway.temperature) {
            return Err(PwiceError::Config(
                "gateway.temperature must be between 0.0 and 2.0".to_string(),
            )
            .into());
        }

        if gateway.top_p <= 0.0 || gateway.top_p > 1.0 {
            return Err(
                PwiceError::Config("gateway.top_p must be in (0.0, 1.0]".to_string()).into(),
            );
        }

        if gateway.top_k == 0 {
            return Err(
                PwiceError::Config("gateway.top_k must be greater than 0".to_string()).into(),
            );
        }

        if gateway.request_timeout_seconds == 0 {
            return Err(PwiceError::Config(
                "gateway.request_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}
