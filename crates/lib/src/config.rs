//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.linegpt/config.json`) and environment.
//! Secrets (channel secret, channel access token, OpenAI key) can live in the file
//! but env variables always win.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Gateway server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// LINE Messaging API settings.
    #[serde(default)]
    pub line: LineConfig,

    /// OpenAI completion settings.
    #[serde(default)]
    pub openai: OpenAiConfig,
}

/// Gateway bind and port settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for the webhook HTTP server (default 8080).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0" — LINE must be able to reach /callback).
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    8080
}

fn default_gateway_bind() -> String {
    "0.0.0.0".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// LINE channel credentials and API base.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineConfig {
    /// Channel secret used for webhook signature verification. Overridden by LINE_CHANNEL_SECRET env.
    pub channel_secret: Option<String>,
    /// Channel access token for the reply API. Overridden by LINE_CHANNEL_ACCESS_TOKEN env.
    pub channel_access_token: Option<String>,
    /// Override the LINE API base URL (for tests). Default https://api.line.me.
    pub api_base: Option<String>,
}

/// OpenAI completion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAiConfig {
    /// API key for chat completions. Overridden by OPENAI_API_KEY env.
    pub api_key: Option<String>,
    /// Model id sent with each completion request (default "gpt-3.5-turbo").
    #[serde(default = "default_openai_model")]
    pub model: String,
    /// Hard timeout for one completion call, in seconds (default 10). LINE reply
    /// tokens expire quickly, so this bounds worst-case latency.
    #[serde(default = "default_openai_timeout_secs")]
    pub timeout_secs: u64,
    /// Override the OpenAI API base URL (for tests). Default https://api.openai.com/v1.
    pub api_base: Option<String>,
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_openai_timeout_secs() -> u64 {
    10
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_openai_model(),
            timeout_secs: default_openai_timeout_secs(),
            api_base: None,
        }
    }
}

/// Missing required credential; fatal at startup.
#[derive(Debug, thiserror::Error)]
#[error("missing required configuration: {0} (set it in the config file or environment)")]
pub struct ConfigError(pub &'static str);

/// Resolved credential set, built once at startup and passed into the components
/// that need it. No ambient env lookups happen after this point.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub channel_secret: String,
    pub channel_access_token: String,
    pub openai_api_key: String,
}

fn env_or(config_value: Option<&str>, env_key: &str) -> Option<String> {
    std::env::var(env_key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            config_value
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve the LINE channel secret: env LINE_CHANNEL_SECRET overrides config.
pub fn resolve_channel_secret(config: &Config) -> Option<String> {
    env_or(config.line.channel_secret.as_deref(), "LINE_CHANNEL_SECRET")
}

/// Resolve the LINE channel access token: env LINE_CHANNEL_ACCESS_TOKEN overrides config.
pub fn resolve_channel_access_token(config: &Config) -> Option<String> {
    env_or(
        config.line.channel_access_token.as_deref(),
        "LINE_CHANNEL_ACCESS_TOKEN",
    )
}

/// Resolve the OpenAI API key: env OPENAI_API_KEY overrides config.
pub fn resolve_openai_api_key(config: &Config) -> Option<String> {
    env_or(config.openai.api_key.as_deref(), "OPENAI_API_KEY")
}

impl Config {
    /// Resolve all required credentials or report the first missing one.
    /// The CLI calls this before starting the gateway so an unconfigured
    /// deployment fails fast instead of serving unauthenticated calls.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let channel_secret =
            resolve_channel_secret(self).ok_or(ConfigError("LINE channel secret"))?;
        let channel_access_token =
            resolve_channel_access_token(self).ok_or(ConfigError("LINE channel access token"))?;
        let openai_api_key = resolve_openai_api_key(self).ok_or(ConfigError("OpenAI API key"))?;
        Ok(Credentials {
            channel_secret,
            channel_access_token,
            openai_api_key,
        })
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("LINEGPT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".linegpt").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the default path (or LINEGPT_CONFIG_PATH). Missing file => default config.
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_gateway_port_and_bind() {
        let g = GatewayConfig::default();
        assert_eq!(g.port, 8080);
        assert_eq!(g.bind, "0.0.0.0");
    }

    #[test]
    fn default_openai_model_and_timeout() {
        let o = OpenAiConfig::default();
        assert_eq!(o.model, "gpt-3.5-turbo");
        assert_eq!(o.timeout_secs, 10);
    }

    #[test]
    fn parse_partial_config() {
        let config: Config = serde_json::from_str(
            r#"{
                "gateway": { "port": 9000 },
                "line": { "channelSecret": "s", "channelAccessToken": "t" },
                "openai": { "apiKey": "k", "timeoutSecs": 5 }
            }"#,
        )
        .expect("parse config");
        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.gateway.bind, "0.0.0.0");
        assert_eq!(config.line.channel_secret.as_deref(), Some("s"));
        assert_eq!(config.openai.timeout_secs, 5);
        assert_eq!(config.openai.model, "gpt-3.5-turbo");
    }

    #[test]
    fn credentials_missing_reports_first_gap() {
        let config: Config = serde_json::from_str(
            r#"{ "line": { "channelAccessToken": "t" }, "openai": { "apiKey": "k" } }"#,
        )
        .expect("parse config");
        // Only meaningful when the env overrides are unset, as in CI.
        if std::env::var("LINE_CHANNEL_SECRET").is_err() {
            let err = config.credentials().expect_err("secret missing");
            assert!(err.to_string().contains("channel secret"));
        }
    }

    #[test]
    fn credentials_resolved_from_config() {
        let config: Config = serde_json::from_str(
            r#"{
                "line": { "channelSecret": "s", "channelAccessToken": "t" },
                "openai": { "apiKey": "k" }
            }"#,
        )
        .expect("parse config");
        if std::env::var("LINE_CHANNEL_SECRET").is_err()
            && std::env::var("LINE_CHANNEL_ACCESS_TOKEN").is_err()
            && std::env::var("OPENAI_API_KEY").is_err()
        {
            let creds = config.credentials().expect("all present");
            assert_eq!(creds.channel_secret, "s");
            assert_eq!(creds.channel_access_token, "t");
            assert_eq!(creds.openai_api_key, "k");
        }
    }
}
