// src/config.rs
//! Runtime configuration read from the environment (after `.env` is loaded).

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
pub const DEFAULT_EMBEDDING_DIMENSIONS: u32 = 768;
pub const DEFAULT_CAPTION_PROMPT: &str = "Describe this image in a few words.";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub vision_model: String,
    pub embedding_model: String,
    pub embedding_dimensions: u32,
    pub caption_prompt: String,
    pub bind_addr: SocketAddr,
    pub session_idle: Duration,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("GEMINI_API_KEY").ok_or(ConfigError::Missing("GEMINI_API_KEY"))?;
        let chat_model = get("GEMINI_CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string());
        let vision_model = get("GEMINI_VISION_MODEL").unwrap_or_else(|| chat_model.clone());

        Ok(Self {
            api_key,
            base_url: get("GEMINI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            chat_model,
            vision_model,
            embedding_model: get("GEMINI_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_dimensions: parse_or(get("EMBEDDING_DIMENSIONS"), "EMBEDDING_DIMENSIONS", DEFAULT_EMBEDDING_DIMENSIONS)?,
            caption_prompt: get("CAPTION_PROMPT").unwrap_or_else(|| DEFAULT_CAPTION_PROMPT.to_string()),
            bind_addr: parse_or(get("BIND_ADDR"), "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            session_idle: Duration::from_secs(scaled(
                get("SESSION_IDLE_MINUTES"),
                "SESSION_IDLE_MINUTES",
                120,
                60,
            )?),
            max_upload_bytes: usize::try_from(scaled(get("MAX_UPLOAD_MB"), "MAX_UPLOAD_MB", 10, 1024 * 1024)?)
                .map_err(|_| ConfigError::Invalid {
                    key: "MAX_UPLOAD_MB",
                    value: get("MAX_UPLOAD_MB").unwrap_or_default(),
                })?,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    raw: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

/// Parses a count and converts it to a smaller unit, rejecting overflow.
fn scaled(raw: Option<String>, key: &'static str, default: u64, factor: u64) -> Result<u64, ConfigError> {
    let value = parse_or(raw.clone(), key, default)?;
    value.checked_mul(factor).ok_or_else(|| ConfigError::Invalid {
        key,
        value: raw.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_only_api_key() {
        let config = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "secret")])).unwrap();
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.chat_model, DEFAULT_CHAT_MODEL);
        assert_eq!(config.vision_model, DEFAULT_CHAT_MODEL);
        assert_eq!(config.embedding_dimensions, 768);
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.session_idle, Duration::from_secs(120 * 60));
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_missing_api_key() {
        let err = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("GEMINI_API_KEY"));
    }

    #[test]
    fn test_overrides_and_invalid_numbers() {
        let config = Config::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k"),
            ("GEMINI_BASE_URL", "http://localhost:9999/v1/"),
            ("GEMINI_CHAT_MODEL", "gemini-pro"),
            ("SESSION_IDLE_MINUTES", "5"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:9999/v1");
        assert_eq!(config.vision_model, "gemini-pro");
        assert_eq!(config.session_idle, Duration::from_secs(300));

        let err = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "k"), ("EMBEDDING_DIMENSIONS", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "EMBEDDING_DIMENSIONS", .. }));
    }

    #[test]
    fn test_unit_conversion_overflow_is_invalid() {
        let max = u64::MAX.to_string();

        let err = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "k"), ("SESSION_IDLE_MINUTES", max.as_str())]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SESSION_IDLE_MINUTES", .. }));

        let err = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "k"), ("MAX_UPLOAD_MB", max.as_str())]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "MAX_UPLOAD_MB", .. }));
    }
}
