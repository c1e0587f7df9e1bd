//! Runtime configuration.
//!
//! Loaded from an optional `ulap.toml` next to the working directory, with
//! environment variables (via `.env` when present) overriding the
//! secret-bearing fields. Missing configuration falls back to defaults so
//! the engine stays constructible in tests without any files on disk.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use tracing::warn;
use url::Url;

pub const CONFIG_FILE: &str = "ulap.toml";

pub const ENV_API_KEY: &str = "ULAP_API_KEY";
pub const ENV_API_URL: &str = "ULAP_API_URL";
pub const ENV_MODELS: &str = "ULAP_MODELS";

const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub api_key: String,
    /// Ordered fallback list: the primary model first, degraded candidates
    /// after it.
    pub model_ids: Vec<String>,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            model_ids: vec![
                "gemini-2.0-flash".to_string(),
                "gemini-flash-latest".to_string(),
                "gemini-1.5-flash-8b".to_string(),
            ],
            max_output_tokens: 1024,
            temperature: 0.7,
        }
    }
}

impl Config {
    /// Loads `ulap.toml` if present, then applies environment overrides.
    pub fn load() -> Self {
        let mut config = Self::from_file(CONFIG_FILE).unwrap_or_default();
        config.apply_env();
        config
    }

    pub fn from_file(path: impl AsRef<Path>) -> Option<Self> {
        let raw = fs::read_to_string(path.as_ref()).ok()?;
        match toml::from_str(&raw) {
            Ok(config) => Some(config),
            Err(error) => {
                warn!(path = %path.as_ref().display(), %error, "ignoring malformed config file");
                None
            }
        }
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    fn apply_env(&mut self) {
        if let Ok(key) = env::var(ENV_API_KEY) {
            self.api_key = key;
        }
        if let Ok(url) = env::var(ENV_API_URL) {
            self.api_url = url;
        }
        if let Ok(models) = env::var(ENV_MODELS) {
            let ids: Vec<String> = models
                .split(',')
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect();
            if !ids.is_empty() {
                self.model_ids = ids;
            }
        }
    }

    /// Validated endpoint base the HTTP client appends `<model>:generateContent` to.
    pub fn endpoint_base(&self) -> Result<Url, url::ParseError> {
        Url::parse(self.api_url.trim_end_matches('/'))
    }
}
