// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";
pub const ENV_AI_CONFIG_PATH: &str = "AI_CONFIG_PATH";

fn default_provider() -> String {
    "openai".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    /// Only "openai" is wired; anything else disables extraction.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// "ENV" means: read from OPENAI_API_KEY.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            api_key: default_api_key(),
            model: default_model(),
        }
    }
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut cfg: AiConfig = serde_json::from_str(&data)?;
        cfg.normalize();
        Ok(cfg)
    }

    /// `$AI_CONFIG_PATH` or `config/ai.json`. A missing or unreadable file
    /// yields a disabled config; extraction then degrades to "nothing found".
    pub fn load() -> Self {
        let path = env::var(ENV_AI_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_AI_CONFIG_PATH.into());
        match Self::load_from_file(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(target: "config", error = ?e, path = %path, "AI config unavailable; extraction disabled");
                let mut cfg = Self::default();
                cfg.normalize();
                cfg
            }
        }
    }

    fn normalize(&mut self) {
        self.provider = self.provider.trim().to_lowercase();

        // Resolve api key if "ENV". A missing variable leaves the key empty,
        // which the generator reports as a missing credential at call time.
        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = match self.provider.as_str() {
                "openai" => env::var("OPENAI_API_KEY").unwrap_or_default(),
                _ => String::new(),
            };
        }
    }
}
