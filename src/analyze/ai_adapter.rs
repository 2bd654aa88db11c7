// src/analyze/ai_adapter.rs
//! Text-generation adapter: provider abstraction used by entity extraction.
//!
//! One call in, one string out. No retries, no caching: the caller bounds the
//! call with its own timeout and treats any `Err` as "nothing extracted".

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};

use crate::config::ai::AiConfig;

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Reply used by the mock generator when `AI_TEST_MODE=mock`.
pub const MOCK_REPLY: &str = r#"{"us_tickers": ["AMD", "AVGO"], "kr_companies": ["삼성SDI", "한미반도체"]}"#;

pub type GenerateFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>>;

/// Trait object used by the extractor (and tests).
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt` under the `system` instruction.
    fn generate<'a>(&'a self, system: &'a str, prompt: &'a str) -> GenerateFuture<'a>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynTextGenerator = Arc<dyn TextGenerator>;

/// Factory: build a generator according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns a deterministic mock generator.
/// * Else if `config.enabled == false` or the provider is unknown, returns a
///   disabled generator.
/// * Else builds the OpenAI generator.
pub fn build_generator(config: &AiConfig) -> DynTextGenerator {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockGenerator::new(MOCK_REPLY));
    }

    if !config.enabled {
        return Arc::new(DisabledGenerator);
    }

    match config.provider.as_str() {
        "openai" => match OpenAiGenerator::new(&config.api_key, &config.model) {
            Ok(g) => Arc::new(g),
            Err(e) => {
                tracing::warn!(target: "extract", error = ?e, "openai generator unavailable");
                Arc::new(DisabledGenerator)
            }
        },
        other => {
            tracing::warn!(target: "extract", provider = other, "unsupported AI provider");
            Arc::new(DisabledGenerator)
        }
    }
}

/// OpenAI Chat Completions. Deterministic sampling (temperature 0).
pub struct OpenAiGenerator {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(api_key: &str, model: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("daily-briefing/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(60))
            .build()
            .context("building openai http client")?;
        Ok(Self {
            http,
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
        })
    }

    async fn complete(&self, system: &str, prompt: &str) -> anyhow::Result<String> {
        if self.api_key.is_empty() {
            bail!("OPENAI_API_KEY is not set");
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            #[serde(default)]
            content: Option<String>,
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.0,
        };

        let body: Resp = self
            .http
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("openai http post()")?
            .error_for_status()
            .context("openai http status")?
            .json()
            .await
            .context("openai response json")?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("openai returned no choices"))
    }
}

impl TextGenerator for OpenAiGenerator {
    fn generate<'a>(&'a self, system: &'a str, prompt: &'a str) -> GenerateFuture<'a> {
        Box::pin(self.complete(system, prompt))
    }
    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Always fails; used when AI is disabled.
pub struct DisabledGenerator;

impl TextGenerator for DisabledGenerator {
    fn generate<'a>(&'a self, _system: &'a str, _prompt: &'a str) -> GenerateFuture<'a> {
        Box::pin(async { Err::<String, _>(anyhow!("text generation is disabled")) })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Returns a fixed reply; for tests and local runs.
#[derive(Clone)]
pub struct MockGenerator {
    pub reply: String,
}

impl MockGenerator {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

impl TextGenerator for MockGenerator {
    fn generate<'a>(&'a self, _system: &'a str, _prompt: &'a str) -> GenerateFuture<'a> {
        let out = self.reply.clone();
        Box::pin(async move { Ok::<String, anyhow::Error>(out) })
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}
