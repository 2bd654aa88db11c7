// src/analyze/extractor.rs
//! Entity discovery: headlines in, not-yet-tracked tickers/companies out.
//!
//! One text-generation call per run. The reply is parsed defensively and the
//! result is re-filtered against the fixed universe, so a model that ignores
//! its instructions can never reintroduce a tracked entity.

use std::collections::HashSet;
use std::fmt::Write as _;

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::analyze::ai_adapter::DynTextGenerator;
use crate::model::{EntitySet, FixedEntities, NewsItem};

/// Headlines beyond this many are dropped before prompting.
pub const MAX_PROMPT_HEADLINES: usize = 60;

const SYSTEM_PROMPT: &str = "You extract company entities from financial news headlines. \
Reply with ONLY a JSON object, no prose.";

static RE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)\s*```").expect("fence regex"));
static RE_TICKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{1,5}(?:[.\-][A-Z]{1,2})?$").expect("ticker regex"));

pub struct EntityExtractor {
    generator: DynTextGenerator,
}

impl EntityExtractor {
    pub fn new(generator: DynTextGenerator) -> Self {
        Self { generator }
    }

    pub fn provider_name(&self) -> &'static str {
        self.generator.provider_name()
    }

    /// Never fails: any error degrades to an empty set (and a warning).
    pub async fn extract(&self, headlines: &[NewsItem], fixed: &FixedEntities) -> EntitySet {
        match self.try_extract(headlines, fixed).await {
            Ok(set) => set,
            Err(e) => {
                tracing::warn!(target: "extract", error = ?e, "entity extraction failed");
                EntitySet::default()
            }
        }
    }

    /// Same as [`extract`](Self::extract) but surfaces the failure so the
    /// caller can account for it.
    pub async fn try_extract(
        &self,
        headlines: &[NewsItem],
        fixed: &FixedEntities,
    ) -> Result<EntitySet> {
        if headlines.is_empty() {
            return Ok(EntitySet::default());
        }
        let prompt = build_prompt(headlines, fixed);
        let reply = self
            .generator
            .generate(SYSTEM_PROMPT, &prompt)
            .await
            .with_context(|| format!("text generation via {}", self.provider_name()))?;
        let raw = parse_reply(&reply)?;
        let set = post_filter(raw, fixed);
        tracing::info!(
            target: "extract",
            us = set.us_tickers.len(),
            kr = set.kr_companies.len(),
            "entities discovered"
        );
        Ok(set)
    }
}

pub fn build_prompt(headlines: &[NewsItem], fixed: &FixedEntities) -> String {
    let mut p = String::new();
    p.push_str(
        "From the news headlines below, list the listed companies that are mentioned.\n\
         Return ONLY this JSON object:\n\
         {\"us_tickers\": [\"TICKER\", ...], \"kr_companies\": [\"회사명\", ...]}\n\
         Rules:\n\
         - us_tickers: US-listed companies as uppercase ticker symbols.\n\
         - kr_companies: Korean-listed companies by their official Korean name.\n\
         - Do not include indices, sectors, countries or currencies.\n",
    );
    let _ = writeln!(
        p,
        "- Exclude these US tickers: {}",
        fixed.us_tickers.join(", ")
    );
    let _ = writeln!(
        p,
        "- Exclude these Korean companies: {}",
        fixed.kr_companies.join(", ")
    );
    p.push_str("\nHeadlines:\n");
    for h in headlines.iter().take(MAX_PROMPT_HEADLINES) {
        let _ = writeln!(p, "- {}", h.headline);
    }
    p
}

/// Unwrap a fenced code block if present, else trim the reply.
pub fn strip_fences(reply: &str) -> &str {
    match RE_FENCE.captures(reply).and_then(|c| c.get(1)) {
        Some(m) => m.as_str().trim(),
        None => reply.trim(),
    }
}

fn string_list(v: &Value, key: &str) -> Result<Vec<String>> {
    let arr = v
        .get(key)
        .ok_or_else(|| anyhow!("reply is missing `{key}`"))?
        .as_array()
        .ok_or_else(|| anyhow!("`{key}` is not an array"))?;
    Ok(arr
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect())
}

/// Parse a model reply into a raw (unfiltered) set. Both keys are required.
pub fn parse_reply(reply: &str) -> Result<EntitySet> {
    let body = strip_fences(reply);
    let v: Value = serde_json::from_str(body).context("reply is not valid JSON")?;
    Ok(EntitySet {
        us_tickers: string_list(&v, "us_tickers")?,
        kr_companies: string_list(&v, "kr_companies")?,
    })
}

/// Normalize, validate, dedup (first wins) and drop anything already fixed.
pub fn post_filter(raw: EntitySet, fixed: &FixedEntities) -> EntitySet {
    let mut seen_us = HashSet::new();
    let us_tickers = raw
        .us_tickers
        .into_iter()
        .map(|t| t.trim().trim_start_matches('$').to_ascii_uppercase())
        .filter(|t| RE_TICKER.is_match(t))
        .filter(|t| !fixed.contains_us(t))
        .filter(|t| seen_us.insert(t.clone()))
        .collect();

    let mut seen_kr = HashSet::new();
    let kr_companies = raw
        .kr_companies
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .filter(|n| !fixed.contains_kr(n))
        .filter(|n| seen_kr.insert(n.clone()))
        .collect();

    EntitySet {
        us_tickers,
        kr_companies,
    }
}
