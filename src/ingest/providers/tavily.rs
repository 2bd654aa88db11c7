// src/ingest/providers/tavily.rs
//! Deep news search through the Tavily search API.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::fetch_each;
use crate::ingest::types::Source;
use crate::ingest::{normalize_text, truncate_chars};
use crate::model::SearchResult;

const SEARCH_URL: &str = "https://api.tavily.com/search";
pub const ENV_TAVILY_API_KEY: &str = "TAVILY_API_KEY";
const CONTENT_CAP: usize = 1000;

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    topic: &'a str,
    search_depth: &'a str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

/// Map a Tavily response body to results tagged with the originating query.
/// Hits without a URL are dropped; URL is the dedup identity downstream.
pub fn parse_results(query: &str, body: &str) -> Result<Vec<SearchResult>> {
    let resp: SearchResponse = serde_json::from_str(body).context("parsing tavily json")?;
    Ok(resp
        .results
        .into_iter()
        .filter(|h| !h.url.trim().is_empty())
        .map(|h| SearchResult {
            keyword: query.to_string(),
            title: normalize_text(&h.title),
            content: truncate_chars(&normalize_text(&h.content), CONTENT_CAP),
            url: h.url.trim().to_string(),
        })
        .collect())
}

#[derive(Clone)]
pub struct TavilySearch {
    client: reqwest::Client,
    api_key: Option<String>,
    max_results: usize,
    item_timeout: Duration,
}

impl TavilySearch {
    pub fn new(api_key: Option<String>, max_results: usize, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("daily-briefing/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .context("building tavily http client")?;
        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            max_results,
            item_timeout: timeout,
        })
    }

    /// Key from `TAVILY_API_KEY`; a missing key makes every call fail.
    pub fn from_env(max_results: usize, timeout: Duration) -> Result<Self> {
        Self::new(std::env::var(ENV_TAVILY_API_KEY).ok(), max_results, timeout)
    }

    async fn search(&self, api_key: &str, query: &str) -> Result<Vec<SearchResult>> {
        let req = SearchRequest {
            api_key,
            query,
            topic: "news",
            search_depth: "advanced",
            max_results: self.max_results,
        };
        let body = self
            .client
            .post(SEARCH_URL)
            .json(&req)
            .send()
            .await
            .context("tavily http post()")?
            .error_for_status()
            .context("tavily http status")?
            .text()
            .await
            .context("tavily http .text()")?;
        parse_results(query, &body)
    }
}

#[async_trait]
impl Source<[String], Vec<SearchResult>> for TavilySearch {
    async fn fetch(&self, queries: &[String]) -> Result<Vec<SearchResult>> {
        let api_key = self
            .api_key
            .clone()
            .ok_or_else(|| anyhow!("{ENV_TAVILY_API_KEY} is not set"))?;

        let (per_query, attempts) = fetch_each(
            "tavily",
            queries.to_vec(),
            self.item_timeout,
            |q| q.clone(),
            |q| {
                let this = self.clone();
                let api_key = api_key.clone();
                async move { this.search(&api_key, &q).await }
            },
        )
        .await;
        attempts.finish(per_query.into_iter().flatten().collect())
    }

    fn name(&self) -> &'static str {
        "tavily"
    }
}
