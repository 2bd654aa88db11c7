// src/ingest/providers/google_news.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use quick_xml::de::from_str;
use serde::Deserialize;

use super::fetch_each;
use crate::ingest::normalize_text;
use crate::ingest::types::Source;
use crate::model::{kst, NewsItem};

const FEED_URL: &str = "https://news.google.com/rss/search";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    source: Option<ItemSource>,
}

#[derive(Debug, Deserialize)]
struct ItemSource {
    #[serde(rename = "$text", default)]
    name: String,
}

/// RFC 2822 → `YYYY-MM-DD HH:MM` in KST. Unparsable stamps pass through.
pub fn format_published(raw: &str) -> String {
    let raw = raw.trim();
    let kst = kst();
    match DateTime::parse_from_rfc2822(raw) {
        Ok(dt) => dt.with_timezone(&kst).format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Parse one Google News RSS search result page into headlines for `keyword`.
///
/// Google appends " - Publisher" to every title; it is stripped when it
/// matches the item's `<source>`.
pub fn parse_feed(keyword: &str, xml: &str, limit: usize) -> Result<Vec<NewsItem>> {
    let rss: Rss = from_str(xml).context("parsing google news rss xml")?;

    let mut out = Vec::with_capacity(rss.channel.item.len().min(limit));
    for it in rss.channel.item.into_iter().take(limit) {
        let source = it
            .source
            .map(|s| normalize_text(&s.name))
            .unwrap_or_default();
        let mut headline = normalize_text(it.title.as_deref().unwrap_or_default());
        if !source.is_empty() {
            if let Some(stripped) = headline.strip_suffix(&format!(" - {source}")) {
                headline = stripped.trim_end().to_string();
            }
        }
        if headline.is_empty() {
            continue;
        }
        out.push(NewsItem {
            keyword: keyword.to_string(),
            headline,
            source,
            published: it
                .pub_date
                .as_deref()
                .map(format_published)
                .unwrap_or_default(),
        });
    }
    Ok(out)
}

/// Fixed-keyword headline search over Google News RSS (Korean edition).
#[derive(Clone)]
pub struct GoogleNewsRss {
    client: reqwest::Client,
    per_keyword: usize,
    item_timeout: Duration,
}

impl GoogleNewsRss {
    pub fn new(per_keyword: usize, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("daily-briefing/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .context("building google news http client")?;
        Ok(Self {
            client,
            per_keyword,
            item_timeout: timeout,
        })
    }

    async fn fetch_keyword(&self, keyword: &str) -> Result<Vec<NewsItem>> {
        let body = self
            .client
            .get(FEED_URL)
            .query(&[("q", keyword), ("hl", "ko"), ("gl", "KR"), ("ceid", "KR:ko")])
            .send()
            .await
            .context("google news http get()")?
            .error_for_status()
            .context("google news http status")?
            .text()
            .await
            .context("google news http .text()")?;
        parse_feed(keyword, &body, self.per_keyword)
    }
}

#[async_trait]
impl Source<[String], Vec<NewsItem>> for GoogleNewsRss {
    /// Keywords are fetched concurrently, output stays in keyword order. A
    /// failing or stalled keyword is skipped; the call fails only if every
    /// keyword failed.
    async fn fetch(&self, keywords: &[String]) -> Result<Vec<NewsItem>> {
        let (per_keyword, attempts) = fetch_each(
            "google_news",
            keywords.to_vec(),
            self.item_timeout,
            |kw| kw.clone(),
            |kw| {
                let this = self.clone();
                async move { this.fetch_keyword(&kw).await }
            },
        )
        .await;
        attempts.finish(per_keyword.into_iter().flatten().collect())
    }

    fn name(&self) -> &'static str {
        "google_news"
    }
}
