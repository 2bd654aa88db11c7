// src/ingest/providers/seeking_alpha.rs
//! Analyst ratings from Seeking Alpha (via RapidAPI).
//!
//! The ratings endpoint returns a history of rating snapshots, newest first.
//! Only the newest snapshot is used. Scores are on the 1..=5 scale.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use super::fetch_each;
use crate::ingest::types::Source;
use crate::model::{round2, Rating};

const RATINGS_URL: &str = "https://seeking-alpha.p.rapidapi.com/symbols/get-ratings";
const RAPIDAPI_HOST: &str = "seeking-alpha.p.rapidapi.com";
pub const ENV_RAPIDAPI_KEY: &str = "RAPIDAPI_KEY";

fn score(v: Option<&Value>) -> Option<f64> {
    let x = match v? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (x.is_finite() && x > 0.0).then(|| round2(x))
}

/// Parse a `get-ratings` body for `symbol`. `Ok(None)` when the symbol has
/// no rating history.
pub fn parse_ratings(symbol: &str, body: &str) -> Result<Option<Rating>> {
    let v: Value = serde_json::from_str(body).context("parsing seeking alpha json")?;
    let latest = v
        .get("data")
        .and_then(Value::as_array)
        .and_then(|a| a.first());
    let Some(ratings) = latest.and_then(|d| d.pointer("/attributes/ratings")) else {
        return Ok(None);
    };
    let rating = Rating {
        symbol: symbol.to_string(),
        wall_street: score(ratings.get("sellSideRating")),
        quant: score(ratings.get("quantRating")),
        authors: score(ratings.get("authorsRating")),
    };
    if rating.wall_street.is_none() && rating.quant.is_none() && rating.authors.is_none() {
        return Ok(None);
    }
    Ok(Some(rating))
}

#[derive(Clone)]
pub struct SeekingAlphaRatings {
    client: reqwest::Client,
    api_key: Option<String>,
    item_timeout: Duration,
}

impl SeekingAlphaRatings {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("daily-briefing/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .context("building seeking alpha http client")?;
        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            item_timeout: timeout,
        })
    }

    pub fn from_env(timeout: Duration) -> Result<Self> {
        Self::new(std::env::var(ENV_RAPIDAPI_KEY).ok(), timeout)
    }

    async fn rating(&self, api_key: &str, symbol: &str) -> Result<Option<Rating>> {
        let body = self
            .client
            .get(RATINGS_URL)
            .query(&[("symbol", symbol.to_ascii_lowercase())])
            .header("X-RapidAPI-Key", api_key)
            .header("X-RapidAPI-Host", RAPIDAPI_HOST)
            .send()
            .await
            .with_context(|| format!("seeking alpha get() for {symbol}"))?
            .error_for_status()
            .with_context(|| format!("seeking alpha status for {symbol}"))?
            .text()
            .await
            .context("seeking alpha .text()")?;
        parse_ratings(symbol, &body)
    }
}

#[async_trait]
impl Source<[String], Vec<Rating>> for SeekingAlphaRatings {
    async fn fetch(&self, symbols: &[String]) -> Result<Vec<Rating>> {
        let api_key = self
            .api_key
            .clone()
            .ok_or_else(|| anyhow!("{ENV_RAPIDAPI_KEY} is not set"))?;

        let (ratings, attempts) = fetch_each(
            "seeking_alpha",
            symbols.to_vec(),
            self.item_timeout,
            |sym| sym.clone(),
            |sym| {
                let this = self.clone();
                let api_key = api_key.clone();
                async move { this.rating(&api_key, &sym).await }
            },
        )
        .await;
        // Symbols without rating history succeed with nothing to show.
        attempts.finish(ratings.into_iter().flatten().collect())
    }

    fn name(&self) -> &'static str {
        "seeking_alpha"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_newest_snapshot() {
        let body = r#"{"data":[
            {"id":"1","type":"rating","attributes":{"asDate":"2026-10-16","ratings":{
                "quantRating":3.4999,"authorsRating":"4.1","sellSideRating":4.25}}},
            {"id":"2","type":"rating","attributes":{"asDate":"2026-10-15","ratings":{
                "quantRating":2.0,"authorsRating":2.0,"sellSideRating":2.0}}}
        ]}"#;
        let r = parse_ratings("NVDA", body).unwrap().unwrap();
        assert_eq!(r.symbol, "NVDA");
        assert_eq!(r.quant, Some(3.5));
        assert_eq!(r.authors, Some(4.1));
        assert_eq!(r.wall_street, Some(4.25));
    }

    #[test]
    fn partial_and_missing_scores() {
        let body = r#"{"data":[{"attributes":{"ratings":{"quantRating":null,"sellSideRating":3.0}}}]}"#;
        let r = parse_ratings("AMD", body).unwrap().unwrap();
        assert_eq!(r.quant, None);
        assert_eq!(r.authors, None);
        assert_eq!(r.wall_street, Some(3.0));

        assert!(parse_ratings("AMD", r#"{"data":[]}"#).unwrap().is_none());
        assert!(parse_ratings("AMD", "not json").is_err());
    }
}
