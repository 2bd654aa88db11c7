// src/ingest/providers/mod.rs
pub mod google_news;
pub mod seeking_alpha;
pub mod tavily;
pub mod yahoo;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::task::JoinSet;

use crate::config::BriefingConfig;
use crate::ingest::types::Sources;

/// Production adapter set. Yahoo Finance backs markets, FX and quotes;
/// credentials for Tavily / RapidAPI come from the environment.
pub fn default_sources(cfg: &BriefingConfig) -> Result<Sources> {
    let timeout = cfg.item_timeout();
    let yahoo = Arc::new(yahoo::YahooFinance::new(cfg.markets.clone(), timeout)?);
    Ok(Sources {
        headlines: Arc::new(google_news::GoogleNewsRss::new(cfg.news.per_keyword, timeout)?),
        market: yahoo.clone(),
        fx: yahoo.clone(),
        deep_search: Arc::new(tavily::TavilySearch::from_env(
            cfg.deep_search.max_results,
            timeout,
        )?),
        ratings: Arc::new(seeking_alpha::SeekingAlphaRatings::from_env(timeout)?),
        quotes: yahoo,
    })
}

/// Per-item bookkeeping for adapters that fan out over keywords/symbols:
/// single failures are logged and skipped, the call fails only when
/// every item failed.
#[derive(Debug, Default)]
pub(crate) struct Attempts {
    ok: usize,
    last_err: Option<anyhow::Error>,
}

impl Attempts {
    pub(crate) fn record<T>(&mut self, provider: &str, item: &str, res: Result<T>) -> Option<T> {
        match res {
            Ok(v) => {
                self.ok += 1;
                Some(v)
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, provider, item, "item fetch failed");
                self.last_err = Some(e);
                None
            }
        }
    }

    pub(crate) fn merge(mut self, other: Attempts) -> Self {
        self.ok += other.ok;
        if other.last_err.is_some() {
            self.last_err = other.last_err;
        }
        self
    }

    pub(crate) fn finish<T>(self, value: T) -> Result<T> {
        match self.last_err {
            Some(e) if self.ok == 0 => Err(e.context("every item failed")),
            _ => Ok(value),
        }
    }
}

/// Fetch every item concurrently, each under its own `per_item` bound, so a
/// stalled item cannot hold up its siblings. Results keep input order; failed
/// or timed-out items are recorded and left out.
pub(crate) async fn fetch_each<I, T, L, F, Fut>(
    provider: &'static str,
    items: Vec<I>,
    per_item: Duration,
    label: L,
    fetch: F,
) -> (Vec<T>, Attempts)
where
    L: Fn(&I) -> String,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let labels: Vec<String> = items.iter().map(&label).collect();
    let mut set = JoinSet::new();
    for (idx, item) in items.into_iter().enumerate() {
        let fut = fetch(item);
        set.spawn(async move {
            let res = match tokio::time::timeout(per_item, fut).await {
                Ok(res) => res,
                Err(_) => Err(anyhow!("timed out after {per_item:?}")),
            };
            (idx, res)
        });
    }

    let mut slots: Vec<Option<T>> = labels.iter().map(|_| None).collect();
    let mut attempts = Attempts::default();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, res)) => slots[idx] = attempts.record(provider, &labels[idx], res),
            Err(e) => {
                attempts.record::<T>(provider, "task", Err(anyhow::Error::new(e)));
            }
        }
    }
    (slots.into_iter().flatten().collect(), attempts)
}
