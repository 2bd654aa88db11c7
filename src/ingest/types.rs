// src/ingest/types.rs
use std::sync::Arc;

use anyhow::Result;

use crate::model::{FxRate, Market, MarketSnapshot, NewsItem, Quote, Rating, SearchResult};

/// One external data provider behind a fixed interface.
///
/// Implementations must fail cleanly (return `Err`) and must not retry beyond
/// their own HTTP timeout; the pipeline turns any `Err` into an absent section.
#[async_trait::async_trait]
pub trait Source<Q: ?Sized + Sync, T: Send>: Send + Sync {
    async fn fetch(&self, query: &Q) -> Result<T>;
    fn name(&self) -> &'static str;
}

pub type DynSource<Q, T> = Arc<dyn Source<Q, T>>;

/// Quote lookup for a list of identifiers on one market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub market: Market,
    /// US tickers or KR 6-digit codes.
    pub identifiers: Vec<String>,
}

/// The adapter set a pipeline run fans out to.
#[derive(Clone)]
pub struct Sources {
    /// Fixed-keyword headline search (Wave A).
    pub headlines: DynSource<[String], Vec<NewsItem>>,
    pub market: DynSource<Market, MarketSnapshot>,
    pub fx: DynSource<(), Vec<FxRate>>,
    pub deep_search: DynSource<[String], Vec<SearchResult>>,
    pub ratings: DynSource<[String], Vec<Rating>>,
    pub quotes: DynSource<QuoteRequest, Vec<Quote>>,
}
