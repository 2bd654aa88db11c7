//! Data shapes produced by the adapters and consumed by merge and render.
//!
//! Everything here is built fresh per pipeline run and never mutated after the
//! merge stage hands it to the renderer.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// Which market a snapshot or quote request refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    Kr,
    Us,
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Market::Kr => write!(f, "kr"),
            Market::Us => write!(f, "us"),
        }
    }
}

/// Whether a holding came from the statically configured universe or from
/// entity discovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    #[default]
    Fixed,
    Discovered,
}

/// Korea Standard Time (UTC+9, no DST).
pub fn kst() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).expect("UTC+9 is a valid offset")
}

/// Round to two decimal places (half away from zero).
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Percent change between two closes, rounded to 2 places.
/// `None` when the previous close is missing or zero.
pub fn pct_change(close: f64, prev_close: f64) -> Option<f64> {
    if prev_close == 0.0 || !prev_close.is_finite() || !close.is_finite() {
        return None;
    }
    Some(round2((close / prev_close - 1.0) * 100.0))
}

/// Latest and previous value of a close series, skipping gaps.
fn last_two(closes: &[Option<f64>]) -> (Option<f64>, Option<f64>) {
    let mut it = closes.iter().rev().filter_map(|c| *c);
    let last = it.next();
    let prev = it.next();
    (last, prev)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Ticker (US) or 6-digit exchange code (KR).
    pub identifier: String,
    pub display_name: String,
    pub close: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_close: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_pct: Option<f64>,
    pub volume: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<u64>,
    #[serde(default)]
    pub origin: Origin,
}

impl Quote {
    /// Build a quote from a daily close series (oldest first, gaps as `None`).
    /// Returns `None` if the series has no observation at all.
    pub fn from_closes(
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        closes: &[Option<f64>],
        volume: u64,
    ) -> Option<Self> {
        let (close, prev_close) = last_two(closes);
        let close = close?;
        Some(Self {
            identifier: identifier.into(),
            display_name: display_name.into(),
            close,
            prev_close,
            change: prev_close.map(|p| round2(close - p)),
            change_pct: prev_close.and_then(|p| pct_change(close, p)),
            volume,
            market_cap: None,
            origin: Origin::Fixed,
        })
    }

    /// Close × volume, used for by-turnover rankings.
    pub fn turnover(&self) -> f64 {
        self.close * self.volume as f64
    }
}

/// One market index (KOSPI, S&P500, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub name: String,
    pub close: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_pct: Option<f64>,
}

impl IndexSnapshot {
    pub fn from_closes(name: impl Into<String>, closes: &[Option<f64>]) -> Option<Self> {
        let (close, prev) = last_two(closes);
        let close = close?;
        Some(Self {
            name: name.into(),
            close: round2(close),
            change_pct: prev.and_then(|p| pct_change(close, p)),
        })
    }
}

/// Net buying per investor class (KRW), e.g. 외국인 / 기관 / 개인.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestorFlow {
    pub investor: String,
    pub net_buy: i64,
}

/// Everything one market adapter returns for a market.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indices: Vec<IndexSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holdings: Vec<Quote>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub investor_flow: Vec<InvestorFlow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gainers: Vec<Quote>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub losers: Vec<Quote>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub turnover_leaders: Vec<Quote>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub news: Vec<NewsItem>,
}

/// FX pair or commodity price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FxRate {
    pub name: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_pct: Option<f64>,
}

/// A fixed-keyword headline. Dedup identity is `headline` (exact match).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub keyword: String,
    pub headline: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub published: String,
}

/// A deep-search hit. Dedup identity is `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub keyword: String,
    pub title: String,
    pub content: String,
    pub url: String,
}

/// Analyst ratings on a 1 (strong sell) ..= 5 (strong buy) scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub symbol: String,
    pub wall_street: Option<f64>,
    pub quant: Option<f64>,
    pub authors: Option<f64>,
}

/// Entities discovered from headlines, in extractor order, never overlapping
/// the fixed universe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySet {
    #[serde(default)]
    pub us_tickers: Vec<String>,
    #[serde(default)]
    pub kr_companies: Vec<String>,
}

impl EntitySet {
    pub fn is_empty(&self) -> bool {
        self.us_tickers.is_empty() && self.kr_companies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.us_tickers.len() + self.kr_companies.len()
    }
}

/// Tickers and company names the Stage-1/2 adapters already cover.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedEntities {
    pub us_tickers: Vec<String>,
    pub kr_companies: Vec<String>,
}

impl FixedEntities {
    pub fn contains_us(&self, ticker: &str) -> bool {
        self.us_tickers
            .iter()
            .any(|t| t.trim().eq_ignore_ascii_case(ticker.trim()))
    }

    pub fn contains_kr(&self, name: &str) -> bool {
        let name = name.trim();
        self.kr_companies
            .iter()
            .any(|n| n.trim() == name || n.trim().eq_ignore_ascii_case(name))
    }
}

/// One market's section of the briefing; holdings are fixed first, then discovered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSection {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indices: Vec<IndexSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holdings: Vec<Quote>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub investor_flow: Vec<InvestorFlow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gainers: Vec<Quote>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub losers: Vec<Quote>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub turnover_leaders: Vec<Quote>,
}

impl MarketSection {
    pub fn fixed_holdings(&self) -> impl Iterator<Item = &Quote> {
        self.holdings.iter().filter(|q| q.origin == Origin::Fixed)
    }

    pub fn discovered_holdings(&self) -> impl Iterator<Item = &Quote> {
        self.holdings
            .iter()
            .filter(|q| q.origin == Origin::Discovered)
    }
}

/// The merged result of one pipeline run. Every section may be empty; an
/// empty section is omitted from both JSON and text output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BriefingDocument {
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub discovered: EntitySet,
    #[serde(default)]
    pub us_market: MarketSection,
    #[serde(default)]
    pub kr_market: MarketSection,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fx: Vec<FxRate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headlines: Vec<NewsItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deep_search: Vec<SearchResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ratings: Vec<Rating>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub market_news: Vec<NewsItem>,
}
