// src/ingest/providers/yahoo.rs
//! Yahoo Finance adapter (v8 chart + v1 search, no auth).
//!
//! Serves three source roles: market snapshots (indices, fixed holdings,
//! derived leaderboards, market news), quote lookups for discovered
//! entities, and FX/commodity rates. Symbols are fetched concurrently, each
//! under its own timeout; a failing symbol is skipped, a call fails only when
//! every symbol failed.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::TimeZone;
use serde::Deserialize;

use super::fetch_each;
use crate::config::briefing::{Instrument, MarketCfg, MarketsCfg};
use crate::ingest::normalize_text;
use crate::ingest::types::{QuoteRequest, Source};
use crate::listings;
use crate::model::{kst, FxRate, IndexSnapshot, Market, MarketSnapshot, NewsItem, Quote};

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const SEARCH_URL: &str = "https://query2.finance.yahoo.com/v1/finance/search";
const LEADERBOARD_SIZE: usize = 3;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: ChartMeta,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: String,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default)]
    long_name: Option<String>,
    #[serde(default)]
    regular_market_volume: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

/// Daily series for one symbol, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub symbol: String,
    pub name: Option<String>,
    pub closes: Vec<Option<f64>>,
    pub last_volume: u64,
}

pub fn parse_chart(body: &str) -> Result<ChartSeries> {
    let data: ChartResponse = serde_json::from_str(body).context("parsing yahoo chart json")?;
    if let Some(err) = data.chart.error {
        if !err.is_null() {
            return Err(anyhow!("yahoo chart error: {err}"));
        }
    }
    let first = data
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| anyhow!("empty yahoo chart result"))?;

    let series = first.indicators.quote.into_iter().next().unwrap_or_default();
    let last_volume = series
        .volume
        .iter()
        .rev()
        .find_map(|v| *v)
        .or(first.meta.regular_market_volume)
        .unwrap_or(0);

    Ok(ChartSeries {
        name: first.meta.short_name.or(first.meta.long_name),
        symbol: first.meta.symbol,
        closes: series.close,
        last_volume,
    })
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    news: Vec<SearchNews>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchNews {
    title: String,
    #[serde(default)]
    publisher: String,
    #[serde(default)]
    provider_publish_time: Option<i64>,
}

pub fn parse_news(keyword: &str, body: &str) -> Result<Vec<NewsItem>> {
    let data: SearchResponse = serde_json::from_str(body).context("parsing yahoo search json")?;
    let kst = kst();
    Ok(data
        .news
        .into_iter()
        .filter_map(|n| {
            let headline = normalize_text(&n.title);
            if headline.is_empty() {
                return None;
            }
            let published = n
                .provider_publish_time
                .and_then(|ts| kst.timestamp_opt(ts, 0).single())
                .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            Some(NewsItem {
                keyword: keyword.to_string(),
                headline,
                source: n.publisher,
                published,
            })
        })
        .collect())
}

fn by_change_desc(a: &Quote, b: &Quote) -> Ordering {
    b.change_pct
        .partial_cmp(&a.change_pct)
        .unwrap_or(Ordering::Equal)
}

/// Top movers and turnover leaders among the tracked holdings.
pub fn leaderboards(holdings: &[Quote], n: usize) -> (Vec<Quote>, Vec<Quote>, Vec<Quote>) {
    let mut gainers: Vec<Quote> = holdings
        .iter()
        .filter(|q| q.change_pct.is_some_and(|c| c > 0.0))
        .cloned()
        .collect();
    gainers.sort_by(by_change_desc);
    gainers.truncate(n);

    let mut losers: Vec<Quote> = holdings
        .iter()
        .filter(|q| q.change_pct.is_some_and(|c| c < 0.0))
        .cloned()
        .collect();
    losers.sort_by(|a, b| by_change_desc(b, a));
    losers.truncate(n);

    let mut turnover: Vec<Quote> = holdings.to_vec();
    turnover.sort_by(|a, b| b.turnover().partial_cmp(&a.turnover()).unwrap_or(Ordering::Equal));
    turnover.truncate(n);

    (gainers, losers, turnover)
}

#[derive(Clone)]
pub struct YahooFinance {
    client: reqwest::Client,
    markets: Arc<MarketsCfg>,
    item_timeout: Duration,
}

impl YahooFinance {
    pub fn new(markets: MarketsCfg, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                 AppleWebKit/537.36 (KHTML, like Gecko) \
                 Chrome/120.0.0.0 Safari/537.36",
            )
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .context("building yahoo http client")?;
        Ok(Self {
            client,
            markets: Arc::new(markets),
            item_timeout: timeout,
        })
    }

    fn market_cfg(&self, market: Market) -> &MarketCfg {
        match market {
            Market::Us => &self.markets.us,
            Market::Kr => &self.markets.kr,
        }
    }

    async fn chart(&self, symbol: &str) -> Result<ChartSeries> {
        let url = format!("{CHART_URL}/{symbol}");
        let body = self
            .client
            .get(&url)
            .query(&[("range", "5d"), ("interval", "1d")])
            .send()
            .await
            .with_context(|| format!("yahoo chart get() for {symbol}"))?
            .error_for_status()
            .with_context(|| format!("yahoo chart status for {symbol}"))?
            .text()
            .await
            .context("yahoo chart .text()")?;
        parse_chart(&body)
    }

    async fn news(&self, query: &str, count: usize) -> Result<Vec<NewsItem>> {
        let count = count.to_string();
        let body = self
            .client
            .get(SEARCH_URL)
            .query(&[("q", query), ("newsCount", count.as_str()), ("quotesCount", "0")])
            .send()
            .await
            .context("yahoo search get()")?
            .error_for_status()
            .context("yahoo search status")?
            .text()
            .await
            .context("yahoo search .text()")?;
        parse_news(query, &body)
    }

    /// Provider symbol for an identifier on `market`.
    fn provider_symbol(market: Market, identifier: &str) -> String {
        match market {
            Market::Us => identifier.trim().to_ascii_uppercase(),
            Market::Kr => listings::yahoo_symbol(identifier),
        }
    }

    async fn quote(&self, market: Market, identifier: &str, name: Option<&str>) -> Result<Quote> {
        let series = self.chart(&Self::provider_symbol(market, identifier)).await?;
        let display = name
            .map(str::to_string)
            .or_else(|| match market {
                Market::Kr => listings::by_code(identifier).map(|l| l.name.to_string()),
                Market::Us => None,
            })
            .or(series.name.clone())
            .unwrap_or_else(|| identifier.to_string());
        Quote::from_closes(identifier, display, &series.closes, series.last_volume)
            .ok_or_else(|| anyhow!("no closes for {identifier}"))
    }

    async fn index(&self, ix: &Instrument) -> Result<IndexSnapshot> {
        let series = self.chart(&ix.symbol).await?;
        IndexSnapshot::from_closes(&ix.name, &series.closes)
            .ok_or_else(|| anyhow!("no closes for {}", ix.symbol))
    }
}

#[async_trait]
impl Source<Market, MarketSnapshot> for YahooFinance {
    async fn fetch(&self, market: &Market) -> Result<MarketSnapshot> {
        let market = *market;
        let cfg = self.market_cfg(market);

        let news = async {
            if cfg.news_query.is_empty() || self.markets.news_count == 0 {
                return Ok(Vec::new());
            }
            match tokio::time::timeout(
                self.item_timeout,
                self.news(&cfg.news_query, self.markets.news_count),
            )
            .await
            {
                Ok(res) => res,
                Err(_) => Err(anyhow!("timed out after {:?}", self.item_timeout)),
            }
        };
        let ((indices, ix_attempts), (holdings, h_attempts), news) = tokio::join!(
            fetch_each(
                "yahoo",
                cfg.indices.clone(),
                self.item_timeout,
                |ix| ix.symbol.clone(),
                |ix| {
                    let this = self.clone();
                    async move { this.index(&ix).await }
                },
            ),
            fetch_each(
                "yahoo",
                cfg.holdings.clone(),
                self.item_timeout,
                |h| h.symbol.clone(),
                |h| {
                    let this = self.clone();
                    async move { this.quote(market, &h.symbol, Some(&h.name)).await }
                },
            ),
            news,
        );

        let mut snap = MarketSnapshot {
            indices,
            holdings,
            ..Default::default()
        };
        // Best effort: news never decides whether the snapshot failed.
        match news {
            Ok(news) => snap.news = news,
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, %market, "yahoo market news failed")
            }
        }

        if market == Market::Kr {
            let (gainers, losers, turnover) = leaderboards(&snap.holdings, LEADERBOARD_SIZE);
            snap.gainers = gainers;
            snap.losers = losers;
            snap.turnover_leaders = turnover;
        }

        ix_attempts.merge(h_attempts).finish(snap)
    }

    fn name(&self) -> &'static str {
        "yahoo_market"
    }
}

#[async_trait]
impl Source<QuoteRequest, Vec<Quote>> for YahooFinance {
    async fn fetch(&self, req: &QuoteRequest) -> Result<Vec<Quote>> {
        let market = req.market;
        let (quotes, attempts) = fetch_each(
            "yahoo",
            req.identifiers.clone(),
            self.item_timeout,
            |id| id.clone(),
            |id| {
                let this = self.clone();
                async move { this.quote(market, &id, None).await }
            },
        )
        .await;
        attempts.finish(quotes)
    }

    fn name(&self) -> &'static str {
        "yahoo_quotes"
    }
}

#[async_trait]
impl Source<(), Vec<FxRate>> for YahooFinance {
    async fn fetch(&self, _query: &()) -> Result<Vec<FxRate>> {
        let (rates, attempts) = fetch_each(
            "yahoo",
            self.markets.fx.clone(),
            self.item_timeout,
            |fx| fx.symbol.clone(),
            |fx| {
                let this = self.clone();
                async move {
                    this.index(&fx).await.map(|ix| FxRate {
                        name: ix.name,
                        price: ix.close,
                        change_pct: ix.change_pct,
                    })
                }
            },
        )
        .await;
        attempts.finish(rates)
    }

    fn name(&self) -> &'static str {
        "yahoo_fx"
    }
}
