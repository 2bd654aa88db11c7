// tests/common/mod.rs
//
// In-memory sources and generator for driving the pipeline without network.
// Every mock records its calls in a shared `CallLog` before doing anything
// else, so tests can assert which calls happened (and with what input).
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use daily_briefing::analyze::ai_adapter::{GenerateFuture, TextGenerator};
use daily_briefing::analyze::EntityExtractor;
use daily_briefing::config::BriefingConfig;
use daily_briefing::ingest::{QuoteRequest, Source, Sources};
use daily_briefing::listings;
use daily_briefing::model::{
    FxRate, IndexSnapshot, Market, MarketSnapshot, NewsItem, Quote, Rating, SearchResult,
};
use daily_briefing::pipeline::BriefingPipeline;

pub const SHARED_URL: &str = "https://news.example/shared";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    Ok,
    Fail,
    Delay(Duration),
}

impl Behavior {
    async fn apply(self, source: &str) -> Result<()> {
        match self {
            Behavior::Ok => Ok(()),
            Behavior::Fail => Err(anyhow!("{source} unavailable")),
            Behavior::Delay(d) => {
                tokio::time::sleep(d).await;
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub source: &'static str,
    pub query: Vec<String>,
}

#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    fn push(&self, source: &'static str, query: Vec<String>) {
        self.0.lock().unwrap().push(Call { source, query });
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    /// Queries passed to `source`, in call order.
    pub fn calls_to(&self, source: &str) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|c| c.source == source)
            .map(|c| c.query)
            .collect()
    }
}

pub fn news(keyword: &str, headline: &str) -> NewsItem {
    NewsItem {
        keyword: keyword.into(),
        headline: headline.into(),
        source: "테스트일보".into(),
        published: "2026-10-19 07:00".into(),
    }
}

pub fn quote(id: &str, name: &str, prev: f64, close: f64) -> Quote {
    Quote::from_closes(id, name, &[Some(prev), Some(close)], 1_000).unwrap()
}

pub fn sample_headlines() -> Vec<NewsItem> {
    vec![
        news("반도체", "AMD, 신규 AI 가속기 공개"),
        news("반도체", "삼성SDI, 전고체 배터리 수주"),
        news("반도체", "AMD, 신규 AI 가속기 공개"),
        news("금리", "연준, 기준금리 동결"),
    ]
}

pub fn us_snapshot() -> MarketSnapshot {
    MarketSnapshot {
        indices: vec![IndexSnapshot {
            name: "S&P500".into(),
            close: 5800.0,
            change_pct: Some(0.5),
        }],
        holdings: vec![
            quote("AAPL", "Apple", 225.0, 230.0),
            quote("NVDA", "NVIDIA", 140.0, 137.2),
        ],
        news: vec![
            news("stock market", "Stocks close higher"),
            news("stock market", "Fed holds rates"),
        ],
        ..Default::default()
    }
}

pub fn kr_snapshot() -> MarketSnapshot {
    let samsung = quote("005930", "삼성전자", 70_000.0, 71_400.0);
    MarketSnapshot {
        indices: vec![IndexSnapshot {
            name: "KOSPI".into(),
            close: 2600.0,
            change_pct: Some(-0.25),
        }],
        holdings: vec![samsung.clone()],
        gainers: vec![samsung.clone()],
        turnover_leaders: vec![samsung],
        news: vec![
            news("KOSPI", "Fed holds rates"),
            news("KOSPI", "코스피 상승 마감"),
        ],
        ..Default::default()
    }
}

pub struct MockHeadlines {
    pub behavior: Behavior,
    pub log: CallLog,
}

#[async_trait]
impl Source<[String], Vec<NewsItem>> for MockHeadlines {
    async fn fetch(&self, keywords: &[String]) -> Result<Vec<NewsItem>> {
        self.log.push("headlines", keywords.to_vec());
        self.behavior.apply("headlines").await?;
        Ok(sample_headlines())
    }
    fn name(&self) -> &'static str {
        "mock_headlines"
    }
}

pub struct MockMarket {
    pub us: Behavior,
    pub kr: Behavior,
    pub log: CallLog,
}

#[async_trait]
impl Source<Market, MarketSnapshot> for MockMarket {
    async fn fetch(&self, market: &Market) -> Result<MarketSnapshot> {
        self.log.push("market", vec![market.to_string()]);
        match market {
            Market::Us => {
                self.us.apply("us market").await?;
                Ok(us_snapshot())
            }
            Market::Kr => {
                self.kr.apply("kr market").await?;
                Ok(kr_snapshot())
            }
        }
    }
    fn name(&self) -> &'static str {
        "mock_market"
    }
}

pub struct MockFx {
    pub behavior: Behavior,
    pub log: CallLog,
}

#[async_trait]
impl Source<(), Vec<FxRate>> for MockFx {
    async fn fetch(&self, _query: &()) -> Result<Vec<FxRate>> {
        self.log.push("fx", Vec::new());
        self.behavior.apply("fx").await?;
        Ok(vec![FxRate {
            name: "USD/KRW".into(),
            price: 1385.2,
            change_pct: Some(0.12),
        }])
    }
    fn name(&self) -> &'static str {
        "mock_fx"
    }
}

/// Behavior for a call on the configured (fixed) list vs. any other list
/// (discovered entities).
pub struct Split {
    pub fixed_input: Vec<String>,
    pub fixed: Behavior,
    pub discovered: Behavior,
}

impl Split {
    fn pick(&self, input: &[String]) -> Behavior {
        if input == self.fixed_input.as_slice() {
            self.fixed
        } else {
            self.discovered
        }
    }
}

/// One hit per query plus a hit on `SHARED_URL` for every query.
pub struct MockSearch {
    pub behavior: Split,
    pub log: CallLog,
}

#[async_trait]
impl Source<[String], Vec<SearchResult>> for MockSearch {
    async fn fetch(&self, queries: &[String]) -> Result<Vec<SearchResult>> {
        self.log.push("deep_search", queries.to_vec());
        self.behavior.pick(queries).apply("deep search").await?;
        Ok(queries
            .iter()
            .flat_map(|q| {
                [
                    SearchResult {
                        keyword: q.clone(),
                        title: format!("{q} outlook"),
                        content: format!("Analysis of {q}."),
                        url: format!("https://news.example/{q}"),
                    },
                    SearchResult {
                        keyword: q.clone(),
                        title: "Shared story".into(),
                        content: "Appears for every query.".into(),
                        url: SHARED_URL.into(),
                    },
                ]
            })
            .collect())
    }
    fn name(&self) -> &'static str {
        "mock_search"
    }
}

pub struct MockRatings {
    pub behavior: Split,
    pub log: CallLog,
}

#[async_trait]
impl Source<[String], Vec<Rating>> for MockRatings {
    async fn fetch(&self, symbols: &[String]) -> Result<Vec<Rating>> {
        self.log.push("ratings", symbols.to_vec());
        self.behavior.pick(symbols).apply("ratings").await?;
        Ok(symbols
            .iter()
            .map(|s| Rating {
                symbol: s.clone(),
                wall_street: Some(4.0),
                quant: Some(3.5),
                authors: None,
            })
            .collect())
    }
    fn name(&self) -> &'static str {
        "mock_ratings"
    }
}

pub struct MockQuotes {
    pub behavior: Behavior,
    pub log: CallLog,
}

#[async_trait]
impl Source<QuoteRequest, Vec<Quote>> for MockQuotes {
    async fn fetch(&self, req: &QuoteRequest) -> Result<Vec<Quote>> {
        let label = match req.market {
            Market::Us => "quotes_us",
            Market::Kr => "quotes_kr",
        };
        self.log.push(label, req.identifiers.clone());
        self.behavior.apply(label).await?;
        Ok(req
            .identifiers
            .iter()
            .map(|id| {
                let name = listings::by_code(id).map(|l| l.name).unwrap_or(id.as_str());
                quote(id, name, 100.0, 101.0)
            })
            .collect())
    }
    fn name(&self) -> &'static str {
        "mock_quotes"
    }
}

/// Fixed reply, call counter, optional failure/delay.
pub struct CountingGenerator {
    pub reply: String,
    pub behavior: Behavior,
    pub calls: Arc<AtomicUsize>,
}

impl TextGenerator for CountingGenerator {
    fn generate<'a>(&'a self, _system: &'a str, _prompt: &'a str) -> GenerateFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.behavior.apply("generator").await?;
            Ok::<String, anyhow::Error>(self.reply.clone())
        })
    }
    fn provider_name(&self) -> &'static str {
        "counting"
    }
}

pub const DEFAULT_REPLY: &str = r#"{"us_tickers": ["AMD"], "kr_companies": ["삼성SDI"]}"#;

/// Per-source behavior switches; everything succeeds by default.
pub struct Harness {
    pub log: CallLog,
    pub generator_calls: Arc<AtomicUsize>,
    pub reply: String,
    pub generator: Behavior,
    pub headlines: Behavior,
    pub us_market: Behavior,
    pub kr_market: Behavior,
    pub fx: Behavior,
    pub deep_search: Behavior,
    pub ratings: Behavior,
    /// Wave C deep search / ratings; the fields above cover Wave B.
    pub discovered_search: Behavior,
    pub discovered_ratings: Behavior,
    pub quotes: Behavior,
}

impl Default for Harness {
    fn default() -> Self {
        Self {
            log: CallLog::default(),
            generator_calls: Arc::new(AtomicUsize::new(0)),
            reply: DEFAULT_REPLY.to_string(),
            generator: Behavior::Ok,
            headlines: Behavior::Ok,
            us_market: Behavior::Ok,
            kr_market: Behavior::Ok,
            fx: Behavior::Ok,
            deep_search: Behavior::Ok,
            ratings: Behavior::Ok,
            discovered_search: Behavior::Ok,
            discovered_ratings: Behavior::Ok,
            quotes: Behavior::Ok,
        }
    }
}

impl Harness {
    pub fn with_reply(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            ..Self::default()
        }
    }

    /// Defaults with 2 s source / extraction timeouts.
    pub fn config() -> BriefingConfig {
        let mut cfg = BriefingConfig::default();
        cfg.sources.timeout_secs = 2;
        cfg.sources.extract_timeout_secs = 2;
        cfg
    }

    pub fn sources(&self) -> Sources {
        let cfg = Self::config();
        Sources {
            headlines: Arc::new(MockHeadlines {
                behavior: self.headlines,
                log: self.log.clone(),
            }),
            market: Arc::new(MockMarket {
                us: self.us_market,
                kr: self.kr_market,
                log: self.log.clone(),
            }),
            fx: Arc::new(MockFx {
                behavior: self.fx,
                log: self.log.clone(),
            }),
            deep_search: Arc::new(MockSearch {
                behavior: Split {
                    fixed_input: cfg.deep_search.queries,
                    fixed: self.deep_search,
                    discovered: self.discovered_search,
                },
                log: self.log.clone(),
            }),
            ratings: Arc::new(MockRatings {
                behavior: Split {
                    fixed_input: cfg.ratings.symbols,
                    fixed: self.ratings,
                    discovered: self.discovered_ratings,
                },
                log: self.log.clone(),
            }),
            quotes: Arc::new(MockQuotes {
                behavior: self.quotes,
                log: self.log.clone(),
            }),
        }
    }

    pub fn pipeline(&self) -> BriefingPipeline {
        let generator = CountingGenerator {
            reply: self.reply.clone(),
            behavior: self.generator,
            calls: self.generator_calls.clone(),
        };
        BriefingPipeline::new(
            self.sources(),
            EntityExtractor::new(Arc::new(generator)),
            Self::config(),
        )
    }

    pub fn generator_calls(&self) -> usize {
        self.generator_calls.load(Ordering::SeqCst)
    }
}
