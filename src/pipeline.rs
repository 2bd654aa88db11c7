// src/pipeline.rs
//! Fan-out orchestration for one briefing run.
//!
//! Wave A: fixed-keyword headlines (fatal on failure).
//! Wave B: entity extraction + every fixed-universe source, concurrently.
//! Wave C: quotes / deep search / ratings for discovered entities, concurrently.
//!
//! Every in-wave task yields a [`TaskOutcome`]; anything but `Done` becomes
//! the task's empty default, so a wave never aborts.

use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use metrics::{counter, gauge, histogram};
use tracing::{info, warn};

use crate::analyze::EntityExtractor;
use crate::config::BriefingConfig;
use crate::ingest::{QuoteRequest, Sources};
use crate::listings;
use crate::merge::{merge, DiscoveredResults, FixedResults};
use crate::model::{BriefingDocument, EntitySet, FxRate, Market, MarketSnapshot};
use crate::render::render;

/// Discovered US tickers / KR companies considered for quotes.
pub const MAX_DISCOVERED_QUOTES: usize = 5;
/// Discovered entities (US + KR combined) sent to deep search.
pub const MAX_DISCOVERED_SEARCHES: usize = 3;
/// Discovered US tickers sent to the ratings source.
pub const MAX_DISCOVERED_RATINGS: usize = 3;

/// Tagged result of one bounded task.
#[derive(Debug)]
pub enum TaskOutcome<T> {
    Done(T),
    Failed(anyhow::Error),
    TimedOut(Duration),
}

impl<T> TaskOutcome<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, TaskOutcome::Done(_))
    }

    /// For callers where a failure is fatal.
    pub fn into_result(self, task: &str) -> Result<T> {
        match self {
            TaskOutcome::Done(v) => Ok(v),
            TaskOutcome::Failed(e) => Err(e.context(format!("{task} failed"))),
            TaskOutcome::TimedOut(limit) => Err(anyhow!("{task} timed out after {limit:?}")),
        }
    }
}

impl<T: Default> TaskOutcome<T> {
    /// Swallow a failure: log it, count it, hand back the empty default.
    pub fn or_default(self, task: &'static str) -> T {
        match self {
            TaskOutcome::Done(v) => v,
            TaskOutcome::Failed(e) => {
                warn!(target: "pipeline", task, error = ?e, "task failed; section omitted");
                counter!("briefing_task_failures_total", "task" => task).increment(1);
                T::default()
            }
            TaskOutcome::TimedOut(limit) => {
                warn!(target: "pipeline", task, ?limit, "task timed out; section omitted");
                counter!("briefing_task_failures_total", "task" => task).increment(1);
                T::default()
            }
        }
    }
}

/// Await `fut` for at most `limit`.
pub async fn run_task<T, F>(limit: Duration, fut: F) -> TaskOutcome<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(v)) => TaskOutcome::Done(v),
        Ok(Err(e)) => TaskOutcome::Failed(e),
        Err(_) => TaskOutcome::TimedOut(limit),
    }
}

/// Like [`run_task`], but an empty input short-circuits to the default
/// without polling `fut`.
async fn run_unless_empty<T, F>(empty: bool, limit: Duration, fut: F) -> TaskOutcome<T>
where
    T: Default,
    F: Future<Output = Result<T>>,
{
    if empty {
        return TaskOutcome::Done(T::default());
    }
    run_task(limit, fut).await
}

/// Wave C inputs derived from an [`EntitySet`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryPlan {
    pub us_quotes: Vec<String>,
    /// Exchange codes; names without a listing are dropped.
    pub kr_quotes: Vec<String>,
    pub deep_search: Vec<String>,
    pub ratings: Vec<String>,
}

impl DiscoveryPlan {
    pub fn from_entities(set: &EntitySet) -> Self {
        let kr_quotes = set
            .kr_companies
            .iter()
            .take(MAX_DISCOVERED_QUOTES)
            .filter_map(|name| match listings::by_name(name) {
                Some(l) => Some(l.code.to_string()),
                None => {
                    info!(target: "pipeline", company = %name, "no listing for discovered company; skipped");
                    None
                }
            })
            .collect();

        Self {
            us_quotes: set
                .us_tickers
                .iter()
                .take(MAX_DISCOVERED_QUOTES)
                .cloned()
                .collect(),
            kr_quotes,
            deep_search: set
                .us_tickers
                .iter()
                .chain(set.kr_companies.iter())
                .take(MAX_DISCOVERED_SEARCHES)
                .cloned()
                .collect(),
            ratings: set
                .us_tickers
                .iter()
                .take(MAX_DISCOVERED_RATINGS)
                .cloned()
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.us_quotes.is_empty()
            && self.kr_quotes.is_empty()
            && self.deep_search.is_empty()
            && self.ratings.is_empty()
    }
}

pub struct BriefingPipeline {
    sources: Sources,
    extractor: EntityExtractor,
    config: BriefingConfig,
}

impl BriefingPipeline {
    pub fn new(sources: Sources, extractor: EntityExtractor, config: BriefingConfig) -> Self {
        Self {
            sources,
            extractor,
            config,
        }
    }

    pub fn config(&self) -> &BriefingConfig {
        &self.config
    }

    /// Run all waves and merge. Fails only if headline retrieval fails.
    pub async fn build_daily_briefing(&self) -> Result<BriefingDocument> {
        crate::metrics::describe();
        counter!("briefing_runs_total").increment(1);
        let started = Instant::now();

        let res = self.run().await;

        let ms = started.elapsed().as_secs_f64() * 1000.0;
        histogram!("briefing_run_ms").record(ms);
        match &res {
            Ok(doc) => info!(
                target: "pipeline",
                ms,
                headlines = doc.headlines.len(),
                discovered = doc.discovered.len(),
                "briefing built"
            ),
            Err(e) => {
                counter!("briefing_failures_total").increment(1);
                warn!(target: "pipeline", error = ?e, ms, "briefing failed");
            }
        }
        res
    }

    /// [`build_daily_briefing`](Self::build_daily_briefing), rendered to text.
    pub async fn build_daily_briefing_text(&self) -> Result<String> {
        let doc = self.build_daily_briefing().await?;
        render(&doc).map_err(|e| {
            counter!("briefing_failures_total").increment(1);
            anyhow!("rendering briefing: {e}")
        })
    }

    /// Single market snapshot, outside any wave: failure is returned.
    pub async fn market_snapshot(&self, market: Market) -> Result<MarketSnapshot> {
        run_task(self.config.source_timeout(), self.sources.market.fetch(&market))
            .await
            .into_result(self.sources.market.name())
    }

    /// FX/commodity rates, outside any wave: failure is returned.
    pub async fn fx_rates(&self) -> Result<Vec<FxRate>> {
        run_task(self.config.source_timeout(), self.sources.fx.fetch(&()))
            .await
            .into_result(self.sources.fx.name())
    }

    async fn run(&self) -> Result<BriefingDocument> {
        let limit = self.config.source_timeout();

        // Wave A
        let headlines = run_task(limit, self.sources.headlines.fetch(&self.config.news.keywords))
            .await
            .into_result(self.sources.headlines.name())
            .context("fixed-keyword headline retrieval")?;
        info!(target: "pipeline", count = headlines.len(), "wave A done");

        // Wave B
        let fixed_entities = self.config.fixed_entities();
        let (entities, kr, us, fx, deep_search, ratings) = tokio::join!(
            run_task(
                self.config.extract_timeout(),
                self.extractor.try_extract(&headlines, &fixed_entities)
            ),
            run_task(limit, self.sources.market.fetch(&Market::Kr)),
            run_task(limit, self.sources.market.fetch(&Market::Us)),
            run_task(limit, self.sources.fx.fetch(&())),
            run_task(limit, self.sources.deep_search.fetch(&self.config.deep_search.queries)),
            run_task(limit, self.sources.ratings.fetch(&self.config.ratings.symbols)),
        );
        let entities: EntitySet = entities.or_default("extract");
        let fixed = FixedResults {
            headlines,
            kr: kr.or_default("kr_market"),
            us: us.or_default("us_market"),
            fx: fx.or_default("fx"),
            deep_search: deep_search.or_default("deep_search"),
            ratings: ratings.or_default("ratings"),
        };
        gauge!("briefing_discovered_entities").set(entities.len() as f64);
        info!(
            target: "pipeline",
            us = ?entities.us_tickers,
            kr = ?entities.kr_companies,
            "wave B done"
        );

        // Wave C
        let discovered = self.discover(entities, limit).await;

        Ok(merge(fixed, discovered, Utc::now()))
    }

    async fn discover(&self, entities: EntitySet, limit: Duration) -> DiscoveredResults {
        let plan = DiscoveryPlan::from_entities(&entities);
        if plan.is_empty() {
            return DiscoveredResults {
                entities,
                ..Default::default()
            };
        }

        let us_req = QuoteRequest {
            market: Market::Us,
            identifiers: plan.us_quotes.clone(),
        };
        let kr_req = QuoteRequest {
            market: Market::Kr,
            identifiers: plan.kr_quotes.clone(),
        };
        let (us_quotes, kr_quotes, deep_search, ratings) = tokio::join!(
            run_unless_empty(
                plan.us_quotes.is_empty(),
                limit,
                self.sources.quotes.fetch(&us_req)
            ),
            run_unless_empty(
                plan.kr_quotes.is_empty(),
                limit,
                self.sources.quotes.fetch(&kr_req)
            ),
            run_unless_empty(
                plan.deep_search.is_empty(),
                limit,
                self.sources.deep_search.fetch(&plan.deep_search)
            ),
            run_unless_empty(
                plan.ratings.is_empty(),
                limit,
                self.sources.ratings.fetch(&plan.ratings)
            ),
        );

        DiscoveredResults {
            entities,
            us_quotes: us_quotes.or_default("discovered_us_quotes"),
            kr_quotes: kr_quotes.or_default("discovered_kr_quotes"),
            deep_search: deep_search.or_default("discovered_deep_search"),
            ratings: ratings.or_default("discovered_ratings"),
        }
    }
}
