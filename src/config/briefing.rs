// src/config/briefing.rs
//! Pipeline + adapter configuration, loaded from TOML.
//!
//! Lookup order:
//! 1) `$BRIEFING_CONFIG_PATH` (must exist)
//! 2) `config/briefing.toml` (optional)
//! 3) built-in defaults
//!
//! Timeouts can then be overridden with `BRIEFING_SOURCE_TIMEOUT_SECS`,
//! `BRIEFING_EXTRACT_TIMEOUT_SECS` and `BRIEFING_ITEM_TIMEOUT_SECS`.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::model::FixedEntities;

pub const DEFAULT_BRIEFING_CONFIG_PATH: &str = "config/briefing.toml";
pub const ENV_BRIEFING_CONFIG_PATH: &str = "BRIEFING_CONFIG_PATH";
pub const ENV_SOURCE_TIMEOUT_SECS: &str = "BRIEFING_SOURCE_TIMEOUT_SECS";
pub const ENV_EXTRACT_TIMEOUT_SECS: &str = "BRIEFING_EXTRACT_TIMEOUT_SECS";
pub const ENV_ITEM_TIMEOUT_SECS: &str = "BRIEFING_ITEM_TIMEOUT_SECS";

/// A provider symbol plus the name shown in the briefing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub name: String,
}

impl Instrument {
    pub fn new(symbol: &str, name: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesCfg {
    /// Per-call bound for every adapter call.
    pub timeout_secs: u64,
    /// Bound for the single text-generation call.
    pub extract_timeout_secs: u64,
    /// Bound for one keyword/symbol/query inside an adapter call.
    pub item_timeout_secs: u64,
}

impl Default for SourcesCfg {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            extract_timeout_secs: 30,
            item_timeout_secs: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsCfg {
    pub keywords: Vec<String>,
    pub per_keyword: usize,
}

impl Default for NewsCfg {
    fn default() -> Self {
        Self {
            keywords: ["코스피", "코스닥", "나스닥", "환율", "반도체", "금리"]
                .into_iter()
                .map(String::from)
                .collect(),
            per_keyword: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeepSearchCfg {
    pub queries: Vec<String>,
    pub max_results: usize,
}

impl Default for DeepSearchCfg {
    fn default() -> Self {
        Self {
            queries: ["미국 증시 마감", "Federal Reserve rate outlook", "한국 증시 전망"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_results: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingsCfg {
    pub symbols: Vec<String>,
}

impl Default for RatingsCfg {
    fn default() -> Self {
        Self {
            symbols: ["AAPL", "MSFT", "NVDA", "TSLA", "GOOGL", "AMZN", "META"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Indices, fixed holdings and the market-news query of one market.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketCfg {
    pub indices: Vec<Instrument>,
    pub holdings: Vec<Instrument>,
    pub news_query: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketsCfg {
    pub us: MarketCfg,
    pub kr: MarketCfg,
    /// FX pairs and commodities.
    pub fx: Vec<Instrument>,
    /// Market-news items per market.
    pub news_count: usize,
}

impl Default for MarketsCfg {
    fn default() -> Self {
        Self {
            us: MarketCfg {
                indices: vec![
                    Instrument::new("^GSPC", "S&P500"),
                    Instrument::new("^IXIC", "NASDAQ"),
                    Instrument::new("^DJI", "DOW"),
                ],
                holdings: vec![
                    Instrument::new("AAPL", "Apple"),
                    Instrument::new("MSFT", "Microsoft"),
                    Instrument::new("NVDA", "NVIDIA"),
                    Instrument::new("TSLA", "Tesla"),
                    Instrument::new("GOOGL", "Google"),
                    Instrument::new("AMZN", "Amazon"),
                    Instrument::new("META", "Meta"),
                ],
                news_query: "stock market".to_string(),
            },
            kr: MarketCfg {
                indices: vec![
                    Instrument::new("^KS11", "KOSPI"),
                    Instrument::new("^KQ11", "KOSDAQ"),
                ],
                holdings: vec![
                    Instrument::new("005930", "삼성전자"),
                    Instrument::new("000660", "SK하이닉스"),
                    Instrument::new("005380", "현대차"),
                    Instrument::new("035420", "NAVER"),
                    Instrument::new("035720", "카카오"),
                ],
                news_query: "KOSPI".to_string(),
            },
            fx: vec![
                Instrument::new("KRW=X", "USD/KRW"),
                Instrument::new("GC=F", "Gold"),
                Instrument::new("CL=F", "WTI Oil"),
                Instrument::new("BTC-USD", "Bitcoin"),
            ],
            news_count: 8,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BriefingConfig {
    pub sources: SourcesCfg,
    pub news: NewsCfg,
    pub deep_search: DeepSearchCfg,
    pub ratings: RatingsCfg,
    pub markets: MarketsCfg,
}

impl BriefingConfig {
    /// Load using env var + fallbacks, then apply env overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_BRIEFING_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!(
                    "{ENV_BRIEFING_CONFIG_PATH} points to non-existent path {}",
                    pb.display()
                ));
            }
            Self::load_from(&pb)?
        } else {
            let default_p = PathBuf::from(DEFAULT_BRIEFING_CONFIG_PATH);
            if default_p.exists() {
                Self::load_from(&default_p)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading briefing config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing briefing config {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: BriefingConfig = toml::from_str(s)?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = parse_secs_env(ENV_SOURCE_TIMEOUT_SECS) {
            self.sources.timeout_secs = v;
        }
        if let Some(v) = parse_secs_env(ENV_EXTRACT_TIMEOUT_SECS) {
            self.sources.extract_timeout_secs = v;
        }
        if let Some(v) = parse_secs_env(ENV_ITEM_TIMEOUT_SECS) {
            self.sources.item_timeout_secs = v;
        }
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.sources.timeout_secs.max(1))
    }

    /// Per-item bound, never above the whole-call bound.
    pub fn item_timeout(&self) -> Duration {
        Duration::from_secs(
            self.sources
                .item_timeout_secs
                .min(self.sources.timeout_secs)
                .max(1),
        )
    }

    pub fn extract_timeout(&self) -> Duration {
        Duration::from_secs(self.sources.extract_timeout_secs.max(1))
    }

    /// Entities the Stage-1/2 adapters already cover: US holdings by ticker,
    /// KR holdings by company name.
    pub fn fixed_entities(&self) -> FixedEntities {
        FixedEntities {
            us_tickers: self
                .markets
                .us
                .holdings
                .iter()
                .map(|h| h.symbol.trim().to_ascii_uppercase())
                .collect(),
            kr_companies: self
                .markets
                .kr
                .holdings
                .iter()
                .map(|h| h.name.trim().to_string())
                .collect(),
        }
    }
}

fn parse_secs_env(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(v) if v > 0 => Some(v),
        _ => {
            tracing::warn!(target: "config", var = name, value = %raw, "ignoring invalid timeout override");
            None
        }
    }
}
