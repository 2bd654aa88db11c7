// src/merge.rs
//! Combine fixed-universe and discovered-entity results into one document.

use std::collections::HashSet;
use std::hash::Hash;

use chrono::{DateTime, Utc};

use crate::model::{
    BriefingDocument, EntitySet, FxRate, MarketSection, MarketSnapshot, NewsItem, Origin, Quote,
    Rating, SearchResult,
};

/// Wave A + Wave B outputs (statically known universe).
#[derive(Debug, Clone, Default)]
pub struct FixedResults {
    pub headlines: Vec<NewsItem>,
    pub us: MarketSnapshot,
    pub kr: MarketSnapshot,
    pub fx: Vec<FxRate>,
    pub deep_search: Vec<SearchResult>,
    pub ratings: Vec<Rating>,
}

/// Wave C outputs, keyed on the extracted entity set.
#[derive(Debug, Clone, Default)]
pub struct DiscoveredResults {
    pub entities: EntitySet,
    pub us_quotes: Vec<Quote>,
    pub kr_quotes: Vec<Quote>,
    pub deep_search: Vec<SearchResult>,
    pub ratings: Vec<Rating>,
}

/// Keep the first item for every key, preserving order of first appearance.
pub fn dedup_first_by<T, K, F>(items: impl IntoIterator<Item = T>, mut key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: FnMut(&T) -> K,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|it| seen.insert(key(it)))
        .collect()
}

pub fn dedup_headlines(items: impl IntoIterator<Item = NewsItem>) -> Vec<NewsItem> {
    dedup_first_by(items, |n| n.headline.clone())
}

pub fn dedup_by_url(items: impl IntoIterator<Item = SearchResult>) -> Vec<SearchResult> {
    dedup_first_by(items, |r| r.url.clone())
}

/// Fixed quotes first, then discovered ones. A discovered quote never
/// replaces a fixed one with the same identifier.
pub fn merge_quotes(fixed: Vec<Quote>, discovered: Vec<Quote>) -> Vec<Quote> {
    let tagged = fixed
        .into_iter()
        .map(|q| Quote {
            origin: Origin::Fixed,
            ..q
        })
        .chain(discovered.into_iter().map(|q| Quote {
            origin: Origin::Discovered,
            ..q
        }));
    dedup_first_by(tagged, |q| q.identifier.trim().to_ascii_uppercase())
}

fn section(snap: MarketSnapshot, discovered: Vec<Quote>) -> MarketSection {
    MarketSection {
        indices: snap.indices,
        holdings: merge_quotes(snap.holdings, discovered),
        investor_flow: snap.investor_flow,
        gainers: snap.gainers,
        losers: snap.losers,
        turnover_leaders: snap.turnover_leaders,
    }
}

pub fn merge(
    fixed: FixedResults,
    discovered: DiscoveredResults,
    generated_at: DateTime<Utc>,
) -> BriefingDocument {
    let FixedResults {
        headlines,
        mut us,
        mut kr,
        fx,
        deep_search,
        ratings,
    } = fixed;

    let market_news = dedup_headlines(
        std::mem::take(&mut us.news)
            .into_iter()
            .chain(std::mem::take(&mut kr.news)),
    );

    let mut all_ratings = ratings;
    all_ratings.extend(discovered.ratings);

    BriefingDocument {
        generated_at,
        discovered: discovered.entities,
        us_market: section(us, discovered.us_quotes),
        kr_market: section(kr, discovered.kr_quotes),
        fx,
        headlines: dedup_headlines(headlines),
        deep_search: dedup_by_url(deep_search.into_iter().chain(discovered.deep_search)),
        ratings: all_ratings,
        market_news,
    }
}
