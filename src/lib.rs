// Public library surface for the binary, integration tests and other hosts.

pub mod analyze;
pub mod api;
pub mod config;
pub mod ingest;
pub mod listings;
pub mod merge;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod render;

use anyhow::Context;

pub use crate::api::router;
pub use crate::model::BriefingDocument;
pub use crate::pipeline::BriefingPipeline;

use crate::analyze::{build_generator, EntityExtractor};
use crate::config::{AiConfig, BriefingConfig};

impl BriefingPipeline {
    /// Wire the production pipeline from config files and environment.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = BriefingConfig::load().context("loading briefing config")?;
        let ai = AiConfig::load();
        let sources = ingest::providers::default_sources(&config)?;
        let extractor = EntityExtractor::new(build_generator(&ai));
        tracing::info!(
            target: "pipeline",
            extractor = extractor.provider_name(),
            keywords = config.news.keywords.len(),
            "pipeline configured"
        );
        Ok(Self::new(sources, extractor, config))
    }
}

/// One-shot run with the production wiring.
pub async fn build_daily_briefing() -> anyhow::Result<BriefingDocument> {
    BriefingPipeline::from_env()?.build_daily_briefing().await
}

/// One-shot run with the production wiring, rendered to text.
pub async fn build_daily_briefing_text() -> anyhow::Result<String> {
    BriefingPipeline::from_env()?.build_daily_briefing_text().await
}
