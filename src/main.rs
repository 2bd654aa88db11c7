//! Daily briefing service: binary entrypoint.
//! Boots the Axum HTTP server with the production pipeline and `/metrics`.

use std::sync::Arc;

use daily_briefing::api::{self, AppState};
use daily_briefing::metrics::Metrics;
use daily_briefing::BriefingPipeline;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Events log under short targets, not the crate path.
const DEFAULT_LOG_FILTER: &str = "warn,daily_briefing=info,pipeline=info,extract=info,ingest=info,api=info,config=info";

/// Compact logs by default, JSON when `BRIEFING_LOG_FORMAT=json`.
/// Uses `try_init` so a subscriber installed by the host runtime wins.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let json = std::env::var("BRIEFING_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let metrics = Metrics::init()?;
    let pipeline = BriefingPipeline::from_env()?;

    let state = AppState {
        pipeline: Arc::new(pipeline),
    };
    let router = api::router(state).merge(metrics.router());

    Ok(router.into())
}
