use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::model::{BriefingDocument, FxRate, Market, MarketSnapshot};
use crate::pipeline::BriefingPipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<BriefingPipeline>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/daily-briefing", get(daily_briefing))
        .route("/api/daily-briefing/text", get(daily_briefing_text))
        .route("/api/kr-market", get(kr_market))
        .route("/api/us-market", get(us_market))
        .route("/api/forex", get(forex))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Any hard failure maps to `500 {"detail": "..."}`.
pub struct ApiError(anyhow::Error);

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::warn!(target: "api", error = ?self.0, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": format!("{:#}", self.0) })),
        )
            .into_response()
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "timestamp": Utc::now().to_rfc3339() }))
}

async fn daily_briefing(State(state): State<AppState>) -> Result<Json<BriefingDocument>, ApiError> {
    Ok(Json(state.pipeline.build_daily_briefing().await?))
}

async fn daily_briefing_text(State(state): State<AppState>) -> Result<String, ApiError> {
    Ok(state.pipeline.build_daily_briefing_text().await?)
}

async fn kr_market(State(state): State<AppState>) -> Result<Json<MarketSnapshot>, ApiError> {
    Ok(Json(state.pipeline.market_snapshot(Market::Kr).await?))
}

async fn us_market(State(state): State<AppState>) -> Result<Json<MarketSnapshot>, ApiError> {
    Ok(Json(state.pipeline.market_snapshot(Market::Us).await?))
}

async fn forex(State(state): State<AppState>) -> Result<Json<Vec<FxRate>>, ApiError> {
    Ok(Json(state.pipeline.fx_rates().await?))
}
