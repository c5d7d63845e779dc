//! Checklist analysis through the enrichment collaborator

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::services::IndicatorSketch;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize, Serialize)]
pub struct AnalyzeChecklistRequest {
    pub indicators: Vec<IndicatorSketch>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AnalyzeChecklistResponse {
    pub indicators: Vec<IndicatorSketch>,
}

/// POST /ai/analyze-checklist
///
/// Never fails because of the enrichment service; at worst the input comes
/// back unchanged.
pub async fn analyze_checklist(
    State(state): State<AppState>,
    Json(payload): Json<AnalyzeChecklistRequest>,
) -> ApiResult<Json<AnalyzeChecklistResponse>> {
    if payload.indicators.iter().any(|s| s.indicator.trim().is_empty()) {
        return Err(ApiError::BadRequest(
            "Every indicator needs non-empty indicator text".to_string(),
        ));
    }

    let indicators = state.enricher.enrich(payload.indicators).await;
    Ok(Json(AnalyzeChecklistResponse { indicators }))
}

pub fn ai_routes() -> Router<AppState> {
    Router::new().route("/ai/analyze-checklist", post(analyze_checklist))
}
