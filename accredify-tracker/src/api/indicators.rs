//! Indicator endpoints: evidence intake, evidence state, completion

use accredify_common::time;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::db;
use crate::models::{CompletionVerdict, Evidence, EvidenceState, Indicator, IndicatorPatch, NewEvidence};
use crate::services::{can_complete, evaluate, indicator_catalog, mark_compliant, review_workflow, CompletionOutcome};
use crate::{ApiResult, AppState};

/// Indicator plus its computed evidence state
#[derive(Debug, Serialize)]
pub struct IndicatorView {
    #[serde(flatten)]
    pub indicator: Indicator,
    pub evidence_state: EvidenceState,
    pub evidence_count: usize,
}

#[derive(Debug, Serialize)]
pub struct EvidenceStateResponse {
    pub indicator_id: Uuid,
    pub evidence_state: EvidenceState,
    pub can_complete: CompletionVerdict,
}

/// PATCH /indicators/:id
///
/// Edits status (except `Compliant`), evidence type, scheduling and free-text
/// fields. Answers with the indicator and its current evidence state.
pub async fn update_indicator(
    State(state): State<AppState>,
    Path(indicator_id): Path<Uuid>,
    Json(payload): Json<IndicatorPatch>,
) -> ApiResult<Json<IndicatorView>> {
    let indicator = indicator_catalog::update_indicator(&state.db, indicator_id, payload).await?;

    let mut conn = state.db.acquire().await.map_err(accredify_common::Error::from)?;
    let evidence = db::evidence::list_for_indicator(&mut conn, indicator_id).await?;

    Ok(Json(IndicatorView {
        evidence_state: evaluate(&indicator, &evidence),
        evidence_count: evidence.len(),
        indicator,
    }))
}

/// POST /indicators/:id/evidence
pub async fn add_evidence(
    State(state): State<AppState>,
    Path(indicator_id): Path<Uuid>,
    Json(payload): Json<NewEvidence>,
) -> ApiResult<(StatusCode, Json<Evidence>)> {
    let evidence = review_workflow::add_evidence(&state.db, indicator_id, payload).await?;
    Ok((StatusCode::CREATED, Json(evidence)))
}

/// GET /indicators/:id/evidence-state
pub async fn evidence_state(
    State(state): State<AppState>,
    Path(indicator_id): Path<Uuid>,
) -> ApiResult<Json<EvidenceStateResponse>> {
    let mut conn = state.db.acquire().await.map_err(accredify_common::Error::from)?;
    let indicator = db::indicators::require(&mut conn, indicator_id).await?;
    let evidence = db::evidence::list_for_indicator(&mut conn, indicator_id).await?;

    let verdict = can_complete(&indicator, &evidence);
    Ok(Json(EvidenceStateResponse {
        indicator_id,
        evidence_state: verdict.evidence_state,
        can_complete: verdict,
    }))
}

/// POST /indicators/:id/complete
///
/// 200 with the updated indicator, or 409 with the gate's reason.
pub async fn complete_indicator(
    State(state): State<AppState>,
    Path(indicator_id): Path<Uuid>,
) -> ApiResult<Response> {
    let outcome = mark_compliant(&state.db, indicator_id, time::today(), state.scheduler.as_ref()).await?;

    let response = match outcome {
        CompletionOutcome::Completed { indicator } => (StatusCode::OK, Json(json!({ "indicator": indicator }))),
        CompletionOutcome::Blocked(verdict) => (
            StatusCode::CONFLICT,
            Json(json!({
                "error": {
                    "code": "COMPLETION_BLOCKED",
                    "message": verdict.reason,
                },
                "evidence_state": verdict.evidence_state,
            })),
        ),
    };

    Ok(response.into_response())
}

/// Build indicator routes
pub fn indicator_routes() -> Router<AppState> {
    Router::new()
        .route("/indicators/:id", patch(update_indicator))
        .route("/indicators/:id/evidence", post(add_evidence))
        .route("/indicators/:id/evidence-state", get(evidence_state))
        .route("/indicators/:id/complete", post(complete_indicator))
}
