//! Evidence review endpoints

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::ActingUser;
use crate::models::Evidence;
use crate::services::review_workflow;
use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub reason: String,
}

/// POST /evidence/:id/submit
pub async fn submit_evidence(
    State(state): State<AppState>,
    Path(evidence_id): Path<Uuid>,
) -> ApiResult<Json<Evidence>> {
    let evidence = review_workflow::submit(&state.db, evidence_id).await?;
    Ok(Json(evidence))
}

/// POST /evidence/:id/accept
pub async fn accept_evidence(
    State(state): State<AppState>,
    Path(evidence_id): Path<Uuid>,
    ActingUser(reviewer): ActingUser,
) -> ApiResult<Json<Evidence>> {
    let evidence = review_workflow::accept(&state.db, evidence_id, reviewer).await?;
    Ok(Json(evidence))
}

/// POST /evidence/:id/reject
///
/// **Request:** `{"reason": "..."}`; a missing or blank reason is a 400.
pub async fn reject_evidence(
    State(state): State<AppState>,
    Path(evidence_id): Path<Uuid>,
    ActingUser(reviewer): ActingUser,
    Json(payload): Json<RejectRequest>,
) -> ApiResult<Json<Evidence>> {
    let evidence = review_workflow::reject(&state.db, evidence_id, reviewer, &payload.reason).await?;
    Ok(Json(evidence))
}

/// Build evidence review routes
pub fn evidence_routes() -> Router<AppState> {
    Router::new()
        .route("/evidence/:id/submit", post(submit_evidence))
        .route("/evidence/:id/accept", post(accept_evidence))
        .route("/evidence/:id/reject", post(reject_evidence))
}
