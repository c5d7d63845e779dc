//! Project endpoints, including checklist import

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::api::indicators::IndicatorView;
use crate::db;
use crate::models::{EvidenceState, ImportOptions, ImportResult, NewIndicator, NewProject, Project};
use crate::services::{evaluate, indicator_catalog, CsvReconciler};
use crate::{ApiResult, AppState};

/// GET /projects
pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<Project>>> {
    let mut conn = state.db.acquire().await.map_err(accredify_common::Error::from)?;
    let projects = db::projects::list(&mut conn).await?;
    Ok(Json(projects))
}

/// POST /projects
pub async fn create_project(
    State(state): State<AppState>,
    Json(payload): Json<NewProject>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let project = payload.into_project();

    let mut conn = state.db.acquire().await.map_err(accredify_common::Error::from)?;
    db::projects::create(&mut conn, &project).await?;

    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /projects/:id/indicators
///
/// Each indicator carries its evidence state, computed from live rows.
pub async fn list_indicators(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<IndicatorView>>> {
    let mut conn = state.db.acquire().await.map_err(accredify_common::Error::from)?;
    db::projects::require(&mut conn, project_id).await?;

    let indicators = db::indicators::list_for_project(&mut conn, project_id).await?;

    let mut views = Vec::with_capacity(indicators.len());
    for indicator in indicators {
        let evidence = db::evidence::list_for_indicator(&mut conn, indicator.id).await?;
        views.push(IndicatorView {
            evidence_state: evaluate(&indicator, &evidence),
            evidence_count: evidence.len(),
            indicator,
        });
    }

    Ok(Json(views))
}

/// POST /projects/:id/indicators
pub async fn create_indicator(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<NewIndicator>,
) -> ApiResult<(StatusCode, Json<IndicatorView>)> {
    let indicator = indicator_catalog::create_indicator(&state.db, project_id, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(IndicatorView {
            indicator,
            evidence_state: EvidenceState::NoEvidence,
            evidence_count: 0,
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    #[serde(flatten)]
    pub result: ImportResult,
    pub total_rows_processed: usize,
}

/// POST /projects/:id/import
///
/// Body is the CSV text. A rejected header answers 400 with the same body
/// shape as a successful import.
pub async fn import_checklist(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Query(options): Query<ImportOptions>,
    body: String,
) -> ApiResult<Response> {
    let reconciler = CsvReconciler::new(state.db.clone());
    let result = reconciler.import_csv(project_id, &body, &options).await?;

    let status = if result.is_file_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };

    let response = ImportResponse {
        total_rows_processed: result.total_rows_processed(),
        result,
    };
    Ok((status, Json(response)).into_response())
}

/// Build project routes
pub fn project_routes() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/:id/indicators",
            get(list_indicators).post(create_indicator),
        )
        .route("/projects/:id/import", post(import_checklist))
}
