//! accredify-tracker library interface
//!
//! Compliance tracking: projects hold indicators, indicators collect
//! evidence, evidence passes review before an indicator may be completed.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::services::{CalendarScheduler, DueDateScheduler, FallbackEnricher};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Text enrichment behind its fallback decorator
    pub enricher: FallbackEnricher,
    pub scheduler: Arc<dyn DueDateScheduler>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, enricher: FallbackEnricher) -> Self {
        Self {
            db,
            enricher,
            scheduler: Arc::new(CalendarScheduler),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::project_routes())
        .merge(api::indicator_routes())
        .merge(api::evidence_routes())
        .merge(api::ai_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
