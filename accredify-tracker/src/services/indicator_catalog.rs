//! Direct indicator creation and edits
//!
//! Indicators created here get the same idempotency key a CSV row with the
//! same section/standard/indicator would get, so a later import updates them
//! instead of duplicating them.

use accredify_common::{Error, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db;
use crate::models::{Indicator, IndicatorPatch, NewIndicator};
use crate::utils::begin_monitored;

/// Create one indicator in an existing project
///
/// Fails with `Conflict` when the project already has an indicator with the
/// same section, standard and indicator text.
pub async fn create_indicator(pool: &SqlitePool, project_id: Uuid, new: NewIndicator) -> Result<Indicator> {
    new.validate()?;

    let mut tx = begin_monitored(pool, "indicator_catalog::create_indicator").await?;

    db::projects::require(tx.conn()?, project_id).await?;

    let mut indicator = new.into_indicator(project_id);
    if db::indicators::find_by_key(tx.conn()?, &indicator.computed_key())
        .await?
        .is_some()
    {
        return Err(Error::Conflict(format!(
            "Indicator '{}' already exists under {} / {}",
            indicator.indicator, indicator.section, indicator.standard
        )));
    }

    db::indicators::insert(tx.conn()?, &mut indicator).await?;
    tx.commit().await?;

    tracing::info!(
        indicator_id = %indicator.id,
        project_id = %project_id,
        evidence_type = indicator.evidence_type.as_str(),
        schedule_type = indicator.schedule_type.as_str(),
        "Indicator created"
    );
    Ok(indicator)
}

/// Apply a partial edit; returns the stored indicator
pub async fn update_indicator(pool: &SqlitePool, indicator_id: Uuid, patch: IndicatorPatch) -> Result<Indicator> {
    patch.validate()?;

    let mut tx = begin_monitored(pool, "indicator_catalog::update_indicator").await?;

    let mut indicator = db::indicators::require(tx.conn()?, indicator_id).await?;
    if !patch.apply_to(&mut indicator) {
        tx.rollback().await?;
        return Ok(indicator);
    }

    db::indicators::update(tx.conn()?, &indicator).await?;
    tx.commit().await?;

    tracing::info!(
        indicator_id = %indicator_id,
        status = indicator.status.as_str(),
        evidence_type = indicator.evidence_type.as_str(),
        "Indicator updated"
    );
    Ok(indicator)
}
