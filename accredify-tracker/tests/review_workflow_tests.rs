//! Integration tests for the evidence review workflow

mod helpers;

use accredify_common::Error;
use accredify_tracker::db;
use accredify_tracker::models::{DriveLink, EvidenceKind, IndicatorEvidenceType, NewEvidence, ReviewState};
use accredify_tracker::services::review_workflow;
use helpers::*;
use uuid::Uuid;

#[tokio::test]
async fn test_add_evidence_starts_as_draft() {
    let (_dir, pool) = create_test_db().await;
    let project = create_project(&pool, "Clinic").await;
    let indicator = create_indicator(&pool, project.id, IndicatorEvidenceType::Text).await;

    let evidence = review_workflow::add_evidence(&pool, indicator.id, note("Drill log"))
        .await
        .unwrap();

    assert_eq!(evidence.review_state, ReviewState::Draft);
    let stored = evidence_of(&pool, indicator.id).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, evidence.id);
    assert_eq!(stored[0].content.as_deref(), Some("Drill log"));
}

#[tokio::test]
async fn test_add_evidence_to_missing_indicator_is_not_found() {
    let (_dir, pool) = create_test_db().await;

    let result = review_workflow::add_evidence(&pool, Uuid::new_v4(), note("Drill log")).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_add_evidence_validates_shape() {
    let (_dir, pool) = create_test_db().await;
    let project = create_project(&pool, "Clinic").await;
    let indicator = create_indicator(&pool, project.id, IndicatorEvidenceType::Text).await;

    let link_without_url = NewEvidence {
        kind: EvidenceKind::Link,
        file_name: None,
        file_url: None,
        content: None,
        drive: DriveLink::default(),
        file_size: None,
    };
    let result = review_workflow::add_evidence(&pool, indicator.id, link_without_url).await;
    assert!(matches!(result, Err(Error::Validation(_))));
    assert_eq!(count_rows(&pool, "evidence").await, 0);
}

#[tokio::test]
async fn test_submit_accept_persists_reviewer() {
    let (_dir, pool) = create_test_db().await;
    let project = create_project(&pool, "Clinic").await;
    let indicator = create_indicator(&pool, project.id, IndicatorEvidenceType::Text).await;
    let evidence = review_workflow::add_evidence(&pool, indicator.id, note("Drill log"))
        .await
        .unwrap();
    let who = reviewer();

    let submitted = review_workflow::submit(&pool, evidence.id).await.unwrap();
    assert_eq!(submitted.review_state, ReviewState::UnderReview);
    assert!(submitted.reviewed_by.is_none());

    review_workflow::accept(&pool, evidence.id, who).await.unwrap();

    let mut conn = pool.acquire().await.unwrap();
    let stored = db::evidence::require(&mut conn, evidence.id).await.unwrap();
    assert_eq!(stored.review_state, ReviewState::Accepted);
    assert_eq!(stored.reviewed_by, Some(who));
    assert!(stored.reviewed_at.is_some());
}

#[tokio::test]
async fn test_reject_without_reason_is_validation_error() {
    let (_dir, pool) = create_test_db().await;
    let project = create_project(&pool, "Clinic").await;
    let indicator = create_indicator(&pool, project.id, IndicatorEvidenceType::Text).await;
    let evidence = review_workflow::add_evidence(&pool, indicator.id, note("Drill log"))
        .await
        .unwrap();

    let result = review_workflow::reject(&pool, evidence.id, reviewer(), "  ").await;
    assert!(matches!(result, Err(Error::Validation(_))));

    // Reason is checked before the item is looked up
    let missing = review_workflow::reject(&pool, Uuid::new_v4(), reviewer(), "").await;
    assert!(matches!(missing, Err(Error::Validation(_))));

    let stored = evidence_of(&pool, indicator.id).await;
    assert_eq!(stored[0].review_state, ReviewState::Draft);
}

#[tokio::test]
async fn test_reject_with_reason_stamps_reviewer() {
    let (_dir, pool) = create_test_db().await;
    let project = create_project(&pool, "Clinic").await;
    let indicator = create_indicator(&pool, project.id, IndicatorEvidenceType::Text).await;
    let evidence = review_workflow::add_evidence(&pool, indicator.id, note("Drill log"))
        .await
        .unwrap();
    review_workflow::submit(&pool, evidence.id).await.unwrap();
    let who = reviewer();

    let rejected = review_workflow::reject(&pool, evidence.id, who, "Log is unsigned")
        .await
        .unwrap();

    assert_eq!(rejected.review_state, ReviewState::Rejected);
    assert_eq!(rejected.review_reason.as_deref(), Some("Log is unsigned"));

    let stored = &evidence_of(&pool, indicator.id).await[0];
    assert_eq!(stored.review_state, ReviewState::Rejected);
    assert_eq!(stored.reviewed_by, Some(who));
    assert!(stored.reviewed_at.is_some());
}

#[tokio::test]
async fn test_draft_can_be_rejected_directly() {
    let (_dir, pool) = create_test_db().await;
    let project = create_project(&pool, "Clinic").await;
    let indicator = create_indicator(&pool, project.id, IndicatorEvidenceType::Text).await;
    let evidence = review_workflow::add_evidence(&pool, indicator.id, note("Wrong file"))
        .await
        .unwrap();

    let rejected = review_workflow::reject(&pool, evidence.id, reviewer(), "Wrong indicator")
        .await
        .unwrap();
    assert_eq!(rejected.review_state, ReviewState::Rejected);
}

#[tokio::test]
async fn test_invalid_transitions_are_conflicts() {
    let (_dir, pool) = create_test_db().await;
    let project = create_project(&pool, "Clinic").await;
    let indicator = create_indicator(&pool, project.id, IndicatorEvidenceType::Text).await;
    let evidence = review_workflow::add_evidence(&pool, indicator.id, note("Drill log"))
        .await
        .unwrap();

    // accept straight from draft
    let early = review_workflow::accept(&pool, evidence.id, reviewer()).await;
    assert!(matches!(early, Err(Error::Conflict(_))));

    let accepted = add_accepted_note(&pool, indicator.id, "Signed log").await;

    // terminal states stay terminal
    assert!(matches!(
        review_workflow::submit(&pool, accepted.id).await,
        Err(Error::Conflict(_))
    ));
    assert!(matches!(
        review_workflow::reject(&pool, accepted.id, reviewer(), "Too late").await,
        Err(Error::Conflict(_))
    ));
    assert!(matches!(
        review_workflow::accept(&pool, accepted.id, reviewer()).await,
        Err(Error::Conflict(_))
    ));
}

#[tokio::test]
async fn test_transition_on_missing_evidence_is_not_found() {
    let (_dir, pool) = create_test_db().await;

    let result = review_workflow::submit(&pool, Uuid::new_v4()).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_stale_compare_and_set_writes_nothing() {
    let (_dir, pool) = create_test_db().await;
    let project = create_project(&pool, "Clinic").await;
    let indicator = create_indicator(&pool, project.id, IndicatorEvidenceType::Text).await;
    let evidence = review_workflow::add_evidence(&pool, indicator.id, note("Drill log"))
        .await
        .unwrap();
    review_workflow::submit(&pool, evidence.id).await.unwrap();

    // Reviewer A read the item while it was under review
    let mut conn = pool.acquire().await.unwrap();
    let mut stale = db::evidence::require(&mut conn, evidence.id).await.unwrap();

    // Reviewer B accepts first
    review_workflow::accept(&pool, evidence.id, reviewer()).await.unwrap();

    // Reviewer A's reject must not overwrite the accepted item
    stale.reject(reviewer(), "Not good enough", chrono::Utc::now()).unwrap();
    let written = db::evidence::update_review_state(&mut conn, &stale, ReviewState::UnderReview)
        .await
        .unwrap();
    assert!(!written);

    let stored = db::evidence::require(&mut conn, evidence.id).await.unwrap();
    assert_eq!(stored.review_state, ReviewState::Accepted);
}

#[tokio::test]
async fn test_concurrent_reviewers_exactly_one_wins() {
    let (_dir, pool) = create_test_db().await;
    let project = create_project(&pool, "Clinic").await;
    let indicator = create_indicator(&pool, project.id, IndicatorEvidenceType::Text).await;
    let evidence = review_workflow::add_evidence(&pool, indicator.id, note("Drill log"))
        .await
        .unwrap();
    review_workflow::submit(&pool, evidence.id).await.unwrap();

    let accept_pool = pool.clone();
    let reject_pool = pool.clone();
    let id = evidence.id;
    let accept = tokio::spawn(async move { review_workflow::accept(&accept_pool, id, reviewer()).await });
    let reject = tokio::spawn(async move { review_workflow::reject(&reject_pool, id, reviewer(), "Blurry").await });

    let outcomes = [accept.await.unwrap(), reject.await.unwrap()];
    let winners = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one reviewer may move the item: {:?}", outcomes);

    let stored = &evidence_of(&pool, indicator.id).await[0];
    assert!(stored.review_state.is_terminal());
}

#[tokio::test]
async fn test_deleting_project_cascades_to_evidence() {
    let (_dir, pool) = create_test_db().await;
    let project = create_project(&pool, "Clinic").await;
    let indicator = create_indicator(&pool, project.id, IndicatorEvidenceType::Text).await;
    add_accepted_note(&pool, indicator.id, "Signed log").await;

    let mut conn = pool.acquire().await.unwrap();
    assert!(db::projects::delete(&mut conn, project.id).await.unwrap());

    assert_eq!(count_rows(&pool, "indicators").await, 0);
    assert_eq!(count_rows(&pool, "evidence").await, 0);
}
