//! Integration tests for the completion gate and scheduling

mod helpers;

use accredify_common::Error;
use accredify_tracker::db;
use accredify_tracker::models::{
    ComplianceStatus, EvidenceKind, EvidenceState, Frequency, IndicatorEvidenceType, NewEvidence,
    ScheduleType,
};
use accredify_tracker::services::completion_gate::{REASON_NO_EVIDENCE, REASON_REJECTED};
use accredify_tracker::services::{
    can_complete, evaluate, mark_compliant, review_workflow, CalendarScheduler, CompletionOutcome,
};
use chrono::NaiveDate;
use helpers::*;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn test_completion_blocked_without_evidence() {
    let (_dir, pool) = create_test_db().await;
    let project = create_project(&pool, "Clinic").await;
    let indicator = create_indicator(&pool, project.id, IndicatorEvidenceType::Text).await;

    let outcome = mark_compliant(&pool, indicator.id, date(2024, 5, 1), &CalendarScheduler)
        .await
        .unwrap();

    match outcome {
        CompletionOutcome::Blocked(verdict) => {
            assert_eq!(verdict.evidence_state, EvidenceState::NoEvidence);
            assert_eq!(verdict.reason.as_deref(), Some(REASON_NO_EVIDENCE));
        }
        other => panic!("expected blocked, got {:?}", other),
    }

    let stored = load_indicator(&pool, indicator.id).await;
    assert_eq!(stored.status, ComplianceStatus::NotStarted);
    assert!(stored.last_updated.is_none());
}

#[tokio::test]
async fn test_completion_blocked_by_rejected_evidence() {
    let (_dir, pool) = create_test_db().await;
    let project = create_project(&pool, "Clinic").await;
    let indicator = create_indicator(&pool, project.id, IndicatorEvidenceType::Text).await;

    add_accepted_note(&pool, indicator.id, "Signed log").await;
    let bad = review_workflow::add_evidence(&pool, indicator.id, note("Old log")).await.unwrap();
    review_workflow::reject(&pool, bad.id, reviewer(), "Expired").await.unwrap();

    let outcome = mark_compliant(&pool, indicator.id, date(2024, 5, 1), &CalendarScheduler)
        .await
        .unwrap();

    match outcome {
        CompletionOutcome::Blocked(verdict) => {
            assert_eq!(verdict.evidence_state, EvidenceState::Rejected);
            assert_eq!(verdict.reason.as_deref(), Some(REASON_REJECTED));
        }
        other => panic!("expected blocked, got {:?}", other),
    }
}

#[tokio::test]
async fn test_completion_allowed_with_accepted_text_evidence() {
    let (_dir, pool) = create_test_db().await;
    let project = create_project(&pool, "Clinic").await;
    let indicator = create_indicator(&pool, project.id, IndicatorEvidenceType::Text).await;
    add_accepted_note(&pool, indicator.id, "Signed drill log").await;

    let outcome = mark_compliant(&pool, indicator.id, date(2024, 5, 1), &CalendarScheduler)
        .await
        .unwrap();
    assert!(matches!(outcome, CompletionOutcome::Completed { .. }));

    let stored = load_indicator(&pool, indicator.id).await;
    assert_eq!(stored.status, ComplianceStatus::Compliant);
    assert!(stored.last_updated.is_some());
    assert!(stored.next_due_date.is_none(), "one-time work has no next due date");
}

#[tokio::test]
async fn test_file_indicator_accepts_drive_linked_evidence() {
    let (_dir, pool) = create_test_db().await;
    let project = create_project(&pool, "Clinic").await;
    let indicator = create_indicator(&pool, project.id, IndicatorEvidenceType::File).await;

    let mut upload = NewEvidence {
        kind: EvidenceKind::Document,
        file_name: Some("inspection.pdf".to_string()),
        file_url: Some(String::new()),
        content: None,
        drive: Default::default(),
        file_size: Some("1.2 MB".to_string()),
    };
    upload.drive.file_id = Some("1xYz".to_string());

    let evidence = review_workflow::add_evidence(&pool, indicator.id, upload).await.unwrap();
    review_workflow::submit(&pool, evidence.id).await.unwrap();
    review_workflow::accept(&pool, evidence.id, reviewer()).await.unwrap();

    let stored = load_indicator(&pool, indicator.id).await;
    let snapshot = evidence_of(&pool, indicator.id).await;
    assert_eq!(evaluate(&stored, &snapshot), EvidenceState::Accepted);
    assert!(can_complete(&stored, &snapshot).allowed);
}

#[tokio::test]
async fn test_recurring_completion_advances_due_date() {
    let (_dir, pool) = create_test_db().await;
    let project = create_project(&pool, "Clinic").await;
    let mut indicator = create_indicator(&pool, project.id, IndicatorEvidenceType::Frequency).await;
    indicator.schedule_type = ScheduleType::Recurring;
    indicator.frequency = Some(Frequency::Monthly);
    {
        let mut conn = pool.acquire().await.unwrap();
        db::indicators::update(&mut conn, &indicator).await.unwrap();
    }
    add_accepted_note(&pool, indicator.id, "January check").await;

    // No due date yet: schedule from today
    let first = mark_compliant(&pool, indicator.id, date(2024, 1, 31), &CalendarScheduler)
        .await
        .unwrap();
    match first {
        CompletionOutcome::Completed { indicator } => {
            assert_eq!(indicator.next_due_date, Some(date(2024, 2, 29)));
        }
        other => panic!("expected completion, got {:?}", other),
    }

    // Existing due date: schedule from it, not from today
    mark_compliant(&pool, indicator.id, date(2024, 6, 1), &CalendarScheduler)
        .await
        .unwrap();
    let stored = load_indicator(&pool, indicator.id).await;
    assert_eq!(stored.next_due_date, Some(date(2024, 3, 29)));
}

#[tokio::test]
async fn test_recurring_one_time_completion_keeps_due_date() {
    let (_dir, pool) = create_test_db().await;
    let project = create_project(&pool, "Clinic").await;
    let mut indicator = create_indicator(&pool, project.id, IndicatorEvidenceType::Text).await;
    indicator.schedule_type = ScheduleType::Recurring;
    indicator.frequency = Some(Frequency::OneTime);
    indicator.next_due_date = Some(date(2024, 5, 1));
    {
        let mut conn = pool.acquire().await.unwrap();
        db::indicators::update(&mut conn, &indicator).await.unwrap();
    }
    add_accepted_note(&pool, indicator.id, "Signed log").await;

    let outcome = mark_compliant(&pool, indicator.id, date(2024, 6, 1), &CalendarScheduler)
        .await
        .unwrap();
    assert!(matches!(outcome, CompletionOutcome::Completed { .. }));

    let stored = load_indicator(&pool, indicator.id).await;
    assert_eq!(stored.status, ComplianceStatus::Compliant);
    assert_eq!(stored.next_due_date, Some(date(2024, 5, 1)));
}

#[tokio::test]
async fn test_mark_compliant_on_missing_indicator_is_not_found() {
    let (_dir, pool) = create_test_db().await;

    let result = mark_compliant(&pool, Uuid::new_v4(), date(2024, 1, 1), &CalendarScheduler).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_gate_matches_evaluator_for_every_state() {
    let (_dir, pool) = create_test_db().await;
    let project = create_project(&pool, "Clinic").await;

    let empty = create_indicator(&pool, project.id, IndicatorEvidenceType::Text).await;

    let pending = create_indicator(&pool, project.id, IndicatorEvidenceType::Text).await;
    review_workflow::add_evidence(&pool, pending.id, note("Draft")).await.unwrap();

    let partial = create_indicator(&pool, project.id, IndicatorEvidenceType::File).await;
    add_accepted_note(&pool, partial.id, "No file attached").await;

    let accepted = create_indicator(&pool, project.id, IndicatorEvidenceType::Text).await;
    add_accepted_note(&pool, accepted.id, "Signed log").await;

    for indicator in [empty, pending, partial, accepted] {
        let snapshot = evidence_of(&pool, indicator.id).await;
        let state = evaluate(&indicator, &snapshot);
        let verdict = can_complete(&indicator, &snapshot);

        assert_eq!(verdict.evidence_state, state);
        assert_eq!(verdict.allowed, state == EvidenceState::Accepted);
        assert_eq!(verdict.reason.is_some(), state != EvidenceState::Accepted);
    }
}
