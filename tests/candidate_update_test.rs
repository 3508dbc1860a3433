use std::sync::Arc;

use serde_json::{json, Value as JsonValue};
use talenthub_backend::database::memory::{MemoryCandidateStore, RowCounts};
use talenthub_backend::dto::candidate_dto::{
    CreateCandidatePayload, ProfileUpdatePayload, UpdateCandidatePayload,
};
use talenthub_backend::error::Error;
use talenthub_backend::models::candidate::{CandidateDetail, CandidateStatus};
use talenthub_backend::models::derived_record::DerivedKind;
use talenthub_backend::services::candidate_service::CandidateService;
use uuid::Uuid;

fn setup() -> (CandidateService, MemoryCandidateStore) {
    let store = MemoryCandidateStore::new();
    let service = CandidateService::new(Arc::new(store.clone()));
    (service, store)
}

fn create_payload(email: &str, skills: &[&str]) -> CreateCandidatePayload {
    serde_json::from_value(json!({
        "name": "Alex Morgan",
        "email": email,
        "phone": "+1 (555) 012-3456",
        "role": "Senior Full Stack Engineer",
        "score": 94.5,
        "skills": skills,
        "experience": [
            { "company": "TechFlow Solutions", "role": "Senior Developer", "duration": "2021 - Present" }
        ],
        "score_breakdown": { "technical": 96.0, "communication": 92.0 },
        "photo_url": "https://images.example.com/alex.jpg"
    }))
    .expect("create payload")
}

fn patch(body: JsonValue) -> UpdateCandidatePayload {
    serde_json::from_value(body).expect("update payload")
}

async fn create(service: &CandidateService, email: &str, skills: &[&str]) -> CandidateDetail {
    service
        .create_candidate(create_payload(email, skills), None)
        .await
        .expect("create candidate")
}

async fn assert_derived_records_match_status(service: &CandidateService, id: i64) {
    let detail = service.get_candidate(id).await.expect("candidate");
    let rejected = service
        .derived_record(DerivedKind::Rejected, id)
        .await
        .expect("rejected lookup");
    let connected = service
        .derived_record(DerivedKind::Connected, id)
        .await
        .expect("connected lookup");

    let status = detail.candidate.status;
    assert_eq!(
        rejected.is_some(),
        status == CandidateStatus::Rejected,
        "rejected record out of sync with status {}",
        status
    );
    assert_eq!(
        connected.is_some(),
        status == CandidateStatus::Scheduled,
        "connected record out of sync with status {}",
        status
    );
}

#[tokio::test]
async fn rejecting_then_connecting_moves_the_derived_record() {
    let (service, _) = setup();
    let c = create(&service, "alex@example.com", &["Rust"]).await;
    assert_eq!(c.candidate.status, CandidateStatus::Pending);
    assert_derived_records_match_status(&service, c.candidate.id).await;

    let rejected = service
        .apply_update(c.candidate.id, patch(json!({ "status": "rejected" })))
        .await
        .expect("reject");
    assert_eq!(rejected.candidate.status, CandidateStatus::Rejected);
    assert!(service
        .derived_record(DerivedKind::Rejected, c.candidate.id)
        .await
        .unwrap()
        .is_some());
    assert!(service
        .derived_record(DerivedKind::Connected, c.candidate.id)
        .await
        .unwrap()
        .is_none());

    let record = service.connect(c.candidate.id).await.expect("connect");
    assert_eq!(record.candidate_id, c.candidate.id);

    let after = service.get_candidate(c.candidate.id).await.unwrap();
    assert_eq!(after.candidate.status, CandidateStatus::Scheduled);
    assert!(service
        .derived_record(DerivedKind::Rejected, c.candidate.id)
        .await
        .unwrap()
        .is_none());
    assert_derived_records_match_status(&service, c.candidate.id).await;
}

#[tokio::test]
async fn connecting_twice_keeps_a_single_record_and_state() {
    let (service, store) = setup();
    let c = create(&service, "twice@example.com", &["Go"]).await;

    let first = service.connect(c.candidate.id).await.expect("first connect");
    let after_first = service.get_candidate(c.candidate.id).await.unwrap();

    let second = service.connect(c.candidate.id).await.expect("second connect");
    let after_second = service.get_candidate(c.candidate.id).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(after_first, after_second);
    assert_eq!(store.row_counts().await.connected, 1);
}

#[tokio::test]
async fn phone_only_patch_leaves_everything_else_alone() {
    let (service, store) = setup();
    let c = create(&service, "phone@example.com", &["Rust", "SQL"]).await;
    service
        .apply_update(c.candidate.id, patch(json!({ "status": "qualified" })))
        .await
        .unwrap();
    let before = service.get_candidate(c.candidate.id).await.unwrap();
    let counts_before = store.row_counts().await;

    let after = service
        .apply_update(c.candidate.id, patch(json!({ "phone": "555" })))
        .await
        .expect("phone update");

    assert_eq!(after.candidate.phone.as_deref(), Some("555"));
    assert!(after.candidate.updated_at >= before.candidate.updated_at);

    let mut expected = before.clone();
    expected.candidate.phone = Some("555".to_string());
    expected.candidate.updated_at = after.candidate.updated_at;
    assert_eq!(after, expected);
    assert_eq!(service.get_candidate(c.candidate.id).await.unwrap(), expected);
    assert_eq!(store.row_counts().await, counts_before);
}

#[tokio::test]
async fn explicit_empty_values_are_applied() {
    let (service, _) = setup();
    let c = create(&service, "empty@example.com", &[]).await;

    let after = service
        .apply_update(
            c.candidate.id,
            patch(json!({ "phone": null, "photo_url": "", "score": 0, "experience": [], "score_breakdown": {} })),
        )
        .await
        .unwrap();

    assert_eq!(after.candidate.phone, None);
    assert_eq!(after.candidate.photo_url.as_deref(), Some(""));
    assert_eq!(after.candidate.score, 0.0);
    assert!(after.candidate.experience.0.is_empty());
    assert!(after.candidate.score_breakdown.0.is_empty());
    assert_eq!(after.candidate.name, c.candidate.name);
}

#[tokio::test]
async fn skills_are_replaced_only_when_supplied() {
    let (service, _) = setup();
    let c = create(&service, "skills@example.com", &["Rust", "SQL", "Kubernetes"]).await;
    assert_eq!(c.skills.len(), 3);

    let untouched = service
        .apply_update(c.candidate.id, patch(json!({})))
        .await
        .unwrap();
    assert_eq!(untouched.skill_names(), vec!["Rust", "SQL", "Kubernetes"]);

    let untouched_by_null = service
        .apply_update(c.candidate.id, patch(json!({ "name": "Alex M.", "skills": null })))
        .await
        .unwrap();
    assert_eq!(untouched_by_null.skills.len(), 3);

    let replaced = service
        .apply_update(c.candidate.id, patch(json!({ "skills": ["Python", "Rust"] })))
        .await
        .unwrap();
    assert_eq!(replaced.skill_names(), vec!["Python", "Rust"]);

    let cleared = service
        .apply_update(c.candidate.id, patch(json!({ "skills": [] })))
        .await
        .unwrap();
    assert!(cleared.skills.is_empty());
    assert!(service.get_candidate(c.candidate.id).await.unwrap().skills.is_empty());
}

#[tokio::test]
async fn failed_skill_replacement_rolls_back_the_status_change() {
    let (service, store) = setup();
    let c = create(&service, "atomic@example.com", &["Rust", "SQL"]).await;
    let before = service.get_candidate(c.candidate.id).await.unwrap();
    let counts_before = store.row_counts().await;

    let err = service
        .apply_update(
            c.candidate.id,
            patch(json!({ "status": "rejected", "name": "Renamed", "skills": ["Rust", "Rust"] })),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TransactionFailure(_)), "got {:?}", err);

    let after = service.get_candidate(c.candidate.id).await.unwrap();
    assert_eq!(after, before);
    assert_eq!(after.candidate.status, CandidateStatus::Pending);
    assert!(service
        .derived_record(DerivedKind::Rejected, c.candidate.id)
        .await
        .unwrap()
        .is_none());
    assert_eq!(store.row_counts().await, counts_before);
}

#[tokio::test]
async fn duplicate_email_on_create_inserts_nothing() {
    let (service, store) = setup();
    create(&service, "taken@example.com", &["Rust"]).await;
    let counts_before = store.row_counts().await;

    let err = service
        .create_candidate(create_payload("taken@example.com", &["Go"]), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateEmail(_)));
    assert_eq!(store.row_counts().await, counts_before);
}

#[tokio::test]
async fn changing_email_to_one_in_use_is_rejected() {
    let (service, _) = setup();
    create(&service, "first@example.com", &[]).await;
    let second = create(&service, "second@example.com", &[]).await;

    let err = service
        .apply_update(second.candidate.id, patch(json!({ "email": "first@example.com" })))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateEmail(_)));

    // Re-sending its own email is not a conflict.
    service
        .apply_update(second.candidate.id, patch(json!({ "email": "second@example.com" })))
        .await
        .expect("same email");
}

#[tokio::test]
async fn invalid_input_is_a_validation_error() {
    let (service, _) = setup();
    let c = create(&service, "invalid@example.com", &[]).await;

    for body in [
        json!({ "score": "high" }),
        json!({ "status": "hired" }),
        json!({ "name": "" }),
        json!({ "email": "not-an-email" }),
        json!({ "skills": ["Rust", "  "] }),
    ] {
        let err = service
            .apply_update(c.candidate.id, patch(body.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "{} gave {:?}", body, err);
    }

    let numeric_string = service
        .apply_update(c.candidate.id, patch(json!({ "score": "71.25" })))
        .await
        .unwrap();
    assert_eq!(numeric_string.candidate.score, 71.25);
}

#[tokio::test]
async fn unknown_candidate_is_not_found() {
    let (service, _) = setup();

    let err = service
        .apply_update(404, patch(json!({ "phone": "1" })))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(matches!(service.connect(404).await, Err(Error::NotFound(_))));
    assert!(matches!(service.delete_candidate(404).await, Err(Error::NotFound(_))));
    assert!(matches!(service.get_candidate(404).await, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn delete_cascades_to_skills_and_derived_records() {
    let (service, store) = setup();
    let keep = create(&service, "keep@example.com", &["Rust"]).await;
    let c = create(&service, "gone@example.com", &["Rust", "SQL"]).await;
    service
        .apply_update(c.candidate.id, patch(json!({ "status": "rejected" })))
        .await
        .unwrap();

    service.delete_candidate(c.candidate.id).await.expect("delete");

    assert_eq!(
        store.row_counts().await,
        RowCounts {
            candidates: 1,
            skills: 1,
            rejected: 0,
            connected: 0,
        }
    );
    assert!(service.get_candidate(keep.candidate.id).await.is_ok());
    assert!(matches!(
        service.delete_candidate(c.candidate.id).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn initial_status_is_reconciled_on_create() {
    let (service, _) = setup();
    let mut payload = create_payload("scheduled@example.com", &[]);
    payload.status = Some("scheduled".to_string());

    let c = service.create_candidate(payload, None).await.unwrap();
    assert_eq!(c.candidate.status, CandidateStatus::Scheduled);
    assert_derived_records_match_status(&service, c.candidate.id).await;
}

#[tokio::test]
async fn every_transition_keeps_derived_records_in_sync() {
    let (service, _) = setup();
    let c = create(&service, "walk@example.com", &[]).await;

    for from in CandidateStatus::ALL {
        for to in CandidateStatus::ALL {
            service
                .apply_update(c.candidate.id, UpdateCandidatePayload::status(from))
                .await
                .unwrap();
            service
                .apply_update(c.candidate.id, UpdateCandidatePayload::status(to))
                .await
                .unwrap();
            assert_derived_records_match_status(&service, c.candidate.id).await;
        }
    }
}

#[tokio::test]
async fn concurrent_status_changes_leave_consistent_records() {
    let (service, _) = setup();
    let c = create(&service, "race@example.com", &[]).await;
    let id = c.candidate.id;

    let mut handles = Vec::new();
    for i in 0..20 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                service.connect(id).await.map(|_| ())
            } else {
                service
                    .apply_update(id, UpdateCandidatePayload::status(CandidateStatus::Rejected))
                    .await
                    .map(|_| ())
            }
        }));
    }
    for handle in handles {
        handle.await.expect("join").expect("update");
    }

    assert_derived_records_match_status(&service, id).await;
}

#[tokio::test]
async fn profile_update_edits_own_record_only() {
    let (service, _) = setup();
    let user_id = Uuid::new_v4();
    let mut payload = create_payload("self@example.com", &["Rust"]);
    payload.user_id = Some(user_id);
    let c = service.create_candidate(payload, None).await.unwrap();
    service.connect(c.candidate.id).await.unwrap();

    let profile: ProfileUpdatePayload = serde_json::from_value(json!({
        "name": "Alex Morgan-Lee",
        "skills": ["Rust", "TypeScript"]
    }))
    .unwrap();
    let updated = service.update_profile(user_id, profile).await.unwrap();

    assert_eq!(updated.candidate.id, c.candidate.id);
    assert_eq!(updated.candidate.name, "Alex Morgan-Lee");
    assert_eq!(updated.candidate.status, CandidateStatus::Scheduled);
    assert_eq!(updated.skill_names(), vec!["Rust", "TypeScript"]);
    assert_eq!(service.get_profile(user_id).await.unwrap(), updated);
    assert_derived_records_match_status(&service, c.candidate.id).await;

    let stranger = service
        .update_profile(Uuid::new_v4(), ProfileUpdatePayload::default())
        .await
        .unwrap_err();
    assert!(matches!(stranger, Error::NotFound(_)));
}

#[tokio::test]
async fn listing_filters_by_status_newest_first() {
    let (service, _) = setup();
    let a = create(&service, "a@example.com", &[]).await;
    let b = create(&service, "b@example.com", &[]).await;
    let c = create(&service, "c@example.com", &[]).await;
    service.connect(a.candidate.id).await.unwrap();
    service.connect(c.candidate.id).await.unwrap();

    let all = service.list_candidates(None).await.unwrap();
    let ids: Vec<i64> = all.iter().map(|d| d.candidate.id).collect();
    assert_eq!(ids, vec![c.candidate.id, b.candidate.id, a.candidate.id]);

    let scheduled = service
        .list_candidates(Some(CandidateStatus::Scheduled))
        .await
        .unwrap();
    assert_eq!(scheduled.len(), 2);
    assert!(scheduled
        .iter()
        .all(|d| d.candidate.status == CandidateStatus::Scheduled));
}

#[tokio::test]
async fn updated_at_moves_only_when_a_row_field_changes() {
    let (service, _) = setup();
    let c = create(&service, "stamp@example.com", &["Rust"]).await;
    let stamp = c.candidate.updated_at;

    let skills_only = service
        .apply_update(c.candidate.id, patch(json!({ "skills": ["Go"] })))
        .await
        .unwrap();
    assert_eq!(skills_only.candidate.updated_at, stamp);

    let same_values = service
        .apply_update(c.candidate.id, patch(json!({ "name": c.candidate.name, "status": "pending" })))
        .await
        .unwrap();
    assert_eq!(same_values.candidate.updated_at, stamp);

    let renamed = service
        .apply_update(c.candidate.id, patch(json!({ "name": "Alex R." })))
        .await
        .unwrap();
    assert!(renamed.candidate.updated_at >= stamp);
    assert_eq!(renamed.candidate.name, "Alex R.");
}
