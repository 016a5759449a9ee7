//! Transaction integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use fanvote_core::{CandidateId, ChangeEvent, PurchaseTransaction, UserId, VotePackage};

fn vote(user_id: UserId, candidate: CandidateId, votes: i64, price: i64) -> PurchaseTransaction {
    PurchaseTransaction::votes(user_id, candidate, &VotePackage::new("bundle", votes, price))
}

#[tokio::test]
async fn insert_records_and_updates_candidate() {
    let harness = TestHarness::new();
    let candidate = CandidateId::generate();
    let record = vote(harness.test_user_id, candidate, 10, 950);

    let (name, value) = harness.user_auth();
    let response = harness
        .server
        .post("/v1/transactions")
        .add_header(name, value)
        .json(&record)
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["id"], record.id.to_string());

    let response = harness
        .server
        .get(&format!("/v1/candidates/{candidate}"))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["votes"], 10);
    assert_eq!(body["points"], 10);
}

#[tokio::test]
async fn insert_publishes_changed_rows() {
    let harness = TestHarness::new();
    let mut changes = harness.state.notifier.subscribe();
    let candidate = CandidateId::generate();

    let (name, value) = harness.user_auth();
    harness
        .server
        .post("/v1/transactions")
        .add_header(name, value)
        .json(&vote(harness.test_user_id, candidate, 5, 500))
        .await
        .assert_status(StatusCode::CREATED);

    match changes.try_recv().unwrap() {
        ChangeEvent::Candidate(row) => {
            assert_eq!(row.candidate_id, candidate);
            assert_eq!(row.votes, 5);
        }
        other => panic!("expected candidate row, got {other:?}"),
    }
    match changes.try_recv().unwrap() {
        ChangeEvent::Fan(row) => assert_eq!(row.user_id, harness.test_user_id),
        other => panic!("expected fan row, got {other:?}"),
    }
}

#[tokio::test]
async fn duplicate_reference_conflicts() {
    let harness = TestHarness::new();
    let record = vote(harness.test_user_id, CandidateId::generate(), 1, 100);

    let (name, value) = harness.user_auth();
    harness
        .server
        .post("/v1/transactions")
        .add_header(name.clone(), value.clone())
        .json(&record)
        .await
        .assert_status(StatusCode::CREATED);

    let response = harness
        .server
        .post("/v1/transactions")
        .add_header(name, value)
        .json(&record)
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "duplicate_reference");
}

#[tokio::test]
async fn insert_for_another_user_is_forbidden() {
    let harness = TestHarness::new();
    let record = vote(UserId::generate(), CandidateId::generate(), 1, 100);

    let (name, value) = harness.user_auth();
    let response = harness
        .server
        .post("/v1/transactions")
        .add_header(name, value)
        .json(&record)
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn inconsistent_unit_price_is_rejected() {
    let harness = TestHarness::new();
    let mut record = vote(harness.test_user_id, CandidateId::generate(), 3, 1000);
    record.unit_price = 400;

    let (name, value) = harness.user_auth();
    let response = harness
        .server
        .post("/v1/transactions")
        .add_header(name, value)
        .json(&record)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn history_lists_own_transactions_newest_first() {
    let harness = TestHarness::new();
    let candidate = CandidateId::generate();
    let (name, value) = harness.user_auth();

    let first = vote(harness.test_user_id, candidate, 1, 100);
    harness
        .server
        .post("/v1/transactions")
        .add_header(name.clone(), value.clone())
        .json(&first)
        .await
        .assert_status(StatusCode::CREATED);

    tokio::time::sleep(std::time::Duration::from_millis(2)).await;

    let second = vote(harness.test_user_id, candidate, 10, 950);
    harness
        .server
        .post("/v1/transactions")
        .add_header(name.clone(), value.clone())
        .json(&second)
        .await
        .assert_status(StatusCode::CREATED);

    let response = harness
        .server
        .get("/v1/transactions")
        .add_query_param("limit", 1)
        .add_header(name, value)
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["transactions"].as_array().unwrap().len(), 1);
    assert_eq!(body["transactions"][0]["id"], second.id.to_string());
    assert_eq!(body["has_more"], true);
}

#[tokio::test]
async fn fan_standing_includes_rank() {
    let harness = TestHarness::new();
    let (name, value) = harness.user_auth();

    harness
        .server
        .post("/v1/transactions")
        .add_header(name.clone(), value.clone())
        .json(&vote(harness.test_user_id, CandidateId::generate(), 3, 300))
        .await
        .assert_status(StatusCode::CREATED);

    let response = harness
        .server
        .get(&format!("/v1/fans/{}", harness.test_user_id))
        .add_header(name, value)
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["votes_cast"], 3);
    assert_eq!(body["points"], 3);
    assert_eq!(body["rank"], 1);
}

#[tokio::test]
async fn package_catalog_is_seeded() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/packages").await;

    response.assert_status_ok();
    let packages: Vec<VotePackage> = response.json();
    assert_eq!(packages.len(), fanvote_core::default_vote_packages().len());
    assert!(packages.iter().any(|p| !p.is_active));
}
