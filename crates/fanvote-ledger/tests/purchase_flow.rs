//! Vote and gift purchase flows against the in-memory backend.

use std::sync::Arc;

use fanvote_core::{
    rounded_unit_price, CandidateId, GiftCatalog, GiftType, PurchaseReference,
    PurchaseTransaction, TransactionKind, TransactionStatus, UserId, VotePackage,
};
use fanvote_ledger::{
    BackendError, InMemoryBackend, Ledger, LedgerBackend, Operation, PurchaseError,
    PurchaseHandler, Session,
};

fn setup(balance: i64) -> (Arc<InMemoryBackend>, Ledger<InMemoryBackend>, UserId) {
    let backend = Arc::new(InMemoryBackend::new());
    let fan = UserId::generate();
    backend.fund(fan, balance);
    (Arc::clone(&backend), Ledger::new(backend), fan)
}

fn rose() -> GiftType {
    GiftCatalog::standard().require("rose").unwrap().clone()
}

#[tokio::test]
async fn sufficient_balance_records_one_transaction_and_debits_price() {
    let (backend, ledger, fan) = setup(5000);
    let candidate = CandidateId::generate();
    let package = VotePackage::new("bundle-10", 10, 950);

    let receipt = ledger
        .purchase_votes(&Session::authenticated(fan), candidate, &package)
        .await
        .unwrap();

    let transactions = backend.transactions();
    assert_eq!(transactions.len(), 1);

    let tx = &transactions[0];
    assert_eq!(tx.id, receipt.transaction_id);
    assert_eq!(tx.kind, TransactionKind::Vote);
    assert_eq!(tx.status, TransactionStatus::Completed);
    assert_eq!(tx.total_amount, 950);
    assert_eq!(tx.unit_count, 10);
    assert_eq!(tx.unit_price, 95);
    assert_eq!(tx.recipient_id, candidate);
    assert!(tx.reference.as_str().starts_with("VOTE-"));
    assert_eq!(tx.metadata["package_id"], "bundle-10");

    assert_eq!(receipt.balance_after, 4050);
    assert_eq!(backend.balance(&fan), Some(4050));
}

#[tokio::test]
async fn exact_balance_is_sufficient() {
    let (backend, ledger, fan) = setup(950);

    ledger
        .purchase_votes(
            &Session::authenticated(fan),
            CandidateId::generate(),
            &VotePackage::new("bundle-10", 10, 950),
        )
        .await
        .unwrap();

    assert_eq!(backend.balance(&fan), Some(0));
}

#[tokio::test]
async fn insufficient_balance_writes_nothing() {
    let (backend, ledger, fan) = setup(949);

    let err = ledger
        .purchase_votes(
            &Session::authenticated(fan),
            CandidateId::generate(),
            &VotePackage::new("bundle-10", 10, 950),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PurchaseError::InsufficientBalance {
            balance: Some(949),
            required: 950
        }
    ));
    assert!(backend.transactions().is_empty());
    assert_eq!(backend.balance(&fan), Some(949));
}

#[tokio::test]
async fn failed_insert_leaves_balance_untouched() {
    let (backend, ledger, fan) = setup(5000);
    backend.fail(Operation::InsertTransaction);

    let err = ledger
        .purchase_votes(
            &Session::authenticated(fan),
            CandidateId::generate(),
            &VotePackage::new("single", 1, 100),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PurchaseError::RecordingFailed(_)));
    assert!(backend.transactions().is_empty());
    assert_eq!(backend.balance(&fan), Some(5000));
}

#[tokio::test]
async fn failed_debit_keeps_transaction_and_balance() {
    let (backend, ledger, fan) = setup(5000);
    backend.fail(Operation::UpdateBalance);

    let err = ledger
        .purchase_votes(
            &Session::authenticated(fan),
            CandidateId::generate(),
            &VotePackage::new("bundle-10", 10, 950),
        )
        .await
        .unwrap_err();

    let transactions = backend.transactions();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].total_amount, 950);
    assert_eq!(backend.balance(&fan), Some(5000));

    match &err {
        PurchaseError::DebitFailed {
            reference,
            transaction_id,
            ..
        } => {
            assert_eq!(reference, &transactions[0].reference);
            assert_eq!(transaction_id, &transactions[0].id);
        }
        other => panic!("expected DebitFailed, got {other:?}"),
    }
    assert!(err.leaves_ledger_inconsistent());
}

#[tokio::test]
async fn concurrent_purchases_both_pass_the_balance_check() {
    // Both flows read the balance before either debits.
    let backend = Arc::new(
        InMemoryBackend::with_packages(vec![VotePackage::new("promo", 10, 1000)])
            .with_read_barrier(2),
    );
    let fan = UserId::generate();
    backend.fund(fan, 1000);
    let ledger = Ledger::new(Arc::clone(&backend));

    let session = Session::authenticated(fan);
    let package = VotePackage::new("promo", 10, 1000);

    let (first, second) = tokio::join!(
        ledger.purchase_votes(&session, CandidateId::generate(), &package),
        ledger.purchase_votes(&session, CandidateId::generate(), &package),
    );
    assert!(first.is_ok());
    assert!(second.is_ok());

    // Overspend: two purchases recorded, the overwrite leaves the stored
    // balance at zero, and the ledger implies one price below zero.
    let transactions = backend.transactions();
    assert_eq!(transactions.len(), 2);
    assert!(transactions.iter().all(|t| t.total_amount == 1000));

    let stored = backend.balance(&fan).unwrap();
    let charged = backend.read_fan_points(&fan).await.unwrap().amount_spent;
    assert_eq!(stored, 0);
    assert_eq!(charged, 2000);
    assert_eq!(1000 - charged, stored - 1000);
}

#[tokio::test]
async fn unit_price_rounds_to_nearest() {
    let backend = Arc::new(InMemoryBackend::with_packages(vec![VotePackage::new(
        "odd", 3, 1000,
    )]));
    let fan = UserId::generate();
    backend.fund(fan, 5000);
    let ledger = Ledger::new(Arc::clone(&backend));

    ledger
        .purchase_votes(
            &Session::authenticated(fan),
            CandidateId::generate(),
            &VotePackage::new("odd", 3, 1000),
        )
        .await
        .unwrap();

    assert_eq!(backend.transactions()[0].unit_price, 333);
    assert_eq!(rounded_unit_price(1000, 3), 333);
}

#[test]
fn generated_references_are_unique() {
    let references: std::collections::HashSet<PurchaseReference> = (0..10_000)
        .map(|_| PurchaseReference::generate("VOTE"))
        .collect();
    assert_eq!(references.len(), 10_000);
}

#[tokio::test]
async fn anonymous_session_is_rejected_before_any_call() {
    let (backend, ledger, _) = setup(5000);
    backend.fail(Operation::ReadBalance);

    let err = ledger
        .purchase_votes(
            &Session::anonymous(),
            CandidateId::generate(),
            &VotePackage::new("single", 1, 100),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PurchaseError::NotAuthenticated));
}

#[tokio::test]
async fn inactive_package_is_refused() {
    let (backend, ledger, fan) = setup(5000);
    let mut package = VotePackage::new("launch-promo", 25, 2000);
    package.is_active = false;

    let err = ledger
        .purchase_votes(&Session::authenticated(fan), CandidateId::generate(), &package)
        .await
        .unwrap_err();

    assert!(matches!(err, PurchaseError::PackageUnavailable { .. }));
    assert!(backend.transactions().is_empty());
}

#[tokio::test]
async fn package_outside_the_catalog_is_refused() {
    let (backend, ledger, fan) = setup(10);

    let err = ledger
        .purchase_votes(
            &Session::authenticated(fan),
            CandidateId::generate(),
            &VotePackage::new("forged", 1_000_000, 1),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PurchaseError::PackageUnavailable { package_id } if package_id == "forged"
    ));
    assert!(backend.transactions().is_empty());
    assert_eq!(backend.balance(&fan), Some(10));
}

#[tokio::test]
async fn listed_package_with_altered_price_is_refused() {
    let (backend, ledger, fan) = setup(5000);

    let err = ledger
        .purchase_votes(
            &Session::authenticated(fan),
            CandidateId::generate(),
            &VotePackage::new("bundle-100", 100, 1),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PurchaseError::PackageUnavailable { .. }));
    assert!(backend.transactions().is_empty());
    assert_eq!(backend.balance(&fan), Some(5000));
}

#[tokio::test]
async fn unreadable_catalog_writes_nothing() {
    let (backend, ledger, fan) = setup(5000);
    backend.fail(Operation::ListPackages);

    let err = ledger
        .purchase_votes(
            &Session::authenticated(fan),
            CandidateId::generate(),
            &VotePackage::new("single", 1, 100),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PurchaseError::CatalogUnavailable(_)));
    assert!(backend.transactions().is_empty());
    assert_eq!(backend.balance(&fan), Some(5000));
}

#[tokio::test]
async fn unreadable_balance_writes_nothing() {
    let (backend, ledger, fan) = setup(5000);
    backend.fail(Operation::ReadBalance);

    let err = ledger
        .purchase_votes(
            &Session::authenticated(fan),
            CandidateId::generate(),
            &VotePackage::new("single", 1, 100),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PurchaseError::BalanceUnavailable(_)));
    assert!(backend.transactions().is_empty());
}

#[tokio::test]
async fn vote_purchase_updates_candidate_totals() {
    let (backend, ledger, fan) = setup(5000);
    let candidate = CandidateId::generate();

    ledger
        .purchase_votes(
            &Session::authenticated(fan),
            candidate,
            &VotePackage::new("bundle-10", 10, 950),
        )
        .await
        .unwrap();

    let aggregate = backend.read_candidate(&candidate).await.unwrap();
    assert_eq!(aggregate.votes, 10);
    assert_eq!(aggregate.points, 10);
}

#[tokio::test]
async fn gift_debits_atomically() {
    let (backend, ledger, fan) = setup(1000);
    let candidate = CandidateId::generate();

    let receipt = ledger
        .purchase_gift(&Session::authenticated(fan), candidate, &rose())
        .await
        .unwrap();

    assert_eq!(receipt.balance_after, 900);
    assert_eq!(backend.balance(&fan), Some(900));

    let transactions = backend.transactions();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].kind, TransactionKind::Gift);
    assert!(receipt.reference.as_str().starts_with("GIFT-"));

    let aggregate = backend.read_candidate(&candidate).await.unwrap();
    assert_eq!(aggregate.gifts, 1);
    assert_eq!(aggregate.gift_worth, 100);
}

#[tokio::test]
async fn gift_with_low_balance_maps_to_insufficient_balance() {
    let (backend, ledger, fan) = setup(50);

    let err = ledger
        .purchase_gift(&Session::authenticated(fan), CandidateId::generate(), &rose())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PurchaseError::InsufficientBalance {
            balance: None,
            required: 100
        }
    ));
    assert!(backend.transactions().is_empty());
    assert_eq!(backend.balance(&fan), Some(50));
}

#[tokio::test]
async fn unknown_gift_is_a_generic_gift_failure() {
    let (_, ledger, fan) = setup(50_000);
    let gift = GiftType {
        id: "unicorn".into(),
        name: "Unicorn".into(),
        price: 100,
        points: 1,
    };

    let err = ledger
        .purchase_gift(&Session::authenticated(fan), CandidateId::generate(), &gift)
        .await
        .unwrap_err();

    assert!(matches!(err, PurchaseError::GiftFailed(BackendError::NotFound(_))));
    assert_eq!(err.user_message(), "Failed to send gift. Please try again.");
}

#[tokio::test]
async fn gift_without_wallet_is_a_generic_gift_failure() {
    let backend = Arc::new(InMemoryBackend::new());
    let ledger = Ledger::new(Arc::clone(&backend));

    let err = ledger
        .purchase_gift(
            &Session::authenticated(UserId::generate()),
            CandidateId::generate(),
            &rose(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PurchaseError::GiftFailed(BackendError::NotFound(_))));
    assert_eq!(err.user_message(), "Failed to send gift. Please try again.");
    assert!(backend.transactions().is_empty());
}

#[tokio::test]
async fn other_gift_failures_are_generic() {
    let (backend, ledger, fan) = setup(5000);
    backend.fail(Operation::GiftProcedure);

    let err = ledger
        .purchase_gift(&Session::authenticated(fan), CandidateId::generate(), &rose())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PurchaseError::GiftFailed(BackendError::Unavailable(_))
    ));
    assert_eq!(err.user_message(), "Failed to send gift. Please try again.");
}

#[tokio::test]
async fn active_packages_are_filtered_and_ordered() {
    let mut late = VotePackage::new("late", 1, 100);
    late.sort_order = 5;
    let mut early = VotePackage::new("early", 1, 100);
    early.sort_order = 1;
    let mut hidden = VotePackage::new("hidden", 1, 100);
    hidden.is_active = false;

    let backend = Arc::new(InMemoryBackend::with_packages(vec![late, hidden, early]));
    let ledger = Ledger::new(backend);

    let ids: Vec<String> = ledger
        .active_packages()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(ids, vec!["early", "late"]);

    assert_eq!(ledger.gift_types().await.unwrap().len(), 5);
}

#[tokio::test]
async fn handler_returns_fan_facing_messages() {
    let (backend, ledger, fan) = setup(50);
    let handler = PurchaseHandler::new(ledger, Session::authenticated(fan));

    let message = handler
        .submit_votes(CandidateId::generate(), &VotePackage::new("single", 1, 100))
        .await
        .unwrap_err();
    assert_eq!(
        message,
        "Insufficient balance. Please top up your wallet and try again."
    );
    assert!(!handler.is_processing());

    backend.fund(fan, 500);
    backend.fail(Operation::UpdateBalance);
    let message = handler
        .submit_votes(CandidateId::generate(), &VotePackage::new("single", 1, 100))
        .await
        .unwrap_err();
    assert_eq!(message, "Failed to process your vote. Please try again.");
    assert!(!handler.is_processing());
}

#[tokio::test]
async fn handler_ignores_submission_while_processing() {
    // The first purchase parks at the read barrier until a second reader arrives.
    let backend = Arc::new(InMemoryBackend::new().with_read_barrier(2));
    let fan = UserId::generate();
    backend.fund(fan, 5000);
    let ledger = Ledger::new(Arc::clone(&backend));
    let handler = Arc::new(PurchaseHandler::new(ledger, Session::authenticated(fan)));

    let first = {
        let handler = Arc::clone(&handler);
        tokio::spawn(async move {
            handler
                .submit_votes(CandidateId::generate(), &VotePackage::new("single", 1, 100))
                .await
        })
    };

    while !handler.is_processing() {
        tokio::task::yield_now().await;
    }

    let second = handler
        .submit_gift(CandidateId::generate(), &rose())
        .await
        .unwrap_err();
    assert_eq!(second, "Your purchase is still being processed.");

    // Release the barrier with an outside reader.
    backend.read_balance(&fan).await.unwrap();
    let receipt = first.await.unwrap().unwrap();

    assert_eq!(receipt.votes, 1);
    assert!(!handler.is_processing());
    assert_eq!(backend.transactions().len(), 1);
}

#[tokio::test]
async fn recorded_transactions_validate() {
    let (backend, ledger, fan) = setup(50_000);

    for package in fanvote_core::default_vote_packages()
        .iter()
        .filter(|p| p.is_active)
    {
        ledger
            .purchase_votes(&Session::authenticated(fan), CandidateId::generate(), package)
            .await
            .unwrap();
    }

    let transactions: Vec<PurchaseTransaction> = backend.transactions();
    assert_eq!(transactions.len(), 4);
    assert!(transactions.iter().all(|t| t.validate().is_ok()));
}
