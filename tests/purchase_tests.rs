mod common;

use common::{backend_with, consumable};
use storefront::application::purchase::PurchaseFlow;
use storefront::domain::outcome::{PurchaseOptions, PurchaseOutcome, RawPurchaseResult};
use storefront::domain::transaction::{TransactionEvent, VerificationFailure};
use storefront::error::{BackendError, StoreError};

fn auto_finish() -> PurchaseOptions {
    PurchaseOptions {
        auto_finish: true,
        ..PurchaseOptions::default()
    }
}

#[tokio::test]
async fn test_auto_finish_acknowledges_before_returning() {
    let backend = backend_with(&["gold.small"]);
    let flow = PurchaseFlow::new(backend.clone());

    let outcome = flow.purchase(&consumable("gold.small"), &auto_finish()).await;
    assert!(outcome.is_success());

    let PurchaseOutcome::Succeeded {
        payload,
        needs_manual_finish,
    } = outcome
    else {
        panic!("expected success, got {outcome:?}");
    };
    assert!(!needs_manual_finish);
    assert_eq!(backend.acknowledged().await, vec![payload.transaction_id]);
}

#[tokio::test]
async fn test_manual_finish_path_acknowledges_exactly_once() {
    let backend = backend_with(&["gold.small"]);
    let flow = PurchaseFlow::new(backend.clone());

    let outcome = flow
        .purchase(&consumable("gold.small"), &PurchaseOptions::default())
        .await;

    let PurchaseOutcome::Succeeded {
        payload,
        needs_manual_finish,
    } = outcome
    else {
        panic!("expected success, got {outcome:?}");
    };
    assert!(needs_manual_finish);
    assert!(backend.acknowledged().await.is_empty());

    flow.finish(&payload).await.unwrap();
    assert_eq!(backend.acknowledged().await, vec![payload.transaction_id]);
}

#[tokio::test]
async fn test_pending_approval_never_acknowledges() {
    let backend = backend_with(&["gold.small"]);
    let flow = PurchaseFlow::new(backend.clone());
    backend
        .script_purchase(Ok(RawPurchaseResult::Pending))
        .await;

    let outcome = flow.purchase(&consumable("gold.small"), &auto_finish()).await;

    assert_eq!(outcome, PurchaseOutcome::Pending);
    assert!(backend.acknowledged().await.is_empty());
}

#[tokio::test]
async fn test_user_cancellation_is_a_distinguished_outcome() {
    let backend = backend_with(&["gold.small"]);
    let flow = PurchaseFlow::new(backend.clone());
    backend
        .script_purchase(Ok(RawPurchaseResult::Cancelled))
        .await;

    let outcome = flow
        .purchase(&consumable("gold.small"), &PurchaseOptions::default())
        .await;
    assert_eq!(outcome, PurchaseOutcome::UserCancelled);
    assert!(!outcome.is_success());
}

#[tokio::test]
async fn test_unverified_completion_fails_with_claimed_payload() {
    let backend = backend_with(&["gold.small"]);
    let flow = PurchaseFlow::new(backend.clone());

    let claimed = common::verified_event(
        7,
        "gold.small",
        storefront::domain::catalog::ProductKind::Consumable,
    )
    .payload()
    .clone();
    backend
        .script_purchase(Ok(RawPurchaseResult::Completed(
            TransactionEvent::Unverified {
                payload: claimed.clone(),
                reason: VerificationFailure::InvalidSignature,
            },
        )))
        .await;

    let outcome = flow.purchase(&consumable("gold.small"), &auto_finish()).await;

    assert_eq!(
        outcome,
        PurchaseOutcome::Failed(StoreError::VerificationFailed {
            payload: claimed,
            reason: VerificationFailure::InvalidSignature,
        })
    );
    assert!(backend.acknowledged().await.is_empty());
}

#[tokio::test]
async fn test_backend_error_channel_normalizes_to_outcomes() {
    let backend = backend_with(&["gold.small"]);
    let flow = PurchaseFlow::new(backend.clone());

    backend.script_purchase(Err(BackendError::Cancelled)).await;
    assert_eq!(
        flow.purchase(&consumable("gold.small"), &PurchaseOptions::default())
            .await,
        PurchaseOutcome::UserCancelled
    );

    backend
        .script_purchase(Err(BackendError::PendingApproval))
        .await;
    assert_eq!(
        flow.purchase(&consumable("gold.small"), &PurchaseOptions::default())
            .await,
        PurchaseOutcome::Pending
    );

    backend
        .script_purchase(Err(BackendError::Unavailable("offline".to_string())))
        .await;
    assert_eq!(
        flow.purchase(&consumable("gold.small"), &PurchaseOptions::default())
            .await,
        PurchaseOutcome::Failed(StoreError::BackendUnavailable("offline".to_string()))
    );
}

#[tokio::test]
async fn test_failed_auto_finish_leaves_purchase_standing() {
    let backend = backend_with(&["gold.small"]);
    let flow = PurchaseFlow::new(backend.clone());
    backend.fail_next_acknowledge();

    let outcome = flow.purchase(&consumable("gold.small"), &auto_finish()).await;

    let PurchaseOutcome::Succeeded {
        payload,
        needs_manual_finish,
    } = outcome
    else {
        panic!("expected success, got {outcome:?}");
    };
    // The acknowledge is still owed and can be retried.
    assert!(needs_manual_finish);
    assert!(backend.acknowledged().await.is_empty());
    flow.finish(&payload).await.unwrap();
    assert_eq!(backend.acknowledged().await, vec![payload.transaction_id]);
}

#[tokio::test]
async fn test_simulated_pending_approval_option() {
    let backend = backend_with(&["gold.small"]);
    let flow = PurchaseFlow::new(backend.clone());

    let options = PurchaseOptions {
        simulate_pending_approval: true,
        ..PurchaseOptions::default()
    };
    let outcome = flow.purchase(&consumable("gold.small"), &options).await;
    assert_eq!(outcome, PurchaseOutcome::Pending);
}
