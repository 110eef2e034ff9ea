use crate::domain::catalog::Product;
use crate::domain::outcome::{PurchaseOptions, PurchaseOutcome, RawPurchaseResult};
use crate::domain::ports::BackendArc;
use crate::domain::transaction::{PurchasePayload, TransactionEvent};
use crate::error::{BackendError, Result, StoreError};

/// Drives purchase attempts against the backend and reduces every possible
/// result to one [`PurchaseOutcome`].
pub struct PurchaseFlow {
    backend: BackendArc,
}

impl PurchaseFlow {
    pub fn new(backend: BackendArc) -> Self {
        Self { backend }
    }

    /// Attempts to purchase `product` and returns the classified outcome.
    ///
    /// With `options.auto_finish` set, a successful purchase is acknowledged
    /// before this returns and the outcome reports
    /// `needs_manual_finish = false`. Otherwise the caller owes exactly one
    /// [`finish`] call after content delivery; until that call succeeds the
    /// backend keeps the product blocked from repurchase.
    ///
    /// [`finish`]: PurchaseFlow::finish
    pub async fn purchase(
        &self,
        product: &Product,
        options: &PurchaseOptions,
    ) -> PurchaseOutcome {
        let raw = self.backend.purchase(product, options).await;
        let outcome = classify(raw);

        let PurchaseOutcome::Succeeded { payload, .. } = outcome else {
            return outcome;
        };
        if !options.auto_finish {
            return PurchaseOutcome::Succeeded {
                payload,
                needs_manual_finish: true,
            };
        }

        match self.backend.acknowledge(&payload).await {
            Ok(()) => PurchaseOutcome::Succeeded {
                payload,
                needs_manual_finish: false,
            },
            Err(err) => {
                // The purchase itself stands; only the finish step is owed.
                tracing::warn!(
                    transaction_id = payload.transaction_id,
                    error = %err,
                    "auto-finish acknowledge failed; manual finish still required"
                );
                PurchaseOutcome::Succeeded {
                    payload,
                    needs_manual_finish: true,
                }
            }
        }
    }

    /// Manually acknowledges a delivered purchase.
    pub async fn finish(&self, payload: &PurchasePayload) -> Result<()> {
        self.backend.acknowledge(payload).await.map_err(Into::into)
    }
}

/// Total mapping from the raw purchase boundary into a [`PurchaseOutcome`].
///
/// Every raw shape and every backend error lands in exactly one variant;
/// this function never fails. Backends that report cancellation or pending
/// approval through the error channel are normalized to the corresponding
/// distinguished outcome rather than `Failed`.
pub fn classify(raw: std::result::Result<RawPurchaseResult, BackendError>) -> PurchaseOutcome {
    match raw {
        Ok(RawPurchaseResult::Completed(TransactionEvent::Verified(payload))) => {
            PurchaseOutcome::Succeeded {
                payload,
                needs_manual_finish: true,
            }
        }
        Ok(RawPurchaseResult::Completed(TransactionEvent::Unverified { payload, reason })) => {
            PurchaseOutcome::Failed(StoreError::VerificationFailed { payload, reason })
        }
        Ok(RawPurchaseResult::Cancelled) => PurchaseOutcome::UserCancelled,
        Ok(RawPurchaseResult::Pending) => PurchaseOutcome::Pending,
        Err(err) => match StoreError::from(err) {
            StoreError::UserCancelled => PurchaseOutcome::UserCancelled,
            StoreError::PendingApproval => PurchaseOutcome::Pending,
            other => PurchaseOutcome::Failed(other),
        },
    }
}
