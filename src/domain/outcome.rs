use super::transaction::{PurchasePayload, TransactionEvent};
use crate::error::StoreError;
use serde::{Deserialize, Serialize};

/// Caller-supplied options for a purchase attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOptions {
    pub quantity: u32,
    /// Identifier of a promotional offer to apply, if any.
    pub promotional_offer: Option<String>,
    /// Opaque token linking the purchase to an application account.
    pub account_token: Option<String>,
    /// Sandbox-only: simulate the purchase being gated on out-of-band approval.
    pub simulate_pending_approval: bool,
    /// When set, a successful purchase is acknowledged before the outcome is
    /// returned; otherwise the caller must call `finish` after delivering
    /// content.
    pub auto_finish: bool,
}

impl Default for PurchaseOptions {
    fn default() -> Self {
        Self {
            quantity: 1,
            promotional_offer: None,
            account_token: None,
            simulate_pending_approval: false,
            auto_finish: false,
        }
    }
}

/// The shape a purchase call produces at the backend boundary, before
/// classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawPurchaseResult {
    /// The backend completed the purchase and produced a transaction event,
    /// verified or not.
    Completed(TransactionEvent),
    /// The user dismissed the payment surface.
    Cancelled,
    /// The purchase is deferred on out-of-band consent (e.g. Ask-to-Buy).
    Pending,
}

/// The single well-typed outcome of a purchase attempt.
///
/// `UserCancelled` and `Pending` are distinguished outcomes, not errors:
/// UI layers show no alarming message for either.
#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseOutcome {
    Succeeded {
        payload: PurchasePayload,
        /// True when the caller still owes an `acknowledge` call. Until that
        /// call succeeds the same product stays blocked from repurchase.
        needs_manual_finish: bool,
    },
    UserCancelled,
    Pending,
    Failed(StoreError),
}

impl PurchaseOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}
