use super::catalog::{ProductId, ProductKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The content of one purchase transaction as reported by the backend.
///
/// A payload on its own says nothing about trustworthiness; whether it was
/// cryptographically verified is carried by the enclosing [`TransactionEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchasePayload {
    pub transaction_id: u64,
    pub product_id: ProductId,
    pub product_kind: ProductKind,
    pub quantity: u32,
}

/// Why a transaction payload failed verification.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum VerificationFailure {
    #[error("payload signature is invalid")]
    InvalidSignature,
    #[error("signing entitlement was revoked")]
    RevokedEntitlement,
    #[error("payload is malformed: {0}")]
    Malformed(String),
}

/// One item of the backend's push-based transaction feed.
///
/// Unverified payloads are forwarded with the claimed content intact so a
/// caller can still inspect what was asserted, without trusting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionEvent {
    Verified(PurchasePayload),
    Unverified {
        payload: PurchasePayload,
        reason: VerificationFailure,
    },
}

impl TransactionEvent {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified(_))
    }

    pub fn payload(&self) -> &PurchasePayload {
        match self {
            Self::Verified(payload) | Self::Unverified { payload, .. } => payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> PurchasePayload {
        PurchasePayload {
            transaction_id: 7,
            product_id: ProductId::from("gold.small"),
            product_kind: ProductKind::Consumable,
            quantity: 1,
        }
    }

    #[test]
    fn test_unverified_event_exposes_claimed_payload() {
        let event = TransactionEvent::Unverified {
            payload: payload(),
            reason: VerificationFailure::InvalidSignature,
        };

        assert!(!event.is_verified());
        assert_eq!(event.payload().transaction_id, 7);
    }

    #[test]
    fn test_verification_failure_display() {
        let reason = VerificationFailure::Malformed("truncated envelope".to_string());
        assert_eq!(reason.to_string(), "payload is malformed: truncated envelope");
    }
}
