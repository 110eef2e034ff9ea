use crate::domain::catalog::ProductId;
use crate::domain::transaction::{PurchasePayload, VerificationFailure};
use thiserror::Error;

/// Error produced at the backend boundary by [`StorefrontBackend`]
/// implementations.
///
/// [`StorefrontBackend`]: crate::domain::ports::StorefrontBackend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("unknown products: {0:?}")]
    UnknownProducts(Vec<ProductId>),
    #[error("purchase cancelled by the user")]
    Cancelled,
    #[error("purchase awaiting out-of-band approval")]
    PendingApproval,
    #[error("backend internal error: {0}")]
    Internal(String),
}

/// The unified error taxonomy surfaced to application code.
///
/// Every externally-sourced failure is translated into this type exactly once,
/// at the boundary; no raw backend error crosses into callers. `Clone` because
/// a coalesced fetch fans one failure out to every joined caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("store backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("invalid or unknown products: {0:?}")]
    InvalidProduct(Vec<ProductId>),
    #[error("purchase cancelled by the user")]
    UserCancelled,
    #[error("purchase awaiting out-of-band approval")]
    PendingApproval,
    /// The claimed payload is preserved so callers can inspect what was
    /// asserted even though it could not be trusted.
    #[error("transaction failed verification: {reason}")]
    VerificationFailed {
        payload: PurchasePayload,
        reason: VerificationFailure,
    },
    #[error("unexpected store error: {0}")]
    Unknown(String),
}

impl From<BackendError> for StoreError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unavailable(detail) => Self::BackendUnavailable(detail),
            BackendError::UnknownProducts(ids) => Self::InvalidProduct(ids),
            BackendError::Cancelled => Self::UserCancelled,
            BackendError::PendingApproval => Self::PendingApproval,
            BackendError::Internal(detail) => Self::Unknown(detail),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
