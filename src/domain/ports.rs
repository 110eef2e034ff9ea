use super::catalog::{Product, ProductId};
use super::outcome::{PurchaseOptions, RawPurchaseResult};
use super::transaction::{PurchasePayload, TransactionEvent};
use crate::error::BackendError;
use async_trait::async_trait;
use futures_core::Stream;
use std::collections::BTreeSet;
use std::pin::Pin;
use std::sync::Arc;

/// A fresh, independent view of the backend's transaction feed.
///
/// The feed is infinite and multi-consumer: every call to
/// [`StorefrontBackend::transaction_events`] yields a stream positioned at
/// "now", with no cursor shared between consumers.
pub type EventStream = Pin<Box<dyn Stream<Item = TransactionEvent> + Send>>;

/// The external commerce backend: catalog lookups, purchases, the push-based
/// transaction feed, and the acknowledge step.
///
/// Implementations report failures as [`BackendError`]; translation into the
/// unified taxonomy happens once, at the application boundary.
#[async_trait]
pub trait StorefrontBackend: Send + Sync {
    async fn fetch_products(
        &self,
        ids: &BTreeSet<ProductId>,
    ) -> Result<Vec<Product>, BackendError>;

    async fn purchase(
        &self,
        product: &Product,
        options: &PurchaseOptions,
    ) -> Result<RawPurchaseResult, BackendError>;

    fn transaction_events(&self) -> EventStream;

    /// Marks a purchase as fully processed, unblocking repurchase of the same
    /// product. Intended to be idempotent on the backend side.
    async fn acknowledge(&self, payload: &PurchasePayload) -> Result<(), BackendError>;
}

pub type BackendArc = Arc<dyn StorefrontBackend>;

/// Receiver of filtered transaction events.
///
/// The observer loop awaits `deliver` to completion before pulling the next
/// event, so a slow sink naturally back-pressures its own subscription.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn deliver(&self, event: TransactionEvent);
}

#[async_trait]
impl EventSink for tokio::sync::mpsc::Sender<TransactionEvent> {
    async fn deliver(&self, event: TransactionEvent) {
        // A closed receiver just drops the event; the observer is stopped
        // through the registry, not through sink failure.
        let _ = self.send(event).await;
    }
}
