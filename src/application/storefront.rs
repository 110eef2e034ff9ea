use super::catalog_cache::ProductCache;
use super::observers::ObserverRegistry;
use super::purchase::PurchaseFlow;
use crate::domain::ports::BackendArc;
use std::sync::Arc;

/// The application-facing entry point: one cache, one observer registry and
/// one purchase flow over a shared backend.
///
/// There is deliberately no process-wide default instance; whoever wires the
/// application constructs a `Storefront` and passes it down explicitly.
pub struct Storefront {
    catalog: ProductCache,
    observers: ObserverRegistry,
    purchases: PurchaseFlow,
}

impl Storefront {
    pub fn new(backend: BackendArc) -> Self {
        Self {
            catalog: ProductCache::new(Arc::clone(&backend)),
            observers: ObserverRegistry::new(Arc::clone(&backend)),
            purchases: PurchaseFlow::new(backend),
        }
    }

    pub fn catalog(&self) -> &ProductCache {
        &self.catalog
    }

    pub fn observers(&self) -> &ObserverRegistry {
        &self.observers
    }

    pub fn purchases(&self) -> &PurchaseFlow {
        &self.purchases
    }

    /// Tears down every live observer. Call once at application shutdown.
    pub async fn shutdown(&self) {
        self.observers.shutdown().await;
    }
}
