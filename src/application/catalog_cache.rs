use crate::domain::catalog::{Product, ProductId};
use crate::domain::ports::BackendArc;
use crate::error::{Result, StoreError};
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

type FetchFuture = Shared<BoxFuture<'static, Result<Vec<Product>>>>;

#[derive(Default)]
struct CacheState {
    products: HashMap<ProductId, Product>,
    /// One entry per outstanding backend fetch, keyed by the exact missing-id
    /// set. An id is either cached or covered by at most one entry here.
    inflight: HashMap<BTreeSet<ProductId>, FetchFuture>,
}

/// Process-lifetime product cache with request coalescing.
///
/// Concurrent `resolve` calls that miss on the same exact id set share a
/// single backend fetch. Overlapping-but-unequal sets are deliberately not
/// merged; exact-set identity keeps the coalescing key trivially correct.
/// There is no eviction: a fetched product is considered valid for the life
/// of the process.
///
/// Each fetch runs on its own task: once started it completes, merges its
/// products and clears its in-flight entry even if every joined caller has
/// been cancelled mid-await. Callers are never able to cancel a fetch.
pub struct ProductCache {
    backend: BackendArc,
    state: Arc<Mutex<CacheState>>,
}

impl ProductCache {
    pub fn new(backend: BackendArc) -> Self {
        Self {
            backend,
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    /// Resolves `ids` to products, fetching whatever the cache is missing.
    ///
    /// Fails atomically: when the backend fetch for the missing ids errors,
    /// the whole call errors and no partial hit list is returned. The failed
    /// in-flight entry is cleared first, so a later call may retry.
    pub async fn resolve(&self, ids: &BTreeSet<ProductId>) -> Result<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let (hits, fetch) = {
            let mut state = self.state.lock().await;

            let mut hits = Vec::new();
            let mut missing = BTreeSet::new();
            for id in ids {
                match state.products.get(id) {
                    Some(product) => hits.push(product.clone()),
                    None => {
                        missing.insert(id.clone());
                    }
                }
            }
            if missing.is_empty() {
                return Ok(hits);
            }

            let fetch = match state.inflight.get(&missing) {
                Some(existing) => {
                    tracing::debug!(ids = ?missing, "joining in-flight product fetch");
                    existing.clone()
                }
                None => {
                    let backend = Arc::clone(&self.backend);
                    let shared_state = Arc::clone(&self.state);
                    let wanted = missing.clone();
                    // The fetch and its bookkeeping run on their own task,
                    // so completion does not depend on any caller staying
                    // alive to poll it.
                    let task = tokio::spawn(async move {
                        let result = backend
                            .fetch_products(&wanted)
                            .await
                            .map_err(StoreError::from);
                        let mut state = shared_state.lock().await;
                        if let Ok(products) = &result {
                            for product in products {
                                state.products.insert(product.id.clone(), product.clone());
                            }
                        }
                        // Entries are only inserted while absent, so this
                        // running fetch is the sole owner of its key.
                        state.inflight.remove(&wanted);
                        result
                    });
                    let fetch: FetchFuture = async move {
                        match task.await {
                            Ok(result) => result,
                            Err(err) => {
                                Err(StoreError::Unknown(format!("catalog fetch task failed: {err}")))
                            }
                        }
                    }
                    .boxed()
                    .shared();
                    state.inflight.insert(missing.clone(), fetch.clone());
                    fetch
                }
            };
            (hits, fetch)
        };

        // The lock is released here; the backend call itself is only ever
        // awaited outside it, through the shared view of the fetch task.
        let fetched = fetch.await?;
        let mut resolved = hits;
        resolved.extend(fetched);
        Ok(resolved)
    }

    /// True when `id` is already resident in the cache.
    pub async fn is_cached(&self, id: &ProductId) -> bool {
        self.state.lock().await.products.contains_key(id)
    }

    /// Number of backend fetches currently outstanding.
    pub async fn inflight_fetches(&self) -> usize {
        self.state.lock().await.inflight.len()
    }
}
