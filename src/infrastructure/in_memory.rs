use crate::domain::catalog::{Product, ProductId};
use crate::domain::outcome::{PurchaseOptions, RawPurchaseResult};
use crate::domain::ports::{EventStream, StorefrontBackend};
use crate::domain::transaction::{PurchasePayload, TransactionEvent};
use crate::error::BackendError;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tokio::sync::{Mutex, RwLock, Semaphore, broadcast};
use tokio_stream::StreamExt as _;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// In-process storefront backend.
///
/// Serves a seeded product map, synthesizes verified purchase transactions and
/// pushes events over a broadcast channel, so every `transaction_events` call
/// gets an independent consumer positioned at "now". Behavior is scriptable
/// (failure injection, held fetches, queued purchase results), which makes it
/// the backend for the demo binary and the integration tests alike.
pub struct InMemoryBackend {
    products: RwLock<HashMap<ProductId, Product>>,
    events: broadcast::Sender<TransactionEvent>,
    fetch_calls: AtomicUsize,
    fail_next_fetch: AtomicBool,
    fetches_held: AtomicBool,
    fetch_gate: Semaphore,
    purchase_script: Mutex<VecDeque<Result<RawPurchaseResult, BackendError>>>,
    fail_next_acknowledge: AtomicBool,
    acknowledged: Mutex<Vec<u64>>,
    next_transaction: AtomicU64,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            products: RwLock::new(HashMap::new()),
            events,
            fetch_calls: AtomicUsize::new(0),
            fail_next_fetch: AtomicBool::new(false),
            fetches_held: AtomicBool::new(false),
            fetch_gate: Semaphore::new(0),
            purchase_script: Mutex::new(VecDeque::new()),
            fail_next_acknowledge: AtomicBool::new(false),
            acknowledged: Mutex::new(Vec::new()),
            next_transaction: AtomicU64::new(1),
        }
    }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let map = products
            .into_iter()
            .map(|product| (product.id.clone(), product))
            .collect();
        Self {
            products: RwLock::new(map),
            ..Self::new()
        }
    }

    /// Pushes an event to every live observer stream. Events emitted while no
    /// observer is running are simply not seen, matching a feed consumed from
    /// "now".
    pub fn emit(&self, event: TransactionEvent) {
        let _ = self.events.send(event);
    }

    /// Total number of `fetch_products` calls served so far.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Makes the next fetch fail with `BackendError::Unavailable`.
    pub fn fail_next_fetch(&self) {
        self.fail_next_fetch.store(true, Ordering::SeqCst);
    }

    /// Blocks every subsequent fetch on the gate until released.
    pub fn hold_fetches(&self) {
        self.fetches_held.store(true, Ordering::SeqCst);
    }

    /// Releases `n` held fetches. Each held fetch consumes one permit.
    pub fn release_fetches(&self, n: usize) {
        self.fetch_gate.add_permits(n);
    }

    /// Queues a canned result for the next purchase call.
    pub async fn script_purchase(&self, result: Result<RawPurchaseResult, BackendError>) {
        self.purchase_script.lock().await.push_back(result);
    }

    /// Makes the next acknowledge call fail.
    pub fn fail_next_acknowledge(&self) {
        self.fail_next_acknowledge.store(true, Ordering::SeqCst);
    }

    /// Transaction ids acknowledged so far, in call order.
    pub async fn acknowledged(&self) -> Vec<u64> {
        self.acknowledged.lock().await.clone()
    }
}

#[async_trait]
impl StorefrontBackend for InMemoryBackend {
    async fn fetch_products(
        &self,
        ids: &BTreeSet<ProductId>,
    ) -> Result<Vec<Product>, BackendError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        if self.fetches_held.load(Ordering::SeqCst) {
            match self.fetch_gate.acquire().await {
                Ok(permit) => permit.forget(),
                Err(_) => {
                    return Err(BackendError::Unavailable("fetch gate closed".to_string()));
                }
            }
        }
        if self.fail_next_fetch.swap(false, Ordering::SeqCst) {
            return Err(BackendError::Unavailable("injected failure".to_string()));
        }

        let products = self.products.read().await;
        let mut found = Vec::with_capacity(ids.len());
        let mut unknown = Vec::new();
        for id in ids {
            match products.get(id) {
                Some(product) => found.push(product.clone()),
                None => unknown.push(id.clone()),
            }
        }
        if !unknown.is_empty() {
            return Err(BackendError::UnknownProducts(unknown));
        }
        Ok(found)
    }

    async fn purchase(
        &self,
        product: &Product,
        options: &PurchaseOptions,
    ) -> Result<RawPurchaseResult, BackendError> {
        if let Some(scripted) = self.purchase_script.lock().await.pop_front() {
            return scripted;
        }
        if options.simulate_pending_approval {
            return Ok(RawPurchaseResult::Pending);
        }

        let payload = PurchasePayload {
            transaction_id: self.next_transaction.fetch_add(1, Ordering::SeqCst),
            product_id: product.id.clone(),
            product_kind: product.kind,
            quantity: options.quantity,
        };
        let event = TransactionEvent::Verified(payload);
        self.emit(event.clone());
        Ok(RawPurchaseResult::Completed(event))
    }

    fn transaction_events(&self) -> EventStream {
        let receiver = self.events.subscribe();
        Box::pin(
            BroadcastStream::new(receiver).filter_map(|item| match item {
                Ok(event) => Some(event),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "transaction feed receiver lagged");
                    None
                }
            }),
        )
    }

    async fn acknowledge(&self, payload: &PurchasePayload) -> Result<(), BackendError> {
        if self.fail_next_acknowledge.swap(false, Ordering::SeqCst) {
            return Err(BackendError::Internal(
                "acknowledge rejected".to_string(),
            ));
        }
        self.acknowledged.lock().await.push(payload.transaction_id);
        Ok(())
    }
}
