use crate::domain::catalog::ProductKind;
use crate::domain::ports::{BackendArc, EventSink, EventStream};
use crate::domain::transaction::TransactionEvent;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt as _;

/// Which transaction events an observer forwards to its sink.
///
/// Unverified events never propagate, under any filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventFilter {
    /// Every verified event, regardless of product kind.
    #[default]
    Verified,
    /// Verified events for auto-renewable subscriptions only.
    AutoRenewable,
}

impl EventFilter {
    fn passes(&self, event: &TransactionEvent) -> bool {
        let TransactionEvent::Verified(payload) = event else {
            return false;
        };
        match self {
            Self::Verified => true,
            Self::AutoRenewable => {
                payload.product_kind == ProductKind::AutoRenewableSubscription
            }
        }
    }
}

/// Opaque token identifying one running observer. Identity only.
///
/// Minted from a process-wide monotonic counter, so handles are unique across
/// registries as well as within one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverHandle(u64);

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

impl ObserverHandle {
    fn mint() -> Self {
        Self(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }
}

struct ObserverRecord {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Owns every live transaction-event observer.
///
/// Each `start` subscribes a fresh, independent consumer to the backend feed
/// (its own position, from "now") and runs it on its own task. Observers stay
/// alive until stopped through the registry or until [`shutdown`]; teardown is
/// deterministic and never left to garbage collection of the stream handle.
///
/// [`shutdown`]: ObserverRegistry::shutdown
pub struct ObserverRegistry {
    backend: BackendArc,
    observers: Mutex<HashMap<ObserverHandle, ObserverRecord>>,
}

impl ObserverRegistry {
    pub fn new(backend: BackendArc) -> Self {
        Self {
            backend,
            observers: Mutex::new(HashMap::new()),
        }
    }

    /// Starts an observer forwarding every verified event to `sink`.
    pub async fn start(&self, sink: Arc<dyn EventSink>) -> ObserverHandle {
        self.start_filtered(sink, EventFilter::Verified).await
    }

    /// Starts an observer with an explicit [`EventFilter`].
    ///
    /// The feed subscription is taken before this method returns, so every
    /// qualifying event emitted afterwards is seen exactly once.
    pub async fn start_filtered(
        &self,
        sink: Arc<dyn EventSink>,
        filter: EventFilter,
    ) -> ObserverHandle {
        let handle = ObserverHandle::mint();
        let stream = self.backend.transaction_events();
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(observe(handle, stream, sink, filter, stop_rx));

        self.observers
            .lock()
            .await
            .insert(handle, ObserverRecord { stop: stop_tx, task });
        tracing::debug!(?handle, ?filter, "observer started");
        handle
    }

    /// Stops the observer behind `handle` and waits for its task to finish.
    ///
    /// An event mid-delivery completes; nothing is delivered afterwards.
    /// Unknown or already-stopped handles are a no-op.
    pub async fn stop(&self, handle: ObserverHandle) {
        let record = self.observers.lock().await.remove(&handle);
        let Some(record) = record else {
            tracing::debug!(?handle, "stop for unknown or already-stopped observer");
            return;
        };
        let _ = record.stop.send(());
        let _ = record.task.await;
        tracing::debug!(?handle, "observer stopped");
    }

    /// Deterministically stops every remaining observer.
    pub async fn shutdown(&self) {
        let records: Vec<_> = self.observers.lock().await.drain().collect();
        for (handle, record) in records {
            let _ = record.stop.send(());
            let _ = record.task.await;
            tracing::debug!(?handle, "observer stopped at shutdown");
        }
    }

    /// Number of currently running observers.
    pub async fn active(&self) -> usize {
        self.observers.lock().await.len()
    }
}

impl Drop for ObserverRegistry {
    fn drop(&mut self) {
        let Ok(mut observers) = self.observers.try_lock() else {
            return;
        };
        if observers.is_empty() {
            return;
        }
        tracing::warn!(
            count = observers.len(),
            "observer registry dropped without shutdown; aborting observer tasks"
        );
        for (_, record) in observers.drain() {
            record.task.abort();
        }
    }
}

async fn observe(
    handle: ObserverHandle,
    mut stream: EventStream,
    sink: Arc<dyn EventSink>,
    filter: EventFilter,
    mut stop_rx: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => {
                break;
            }
            event = stream.next() => {
                let Some(event) = event else {
                    tracing::debug!(?handle, "transaction feed ended");
                    break;
                };
                if filter.passes(&event) {
                    // Cancellation is only observed between items; delivery
                    // of the current event always runs to completion. The
                    // sink is awaited before the next pull, so a slow sink
                    // back-pressures this observer and no one else.
                    sink.deliver(event).await;
                }
            }
        }
    }
}
