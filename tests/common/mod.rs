use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::sync::Arc;
use storefront::domain::catalog::{Product, ProductId, ProductKind};
use storefront::domain::transaction::{PurchasePayload, TransactionEvent};
use storefront::infrastructure::in_memory::InMemoryBackend;

#[allow(dead_code)]
pub fn product(id: &str, kind: ProductKind) -> Product {
    Product {
        id: ProductId::from(id),
        kind,
        title: id.to_string(),
        description: format!("test product {id}"),
        price: Decimal::new(199, 2),
        currency: "USD".to_string(),
    }
}

#[allow(dead_code)]
pub fn consumable(id: &str) -> Product {
    product(id, ProductKind::Consumable)
}

#[allow(dead_code)]
pub fn backend_with(ids: &[&str]) -> Arc<InMemoryBackend> {
    Arc::new(InMemoryBackend::with_products(
        ids.iter().map(|id| consumable(id)),
    ))
}

#[allow(dead_code)]
pub fn id_set(ids: &[&str]) -> BTreeSet<ProductId> {
    ids.iter().map(|id| ProductId::from(*id)).collect()
}

#[allow(dead_code)]
pub fn verified_event(transaction_id: u64, product_id: &str, kind: ProductKind) -> TransactionEvent {
    TransactionEvent::Verified(PurchasePayload {
        transaction_id,
        product_id: ProductId::from(product_id),
        product_kind: kind,
        quantity: 1,
    })
}
