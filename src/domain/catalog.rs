use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a purchasable product.
///
/// Ordered and hashable so that sets of ids can key the cache's in-flight
/// table deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ProductId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    Consumable,
    NonConsumable,
    NonRenewingSubscription,
    AutoRenewableSubscription,
}

/// An immutable catalog entry as returned by the backend.
///
/// Owned by the cache once fetched; callers receive clones and never mutate
/// cached state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub kind: ProductKind,
    pub title: String,
    pub description: String,
    /// Localized decimal price, paired with `currency`.
    pub price: Decimal,
    /// ISO 4217 currency code.
    pub currency: String,
}
