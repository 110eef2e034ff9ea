use clap::Parser;
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use storefront::application::storefront::Storefront;
use storefront::domain::catalog::{Product, ProductId, ProductKind};
use storefront::domain::outcome::PurchaseOptions;
use storefront::infrastructure::in_memory::InMemoryBackend;
use tokio::sync::mpsc;

/// Demo session against the in-process storefront backend.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Product ids to resolve from the demo catalog
    #[arg(default_values_t = [String::from("gold.small"), String::from("premium.monthly")])]
    ids: Vec<String>,

    /// Purchase this product id after resolving
    #[arg(long)]
    buy: Option<String>,

    /// Acknowledge a successful purchase immediately
    #[arg(long)]
    auto_finish: bool,
}

fn demo_catalog() -> Vec<Product> {
    let product = |id: &str, kind, title: &str, price| Product {
        id: ProductId::from(id),
        kind,
        title: title.to_string(),
        description: format!("Demo catalog entry for {id}"),
        price,
        currency: "USD".to_string(),
    };
    vec![
        product(
            "gold.small",
            ProductKind::Consumable,
            "Small gold pack",
            Decimal::new(99, 2),
        ),
        product(
            "gold.large",
            ProductKind::Consumable,
            "Large gold pack",
            Decimal::new(499, 2),
        ),
        product(
            "premium.monthly",
            ProductKind::AutoRenewableSubscription,
            "Premium (monthly)",
            Decimal::new(999, 2),
        ),
        product(
            "artbook",
            ProductKind::NonConsumable,
            "Digital artbook",
            Decimal::new(299, 2),
        ),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let backend = Arc::new(InMemoryBackend::with_products(demo_catalog()));
    let store = Storefront::new(backend.clone());

    let (events_tx, mut events_rx) = mpsc::channel(16);
    store.observers().start(Arc::new(events_tx)).await;

    let ids: BTreeSet<ProductId> = cli.ids.iter().map(|id| ProductId::from(id.as_str())).collect();
    let products = store.catalog().resolve(&ids).await.into_diagnostic()?;
    println!(
        "{}",
        serde_json::to_string_pretty(&products).into_diagnostic()?
    );

    // Resolving the same set again is served from the cache.
    store.catalog().resolve(&ids).await.into_diagnostic()?;
    println!("backend fetches: {}", backend.fetch_calls());

    if let Some(buy) = cli.buy {
        let wanted = ProductId::from(buy);
        let single: BTreeSet<ProductId> = [wanted.clone()].into();
        let resolved = store.catalog().resolve(&single).await.into_diagnostic()?;
        let product = resolved
            .first()
            .ok_or_else(|| miette::miette!("product {wanted} not in catalog"))?;

        let options = PurchaseOptions {
            auto_finish: cli.auto_finish,
            ..PurchaseOptions::default()
        };
        let outcome = store.purchases().purchase(product, &options).await;
        println!("purchase outcome: {outcome:?}");
    }

    // Give the observer a moment to forward anything the purchase emitted.
    tokio::time::sleep(Duration::from_millis(50)).await;
    store.shutdown().await;

    while let Ok(event) = events_rx.try_recv() {
        println!("transaction event: {event:?}");
    }

    Ok(())
}
