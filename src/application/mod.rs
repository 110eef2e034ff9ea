pub mod catalog_cache;
pub mod observers;
pub mod purchase;
pub mod storefront;
