//! Read-only view over the product/inventory dataset.
//!
//! The dataset arrives pre-loaded (the surrounding application fetches it);
//! nothing in this module performs network calls or mutation. The assistant
//! subsystem only ever asks questions of it: which products exist, what are
//! their stock figures, what do the aggregates look like.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One row of a product's stock ledger.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRow {
    pub date: String,
    pub direction: Direction,
    pub quantity: i64,
    pub unit_price: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,
    pub current_stock: i64,
    pub stock_in: i64,
    pub stock_out: i64,
    pub last_price: f64,
    #[serde(default)]
    pub transactions: Vec<LedgerRow>,
}

/// Aggregate statistics derived from the full catalog.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductStats {
    pub product_count: usize,
    pub categories: Vec<String>,
    pub total_units: i64,
    pub total_in: i64,
    pub total_out: i64,
    pub total_value: f64,
}

/// Accessor over the pre-loaded product dataset.
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Builds a catalog from a JSON array of products.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        let products: Vec<Product> = serde_json::from_str(raw)?;
        Ok(Self::new(products))
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn valid_product_names(&self) -> Vec<String> {
        self.products.iter().map(|p| p.name.clone()).collect()
    }

    /// Case-insensitive exact-name lookup. No fuzzy matching: near-synonymous
    /// names must not resolve to a product the user did not name.
    pub fn product_by_name(&self, name: &str) -> Option<&Product> {
        let wanted = name.trim();
        self.products
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(wanted))
    }

    pub fn stats(&self) -> ProductStats {
        let mut categories: Vec<String> = Vec::new();
        let mut total_units = 0i64;
        let mut total_in = 0i64;
        let mut total_out = 0i64;
        let mut total_value = 0f64;

        for product in &self.products {
            if !categories.iter().any(|c| c.eq_ignore_ascii_case(&product.category)) {
                categories.push(product.category.clone());
            }
            total_units += product.current_stock;
            total_in += product.stock_in;
            total_out += product.stock_out;
            total_value += product.current_stock as f64 * product.last_price;
        }

        ProductStats {
            product_count: self.products.len(),
            categories,
            total_units,
            total_in,
            total_out,
            total_value,
        }
    }
}

/// Explicit time-stamped cache around the loaded catalog.
///
/// Constructed once per session/context and passed by reference to callers;
/// holders check staleness and swap in a fresh dataset when the surrounding
/// application re-fetches.
pub struct CatalogCache {
    value: Arc<Catalog>,
    fetched_at: Instant,
    ttl: Duration,
}

impl CatalogCache {
    pub fn new(catalog: Catalog, ttl: Duration) -> Self {
        Self {
            value: Arc::new(catalog),
            fetched_at: Instant::now(),
            ttl,
        }
    }

    pub fn get(&self) -> Arc<Catalog> {
        Arc::clone(&self.value)
    }

    pub fn is_stale(&self) -> bool {
        self.fetched_at.elapsed() > self.ttl
    }

    pub fn refresh(&mut self, catalog: Catalog) {
        self.value = Arc::new(catalog);
        self.fetched_at = Instant::now();
    }
}
