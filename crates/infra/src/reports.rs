//! Read-only reporting over the registry and ledger listings.
//!
//! Read models here are disposable: they are rebuilt from `list_products` and
//! `list_movements` output and never written back.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use stockledger_core::{Entity, ProductId};
use stockledger_inventory::{Movement, MovementKind, Product};

/// Inbound vs outbound volume.
///
/// Volumes are `i128`: a handful of large movements already sum past `i64`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindTotals {
    pub inbound: i128,
    pub outbound: i128,
}

impl KindTotals {
    fn add(&mut self, movement: &Movement) {
        let quantity = i128::from(movement.quantity().get());
        match movement.kind() {
            MovementKind::Inbound => self.inbound += quantity,
            MovementKind::Outbound => self.outbound += quantity,
        }
    }
}

/// Movement volume for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductTotals {
    pub product_id: ProductId,
    /// Product name, or `#<id>` for a movement whose product is missing.
    pub name: String,
    pub inbound: i128,
    pub outbound: i128,
    /// Inbound plus outbound volume.
    pub moved: i128,
    /// Cached quantity; `None` for a missing product.
    pub on_hand: Option<i64>,
}

/// Summed quantity for one (date, kind) bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub kind: MovementKind,
    pub quantity: i128,
}

/// Current stock line for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockLevel {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: i64,
    pub minimum_threshold: i64,
}

pub fn totals_by_kind(movements: &[Movement]) -> KindTotals {
    let mut totals = KindTotals::default();
    for movement in movements {
        totals.add(movement);
    }
    totals
}

/// Per-product volume, for products with at least one movement, ordered by
/// name then id.
pub fn totals_by_product(products: &[Product], movements: &[Movement]) -> Vec<ProductTotals> {
    let mut by_product: HashMap<ProductId, KindTotals> = HashMap::new();
    for movement in movements {
        by_product
            .entry(movement.product_id())
            .or_default()
            .add(movement);
    }

    let mut rows: Vec<ProductTotals> = by_product
        .into_iter()
        .map(|(product_id, totals)| {
            let product = products.iter().find(|p| p.id() == product_id);
            ProductTotals {
                product_id,
                name: product
                    .map(|p| p.name().to_string())
                    .unwrap_or_else(|| format!("#{product_id}")),
                inbound: totals.inbound,
                outbound: totals.outbound,
                moved: totals.inbound + totals.outbound,
                on_hand: product.map(Product::quantity),
            }
        })
        .collect();

    rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.product_id.cmp(&b.product_id)));
    rows
}

/// Volume per day and kind, ordered by date then kind (inbound first).
pub fn daily_totals(movements: &[Movement]) -> Vec<DailyTotal> {
    let mut buckets: BTreeMap<(NaiveDate, MovementKind), i128> = BTreeMap::new();
    for movement in movements {
        *buckets.entry((movement.date(), movement.kind())).or_default() +=
            i128::from(movement.quantity().get());
    }

    buckets
        .into_iter()
        .map(|((date, kind), quantity)| DailyTotal {
            date,
            kind,
            quantity,
        })
        .collect()
}

/// Every product with its current quantity, ordered by name then id.
pub fn stock_levels(products: &[Product]) -> Vec<StockLevel> {
    let mut levels: Vec<StockLevel> = products
        .iter()
        .map(|p| StockLevel {
            product_id: p.id(),
            name: p.name().to_string(),
            quantity: p.quantity(),
            minimum_threshold: p.minimum_threshold(),
        })
        .collect();
    levels.sort_by(|a, b| a.name.cmp(&b.name).then(a.product_id.cmp(&b.product_id)));
    levels
}

/// All report sections in one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockReport {
    pub by_kind: KindTotals,
    pub by_product: Vec<ProductTotals>,
    pub daily: Vec<DailyTotal>,
    pub stock: Vec<StockLevel>,
}

impl StockReport {
    pub fn build(products: &[Product], movements: &[Movement]) -> Self {
        Self {
            by_kind: totals_by_kind(movements),
            by_product: totals_by_product(products, movements),
            daily: daily_totals(movements),
            stock: stock_levels(products),
        }
    }
}
