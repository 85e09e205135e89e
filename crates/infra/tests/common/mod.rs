#![allow(dead_code)]

use chrono::NaiveDate;

use stockledger_core::{Entity, ProductId};
use stockledger_infra::{StockLedger, StoreConfig};
use stockledger_inventory::{Movement, ReversalPolicy, net_quantity};

pub async fn ledger() -> StockLedger {
    ledger_with(ReversalPolicy::AllowNegative).await
}

pub async fn ledger_with(policy: ReversalPolicy) -> StockLedger {
    StockLedger::open(&StoreConfig::in_memory().with_reversal_policy(policy))
        .await
        .expect("in-memory ledger")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Asserts the cached quantity of every product equals the net of its
/// movements, and that the engine's own audit agrees.
pub async fn assert_consistent(ledger: &StockLedger) {
    let products = ledger.list_products().await.unwrap();
    let movements: Vec<Movement> = ledger.list_movements().await.unwrap();
    for product in &products {
        assert_eq!(
            i128::from(product.quantity()),
            net_quantity(product.id(), &movements),
            "product {} out of step with its movements",
            product.id()
        );
    }
    assert!(ledger.audit().await.unwrap().is_empty());
}

pub async fn quantity(ledger: &StockLedger, id: ProductId) -> i64 {
    ledger.get_product(id).await.unwrap().quantity()
}
