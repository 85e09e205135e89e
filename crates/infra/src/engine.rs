//! Ledger consistency engine.
//!
//! The engine is the only code allowed to write a movement and a product
//! quantity together. It keeps, for every product P:
//!
//! ```text
//! P.quantity == Σ inbound(P) − Σ outbound(P)
//! ```
//!
//! ## Execution Flow
//!
//! Every compound operation runs on the connection handle it is given:
//!
//! ```text
//! begin transaction on `conn`
//!   ↓
//! 1. Load the rows the decision needs
//!   ↓
//! 2. Decide (pure rules from `stockledger_inventory`)
//!   ↓
//! 3. Write movement + quantity
//!   ↓
//! commit
//! ```
//!
//! Any error returns before `commit`; dropping the transaction rolls it back,
//! so no partial write is ever visible to another connection. If `conn` is
//! already inside a transaction, the operation runs in a savepoint.

use serde::Serialize;
use sqlx::{Connection, Sqlite, SqliteConnection, Transaction};
use tracing::{info, instrument, warn};

use stockledger_core::{Entity, MovementId, ProductId};
use stockledger_inventory::{Movement, Product, RecordMovement, ReversalPolicy, net_quantity};

use crate::error::{LedgerError, LedgerResult, map_sqlx_error};
use crate::{ledger, registry};

/// A product whose cached quantity disagrees with its movement history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockDiscrepancy {
    pub product_id: ProductId,
    /// Cached quantity, or `None` if movements reference a missing product.
    pub recorded: Option<i64>,
    /// Net of the product's movements. Wider than `recorded`, so an
    /// out-of-range history is reported rather than wrapped.
    pub derived: i128,
}

async fn begin(conn: &mut SqliteConnection) -> LedgerResult<Transaction<'_, Sqlite>> {
    conn.begin()
        .await
        .map_err(|e| map_sqlx_error("begin_transaction", e))
}

async fn commit(tx: Transaction<'_, Sqlite>) -> LedgerResult<()> {
    tx.commit()
        .await
        .map_err(|e| map_sqlx_error("commit_transaction", e))
}

#[instrument(skip(conn), err)]
pub async fn create_product(conn: &mut SqliteConnection, name: &str) -> LedgerResult<Product> {
    let product = registry::create(conn, name).await?;
    info!(product_id = %product.id(), name = %product.name(), "product created");
    Ok(product)
}

/// Delete a product if, and only if, no movement references it.
///
/// The reference check and the delete share one transaction; a movement
/// committed concurrently trips the storage foreign key and surfaces as
/// `Conflict` as well.
#[instrument(skip(conn), fields(product_id = %product_id), err)]
pub async fn delete_product(
    conn: &mut SqliteConnection,
    product_id: ProductId,
) -> LedgerResult<()> {
    let mut tx = begin(conn).await?;

    registry::get(&mut tx, product_id).await?;
    if let Err(err) = registry::delete(&mut tx, product_id).await {
        if matches!(err, LedgerError::Conflict(_)) {
            warn!(product_id = %product_id, "delete blocked by existing movements");
        }
        return Err(err);
    }

    commit(tx).await?;
    info!(product_id = %product_id, "product deleted");
    Ok(())
}

/// Record a movement and apply its effect on the product, all-or-nothing.
///
/// Fails with `Validation` for a non-positive quantity, `NotFound` for an
/// unknown product and `InsufficientStock` for an outbound movement larger
/// than the quantity on hand. On failure nothing is written.
#[instrument(
    skip(conn, cmd),
    fields(
        product_id = %cmd.product_id,
        kind = %cmd.kind,
        quantity = cmd.quantity
    ),
    err
)]
pub async fn record_movement(
    conn: &mut SqliteConnection,
    cmd: &RecordMovement,
) -> LedgerResult<Movement> {
    let new = cmd.validate()?;

    let mut tx = begin(conn).await?;

    let product = registry::get(&mut tx, new.product_id).await?;
    let adjustment = product.plan_movement(&new).map_err(|err| {
        warn!(on_hand = product.quantity(), "movement rejected: {err}");
        LedgerError::from(err)
    })?;

    let movement = ledger::create(&mut tx, &new).await?;
    registry::adjust_quantity(&mut tx, &adjustment).await?;

    commit(tx).await?;
    info!(
        movement_id = %movement.id(),
        new_quantity = product.quantity() + adjustment.delta,
        "movement recorded"
    );
    Ok(movement)
}

/// Delete a movement and undo its effect on the product, all-or-nothing.
///
/// Returns the removed movement. A movement whose product no longer exists
/// is an `Integrity` fault and is left in place.
#[instrument(skip(conn), fields(movement_id = %movement_id, policy = %policy), err)]
pub async fn reverse_movement(
    conn: &mut SqliteConnection,
    movement_id: MovementId,
    policy: ReversalPolicy,
) -> LedgerResult<Movement> {
    let mut tx = begin(conn).await?;

    let movement = ledger::get(&mut tx, movement_id).await?;
    let product = registry::find(&mut tx, movement.product_id())
        .await?
        .ok_or_else(|| {
            LedgerError::Integrity(format!(
                "movement {movement_id} references missing product {}",
                movement.product_id()
            ))
        })?;

    let adjustment = product.plan_reversal(&movement, policy).map_err(|err| {
        warn!(on_hand = product.quantity(), "reversal rejected: {err}");
        LedgerError::from(err)
    })?;

    registry::adjust_quantity(&mut tx, &adjustment).await?;
    ledger::delete(&mut tx, movement_id).await?;

    commit(tx).await?;

    let new_quantity = product.quantity() + adjustment.delta;
    if new_quantity < 0 {
        warn!(product_id = %product.id(), new_quantity, "reversal left product below zero");
    }
    info!(product_id = %product.id(), new_quantity, "movement reversed");
    Ok(movement)
}

pub async fn get_product(
    conn: &mut SqliteConnection,
    product_id: ProductId,
) -> LedgerResult<Product> {
    registry::get(conn, product_id).await
}

pub async fn list_products(conn: &mut SqliteConnection) -> LedgerResult<Vec<Product>> {
    registry::list(conn).await
}

pub async fn list_movements(conn: &mut SqliteConnection) -> LedgerResult<Vec<Movement>> {
    ledger::list(conn).await
}

pub async fn list_movements_for_product(
    conn: &mut SqliteConnection,
    product_id: ProductId,
) -> LedgerResult<Vec<Movement>> {
    ledger::list_for_product(conn, product_id).await
}

/// Compare every cached quantity with the net of its movements.
///
/// Read-only. Empty under correct operation; entries point at ungoverned
/// writes or orphaned movements.
#[instrument(skip(conn), err)]
pub async fn audit(conn: &mut SqliteConnection) -> LedgerResult<Vec<StockDiscrepancy>> {
    // One transaction so both reads see the same snapshot.
    let mut tx = begin(conn).await?;
    let products = registry::list(&mut tx).await?;
    let movements = ledger::list(&mut tx).await?;
    commit(tx).await?;

    let mut discrepancies: Vec<StockDiscrepancy> = products
        .iter()
        .filter_map(|p| {
            let derived = net_quantity(p.id(), &movements);
            (derived != i128::from(p.quantity())).then(|| StockDiscrepancy {
                product_id: p.id(),
                recorded: Some(p.quantity()),
                derived,
            })
        })
        .collect();

    let mut orphans: Vec<ProductId> = movements
        .iter()
        .map(Movement::product_id)
        .filter(|id| !products.iter().any(|p| p.id() == *id))
        .collect();
    orphans.sort();
    orphans.dedup();
    discrepancies.extend(orphans.into_iter().map(|product_id| StockDiscrepancy {
        product_id,
        recorded: None,
        derived: net_quantity(product_id, &movements),
    }));

    if !discrepancies.is_empty() {
        warn!(count = discrepancies.len(), "stock ledger discrepancies found");
    }
    Ok(discrepancies)
}
