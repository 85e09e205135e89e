//! End-to-end behaviour of the consistency engine against SQLite.

mod common;

use stockledger_core::{Entity, MovementId, ProductId};
use stockledger_infra::{LedgerError, StockLedger, StoreConfig};
use stockledger_inventory::{MovementKind, RecordMovement, ReversalPolicy};

use common::{assert_consistent, date, ledger, ledger_with, quantity};

#[tokio::test]
async fn widget_scenario() {
    let ledger = ledger().await;

    let widget = ledger.create_product("Widget").await.unwrap();
    assert_eq!(widget.id(), ProductId::new(1));
    assert_eq!(widget.quantity(), 0);

    let first = ledger
        .record_movement(
            &RecordMovement::new(widget.id(), MovementKind::Inbound, 50).on(date(2024, 1, 1)),
        )
        .await
        .unwrap();
    assert_eq!(quantity(&ledger, widget.id()).await, 50);

    let err = ledger
        .record_movement(
            &RecordMovement::new(widget.id(), MovementKind::Outbound, 70).on(date(2024, 1, 2)),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientStock {
            requested: 70,
            on_hand: 50,
            ..
        }
    ));
    assert_eq!(quantity(&ledger, widget.id()).await, 50);
    assert_eq!(ledger.list_movements().await.unwrap().len(), 1);

    let second = ledger
        .record_movement(
            &RecordMovement::new(widget.id(), MovementKind::Outbound, 20).on(date(2024, 1, 2)),
        )
        .await
        .unwrap();
    assert_eq!(quantity(&ledger, widget.id()).await, 30);

    let reversed = ledger.reverse_movement(first.id()).await.unwrap();
    assert_eq!(reversed, first);
    assert_eq!(quantity(&ledger, widget.id()).await, -20);
    assert_eq!(
        ledger.list_movements_for_product(widget.id()).await.unwrap(),
        vec![second]
    );
    assert_consistent(&ledger).await;
}

#[tokio::test]
async fn reject_negative_policy_keeps_stock_on_guarded_reversal() {
    let ledger = ledger_with(ReversalPolicy::RejectNegative).await;
    let widget = ledger.create_product("Widget").await.unwrap();

    let first = ledger
        .record_movement(&RecordMovement::new(widget.id(), MovementKind::Inbound, 50))
        .await
        .unwrap();
    ledger
        .record_movement(&RecordMovement::new(widget.id(), MovementKind::Outbound, 20))
        .await
        .unwrap();

    let err = ledger.reverse_movement(first.id()).await.unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientStock { on_hand: 30, .. }));
    assert_eq!(quantity(&ledger, widget.id()).await, 30);
    assert_eq!(ledger.list_movements().await.unwrap().len(), 2);
    assert_consistent(&ledger).await;
}

#[tokio::test]
async fn reversal_round_trip_restores_quantity() {
    let ledger = ledger().await;
    let bolt = ledger.create_product("Bolt").await.unwrap();
    ledger
        .record_movement(&RecordMovement::new(bolt.id(), MovementKind::Inbound, 7))
        .await
        .unwrap();
    let before = quantity(&ledger, bolt.id()).await;

    let movement = ledger
        .record_movement(
            &RecordMovement::new(bolt.id(), MovementKind::Inbound, 10).on(date(2024, 1, 1)),
        )
        .await
        .unwrap();
    ledger.reverse_movement(movement.id()).await.unwrap();

    assert_eq!(quantity(&ledger, bolt.id()).await, before);
    let remaining = ledger.list_movements_for_product(bolt.id()).await.unwrap();
    assert!(remaining.iter().all(|m| m.id() != movement.id()));

    let err = ledger.reverse_movement(movement.id()).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
}

#[tokio::test]
async fn reversing_outbound_restores_stock() {
    let ledger = ledger().await;
    let nut = ledger.create_product("Nut").await.unwrap();
    ledger
        .record_movement(&RecordMovement::new(nut.id(), MovementKind::Inbound, 10))
        .await
        .unwrap();
    let out = ledger
        .record_movement(&RecordMovement::new(nut.id(), MovementKind::Outbound, 10))
        .await
        .unwrap();
    assert_eq!(quantity(&ledger, nut.id()).await, 0);

    ledger.reverse_movement(out.id()).await.unwrap();
    assert_eq!(quantity(&ledger, nut.id()).await, 10);
}

#[tokio::test]
async fn delete_guard_blocks_referenced_product() {
    let ledger = ledger().await;
    let widget = ledger.create_product("Widget").await.unwrap();
    let movement = ledger
        .record_movement(&RecordMovement::new(widget.id(), MovementKind::Inbound, 1))
        .await
        .unwrap();

    let err = ledger.delete_product(widget.id()).await.unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));
    assert!(
        ledger
            .list_products()
            .await
            .unwrap()
            .iter()
            .any(|p| p.id() == widget.id())
    );

    // Once the last movement is reversed the product can go.
    ledger.reverse_movement(movement.id()).await.unwrap();
    ledger.delete_product(widget.id()).await.unwrap();
    assert!(ledger.list_products().await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_unknown_product_is_not_found() {
    let ledger = ledger().await;
    let err = ledger.delete_product(ProductId::new(77)).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
}

#[tokio::test]
async fn create_product_validates_name() {
    let ledger = ledger().await;
    let err = ledger.create_product("").await.unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
    assert_eq!(err.code(), "validation_error");
}

#[tokio::test]
async fn failed_quantity_update_leaves_no_movement_behind() {
    let ledger = ledger().await;
    let widget = ledger.create_product("Widget").await.unwrap();
    ledger
        .record_movement(&RecordMovement::new(widget.id(), MovementKind::Inbound, 5))
        .await
        .unwrap();

    // Simulated store failure after the movement insert, on the quantity update.
    sqlx::query(
        r#"
        CREATE TRIGGER fail_stock_update BEFORE UPDATE OF quantity ON products
        BEGIN
            SELECT RAISE(ABORT, 'simulated store failure');
        END
        "#,
    )
    .execute(ledger.pool())
    .await
    .unwrap();

    let err = ledger
        .record_movement(&RecordMovement::new(widget.id(), MovementKind::Inbound, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Store { .. }), "got {err:?}");

    assert_eq!(quantity(&ledger, widget.id()).await, 5);
    assert_eq!(ledger.list_movements().await.unwrap().len(), 1);
    assert_consistent(&ledger).await;
}

#[tokio::test]
async fn failed_movement_delete_rolls_back_reversal() {
    let ledger = ledger().await;
    let widget = ledger.create_product("Widget").await.unwrap();
    let movement = ledger
        .record_movement(&RecordMovement::new(widget.id(), MovementKind::Inbound, 5))
        .await
        .unwrap();

    // Fails after the quantity has already been adjusted inside the transaction.
    sqlx::query(
        r#"
        CREATE TRIGGER fail_movement_delete BEFORE DELETE ON movements
        BEGIN
            SELECT RAISE(ABORT, 'simulated store failure');
        END
        "#,
    )
    .execute(ledger.pool())
    .await
    .unwrap();

    let err = ledger.reverse_movement(movement.id()).await.unwrap_err();
    assert!(matches!(err, LedgerError::Store { .. }), "got {err:?}");
    assert_eq!(quantity(&ledger, widget.id()).await, 5);
    assert_eq!(ledger.list_movements().await.unwrap(), vec![movement]);
}

#[tokio::test]
async fn reversing_movement_of_vanished_product_is_integrity_fault() {
    let ledger = ledger().await;
    let widget = ledger.create_product("Widget").await.unwrap();
    let movement = ledger
        .record_movement(&RecordMovement::new(widget.id(), MovementKind::Inbound, 5))
        .await
        .unwrap();

    // An ungoverned write with the storage foreign key switched off.
    sqlx::query("PRAGMA foreign_keys = OFF")
        .execute(ledger.pool())
        .await
        .unwrap();
    sqlx::query("DELETE FROM products WHERE id = ?1")
        .bind(widget.id().get())
        .execute(ledger.pool())
        .await
        .unwrap();

    let err = ledger.reverse_movement(movement.id()).await.unwrap_err();
    assert!(matches!(err, LedgerError::Integrity(_)));
    assert_eq!(ledger.list_movements().await.unwrap(), vec![movement]);

    let discrepancies = ledger.audit().await.unwrap();
    assert_eq!(discrepancies.len(), 1);
    assert_eq!(discrepancies[0].product_id, widget.id());
    assert_eq!(discrepancies[0].recorded, None);
    assert_eq!(discrepancies[0].derived, 5);
}

#[tokio::test]
async fn storage_foreign_key_backs_up_the_delete_guard() {
    let ledger = ledger().await;
    let widget = ledger.create_product("Widget").await.unwrap();
    ledger
        .record_movement(&RecordMovement::new(widget.id(), MovementKind::Inbound, 1))
        .await
        .unwrap();

    // Bypass the engine: the store itself refuses to orphan the movement.
    let err = sqlx::query("DELETE FROM products WHERE id = ?1")
        .bind(widget.id().get())
        .execute(ledger.pool())
        .await
        .unwrap_err();
    assert!(err.as_database_error().is_some_and(|e| e.is_foreign_key_violation()));
}

#[tokio::test]
async fn unknown_movement_reversal_reports_not_found() {
    let ledger = ledger().await;
    let err = ledger.reverse_movement(MovementId::new(1)).await.unwrap_err();
    assert_eq!(err.code(), "not_found");
}

#[tokio::test]
async fn second_connection_observes_only_committed_state() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("stock.db").display());
    let config = StoreConfig::default().with_database_url(url);

    let writer = StockLedger::open(&config).await.unwrap();
    let reader = StockLedger::open(&config).await.unwrap();

    let widget = writer.create_product("Widget").await.unwrap();
    writer
        .record_movement(&RecordMovement::new(widget.id(), MovementKind::Inbound, 12))
        .await
        .unwrap();
    let _ = writer
        .record_movement(&RecordMovement::new(widget.id(), MovementKind::Outbound, 99))
        .await
        .unwrap_err();

    assert_eq!(quantity(&reader, widget.id()).await, 12);
    assert_eq!(reader.list_movements().await.unwrap().len(), 1);
    assert_eq!(reader.delete_product(widget.id()).await.unwrap_err().code(), "conflict");
    assert_consistent(&reader).await;

    writer.close().await;
    reader.close().await;
}

#[tokio::test]
async fn report_reflects_listings() {
    let ledger = ledger().await;
    let widget = ledger.create_product("Widget").await.unwrap();
    ledger
        .record_movement(
            &RecordMovement::new(widget.id(), MovementKind::Inbound, 50).on(date(2024, 1, 1)),
        )
        .await
        .unwrap();
    ledger
        .record_movement(
            &RecordMovement::new(widget.id(), MovementKind::Outbound, 20).on(date(2024, 1, 2)),
        )
        .await
        .unwrap();

    let report = ledger.report().await.unwrap();
    assert_eq!(report.by_kind.inbound, 50);
    assert_eq!(report.by_kind.outbound, 20);
    assert_eq!(report.by_product[0].on_hand, Some(30));
    assert_eq!(report.daily.len(), 2);
    assert_eq!(report.stock[0].quantity, 30);
}

#[tokio::test]
async fn report_totals_beyond_i64_stay_exact() {
    let ledger = ledger().await;
    let widget = ledger.create_product("Widget").await.unwrap();
    for kind in [
        MovementKind::Inbound,
        MovementKind::Outbound,
        MovementKind::Inbound,
    ] {
        ledger
            .record_movement(&RecordMovement::new(widget.id(), kind, i64::MAX))
            .await
            .unwrap();
    }
    assert_eq!(quantity(&ledger, widget.id()).await, i64::MAX);

    let report = ledger.report().await.unwrap();
    let wide = i128::from(i64::MAX);
    assert_eq!(report.by_kind.inbound, 2 * wide);
    assert_eq!(report.by_kind.outbound, wide);
    assert_eq!(report.by_product[0].moved, 3 * wide);
    assert_consistent(&ledger).await;
}

#[tokio::test]
async fn audit_handles_histories_whose_partial_sums_leave_i64() {
    let ledger = ledger().await;
    let widget = ledger.create_product("Widget").await.unwrap();
    let mut ids = Vec::new();
    for kind in [
        MovementKind::Inbound,
        MovementKind::Outbound,
        MovementKind::Inbound,
        MovementKind::Outbound,
        MovementKind::Inbound,
    ] {
        let movement = ledger
            .record_movement(&RecordMovement::new(widget.id(), kind, i64::MAX))
            .await
            .unwrap();
        ids.push(movement.id());
    }

    ledger.reverse_movement(ids[0]).await.unwrap();
    ledger.reverse_movement(ids[2]).await.unwrap();
    assert_eq!(quantity(&ledger, widget.id()).await, -i64::MAX);

    // Remaining history is outbound, outbound, inbound: the running sum
    // dips below i64::MIN before the final inbound brings it back.
    assert!(ledger.audit().await.unwrap().is_empty());
    assert_consistent(&ledger).await;

    let report = ledger.report().await.unwrap();
    assert_eq!(report.by_kind.outbound, 2 * i128::from(i64::MAX));
}
