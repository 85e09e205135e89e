//! Movement ledger: the append/remove log of stock movements.
//!
//! Writes here never touch product quantities. They are crate-private so the
//! consistency engine stays the only caller that can create or delete a
//! movement.

use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqliteConnection};
use tracing::debug;

use stockledger_core::{DomainError, MovementId, ProductId};
use stockledger_inventory::{Movement, MovementKind, NewMovement, Quantity};

use crate::error::{LedgerError, LedgerResult, map_sqlx_error};

/// Append a movement.
///
/// A [`NewMovement`] can only hold a positive [`Quantity`], so non-positive
/// input fails with `Validation` before it gets here (see
/// `RecordMovement::validate`). Product existence and stock are not checked.
pub(crate) async fn create(
    conn: &mut SqliteConnection,
    new: &NewMovement,
) -> LedgerResult<Movement> {
    let result = sqlx::query(
        r#"
        INSERT INTO movements (product_id, kind, quantity, date)
        VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(new.product_id.get())
    .bind(new.kind.as_str())
    .bind(new.quantity.get())
    .bind(new.date)
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("insert_movement", e))?;

    let id = MovementId::new(result.last_insert_rowid());
    debug!(movement_id = %id, product_id = %new.product_id, "movement inserted");
    Ok(new.clone().into_movement(id))
}

/// List every movement, ordered by id.
pub async fn list(conn: &mut SqliteConnection) -> LedgerResult<Vec<Movement>> {
    let rows = sqlx::query(
        r#"
        SELECT id, product_id, kind, quantity, date
        FROM movements
        ORDER BY id ASC
        "#,
    )
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("list_movements", e))?;

    rows.iter().map(decode).collect()
}

/// List the movements of one product, ordered by id.
pub async fn list_for_product(
    conn: &mut SqliteConnection,
    product_id: ProductId,
) -> LedgerResult<Vec<Movement>> {
    let rows = sqlx::query(
        r#"
        SELECT id, product_id, kind, quantity, date
        FROM movements
        WHERE product_id = ?1
        ORDER BY id ASC
        "#,
    )
    .bind(product_id.get())
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("list_movements_for_product", e))?;

    rows.iter().map(decode).collect()
}

pub async fn find(conn: &mut SqliteConnection, id: MovementId) -> LedgerResult<Option<Movement>> {
    let row = sqlx::query(
        r#"
        SELECT id, product_id, kind, quantity, date
        FROM movements
        WHERE id = ?1
        "#,
    )
    .bind(id.get())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("find_movement", e))?;

    row.as_ref().map(decode).transpose()
}

/// Like [`find`], but a missing movement is a `NotFound` error.
pub async fn get(conn: &mut SqliteConnection, id: MovementId) -> LedgerResult<Movement> {
    find(conn, id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("movement {id}")).into())
}

/// Whether any movement references `product_id`.
pub async fn has_movements(
    conn: &mut SqliteConnection,
    product_id: ProductId,
) -> LedgerResult<bool> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (SELECT 1 FROM movements WHERE product_id = ?1)
        "#,
    )
    .bind(product_id.get())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("has_movements", e))?;

    Ok(exists)
}

/// Remove a movement. Does not adjust any product quantity.
pub(crate) async fn delete(conn: &mut SqliteConnection, id: MovementId) -> LedgerResult<()> {
    let result = sqlx::query("DELETE FROM movements WHERE id = ?1")
        .bind(id.get())
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("delete_movement", e))?;

    if result.rows_affected() == 0 {
        return Err(DomainError::not_found(format!("movement {id}")).into());
    }
    Ok(())
}

// SQLx row types

#[derive(Debug)]
struct MovementRow {
    id: i64,
    product_id: i64,
    kind: String,
    quantity: i64,
    date: NaiveDate,
}

impl<'r> FromRow<'r, SqliteRow> for MovementRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(MovementRow {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            kind: row.try_get("kind")?,
            quantity: row.try_get("quantity")?,
            date: row.try_get("date")?,
        })
    }
}

impl TryFrom<MovementRow> for Movement {
    type Error = LedgerError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        let kind: MovementKind = row.kind.parse().map_err(|_| {
            LedgerError::Integrity(format!("movement {} has unknown kind '{}'", row.id, row.kind))
        })?;
        let quantity = Quantity::new(row.quantity).map_err(|_| {
            LedgerError::Integrity(format!(
                "movement {} has non-positive quantity {}",
                row.id, row.quantity
            ))
        })?;
        Ok(Movement::from_parts(
            MovementId::new(row.id),
            ProductId::new(row.product_id),
            kind,
            quantity,
            row.date,
        ))
    }
}

fn decode(row: &SqliteRow) -> LedgerResult<Movement> {
    MovementRow::from_row(row)
        .map_err(|e| map_sqlx_error("decode_movement", e))?
        .try_into()
}
