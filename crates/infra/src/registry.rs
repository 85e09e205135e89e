//! Product registry: the catalog of products and their cached quantities.
//!
//! Every function takes an explicit connection handle. Callers that need
//! several steps to be atomic pass a transaction (`&mut *tx`).

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqliteConnection};
use tracing::debug;

use stockledger_core::{DomainError, ProductId};
use stockledger_inventory::{Product, ProductName, StockAdjustment};

use crate::error::{LedgerError, LedgerResult, map_sqlx_error};
use crate::ledger;

/// Create a product with quantity 0.
pub async fn create(conn: &mut SqliteConnection, name: &str) -> LedgerResult<Product> {
    let name = ProductName::new(name)?;

    let result = sqlx::query(
        r#"
        INSERT INTO products (name, quantity, minimum_threshold)
        VALUES (?1, 0, 0)
        "#,
    )
    .bind(name.as_str())
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("insert_product", e))?;

    let id = ProductId::new(result.last_insert_rowid());
    debug!(product_id = %id, "product inserted");
    Ok(Product::from_parts(id, name, 0, 0))
}

/// List every product, ordered by id.
pub async fn list(conn: &mut SqliteConnection) -> LedgerResult<Vec<Product>> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, quantity, minimum_threshold
        FROM products
        ORDER BY id ASC
        "#,
    )
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("list_products", e))?;

    rows.iter().map(decode).collect()
}

pub async fn find(conn: &mut SqliteConnection, id: ProductId) -> LedgerResult<Option<Product>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, quantity, minimum_threshold
        FROM products
        WHERE id = ?1
        "#,
    )
    .bind(id.get())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("find_product", e))?;

    row.as_ref().map(decode).transpose()
}

/// Like [`find`], but a missing product is a `NotFound` error.
pub async fn get(conn: &mut SqliteConnection, id: ProductId) -> LedgerResult<Product> {
    find(conn, id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("product {id}")).into())
}

/// Delete a product that no movement references.
///
/// The reference check and the delete must run on the same transaction for
/// the guard to hold; the engine's `delete_product` does that. The foreign key
/// on `movements.product_id` backs the check up at the storage level.
pub async fn delete(conn: &mut SqliteConnection, id: ProductId) -> LedgerResult<()> {
    if ledger::has_movements(conn, id).await? {
        return Err(DomainError::conflict(format!(
            "product {id} has movements and cannot be deleted"
        ))
        .into());
    }

    let result = sqlx::query("DELETE FROM products WHERE id = ?1")
        .bind(id.get())
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("delete_product", e))?;

    if result.rows_affected() == 0 {
        return Err(DomainError::not_found(format!("product {id}")).into());
    }
    Ok(())
}

/// Apply a planned stock adjustment. The only write path for `quantity`.
pub(crate) async fn adjust_quantity(
    conn: &mut SqliteConnection,
    adjustment: &StockAdjustment,
) -> LedgerResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET quantity = quantity + ?1
        WHERE id = ?2
        "#,
    )
    .bind(adjustment.delta)
    .bind(adjustment.product_id.get())
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("adjust_quantity", e))?;

    if result.rows_affected() == 0 {
        return Err(LedgerError::Integrity(format!(
            "product {} vanished while adjusting stock",
            adjustment.product_id
        )));
    }
    Ok(())
}

// SQLx row types

#[derive(Debug)]
struct ProductRow {
    id: i64,
    name: String,
    quantity: i64,
    minimum_threshold: i64,
}

impl<'r> FromRow<'r, SqliteRow> for ProductRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            quantity: row.try_get("quantity")?,
            minimum_threshold: row.try_get("minimum_threshold")?,
        })
    }
}

impl TryFrom<ProductRow> for Product {
    type Error = LedgerError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let name = ProductName::new(row.name).map_err(|_| {
            LedgerError::Integrity(format!("stored product {} has an empty name", row.id))
        })?;
        Ok(Product::from_parts(
            ProductId::new(row.id),
            name,
            row.quantity,
            row.minimum_threshold,
        ))
    }
}

fn decode(row: &SqliteRow) -> LedgerResult<Product> {
    ProductRow::from_row(row)
        .map_err(|e| map_sqlx_error("decode_product", e))?
        .try_into()
}
