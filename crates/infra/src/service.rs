//! Pool-backed facade over the consistency engine.
//!
//! Each call acquires one pooled connection, hands it to the engine and
//! releases it when the call returns (the `PoolConnection` guard goes back to
//! the pool on drop). No session state outlives a call.

use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqlitePool};

use stockledger_core::{MovementId, ProductId};
use stockledger_inventory::{Movement, Product, RecordMovement, ReversalPolicy};

use crate::config::StoreConfig;
use crate::db;
use crate::engine::{self, StockDiscrepancy};
use crate::error::{LedgerResult, map_sqlx_error};
use crate::reports::StockReport;

/// The surface the presentation layer talks to.
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
    reversal_policy: ReversalPolicy,
}

impl StockLedger {
    pub fn new(pool: SqlitePool, reversal_policy: ReversalPolicy) -> Self {
        Self {
            pool,
            reversal_policy,
        }
    }

    /// Connect, bootstrap the schema and build a ledger from `config`.
    pub async fn open(config: &StoreConfig) -> LedgerResult<Self> {
        let pool = db::connect(config).await?;
        Ok(Self::new(pool, config.reversal_policy))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn reversal_policy(&self) -> ReversalPolicy {
        self.reversal_policy
    }

    async fn acquire(&self) -> LedgerResult<PoolConnection<Sqlite>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire_connection", e))
    }

    pub async fn create_product(&self, name: &str) -> LedgerResult<Product> {
        let mut conn = self.acquire().await?;
        engine::create_product(&mut conn, name).await
    }

    pub async fn delete_product(&self, product_id: ProductId) -> LedgerResult<()> {
        let mut conn = self.acquire().await?;
        engine::delete_product(&mut conn, product_id).await
    }

    pub async fn record_movement(&self, cmd: &RecordMovement) -> LedgerResult<Movement> {
        let mut conn = self.acquire().await?;
        engine::record_movement(&mut conn, cmd).await
    }

    pub async fn reverse_movement(&self, movement_id: MovementId) -> LedgerResult<Movement> {
        let mut conn = self.acquire().await?;
        engine::reverse_movement(&mut conn, movement_id, self.reversal_policy).await
    }

    pub async fn get_product(&self, product_id: ProductId) -> LedgerResult<Product> {
        let mut conn = self.acquire().await?;
        engine::get_product(&mut conn, product_id).await
    }

    pub async fn list_products(&self) -> LedgerResult<Vec<Product>> {
        let mut conn = self.acquire().await?;
        engine::list_products(&mut conn).await
    }

    pub async fn list_movements(&self) -> LedgerResult<Vec<Movement>> {
        let mut conn = self.acquire().await?;
        engine::list_movements(&mut conn).await
    }

    pub async fn list_movements_for_product(
        &self,
        product_id: ProductId,
    ) -> LedgerResult<Vec<Movement>> {
        let mut conn = self.acquire().await?;
        engine::list_movements_for_product(&mut conn, product_id).await
    }

    pub async fn audit(&self) -> LedgerResult<Vec<StockDiscrepancy>> {
        let mut conn = self.acquire().await?;
        engine::audit(&mut conn).await
    }

    /// Build the read-only report from the listing operations.
    pub async fn report(&self) -> LedgerResult<StockReport> {
        let products = self.list_products().await?;
        let movements = self.list_movements().await?;
        Ok(StockReport::build(&products, &movements))
    }

    /// Close the pool, waiting for checked-out connections to come back.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
