//! SQLite connection pool and schema bootstrap.

use core::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{debug, instrument};

use crate::config::StoreConfig;
use crate::error::{LedgerResult, map_sqlx_error};

/// Schema statements, applied in order. Every statement is idempotent.
///
/// `movements.product_id` is a real foreign key with `ON DELETE RESTRICT`, so the
/// store itself refuses to orphan movements even if a caller bypasses the engine.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        name              TEXT    NOT NULL CHECK (length(trim(name)) > 0),
        quantity          INTEGER NOT NULL DEFAULT 0,
        minimum_threshold INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS movements (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        product_id INTEGER NOT NULL REFERENCES products (id) ON DELETE RESTRICT,
        kind       TEXT    NOT NULL CHECK (kind IN ('inbound', 'outbound')),
        quantity   INTEGER NOT NULL CHECK (quantity > 0),
        date       TEXT    NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS movements_product_id ON movements (product_id)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id       INTEGER PRIMARY KEY AUTOINCREMENT,
        name     TEXT    NOT NULL,
        username TEXT    NOT NULL UNIQUE,
        password TEXT    NOT NULL,
        is_admin INTEGER NOT NULL DEFAULT 0
    )
    "#,
];

/// Open a pool for `config` and make sure the schema exists.
#[instrument(skip(config), fields(database_url = %config.database_url), err)]
pub async fn connect(config: &StoreConfig) -> LedgerResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(|e| map_sqlx_error("parse_database_url", e))?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(config.busy_timeout);

    let pool_options = if config.is_in_memory() {
        // Each in-memory connection is its own database; pin exactly one and
        // never recycle it.
        SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(config.max_connections)
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(|e| map_sqlx_error("connect", e))?;

    migrate(&pool).await?;
    Ok(pool)
}

/// Create missing tables and indexes.
pub async fn migrate(pool: &SqlitePool) -> LedgerResult<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
    }
    debug!(statements = SCHEMA.len(), "schema ready");
    Ok(())
}
