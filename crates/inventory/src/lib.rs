//! Inventory domain module.
//!
//! This crate contains the business rules for products and stock movements,
//! implemented purely as deterministic domain logic (no IO, no storage).

pub mod movement;
pub mod product;
pub mod stock;

pub use movement::{Movement, MovementKind, NewMovement, Quantity, RecordMovement, today};
pub use product::{Product, ProductName};
pub use stock::{ReversalPolicy, StockAdjustment, net_quantity};
