//! Pure stock rules: what a movement (or its reversal) does to a product.
//!
//! Nothing here performs IO. The infra engine asks these functions for a
//! [`StockAdjustment`] and then persists the movement and the adjustment in
//! one transaction.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult, Entity, ProductId};

use crate::movement::{Movement, MovementKind, NewMovement};
use crate::product::Product;

/// Net change to apply to one product's cached quantity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub product_id: ProductId,
    pub delta: i64,
}

/// How reversals that would leave a product below zero are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReversalPolicy {
    /// Reversal is a correction action and always applies, even if later
    /// outbound movements already consumed the stock.
    #[default]
    AllowNegative,
    /// Reversal is rejected with `InsufficientStock` if the resulting
    /// quantity would be negative.
    RejectNegative,
}

impl ReversalPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReversalPolicy::AllowNegative => "allow-negative",
            ReversalPolicy::RejectNegative => "reject-negative",
        }
    }
}

impl core::fmt::Display for ReversalPolicy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReversalPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "allow-negative" | "allow" => Ok(ReversalPolicy::AllowNegative),
            "reject-negative" | "reject" => Ok(ReversalPolicy::RejectNegative),
            other => Err(DomainError::validation(format!(
                "reversal policy must be allow-negative or reject-negative, got '{other}'"
            ))),
        }
    }
}

impl Product {
    /// Decide the stock effect of recording `movement` against this product.
    ///
    /// Outbound movements may never take more than is on hand.
    pub fn plan_movement(&self, movement: &NewMovement) -> DomainResult<StockAdjustment> {
        self.ensure_owns(movement.product_id)?;

        let requested = movement.quantity.get();
        if movement.kind == MovementKind::Outbound && requested > self.quantity() {
            return Err(DomainError::insufficient_stock(
                self.id(),
                requested,
                self.quantity(),
            ));
        }

        let delta = movement.kind.signed(movement.quantity);
        self.checked_target(delta)?;
        Ok(StockAdjustment {
            product_id: self.id(),
            delta,
        })
    }

    /// Decide the stock effect of reversing `movement`.
    ///
    /// Under [`ReversalPolicy::AllowNegative`] this never fails for a matching
    /// product; the result may be negative.
    pub fn plan_reversal(
        &self,
        movement: &Movement,
        policy: ReversalPolicy,
    ) -> DomainResult<StockAdjustment> {
        self.ensure_owns(movement.product_id())?;

        let delta = -movement.signed_quantity();
        let target = self.checked_target(delta)?;
        if policy == ReversalPolicy::RejectNegative && target < 0 {
            return Err(DomainError::insufficient_stock(
                self.id(),
                movement.quantity().get(),
                self.quantity(),
            ));
        }

        Ok(StockAdjustment {
            product_id: self.id(),
            delta,
        })
    }

    /// Apply a planned adjustment to the in-memory product.
    pub fn apply(&mut self, adjustment: &StockAdjustment) -> DomainResult<()> {
        self.ensure_owns(adjustment.product_id)?;
        self.quantity = self.checked_target(adjustment.delta)?;
        Ok(())
    }

    fn ensure_owns(&self, product_id: ProductId) -> DomainResult<()> {
        if product_id != self.id() {
            return Err(DomainError::integrity(format!(
                "movement references product {product_id}, not {}",
                self.id()
            )));
        }
        Ok(())
    }

    fn checked_target(&self, delta: i64) -> DomainResult<i64> {
        self.quantity()
            .checked_add(delta)
            .ok_or_else(|| DomainError::validation("stock quantity out of range"))
    }
}

/// Net quantity of `product_id` derived from a movement history:
/// inbound total minus outbound total.
///
/// Summed in `i128`: partial sums of in-range movements can leave the `i64`
/// range even when the final net fits.
pub fn net_quantity<'a, I>(product_id: ProductId, movements: I) -> i128
where
    I: IntoIterator<Item = &'a Movement>,
{
    movements
        .into_iter()
        .filter(|m| m.product_id() == product_id)
        .map(|m| i128::from(m.signed_quantity()))
        .sum()
}
