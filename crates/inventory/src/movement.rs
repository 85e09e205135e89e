use core::str::FromStr;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult, Entity, MovementId, ProductId};

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Inbound,
    Outbound,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Inbound => "inbound",
            MovementKind::Outbound => "outbound",
        }
    }

    /// Signed effect of a movement of this kind on on-hand stock.
    pub fn signed(&self, quantity: Quantity) -> i64 {
        match self {
            MovementKind::Inbound => quantity.get(),
            MovementKind::Outbound => -quantity.get(),
        }
    }
}

impl core::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inbound" | "in" => Ok(MovementKind::Inbound),
            "outbound" | "out" => Ok(MovementKind::Outbound),
            other => Err(DomainError::validation(format!(
                "movement kind must be inbound or outbound, got '{other}'"
            ))),
        }
    }
}

/// Strictly positive movement quantity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Quantity(i64);

impl Quantity {
    pub fn new(raw: i64) -> DomainResult<Self> {
        if raw <= 0 {
            return Err(DomainError::validation(format!(
                "movement quantity must be positive, got {raw}"
            )));
        }
        Ok(Self(raw))
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for Quantity {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i64 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A recorded stock-in or stock-out event against one product.
///
/// Movements are never edited in place: they are created by recording and
/// removed by reversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    id: MovementId,
    product_id: ProductId,
    kind: MovementKind,
    quantity: Quantity,
    date: NaiveDate,
}

impl Movement {
    /// Rebuild a movement from stored parts.
    pub fn from_parts(
        id: MovementId,
        product_id: ProductId,
        kind: MovementKind,
        quantity: Quantity,
        date: NaiveDate,
    ) -> Self {
        Self {
            id,
            product_id,
            kind,
            quantity,
            date,
        }
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn kind(&self) -> MovementKind {
        self.kind
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Signed effect this movement had on its product's stock when recorded.
    pub fn signed_quantity(&self) -> i64 {
        self.kind.signed(self.quantity)
    }
}

impl Entity for Movement {
    type Id = MovementId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// A validated movement that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovement {
    pub product_id: ProductId,
    pub kind: MovementKind,
    pub quantity: Quantity,
    pub date: NaiveDate,
}

impl NewMovement {
    pub fn into_movement(self, id: MovementId) -> Movement {
        Movement::from_parts(id, self.product_id, self.kind, self.quantity, self.date)
    }
}

/// Command: RecordMovement.
///
/// Raw input as collected from a caller; validated by [`RecordMovement::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMovement {
    pub product_id: ProductId,
    pub kind: MovementKind,
    pub quantity: i64,
    /// Defaults to the current local date.
    pub date: Option<NaiveDate>,
}

impl RecordMovement {
    pub fn new(product_id: ProductId, kind: MovementKind, quantity: i64) -> Self {
        Self {
            product_id,
            kind,
            quantity,
            date: None,
        }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn validate(&self) -> DomainResult<NewMovement> {
        Ok(NewMovement {
            product_id: self.product_id,
            kind: self.kind,
            quantity: Quantity::new(self.quantity)?,
            date: self.date.unwrap_or_else(today),
        })
    }
}

/// Current local calendar date.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn quantity_rejects_zero_and_negative() {
        assert!(Quantity::new(1).is_ok());
        assert!(matches!(Quantity::new(0), Err(DomainError::Validation(_))));
        assert!(matches!(Quantity::new(-3), Err(DomainError::Validation(_))));
    }

    #[test]
    fn quantity_deserialization_is_validated() {
        let ok: Quantity = serde_json::from_str("5").unwrap();
        assert_eq!(ok.get(), 5);
        assert!(serde_json::from_str::<Quantity>("0").is_err());
    }

    #[test]
    fn kind_parses_long_and_short_forms() {
        assert_eq!("inbound".parse::<MovementKind>().unwrap(), MovementKind::Inbound);
        assert_eq!("OUT".parse::<MovementKind>().unwrap(), MovementKind::Outbound);
        assert!("sideways".parse::<MovementKind>().is_err());
    }

    #[test]
    fn signed_quantity_follows_kind() {
        let q = Quantity::new(7).unwrap();
        assert_eq!(MovementKind::Inbound.signed(q), 7);
        assert_eq!(MovementKind::Outbound.signed(q), -7);
    }

    #[test]
    fn record_movement_defaults_date_to_today() {
        let cmd = RecordMovement::new(ProductId::new(1), MovementKind::Inbound, 3);
        let new = cmd.validate().unwrap();
        assert_eq!(new.date, today());

        let dated = RecordMovement::new(ProductId::new(1), MovementKind::Inbound, 3)
            .on(date(2024, 1, 1))
            .validate()
            .unwrap();
        assert_eq!(dated.date, date(2024, 1, 1));
    }

    #[test]
    fn record_movement_rejects_non_positive_quantity() {
        let err = RecordMovement::new(ProductId::new(1), MovementKind::Outbound, 0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
