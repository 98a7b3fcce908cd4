use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub default_uom_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Unit of measure. `factor` converts quantities to the category base unit,
/// `rounding` is the smallest step quantities in this unit can take.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Uom {
    pub id: Uuid,
    pub name: String,
    pub symbol: String,
    pub category: String,
    pub factor: Decimal,
    pub rounding: Decimal,
}

impl Uom {
    /// Converts a quantity expressed in this unit into `to`, without rounding.
    /// Both units must belong to the same category.
    pub fn compute_qty(&self, quantity: Decimal, to: &Uom) -> Decimal {
        quantity * self.factor / to.factor
    }

    /// Rounds a quantity up to the next representable step of this unit.
    pub fn ceil(&self, quantity: Decimal) -> Decimal {
        if self.rounding.is_zero() {
            return quantity;
        }
        (quantity / self.rounding).ceil() * self.rounding
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lot {
    pub id: Uuid,
    pub product_id: Uuid,
    pub number: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn uom(factor: Decimal, rounding: Decimal) -> Uom {
        Uom {
            id: Uuid::new_v4(),
            name: "Unit".to_string(),
            symbol: "u".to_string(),
            category: "units".to_string(),
            factor,
            rounding,
        }
    }

    #[test]
    fn compute_qty_scales_through_category_base() {
        let kilogram = uom(dec!(1), dec!(0.01));
        let gram = uom(dec!(0.001), dec!(1));

        assert_eq!(kilogram.compute_qty(dec!(2), &gram), dec!(2000));
        assert_eq!(gram.compute_qty(dec!(500), &kilogram), dec!(0.5));
    }

    #[test]
    fn ceil_rounds_up_to_the_unit_step() {
        let unit = uom(dec!(1), dec!(0.01));
        assert_eq!(unit.ceil(dec!(1.001)), dec!(1.01));
        assert_eq!(unit.ceil(dec!(2)), dec!(2));

        let whole = uom(dec!(1), dec!(1));
        assert_eq!(whole.ceil(dec!(2.1)), dec!(3));
    }

    #[test]
    fn ceil_with_zero_rounding_is_identity() {
        let unit = uom(dec!(1), dec!(0));
        assert_eq!(unit.ceil(dec!(1.234)), dec!(1.234));
    }
}
