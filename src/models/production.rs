use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::Uom;

/// Decimal places shared with monetary values across the schema. The two
/// rounded variance fields must use the same precision.
pub const PRICE_DECIMALS: u32 = 2;

/// A bill of materials with its input and output lines already loaded,
/// ordered by `(sequence, id)`.
#[derive(Debug, Clone)]
pub struct Bom {
    pub id: Uuid,
    pub name: String,
    pub inputs: Vec<BomLine>,
    pub outputs: Vec<BomLine>,
}

#[derive(Debug, Clone)]
pub struct BomLine {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub uom: Uom,
}

impl Bom {
    /// Scale factor mapping BOM line quantities to an actual produced
    /// quantity of `product_id` expressed in `uom`. Zero when the BOM has
    /// no output line for that product.
    pub fn compute_factor(&self, product_id: Uuid, quantity: Decimal, uom: &Uom) -> Decimal {
        let mut output_qty = Decimal::ZERO;
        for output in &self.outputs {
            if output.product_id == product_id {
                output_qty += output.uom.compute_qty(output.quantity, uom);
            }
        }
        if output_qty.is_zero() {
            Decimal::ZERO
        } else {
            quantity / output_qty
        }
    }
}

impl BomLine {
    /// Line quantity scaled by `factor`, ceiled to the line unit's step.
    pub fn compute_quantity(&self, factor: Decimal) -> Decimal {
        self.uom.ceil(self.quantity * factor)
    }
}

/// A manufacturing run converting input materials into output product.
/// The `quantity` is the declared target; it is nullable and the variance
/// fields are undefined without it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProductionOrder {
    pub id: Uuid,
    pub company_id: Uuid,
    pub number: String,
    pub product_id: Option<Uuid>,
    pub bom_id: Option<Uuid>,
    pub uom_id: Option<Uuid>,
    pub quantity: Option<Decimal>,
    pub state: String,
    pub planned_date: Option<NaiveDate>,
    pub effective_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Derived mass balance figures for one production order. Recomputed on
/// every report run, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MassBalance {
    /// Total input consumption the BOM plans for the declared quantity.
    pub plan_consumption: Decimal,
    /// Declared quantity minus planned consumption, rounded.
    pub difference: Decimal,
    /// `difference / plan_consumption`, rounded. Undefined when the planned
    /// consumption is zero.
    pub difference_percent: Option<Decimal>,
}

impl ProductionOrder {
    /// Computes the mass balance of this order against `bom`. Returns `None`
    /// unless the order has a product, a declared quantity and the BOM has at
    /// least one input and one output line.
    pub fn mass_balance(&self, bom: Option<&Bom>) -> Option<MassBalance> {
        let bom = bom?;
        let product_id = self.product_id?;
        let quantity = self.quantity?;
        if bom.inputs.is_empty() || bom.outputs.is_empty() {
            return None;
        }

        // Scale every input line to the actually declared output quantity,
        // expressed in the first output line's unit.
        let uom = &bom.outputs[0].uom;
        let factor = bom.compute_factor(product_id, quantity, uom);

        let mut plan_consumption = Decimal::ZERO;
        for input in &bom.inputs {
            plan_consumption += input.compute_quantity(factor);
        }

        let raw_difference = quantity - plan_consumption;
        let difference_percent = if plan_consumption.is_zero() {
            // A BOM whose outputs never mention the produced product plans
            // zero consumption; the percentage is undefined, not zero.
            None
        } else {
            Some((raw_difference / plan_consumption).round_dp(PRICE_DECIMALS))
        };

        Some(MassBalance {
            plan_consumption,
            difference: raw_difference.round_dp(PRICE_DECIMALS),
            difference_percent,
        })
    }
}
