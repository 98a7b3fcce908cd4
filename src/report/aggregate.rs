use rust_decimal::Decimal;
use std::collections::HashSet;
use uuid::Uuid;

use crate::models::{MassBalance, ProductionOrder, StockMove};

/// A production order reached from one selected move, with its variance
/// fields computed and its other-side sibling moves loaded. One entry per
/// selected move, so an order reached twice is counted twice, matching the
/// per-move summation of the report.
#[derive(Debug, Clone)]
pub struct ResolvedProduction {
    pub order: ProductionOrder,
    pub balance: Option<MassBalance>,
    pub siblings: Vec<StockMove>,
}

/// Presentation-ready totals over the whole report. `consumption` is the
/// exact sum of sibling move quantities; the three variance totals sum the
/// per-order computed fields, treating undefined values as zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportTotals {
    pub quantity: Decimal,
    pub consumption: Decimal,
    pub plan_consumption: Decimal,
    pub difference: Decimal,
    pub difference_percent: Decimal,
}

impl ReportTotals {
    pub fn from_productions(productions: &[ResolvedProduction]) -> Self {
        let mut totals = Self::default();
        for production in productions {
            for sibling in &production.siblings {
                // fall back to the move's own quantity when the order never
                // declared a target quantity
                totals.quantity += production.order.quantity.unwrap_or(sibling.quantity);
                totals.consumption += sibling.quantity;
                if let Some(balance) = &production.balance {
                    totals.plan_consumption += balance.plan_consumption;
                    totals.difference += balance.difference;
                    totals.difference_percent +=
                        balance.difference_percent.unwrap_or(Decimal::ZERO);
                }
            }
        }
        totals
    }
}

/// De-duplicated products referenced by the sibling moves, in first-seen
/// order.
pub fn distinct_products(productions: &[ResolvedProduction]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    let mut products = Vec::new();
    for production in productions {
        for sibling in &production.siblings {
            if seen.insert(sibling.product_id) {
                products.push(sibling.product_id);
            }
        }
    }
    products
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn order(quantity: Option<Decimal>) -> ProductionOrder {
        ProductionOrder {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            number: "PROD-1".to_string(),
            product_id: Some(Uuid::new_v4()),
            bom_id: Some(Uuid::new_v4()),
            uom_id: None,
            quantity,
            state: "done".to_string(),
            planned_date: None,
            effective_date: None,
            created_at: Utc::now(),
        }
    }

    fn sibling(product_id: Uuid, quantity: Decimal) -> StockMove {
        StockMove {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            product_id,
            uom_id: Uuid::new_v4(),
            lot_id: None,
            quantity,
            from_location_id: Uuid::new_v4(),
            to_location_id: Uuid::new_v4(),
            state: "done".to_string(),
            effective_date: None,
            production_input_id: None,
            production_output_id: None,
            created_at: Utc::now(),
        }
    }

    fn balance(plan: Decimal, difference: Decimal, percent: Option<Decimal>) -> MassBalance {
        MassBalance {
            plan_consumption: plan,
            difference,
            difference_percent: percent,
        }
    }

    #[test]
    fn consumption_is_the_exact_sum_of_sibling_quantities() {
        let product = Uuid::new_v4();
        let resolved = vec![ResolvedProduction {
            order: order(Some(dec!(100))),
            balance: Some(balance(dec!(200), dec!(-100.00), Some(dec!(-0.50)))),
            siblings: vec![sibling(product, dec!(120.5)), sibling(product, dec!(79.5))],
        }];

        let totals = ReportTotals::from_productions(&resolved);
        assert_eq!(totals.consumption, dec!(200));
        // the order quantity counts once per sibling move
        assert_eq!(totals.quantity, dec!(200));
        assert_eq!(totals.plan_consumption, dec!(400));
        assert_eq!(totals.difference, dec!(-200.00));
        assert_eq!(totals.difference_percent, dec!(-1.00));
    }

    #[test]
    fn missing_order_quantity_falls_back_to_the_move_quantity() {
        let product = Uuid::new_v4();
        let resolved = vec![ResolvedProduction {
            order: order(None),
            balance: None,
            siblings: vec![sibling(product, dec!(12)), sibling(product, dec!(8))],
        }];

        let totals = ReportTotals::from_productions(&resolved);
        assert_eq!(totals.quantity, dec!(20));
        assert_eq!(totals.consumption, dec!(20));
    }

    #[test]
    fn undefined_balances_sum_as_zero() {
        let product = Uuid::new_v4();
        let resolved = vec![
            ResolvedProduction {
                order: order(Some(dec!(10))),
                balance: Some(balance(dec!(0), dec!(10.00), None)),
                siblings: vec![sibling(product, dec!(10))],
            },
            ResolvedProduction {
                order: order(Some(dec!(5))),
                balance: None,
                siblings: vec![sibling(product, dec!(5))],
            },
        ];

        let totals = ReportTotals::from_productions(&resolved);
        assert_eq!(totals.plan_consumption, dec!(0));
        assert_eq!(totals.difference, dec!(10.00));
        assert_eq!(totals.difference_percent, dec!(0));
    }

    #[test]
    fn empty_selection_aggregates_to_zero() {
        let totals = ReportTotals::from_productions(&[]);
        assert_eq!(totals, ReportTotals::default());
        assert!(distinct_products(&[]).is_empty());
    }

    #[test]
    fn distinct_products_deduplicate_in_first_seen_order() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let resolved = vec![
            ResolvedProduction {
                order: order(Some(dec!(1))),
                balance: None,
                siblings: vec![sibling(first, dec!(1)), sibling(second, dec!(1))],
            },
            ResolvedProduction {
                order: order(Some(dec!(1))),
                balance: None,
                siblings: vec![sibling(first, dec!(1))],
            },
        ];

        assert_eq!(distinct_products(&resolved), vec![first, second]);
    }
}
