//! Deterministic budget fitting.
//!
//! Because the total is monotonic in every field, walking fields downward in
//! a fixed order always converges: either the total drops under the budget or
//! every field reaches its floor.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::selections::{SelectionField, Selections, MIN_DESIGN_TIER};
use crate::pricing::{compute_total, PricingTable};

/// Order in which fields are given up when the estimate is over budget.
pub const REDUCTION_ORDER: [SelectionField; 9] = [
    SelectionField::Apis,
    SelectionField::Products,
    SelectionField::PaymentGateway,
    SelectionField::UserAuth,
    SelectionField::CmsType,
    SelectionField::SystemPages,
    SelectionField::ComplexPages,
    SelectionField::DesignTier,
    SelectionField::StandardPages,
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetCheck {
    pub budget: Decimal,
    pub total: Decimal,
    pub within_budget: bool,
    /// Amount over budget; zero when the estimate fits.
    pub overrun: Decimal,
}

pub fn check_budget(table: &PricingTable, selections: &Selections, budget: Decimal) -> BudgetCheck {
    let total = compute_total(table, selections);
    let overrun = (total - budget).max(Decimal::ZERO);
    BudgetCheck { budget, total, within_budget: total <= budget, overrun }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetFit {
    pub budget: Decimal,
    pub original_total: Decimal,
    pub selections: Selections,
    pub total: Decimal,
    pub within_budget: bool,
    pub reduced: Vec<SelectionField>,
}

pub fn fit_to_budget(table: &PricingTable, selections: &Selections, budget: Decimal) -> BudgetFit {
    let original_total = compute_total(table, selections);
    let mut current = selections.clone();
    let mut total = original_total;

    while total > budget {
        let Some(next) = reduce_once(&current) else {
            break;
        };
        total = compute_total(table, &next);
        current = next;
    }

    BudgetFit {
        budget,
        original_total,
        reduced: selections.diff(&current),
        within_budget: total <= budget,
        selections: current,
        total,
    }
}

/// Lowers the first reducible field in `REDUCTION_ORDER` by one step.
fn reduce_once(selections: &Selections) -> Option<Selections> {
    let mut next = selections.clone();
    for field in REDUCTION_ORDER {
        let reduced = match field {
            SelectionField::Apis => decrement(&mut next.apis, 0),
            SelectionField::Products => decrement(&mut next.products, 0),
            SelectionField::SystemPages => decrement(&mut next.system_pages, 0),
            SelectionField::ComplexPages => decrement(&mut next.complex_pages, 0),
            SelectionField::StandardPages => decrement(&mut next.standard_pages, 0),
            SelectionField::DesignTier => {
                if next.design_tier > MIN_DESIGN_TIER {
                    next.design_tier -= 1;
                    true
                } else {
                    false
                }
            }
            SelectionField::PaymentGateway => std::mem::take(&mut next.payment_gateway),
            SelectionField::UserAuth => std::mem::take(&mut next.user_auth),
            SelectionField::CmsType => match next.cms_type.downgrade() {
                Some(tier) => {
                    next.cms_type = tier;
                    true
                }
                None => false,
            },
        };
        if reduced {
            return Some(next);
        }
    }
    None
}

fn decrement(value: &mut u32, floor: u32) -> bool {
    if *value > floor {
        *value -= 1;
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{check_budget, fit_to_budget};
    use crate::domain::selections::{CmsTier, SelectionField, Selections};
    use crate::pricing::{compute_total, PricingTable};

    #[test]
    fn selections_within_budget_are_untouched() {
        let table = PricingTable::default();
        let fit = fit_to_budget(&table, &Selections::default(), Decimal::from(500_000));

        assert!(fit.within_budget);
        assert_eq!(fit.selections, Selections::default());
        assert!(fit.reduced.is_empty());
        assert_eq!(fit.total, Decimal::from(425_000));
    }

    #[test]
    fn drops_integrations_before_pages() {
        let table = PricingTable::default();
        let selections = Selections {
            standard_pages: 5,
            apis: 3,
            user_auth: true,
            ..Selections::default()
        };
        // 250k + 100k + 125k + 120k + 300k = 895k
        let fit = fit_to_budget(&table, &selections, Decimal::from(600_000));

        assert!(fit.within_budget);
        assert_eq!(fit.original_total, Decimal::from(895_000));
        assert_eq!(fit.selections.apis, 0);
        assert!(fit.selections.user_auth);
        assert_eq!(fit.selections.standard_pages, 5);
        assert_eq!(fit.total, Decimal::from(595_000));
        assert_eq!(fit.reduced, vec![SelectionField::Apis]);

        let tighter = fit_to_budget(&table, &selections, Decimal::from(500_000));
        assert!(!tighter.selections.user_auth);
        assert_eq!(tighter.total, Decimal::from(475_000));
        assert_eq!(tighter.reduced, vec![SelectionField::UserAuth, SelectionField::Apis]);
    }

    #[test]
    fn never_increases_any_field() {
        let table = PricingTable::default();
        let selections = Selections {
            design_tier: 4,
            standard_pages: 12,
            complex_pages: 6,
            system_pages: 3,
            cms_type: CmsTier::Traditional,
            products: 40,
            user_auth: true,
            payment_gateway: true,
            apis: 5,
        };
        for budget in [0_i64, 350_000, 800_000, 1_500_000, 5_000_000] {
            let fit = fit_to_budget(&table, &selections, Decimal::from(budget));
            let reduced = &fit.selections;
            assert!(reduced.design_tier <= selections.design_tier);
            assert!(reduced.standard_pages <= selections.standard_pages);
            assert!(reduced.complex_pages <= selections.complex_pages);
            assert!(reduced.system_pages <= selections.system_pages);
            assert!(reduced.products <= selections.products);
            assert!(reduced.apis <= selections.apis);
            assert!(fit.total <= fit.original_total);
            assert_eq!(fit.total, compute_total(&table, reduced));
            reduced.validate().expect("fitted selections stay valid");
        }
    }

    #[test]
    fn unreachable_budget_reports_floor() {
        let table = PricingTable::default();
        let fit = fit_to_budget(&table, &Selections::default(), Decimal::from(100_000));

        assert!(!fit.within_budget);
        assert_eq!(fit.selections.standard_pages, 0);
        assert_eq!(fit.selections.design_tier, 1);
        // base fee + one design unit is the floor
        assert_eq!(fit.total, Decimal::from(350_000));
    }

    #[test]
    fn check_reports_overrun() {
        let table = PricingTable::default();
        let check = check_budget(&table, &Selections::default(), Decimal::from(400_000));
        assert!(!check.within_budget);
        assert_eq!(check.overrun, Decimal::from(25_000));

        let check = check_budget(&table, &Selections::default(), Decimal::from(425_000));
        assert!(check.within_budget);
        assert_eq!(check.overrun, Decimal::ZERO);
    }
}
