use rust_decimal::Decimal;
use scopewise_core::domain::selections::{SelectionField, Selections};
use scopewise_core::pricing::budget::fit_to_budget;
use scopewise_core::pricing::currency::{Currency, CurrencyFormatter};
use scopewise_core::pricing::QuoteEngine;
use serde::Serialize;

use crate::commands::quote::engine;
use crate::commands::selection::SelectionArgs;
use crate::commands::{load_config, CommandResult, EXIT_INVALID_INPUT};

#[derive(Debug, Serialize)]
struct FitReport {
    budget_ngn: Decimal,
    budget_display: String,
    original_total_display: String,
    total: Decimal,
    total_display: String,
    within_budget: bool,
    reduced: Vec<SelectionField>,
    selections: Selections,
}

/// `budget` is read in `currency` and converted to NGN before fitting.
pub fn run(args: &SelectionArgs, budget: Decimal, currency: Currency) -> CommandResult {
    let config = match load_config("fit") {
        Ok(config) => config,
        Err(result) => return result,
    };
    if budget <= Decimal::ZERO {
        return CommandResult::failure(
            "fit",
            "invalid_budget",
            "budget must be greater than zero",
            EXIT_INVALID_INPUT,
        );
    }
    let selections = match args.selections() {
        Ok(selections) => selections,
        Err(error) => {
            return CommandResult::failure(
                "fit",
                "invalid_selection",
                error.to_string(),
                EXIT_INVALID_INPUT,
            )
        }
    };

    let formatter = CurrencyFormatter::new(config.pricing.usd_rate);
    let budget_ngn = match currency {
        Currency::Ngn => budget,
        Currency::Usd => match budget.checked_mul(formatter.usd_rate()) {
            Some(budget_ngn) => budget_ngn,
            None => {
                return CommandResult::failure(
                    "fit",
                    "invalid_budget",
                    "budget is too large to convert to NGN",
                    EXIT_INVALID_INPUT,
                )
            }
        },
    };
    let engine = engine(&config);
    let fit = fit_to_budget(engine.table(), &selections, budget_ngn);

    CommandResult::data(
        "fit",
        &FitReport {
            budget_ngn,
            budget_display: formatter.format(budget_ngn, currency),
            original_total_display: formatter.format(fit.original_total, currency),
            total: fit.total,
            total_display: formatter.format(fit.total, currency),
            within_budget: fit.within_budget,
            reduced: fit.reduced,
            selections: fit.selections,
        },
    )
}
