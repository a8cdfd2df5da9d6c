use rust_decimal::Decimal;
use scopewise_core::config::AppConfig;
use scopewise_core::domain::selections::Selections;
use scopewise_core::pricing::currency::{Currency, CurrencyFormatter};
use scopewise_core::pricing::milestones::MilestoneSchedule;
use scopewise_core::pricing::{CostComponent, DeterministicQuoteEngine, QuoteEngine};
use serde::Serialize;

use crate::commands::selection::SelectionArgs;
use crate::commands::{load_config, CommandResult, EXIT_INVALID_INPUT};

#[derive(Debug, Serialize)]
struct MilestoneLine {
    label: String,
    description: String,
    amount: Decimal,
    display: String,
}

#[derive(Debug, Serialize)]
struct QuoteReport {
    selections: Selections,
    currency: Currency,
    total: Decimal,
    total_display: String,
    milestones: Vec<MilestoneLine>,
    breakdown: Vec<CostComponent>,
}

pub fn run(args: &SelectionArgs, currency: Currency) -> CommandResult {
    let config = match load_config("quote") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let selections = match args.selections() {
        Ok(selections) => selections,
        Err(error) => {
            return CommandResult::failure(
                "quote",
                "invalid_selection",
                error.to_string(),
                EXIT_INVALID_INPUT,
            )
        }
    };

    CommandResult::data("quote", &report(&config, selections, currency))
}

pub(crate) fn engine(config: &AppConfig) -> DeterministicQuoteEngine {
    DeterministicQuoteEngine::new(config.pricing.table.clone(), MilestoneSchedule::default())
}

fn report(config: &AppConfig, selections: Selections, currency: Currency) -> QuoteReport {
    let quote = engine(config).quote(&selections);
    let formatter = CurrencyFormatter::new(config.pricing.usd_rate);

    QuoteReport {
        currency,
        total: quote.total,
        total_display: formatter.format(quote.total, currency),
        milestones: quote
            .milestones
            .into_iter()
            .map(|milestone| MilestoneLine {
                display: formatter.format(milestone.amount, currency),
                label: milestone.label,
                description: milestone.description,
                amount: milestone.amount,
            })
            .collect(),
        breakdown: quote.breakdown,
        selections,
    }
}
