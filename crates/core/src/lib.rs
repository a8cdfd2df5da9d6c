//! Core estimator model for the portfolio pricing calculator.
//!
//! - `domain` - the `Selections` record, strict user edits and the lenient
//!   decode boundary for agent-produced patches
//! - `pricing` - deterministic quote engine, milestone schedule, currency
//!   display and budget fitting
//! - `state` - the single shared selection cell read by the estimator and
//!   the chat advisor
//!
//! Prices are never decided by the language model. The model may only
//! propose a selection patch; every total is computed here.

pub mod config;
pub mod domain;
pub mod errors;
pub mod pricing;
pub mod state;
pub mod summary;

pub use domain::patch::{decode_agent_patch, AdjustmentKind, PatchAdjustment, PatchDecode};
pub use domain::selections::{CmsTier, SelectionField, Selections, SelectionsPatch};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use pricing::budget::{check_budget, fit_to_budget, BudgetCheck, BudgetFit};
pub use pricing::currency::{Currency, CurrencyFormatter};
pub use pricing::milestones::{Milestone, MilestonePhase, MilestoneSchedule};
pub use pricing::{
    compute_total, CostComponent, CostStage, DeterministicQuoteEngine, PricingTable, Quote,
    QuoteEngine,
};
pub use state::{ChangeOrigin, SelectionState, SelectionStore};
pub use summary::scope_summary;
