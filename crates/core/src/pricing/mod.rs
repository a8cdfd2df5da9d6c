pub mod budget;
pub mod currency;
pub mod milestones;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::selections::{CmsTier, Selections};
use crate::errors::DomainError;

use self::milestones::{Milestone, MilestoneSchedule};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CmsPrices {
    pub none: Decimal,
    pub headless: Decimal,
    pub traditional: Decimal,
}

/// Unit prices in NGN. Loaded once at startup and never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTable {
    pub base_fee: Decimal,
    pub design_unit: Decimal,
    pub standard_page: Decimal,
    pub complex_page: Decimal,
    pub system_page: Decimal,
    pub ecommerce_base: Decimal,
    pub per_product: Decimal,
    pub user_auth: Decimal,
    pub payment_gateway: Decimal,
    pub per_api: Decimal,
    pub cms: CmsPrices,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self {
            base_fee: Decimal::from(250_000),
            design_unit: Decimal::from(100_000),
            standard_page: Decimal::from(25_000),
            complex_page: Decimal::from(45_000),
            system_page: Decimal::from(90_000),
            ecommerce_base: Decimal::from(300_000),
            per_product: Decimal::from(5_000),
            user_auth: Decimal::from(120_000),
            payment_gateway: Decimal::from(150_000),
            per_api: Decimal::from(100_000),
            cms: CmsPrices {
                none: Decimal::ZERO,
                headless: Decimal::from(100_000),
                traditional: Decimal::from(250_000),
            },
        }
    }
}

impl PricingTable {
    pub fn cms_price(&self, tier: CmsTier) -> Decimal {
        match tier {
            CmsTier::None => self.cms.none,
            CmsTier::Headless => self.cms.headless,
            CmsTier::Traditional => self.cms.traditional,
        }
    }

    /// Negative prices would break monotonicity of the total.
    pub fn validate(&self) -> Result<(), DomainError> {
        let entries = [
            ("base_fee", self.base_fee),
            ("design_unit", self.design_unit),
            ("standard_page", self.standard_page),
            ("complex_page", self.complex_page),
            ("system_page", self.system_page),
            ("ecommerce_base", self.ecommerce_base),
            ("per_product", self.per_product),
            ("user_auth", self.user_auth),
            ("payment_gateway", self.payment_gateway),
            ("per_api", self.per_api),
            ("cms.none", self.cms.none),
            ("cms.headless", self.cms.headless),
            ("cms.traditional", self.cms.traditional),
        ];
        if let Some((name, _)) = entries.iter().find(|(_, amount)| amount.is_sign_negative()) {
            return Err(DomainError::InvariantViolation(format!(
                "pricing.{name} must not be negative"
            )));
        }
        if self.cms.none > self.cms.headless || self.cms.headless > self.cms.traditional {
            return Err(DomainError::InvariantViolation(
                "pricing.cms tiers must be ordered none <= headless <= traditional".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostStage {
    BaseFee,
    Design,
    StandardPages,
    ComplexPages,
    SystemPages,
    Cms,
    EcommerceBase,
    Products,
    UserAuth,
    PaymentGateway,
    ApiIntegrations,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostComponent {
    pub stage: CostStage,
    pub detail: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub total: Decimal,
    pub milestones: Vec<Milestone>,
    pub breakdown: Vec<CostComponent>,
}

pub trait QuoteEngine: Send + Sync {
    fn quote(&self, selections: &Selections) -> Quote;
    fn table(&self) -> &PricingTable;
}

#[derive(Clone, Debug, Default)]
pub struct DeterministicQuoteEngine {
    table: PricingTable,
    schedule: MilestoneSchedule,
}

impl DeterministicQuoteEngine {
    pub fn new(table: PricingTable, schedule: MilestoneSchedule) -> Self {
        Self { table, schedule }
    }

    pub fn schedule(&self) -> &MilestoneSchedule {
        &self.schedule
    }
}

impl QuoteEngine for DeterministicQuoteEngine {
    fn quote(&self, selections: &Selections) -> Quote {
        let breakdown = breakdown(&self.table, selections);
        let total = breakdown.iter().map(|component| component.amount).sum();
        Quote { total, milestones: self.schedule.split(total), breakdown }
    }

    fn table(&self) -> &PricingTable {
        &self.table
    }
}

pub fn compute_total(table: &PricingTable, selections: &Selections) -> Decimal {
    breakdown(table, selections).iter().map(|component| component.amount).sum()
}

/// Additive cost components in fixed order. Zero-valued components are kept
/// so the breakdown has the same shape for every selection.
pub fn breakdown(table: &PricingTable, selections: &Selections) -> Vec<CostComponent> {
    let ecommerce_base =
        if selections.products > 0 { table.ecommerce_base } else { Decimal::ZERO };

    vec![
        component(CostStage::BaseFee, "flat base fee".to_string(), table.base_fee),
        component(
            CostStage::Design,
            format!("design unit x tier {}", selections.design_tier),
            table.design_unit * Decimal::from(selections.design_tier),
        ),
        component(
            CostStage::StandardPages,
            format!("{} standard page(s)", selections.standard_pages),
            table.standard_page * Decimal::from(selections.standard_pages),
        ),
        component(
            CostStage::ComplexPages,
            format!("{} complex page(s)", selections.complex_pages),
            table.complex_page * Decimal::from(selections.complex_pages),
        ),
        component(
            CostStage::SystemPages,
            format!("{} system page(s)", selections.system_pages),
            table.system_page * Decimal::from(selections.system_pages),
        ),
        component(
            CostStage::Cms,
            selections.cms_type.label().to_string(),
            table.cms_price(selections.cms_type),
        ),
        component(
            CostStage::EcommerceBase,
            "e-commerce base fee when products > 0".to_string(),
            ecommerce_base,
        ),
        component(
            CostStage::Products,
            format!("{} product(s)", selections.products),
            table.per_product * Decimal::from(selections.products),
        ),
        component(
            CostStage::UserAuth,
            "user authentication".to_string(),
            if selections.user_auth { table.user_auth } else { Decimal::ZERO },
        ),
        component(
            CostStage::PaymentGateway,
            "payment gateway".to_string(),
            if selections.payment_gateway { table.payment_gateway } else { Decimal::ZERO },
        ),
        component(
            CostStage::ApiIntegrations,
            format!("{} API integration(s)", selections.apis),
            table.per_api * Decimal::from(selections.apis),
        ),
    ]
}

fn component(stage: CostStage, detail: String, amount: Decimal) -> CostComponent {
    CostComponent { stage, detail, amount }
}
