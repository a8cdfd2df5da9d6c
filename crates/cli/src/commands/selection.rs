use clap::Args;
use scopewise_core::domain::selections::{CmsTier, Selections, SelectionsPatch};
use scopewise_core::errors::DomainError;

/// Estimator inputs shared by `quote` and `fit`. Unset flags keep the
/// estimator defaults.
#[derive(Debug, Clone, Default, Args)]
pub struct SelectionArgs {
    #[arg(long, help = "Design tier, 1 (template) to 4 (enterprise)")]
    pub design_tier: Option<u8>,
    #[arg(long, help = "Standard pages, 0-20")]
    pub standard_pages: Option<u32>,
    #[arg(long, help = "Complex pages, 0-20")]
    pub complex_pages: Option<u32>,
    #[arg(long, help = "System pages, 0-5")]
    pub system_pages: Option<u32>,
    #[arg(long, value_parser = parse_cms, help = "CMS: none, headless or traditional")]
    pub cms: Option<CmsTier>,
    #[arg(long, help = "E-commerce products, 0-200")]
    pub products: Option<u32>,
    #[arg(long, help = "Include user authentication")]
    pub user_auth: bool,
    #[arg(long, help = "Include a payment gateway")]
    pub payment_gateway: bool,
    #[arg(long, help = "Third-party API integrations, 0-10")]
    pub apis: Option<u32>,
}

impl SelectionArgs {
    pub fn to_patch(&self) -> SelectionsPatch {
        SelectionsPatch {
            design_tier: self.design_tier,
            standard_pages: self.standard_pages,
            complex_pages: self.complex_pages,
            system_pages: self.system_pages,
            cms_type: self.cms,
            products: self.products,
            user_auth: self.user_auth.then_some(true),
            payment_gateway: self.payment_gateway.then_some(true),
            apis: self.apis,
        }
    }

    pub fn selections(&self) -> Result<Selections, DomainError> {
        self.to_patch().apply_to(&Selections::default())
    }
}

fn parse_cms(raw: &str) -> Result<CmsTier, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "none" => Ok(CmsTier::None),
        "headless" => Ok(CmsTier::Headless),
        "traditional" => Ok(CmsTier::Traditional),
        other => CmsTier::from_wire(other)
            .ok_or_else(|| format!("unknown CMS tier `{raw}` (use none, headless or traditional)")),
    }
}
