use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

pub const MIN_DESIGN_TIER: u8 = 1;
pub const MAX_DESIGN_TIER: u8 = 4;
pub const MAX_STANDARD_PAGES: u32 = 20;
pub const MAX_COMPLEX_PAGES: u32 = 20;
pub const MAX_SYSTEM_PAGES: u32 = 5;
pub const MAX_PRODUCTS: u32 = 200;
pub const MAX_APIS: u32 = 10;

/// CMS tier offered by the estimator.
///
/// The wire value is the historical price key (`"0"`, `"100000"`,
/// `"250000"`). Prices are looked up in the pricing table, never parsed
/// from the wire value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmsTier {
    #[default]
    #[serde(rename = "0")]
    None,
    #[serde(rename = "100000")]
    Headless,
    #[serde(rename = "250000")]
    Traditional,
}

impl CmsTier {
    pub const ALL: [CmsTier; 3] = [CmsTier::None, CmsTier::Headless, CmsTier::Traditional];

    pub fn wire_value(&self) -> &'static str {
        match self {
            Self::None => "0",
            Self::Headless => "100000",
            Self::Traditional => "250000",
        }
    }

    pub fn from_wire(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tier| tier.wire_value() == raw.trim())
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Headless => "Headless CMS",
            Self::Traditional => "Traditional CMS",
        }
    }

    /// Next cheaper tier, if any.
    pub fn downgrade(&self) -> Option<Self> {
        match self {
            Self::None => None,
            Self::Headless => Some(Self::None),
            Self::Traditional => Some(Self::Headless),
        }
    }
}

pub fn design_tier_name(tier: u8) -> &'static str {
    match tier {
        1 => "Template Customization",
        2 => "Custom Design",
        3 => "Premium Custom",
        4 => "Enterprise-grade",
        _ => "Unknown",
    }
}

/// The project configuration driving the quote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selections {
    pub design_tier: u8,
    pub standard_pages: u32,
    pub complex_pages: u32,
    pub system_pages: u32,
    pub cms_type: CmsTier,
    pub products: u32,
    pub user_auth: bool,
    pub payment_gateway: bool,
    pub apis: u32,
}

impl Default for Selections {
    fn default() -> Self {
        Self {
            design_tier: 1,
            standard_pages: 3,
            complex_pages: 0,
            system_pages: 0,
            cms_type: CmsTier::None,
            products: 0,
            user_auth: false,
            payment_gateway: false,
            apis: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionField {
    DesignTier,
    StandardPages,
    ComplexPages,
    SystemPages,
    CmsType,
    Products,
    UserAuth,
    PaymentGateway,
    Apis,
}

impl SelectionField {
    pub const ALL: [SelectionField; 9] = [
        SelectionField::DesignTier,
        SelectionField::StandardPages,
        SelectionField::ComplexPages,
        SelectionField::SystemPages,
        SelectionField::CmsType,
        SelectionField::Products,
        SelectionField::UserAuth,
        SelectionField::PaymentGateway,
        SelectionField::Apis,
    ];

    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::DesignTier => "designTier",
            Self::StandardPages => "standardPages",
            Self::ComplexPages => "complexPages",
            Self::SystemPages => "systemPages",
            Self::CmsType => "cmsType",
            Self::Products => "products",
            Self::UserAuth => "userAuth",
            Self::PaymentGateway => "paymentGateway",
            Self::Apis => "apis",
        }
    }

    pub fn from_wire(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.wire_name() == raw)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::DesignTier => "Design Tier",
            Self::StandardPages => "Standard Pages",
            Self::ComplexPages => "Complex Pages",
            Self::SystemPages => "System Pages",
            Self::CmsType => "CMS",
            Self::Products => "E-commerce Products",
            Self::UserAuth => "User Authentication",
            Self::PaymentGateway => "Payment Gateway",
            Self::Apis => "API Integrations",
        }
    }

    /// Inclusive bounds for integer fields; `None` for flags and the CMS tier.
    pub fn bounds(&self) -> Option<(u32, u32)> {
        match self {
            Self::DesignTier => Some((u32::from(MIN_DESIGN_TIER), u32::from(MAX_DESIGN_TIER))),
            Self::StandardPages => Some((0, MAX_STANDARD_PAGES)),
            Self::ComplexPages => Some((0, MAX_COMPLEX_PAGES)),
            Self::SystemPages => Some((0, MAX_SYSTEM_PAGES)),
            Self::Products => Some((0, MAX_PRODUCTS)),
            Self::Apis => Some((0, MAX_APIS)),
            Self::CmsType | Self::UserAuth | Self::PaymentGateway => None,
        }
    }
}

impl fmt::Display for SelectionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl Selections {
    pub fn validate(&self) -> Result<(), DomainError> {
        for field in SelectionField::ALL {
            let (Some((min, max)), Some(value)) = (field.bounds(), self.count(field)) else {
                continue;
            };
            if value < min || value > max {
                return Err(DomainError::InvalidSelection {
                    field,
                    reason: format!("{value} is outside {min}..={max}"),
                });
            }
        }
        Ok(())
    }

    /// Integer value of a counted field.
    pub fn count(&self, field: SelectionField) -> Option<u32> {
        match field {
            SelectionField::DesignTier => Some(u32::from(self.design_tier)),
            SelectionField::StandardPages => Some(self.standard_pages),
            SelectionField::ComplexPages => Some(self.complex_pages),
            SelectionField::SystemPages => Some(self.system_pages),
            SelectionField::Products => Some(self.products),
            SelectionField::Apis => Some(self.apis),
            SelectionField::CmsType | SelectionField::UserAuth | SelectionField::PaymentGateway => {
                None
            }
        }
    }

    pub fn diff(&self, other: &Selections) -> Vec<SelectionField> {
        SelectionField::ALL
            .into_iter()
            .filter(|field| match field {
                SelectionField::CmsType => self.cms_type != other.cms_type,
                SelectionField::UserAuth => self.user_auth != other.user_auth,
                SelectionField::PaymentGateway => self.payment_gateway != other.payment_gateway,
                counted => self.count(*counted) != other.count(*counted),
            })
            .collect()
    }
}

/// Typed partial update from the estimator controls.
///
/// Unlike agent patches, user edits are merged over the current record and
/// rejected outright when a value is out of range.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SelectionsPatch {
    pub design_tier: Option<u8>,
    pub standard_pages: Option<u32>,
    pub complex_pages: Option<u32>,
    pub system_pages: Option<u32>,
    pub cms_type: Option<CmsTier>,
    pub products: Option<u32>,
    pub user_auth: Option<bool>,
    pub payment_gateway: Option<bool>,
    pub apis: Option<u32>,
}

impl SelectionsPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, base: &Selections) -> Result<Selections, DomainError> {
        let mut next = base.clone();
        if let Some(design_tier) = self.design_tier {
            next.design_tier = design_tier;
        }
        if let Some(standard_pages) = self.standard_pages {
            next.standard_pages = standard_pages;
        }
        if let Some(complex_pages) = self.complex_pages {
            next.complex_pages = complex_pages;
        }
        if let Some(system_pages) = self.system_pages {
            next.system_pages = system_pages;
        }
        if let Some(cms_type) = self.cms_type {
            next.cms_type = cms_type;
        }
        if let Some(products) = self.products {
            next.products = products;
        }
        if let Some(user_auth) = self.user_auth {
            next.user_auth = user_auth;
        }
        if let Some(payment_gateway) = self.payment_gateway {
            next.payment_gateway = payment_gateway;
        }
        if let Some(apis) = self.apis {
            next.apis = apis;
        }
        next.validate()?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::{CmsTier, SelectionField, Selections, SelectionsPatch};
    use crate::errors::DomainError;

    #[test]
    fn defaults_are_valid() {
        let selections = Selections::default();
        selections.validate().expect("defaults should validate");
        assert_eq!(selections.design_tier, 1);
        assert_eq!(selections.standard_pages, 3);
        assert_eq!(selections.cms_type, CmsTier::None);
    }

    #[test]
    fn serializes_with_wire_names_and_cms_price_keys() {
        let selections = Selections { cms_type: CmsTier::Headless, ..Selections::default() };
        let json = serde_json::to_value(&selections).expect("serialize");

        assert_eq!(json["designTier"], 1);
        assert_eq!(json["standardPages"], 3);
        assert_eq!(json["cmsType"], "100000");
        assert_eq!(json["paymentGateway"], false);
    }

    #[test]
    fn validate_rejects_out_of_range_fields() {
        let selections = Selections { system_pages: 6, ..Selections::default() };
        let error = selections.validate().expect_err("system pages above cap");
        assert!(matches!(
            error,
            DomainError::InvalidSelection { field: SelectionField::SystemPages, .. }
        ));

        let selections = Selections { design_tier: 0, ..Selections::default() };
        assert!(selections.validate().is_err());
    }

    #[test]
    fn diff_lists_changed_fields_in_schema_order() {
        let before = Selections::default();
        let after = Selections {
            apis: 2,
            design_tier: 3,
            user_auth: true,
            ..Selections::default()
        };

        assert_eq!(
            before.diff(&after),
            vec![SelectionField::DesignTier, SelectionField::UserAuth, SelectionField::Apis]
        );
        assert!(after.diff(&after).is_empty());
    }

    #[test]
    fn user_patch_merges_over_current_state() {
        let current = Selections { products: 10, ..Selections::default() };
        let patch = SelectionsPatch { standard_pages: Some(7), ..SelectionsPatch::default() };

        let next = patch.apply_to(&current).expect("valid patch");
        assert_eq!(next.standard_pages, 7);
        assert_eq!(next.products, 10);
    }

    #[test]
    fn user_patch_with_out_of_range_value_is_rejected() {
        let patch = SelectionsPatch { apis: Some(11), ..SelectionsPatch::default() };
        assert!(patch.apply_to(&Selections::default()).is_err());
    }

    #[test]
    fn user_patch_rejects_unknown_keys() {
        let result = serde_json::from_str::<SelectionsPatch>(r#"{"pages": 4}"#);
        assert!(result.is_err());
    }

    #[test]
    fn cms_tier_round_trips_wire_values() {
        for tier in CmsTier::ALL {
            assert_eq!(CmsTier::from_wire(tier.wire_value()), Some(tier));
        }
        assert_eq!(CmsTier::from_wire("50000"), None);
    }
}
