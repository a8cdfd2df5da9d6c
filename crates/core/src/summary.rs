use crate::domain::selections::{design_tier_name, CmsTier, Selections};

/// Opening chat message built from the estimator when the visitor asks to
/// discuss their estimate. `total_display` is the already formatted total.
pub fn scope_summary(advisor: &str, selections: &Selections, total_display: &str) -> String {
    let mut summary = format!(
        "Hello {advisor}, I've used the calculator to create a project estimate. Here's the scope:\n"
    );
    summary.push_str(&format!("- Design Tier: {}\n", design_tier_name(selections.design_tier)));

    let counted = [
        ("Standard Pages", selections.standard_pages),
        ("Complex Pages", selections.complex_pages),
        ("System Pages", selections.system_pages),
    ];
    for (label, count) in counted {
        if count > 0 {
            summary.push_str(&format!("- {label}: {count}\n"));
        }
    }
    if selections.cms_type != CmsTier::None {
        summary.push_str(&format!("- CMS: {}\n", selections.cms_type.label()));
    }
    if selections.products > 0 {
        summary.push_str(&format!("- E-commerce Products: {}\n", selections.products));
    }

    let mut features = Vec::new();
    if selections.user_auth {
        features.push("User Authentication");
    }
    if selections.payment_gateway {
        features.push("Payment Gateway");
    }
    if !features.is_empty() {
        summary.push_str(&format!("- Additional Features: {}\n", features.join(", ")));
    }
    if selections.apis > 0 {
        summary.push_str(&format!("- API Integrations: {}\n", selections.apis));
    }

    summary.push_str(&format!(
        "\nThe estimated total is {total_display}. Can we discuss this further?"
    ));
    summary
}
