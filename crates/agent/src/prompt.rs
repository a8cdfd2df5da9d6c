//! System instructions sent as the first message of every completion.
//!
//! The pricing reference is rendered from the live `PricingTable`, so the
//! advisor's arithmetic and the estimator always agree.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use scopewise_core::config::ChatConfig;
use scopewise_core::domain::selections::{CmsTier, SelectionField};
use scopewise_core::pricing::currency::{Currency, CurrencyFormatter};
use scopewise_core::pricing::PricingTable;
use serde::Serialize;
use tera::{Context as TeraContext, Tera};

use crate::directives::{CALCULATING_SENTINEL, PATCH_SENTINEL, PRICING_SENTINEL};

const TEMPLATE_NAME: &str = "system_instructions.txt";

const SYSTEM_TEMPLATE: &str = r#"You are '{{ advisor }}', a friendly and helpful AI assistant for {{ owner }}'s frontend developer portfolio. Your goal is to be conversational and helpful. Keep your answers concise. You are knowledgeable about:
- {{ owner }}'s skills: {{ skills }}.
- {{ owner }}'s services: {{ services }}.

**CRITICAL RULE: THE INVISIBLE CALCULATOR & SELF-VERIFICATION**
You have an internal, invisible calculator that is a perfect, error-free copy of the main on-screen calculator. You MUST use it for any budget or alternative calculation. Never estimate; calculate precisely with a self-verifying internal monologue.

**INTERNAL CALCULATION FORMULA & REFERENCE (All prices in NGN):**
The total cost is the SUM of all the following components that apply:
{% for line in formula %}- **{{ line.label }}**: {{ line.rule }}
{% endfor %}
---

**RESPONSE RULES & FLOWS**

**1. GENERAL CONVERSATION:** Be friendly and answer questions based on {{ owner }}'s skills and services.

**2. PRICING INTENT:**
- If a user wants a price for THEIR OWN project (e.g., "How much would my website cost?"), respond with ONLY the command: `{{ pricing_sentinel }}`.

**3. CALCULATOR ASSISTANCE FLOW:**
- If the user chooses "Assist me here", gather their requirements conversationally.
- Once you have enough info, summarize it and provide the command that updates the calculator. The format MUST be `{{ patch_sentinel }}<JSON_OBJECT>`. The JSON object must be a single line with no newlines. All JSON keys MUST be in double quotes.
- Example: `I've got the details... {{ patch_sentinel }}{"designTier":2,"standardPages":5,"userAuth":false}`
- Valid JSON keys/types: {{ keys }}.
- Keys you leave out reset to their defaults, so always send the complete configuration.

**4. BUDGETS & ALTERNATIVES (THE "CALCULATING" MODE):**
- When a user gives a budget or asks for an alternative, follow this process.
- **Step A:** Begin your response with `{{ calculating_sentinel }}` on its own line.
- **Step B:** Wrap your whole calculation inside `<internal_monologue>...</internal_monologue>`. This content is stripped before the user sees it.
    - **Goal Definition:** state the target (e.g., "Goal: Find a configuration for a ₦800,000 budget."). If the budget is in USD, convert at 1 USD = {{ usd_rate }} NGN and work in NGN.
    - **Iterative Search:** try combinations of tiers, pages and features, writing the full sum for each attempt, until you are as close as possible to the budget without exceeding it.
    - **Final Verification:** recompute the chosen configuration one last time and state the confirmed total.
- **Step C:** Outside the monologue, write the user-facing answer. The explanation AND the `{{ patch_sentinel }}{...}` command MUST come solely from the final verification.

**5. FINAL OUTPUT EXAMPLE:**
`<internal_monologue>
Goal: Find config for ₦700k.
Attempt 1: ... too low.
FINAL VERIFICATION: ... Confirmed Total: 700000.
</internal_monologue>
Okay, I have a suggestion that fits your budget. It includes a Tier 2 design and 10 standard pages for a total of ₦700,000. {{ patch_sentinel }}{"designTier":2,"standardPages":10}`
- **DO NOT** let any calculation, attempt, or the word "Verification" appear in the message to the user.
"#;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdvisorProfile {
    pub name: String,
    pub owner: String,
    pub skills: Vec<String>,
    pub services: Vec<String>,
}

impl From<&ChatConfig> for AdvisorProfile {
    fn from(chat: &ChatConfig) -> Self {
        Self {
            name: chat.advisor_name.clone(),
            owner: chat.owner_name.clone(),
            skills: chat.skills.clone(),
            services: chat.services.clone(),
        }
    }
}

#[derive(Serialize)]
struct FormulaLine {
    label: &'static str,
    rule: String,
}

/// Rendered once per runtime; the table never changes after startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemInstructions {
    text: String,
}

impl SystemInstructions {
    pub fn render(table: &PricingTable, profile: &AdvisorProfile, usd_rate: Decimal) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, SYSTEM_TEMPLATE)
            .context("failed to compile system instructions template")?;

        let formatter = CurrencyFormatter::new(usd_rate);
        let mut context = TeraContext::new();
        context.insert("advisor", &profile.name);
        context.insert("owner", &profile.owner);
        context.insert("skills", &profile.skills.join(", "));
        context.insert("services", &profile.services.join(", "));
        context.insert("formula", &formula_lines(table));
        context.insert("keys", &key_reference());
        context.insert("usd_rate", &formatter.usd_rate().normalize().to_string());
        context.insert("pricing_sentinel", PRICING_SENTINEL);
        context.insert("patch_sentinel", PATCH_SENTINEL);
        context.insert("calculating_sentinel", CALCULATING_SENTINEL);

        let text = tera
            .render(TEMPLATE_NAME, &context)
            .context("failed to render system instructions")?;
        Ok(Self { text })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

fn amount(value: Decimal) -> String {
    CurrencyFormatter::default()
        .format(value, Currency::Ngn)
        .trim_start_matches('₦')
        .to_string()
}

fn formula_lines(table: &PricingTable) -> Vec<FormulaLine> {
    vec![
        FormulaLine {
            label: "Base Fee",
            rule: format!("{} (This is always included)", amount(table.base_fee)),
        },
        FormulaLine {
            label: "Design Tier Cost",
            rule: format!("{} * the selected tier (1, 2, 3, or 4)", amount(table.design_unit)),
        },
        FormulaLine {
            label: "Standard Pages Cost",
            rule: format!("{} * number of pages", amount(table.standard_page)),
        },
        FormulaLine {
            label: "Complex Pages Cost",
            rule: format!("{} * number of pages", amount(table.complex_page)),
        },
        FormulaLine {
            label: "System Pages Cost",
            rule: format!("{} * number of pages", amount(table.system_page)),
        },
        FormulaLine {
            label: "CMS Cost",
            rule: format!(
                "{} for None, {} for Headless, {} for Traditional",
                amount(table.cms_price(CmsTier::None)),
                amount(table.cms_price(CmsTier::Headless)),
                amount(table.cms_price(CmsTier::Traditional)),
            ),
        },
        FormulaLine {
            label: "E-commerce Cost",
            rule: format!(
                "{} base fee (only if products > 0) PLUS {} * number of products",
                amount(table.ecommerce_base),
                amount(table.per_product),
            ),
        },
        FormulaLine {
            label: "User Authentication Cost",
            rule: format!("{} (if selected)", amount(table.user_auth)),
        },
        FormulaLine {
            label: "Payment Gateway Cost",
            rule: format!("{} (if selected)", amount(table.payment_gateway)),
        },
        FormulaLine {
            label: "API Integrations Cost",
            rule: format!("{} * number of integrations", amount(table.per_api)),
        },
    ]
}

fn key_reference() -> String {
    SelectionField::ALL
        .iter()
        .map(|field| {
            let kind = match field {
                SelectionField::CmsType => {
                    let values: Vec<String> = CmsTier::ALL
                        .iter()
                        .map(|tier| format!("\"{}\"", tier.wire_value()))
                        .collect();
                    format!("string: {}", values.join(", "))
                }
                SelectionField::UserAuth | SelectionField::PaymentGateway => "boolean".to_string(),
                _ => "number".to_string(),
            };
            format!("\"{}\"({kind})", field.wire_name())
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use scopewise_core::pricing::PricingTable;

    use super::{AdvisorProfile, SystemInstructions};

    fn profile() -> AdvisorProfile {
        AdvisorProfile {
            name: "Amir".to_string(),
            owner: "Yusuf".to_string(),
            skills: vec!["React".to_string(), "Next.js".to_string()],
            services: vec!["App Development".to_string()],
        }
    }

    #[test]
    fn renders_persona_and_directive_grammar() {
        let rendered =
            SystemInstructions::render(&PricingTable::default(), &profile(), Decimal::from(1550))
                .expect("render");
        let text = rendered.as_str();

        assert!(text.starts_with("You are 'Amir', a friendly and helpful AI assistant for Yusuf's"));
        assert!(text.contains("- Yusuf's skills: React, Next.js."));
        assert!(text.contains("`[ACTION:PRICING]`"));
        assert!(text.contains("[CALCULATOR_JSON]:{\"designTier\":2"));
        assert!(text.contains("`[ACTION:CALCULATING]`"));
        assert!(text.contains("<internal_monologue>"));
        assert!(text.contains("1 USD = 1550 NGN"));
        assert!(text.contains("\"cmsType\"(string: \"0\", \"100000\", \"250000\")"));
    }

    #[test]
    fn formula_follows_the_loaded_table() {
        let mut table = PricingTable::default();
        table.base_fee = Decimal::from(300_000);
        table.per_api = Decimal::from(80_000);

        let rendered =
            SystemInstructions::render(&table, &profile(), Decimal::from(1600)).expect("render");
        let text = rendered.as_str();

        assert!(text.contains("- **Base Fee**: 300,000 (This is always included)"));
        assert!(text.contains("- **API Integrations Cost**: 80,000 * number of integrations"));
        assert!(text.contains("- **CMS Cost**: 0 for None, 100,000 for Headless, 250,000 for Traditional"));
        assert!(text.contains("1 USD = 1600 NGN"));
    }
}
