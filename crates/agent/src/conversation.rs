use std::collections::HashMap;

use anyhow::{Context as _, Result};
use rust_decimal::Decimal;
use scopewise_core::pricing::currency::{Currency, CurrencyFormatter};
use serde::{Deserialize, Serialize};
use tera::{Context, Tera};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Agent,
}

/// Interface affordance attached to an agent message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageAction {
    /// Offer "open the estimator" vs "assist me here".
    PricingChoice,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<MessageAction>,
    #[serde(default)]
    pub show_estimator_cta: bool,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: ChatRole::User, text: text.into(), action: None, show_estimator_cta: false }
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self { role: ChatRole::Agent, text: text.into(), action: None, show_estimator_cta: false }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Owned copy of the messages, used as completion history.
    pub fn history(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drops every message still offering the pricing choice. Returns whether
    /// anything was removed.
    pub fn remove_pending_pricing_choice(&mut self) -> bool {
        let before = self.messages.len();
        self.messages.retain(|message| message.action != Some(MessageAction::PricingChoice));
        self.messages.len() != before
    }

    pub fn to_plain_text(&self, advisor: &str) -> String {
        self.messages
            .iter()
            .map(|message| format!("{}: {}", sender_label(message.role, advisor), message.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn to_print_html(&self, advisor: &str) -> Result<String> {
        let mut tera = Tera::default();
        register_template_filters(&mut tera);
        tera.add_raw_template(PRINT_TEMPLATE_NAME, PRINT_TEMPLATE)
            .context("transcript print template failed to compile")?;

        let entries = self
            .messages
            .iter()
            .map(|message| PrintEntry {
                sender: sender_label(message.role, advisor).to_string(),
                class: match message.role {
                    ChatRole::User => "user-message",
                    ChatRole::Agent => "model-message",
                },
                text: message.text.clone(),
            })
            .collect::<Vec<_>>();

        let mut context = Context::new();
        context.insert("advisor", advisor);
        context.insert("messages", &entries);
        tera.render(PRINT_TEMPLATE_NAME, &context).context("transcript print rendering failed")
    }
}

pub fn download_file_name(advisor: &str) -> String {
    let slug = advisor
        .trim()
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch.to_ascii_lowercase() } else { '-' })
        .collect::<String>();
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "chat-transcript.txt".to_string()
    } else {
        format!("chat-with-{slug}.txt")
    }
}

fn sender_label(role: ChatRole, advisor: &str) -> &str {
    match role {
        ChatRole::User => "You",
        ChatRole::Agent => advisor,
    }
}

#[derive(Serialize)]
struct PrintEntry {
    sender: String,
    class: &'static str,
    text: String,
}

const PRINT_TEMPLATE_NAME: &str = "transcript_print.html";

const PRINT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <title>Chat with {{ advisor }}</title>
    <style>
      @media print { body { -webkit-print-color-adjust: exact; } }
      body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Helvetica, Arial, sans-serif; line-height: 1.6; color: #333; padding: 1rem; }
      h1 { color: #111; }
      .user-message, .model-message { margin-bottom: 1rem; padding: 0.75rem 1rem; border-radius: 12px; max-width: 80%; word-wrap: break-word; }
      .user-message { background-color: #dbeafe; margin-left: auto; border-bottom-right-radius: 4px; }
      .model-message { background-color: #e5e7eb; border-bottom-left-radius: 4px; }
      p { margin: 0.25rem 0 0; white-space: pre-wrap; }
      strong { display: block; margin-bottom: 4px; }
    </style>
  </head>
  <body>
    <h1>Chat with {{ advisor }}</h1>
    <div>{% for message in messages %}<div class="{{ message.class }}"><strong>{{ message.sender }}:</strong> <p>{{ message.text | transcript_text | safe }}</p></div>{% endfor %}</div>
    <script>
      window.onload = function() {
        window.print();
        window.close();
      }
    </script>
  </body>
</html>
"#;

/// Register custom Tera filters used by the transcript print template.
pub fn register_template_filters(tera: &mut Tera) {
    tera.register_filter("transcript_text", tera_transcript_text_filter);
}

/// Escapes markup and turns newlines into `<br>`.
fn tera_transcript_text_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let text = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("transcript_text filter expects a string input"))?;
    Ok(tera::Value::String(tera::escape_html(text).replace('\n', "<br>")))
}

const BUDGET_KEYWORDS: [&str; 4] = ["budget", "cost", "alternative", "suggest"];
const BUDGET_CONTEXT: [&str; 10] =
    ["budget", "under", "below", "max", "around", "about", "within", "is", "of", "spend"];

/// A user prompt that asks for a budget-driven suggestion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetIntent {
    pub prompt: String,
    /// Stated budget converted to NGN, when one could be read.
    pub budget_ngn: Option<Decimal>,
    pub stated_currency: Option<Currency>,
}

#[derive(Clone, Debug, Default)]
pub struct BudgetIntentDetector {
    formatter: CurrencyFormatter,
}

impl BudgetIntentDetector {
    pub fn new(formatter: CurrencyFormatter) -> Self {
        Self { formatter }
    }

    /// `None` when the prompt mentions none of the budget keywords.
    pub fn detect(&self, text: &str) -> Option<BudgetIntent> {
        let normalized_text = text.to_lowercase();
        if !BUDGET_KEYWORDS.iter().any(|keyword| normalized_text.contains(keyword)) {
            return None;
        }

        let tokens = tokenize(&normalized_text);
        let amount = extract_budget(&tokens);
        let budget_ngn = amount.and_then(|(value, currency)| match currency {
            Currency::Ngn => Some(value),
            Currency::Usd => value.checked_mul(self.formatter.usd_rate()),
        });

        Some(BudgetIntent {
            prompt: text.to_string(),
            budget_ngn,
            stated_currency: amount.map(|(_, currency)| currency),
        })
    }
}

fn tokenize(text: &str) -> Vec<String> {
    let mut sanitized = String::with_capacity(text.len());
    for character in text.chars() {
        if character.is_alphanumeric() || matches!(character, '$' | '₦' | '.' | ',') {
            sanitized.push(character);
        } else {
            sanitized.push(' ');
        }
    }
    sanitized.split_whitespace().map(|token| token.to_string()).collect()
}

fn extract_budget(tokens: &[String]) -> Option<(Decimal, Currency)> {
    for (index, token) in tokens.iter().enumerate() {
        let Some(money) = parse_money_token(token) else {
            continue;
        };
        let in_context = index > 0 && BUDGET_CONTEXT.contains(&tokens[index - 1].as_str());
        let currency = money.symbol.or_else(|| {
            tokens.get(index + 1).and_then(|next| currency_word(next.trim_end_matches(['.', ','])))
        });

        // Bare small numbers ("3 pages") are counts, not budgets.
        let plausible = money.symbol.is_some()
            || money.scaled
            || currency.is_some()
            || (in_context && money.amount >= Decimal::from(1_000));
        if plausible {
            return Some((money.amount, currency.unwrap_or(Currency::Ngn)));
        }
    }
    None
}

struct MoneyToken {
    amount: Decimal,
    symbol: Option<Currency>,
    scaled: bool,
}

fn parse_money_token(token: &str) -> Option<MoneyToken> {
    let (symbol, rest) = if let Some(rest) = token.strip_prefix('$') {
        (Some(Currency::Usd), rest)
    } else if let Some(rest) = token.strip_prefix('₦') {
        (Some(Currency::Ngn), rest)
    } else {
        (None, token)
    };
    let trimmed = rest.trim_end_matches(['.', ',']).replace(',', "");
    if trimmed.is_empty() {
        return None;
    }

    let (number_part, multiplier, scaled) = if let Some(prefix) = trimmed.strip_suffix('k') {
        (prefix, Decimal::from(1_000), true)
    } else if let Some(prefix) = trimmed.strip_suffix('m') {
        (prefix, Decimal::from(1_000_000), true)
    } else {
        (trimmed.as_str(), Decimal::ONE, false)
    };

    let amount = number_part.parse::<Decimal>().ok()?;
    if amount.is_sign_negative() {
        return None;
    }
    Some(MoneyToken { amount: amount.checked_mul(multiplier)?, symbol, scaled })
}

fn currency_word(token: &str) -> Option<Currency> {
    match token {
        "naira" | "ngn" => Some(Currency::Ngn),
        "usd" | "dollars" | "dollar" => Some(Currency::Usd),
        _ => None,
    }
}
