use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Result;
use scopewise_agent::conversation::{ChatMessage, MessageAction};
use scopewise_agent::llm::OpenAiCompatibleClient;
use scopewise_agent::runtime::{
    AgentRuntime, ChatSession, PricingChoice, SubmitError, TurnOutcome, UiEffect,
};
use scopewise_core::domain::selections::{SelectionField, Selections, SelectionsPatch};
use scopewise_core::pricing::currency::Currency;
use scopewise_core::pricing::QuoteEngine;
use serde_json::{Map, Value};

use crate::commands::{load_config, CommandResult, EXIT_CONFIG, EXIT_RUNTIME};

const HELP: &str = "commands: /quote [usd], /set field=value ..., /discuss [usd], /calculator, /assist, /transcript, /quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub turns: usize,
    pub selections: Selections,
}

pub fn run() -> CommandResult {
    let config = match load_config("chat") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let client = match OpenAiCompatibleClient::from_config(&config.llm) {
        Ok(client) => client,
        Err(error) => {
            return CommandResult::failure("chat", "llm_client", format!("{error:#}"), EXIT_CONFIG)
        }
    };
    let runtime = match AgentRuntime::from_config(&config, Arc::new(client)) {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure("chat", "runtime", format!("{error:#}"), EXIT_RUNTIME)
        }
    };
    let executor = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(executor) => executor,
        Err(error) => {
            return CommandResult::failure("chat", "runtime", error.to_string(), EXIT_RUNTIME)
        }
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    match executor.block_on(run_session(&runtime, stdin.lock(), &mut stdout)) {
        Ok(summary) => CommandResult::success(
            "chat",
            format!("chat ended after {} turn(s)", summary.turns),
        ),
        Err(error) => CommandResult::failure("chat", "io", format!("{error:#}"), EXIT_RUNTIME),
    }
}

/// Line-oriented chat loop. Lines starting with `/` are local commands,
/// anything else goes to the advisor.
pub async fn run_session<R, W>(runtime: &AgentRuntime, input: R, output: &mut W) -> Result<SessionSummary>
where
    R: BufRead,
    W: Write,
{
    let session = ChatSession::default();
    let mut turns = 0;
    for message in runtime.open(&session) {
        print_message(runtime, output, &message)?;
    }
    writeln!(output, "{HELP}")?;

    for line in input.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let mut words = trimmed.split_whitespace();
        let outcome = match words.next().unwrap_or_default() {
            "/quit" | "/exit" => break,
            "/help" => {
                writeln!(output, "{HELP}")?;
                continue;
            }
            "/quote" => {
                print_total(runtime, &session, output, currency_arg(words.next()))?;
                continue;
            }
            "/transcript" => {
                writeln!(output, "{}", session.transcript().to_plain_text(runtime.advisor_name()))?;
                continue;
            }
            "/set" => {
                apply_edit(runtime, &session, output, words.collect())?;
                continue;
            }
            "/discuss" => runtime.discuss_estimate(&session, currency_arg(words.next())).await,
            "/calculator" => {
                runtime.choose_pricing_option(&session, PricingChoice::Calculator).await
            }
            "/assist" => runtime.choose_pricing_option(&session, PricingChoice::Assist).await,
            _ => runtime.submit(&session, trimmed).await,
        };

        match outcome {
            Ok(outcome) => {
                turns += 1;
                print_outcome(runtime, &session, output, &outcome)?;
            }
            Err(SubmitError::EmptyMessage) => continue,
            Err(error @ SubmitError::Busy) => writeln!(output, "! {error}")?,
        }
    }

    Ok(SessionSummary { turns, selections: session.store().selections() })
}

fn currency_arg(raw: Option<&str>) -> Currency {
    raw.and_then(|value| value.parse::<Currency>().ok()).unwrap_or_default()
}

fn print_message<W: Write>(runtime: &AgentRuntime, output: &mut W, message: &ChatMessage) -> Result<()> {
    writeln!(output, "{}: {}", runtime.advisor_name(), message.text)?;
    if message.action == Some(MessageAction::PricingChoice) {
        writeln!(output, "  (reply /calculator to open the estimator or /assist for help)")?;
    }
    Ok(())
}

fn print_outcome<W: Write>(
    runtime: &AgentRuntime,
    session: &ChatSession,
    output: &mut W,
    outcome: &TurnOutcome,
) -> Result<()> {
    if let Some(reply) = &outcome.reply {
        print_message(runtime, output, reply)?;
    }
    for effect in &outcome.effects {
        match effect {
            UiEffect::HighlightFields(fields) if !fields.is_empty() => {
                let names: Vec<&str> = fields.iter().map(SelectionField::wire_name).collect();
                writeln!(output, "  [estimator] updated: {}", names.join(", "))?;
                print_total(runtime, session, output, Currency::Ngn)?;
            }
            UiEffect::CloseChat => writeln!(output, "  [estimator] opened; use /set to adjust")?,
            _ => {}
        }
    }
    if let Some(check) = &outcome.budget_check {
        let formatter = runtime.formatter();
        if check.within_budget {
            writeln!(
                output,
                "  [budget] fits within {}",
                formatter.format(check.budget, Currency::Ngn)
            )?;
        } else {
            writeln!(
                output,
                "  [budget] over {} by {}",
                formatter.format(check.budget, Currency::Ngn),
                formatter.format(check.overrun, Currency::Ngn)
            )?;
        }
    }
    Ok(())
}

fn print_total<W: Write>(
    runtime: &AgentRuntime,
    session: &ChatSession,
    output: &mut W,
    currency: Currency,
) -> Result<()> {
    let total = runtime.engine().quote(&session.store().selections()).total;
    writeln!(output, "  [estimator] total {}", runtime.formatter().format(total, currency))?;
    Ok(())
}

/// `/set designTier=2 userAuth=true cmsType=100000`
fn apply_edit<W: Write>(
    runtime: &AgentRuntime,
    session: &ChatSession,
    output: &mut W,
    assignments: Vec<&str>,
) -> Result<()> {
    let mut fields = Map::new();
    for assignment in assignments {
        let Some((key, raw)) = assignment.split_once('=') else {
            writeln!(output, "! expected field=value, got `{assignment}`")?;
            return Ok(());
        };
        let value = if key == SelectionField::CmsType.wire_name() {
            Value::String(raw.to_string())
        } else {
            serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
        };
        fields.insert(key.to_string(), value);
    }

    let edit = match serde_json::from_value::<SelectionsPatch>(Value::Object(fields)) {
        Ok(edit) => edit,
        Err(error) => {
            writeln!(output, "! {error}")?;
            return Ok(());
        }
    };
    match session.store().update(&edit) {
        Ok(_) => print_total(runtime, session, output, Currency::Ngn),
        Err(error) => {
            writeln!(output, "! {error}")?;
            Ok(())
        }
    }
}
