use std::env;
use std::io::Cursor;
use std::sync::{Arc, Mutex, OnceLock};

use rust_decimal::Decimal;
use scopewise_agent::llm::ScriptedLlmClient;
use scopewise_agent::runtime::AgentRuntime;
use scopewise_cli::commands::selection::SelectionArgs;
use scopewise_cli::commands::{chat, config, fit, parse, prompt, quote};
use scopewise_core::config::AppConfig;
use scopewise_core::pricing::currency::Currency;
use serde_json::Value;

#[test]
fn quote_prices_default_selection() {
    with_env(&[], || {
        let result = quote::run(&SelectionArgs::default(), Currency::Ngn);
        assert_eq!(result.exit_code, 0, "expected successful quote: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "quote");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["total"], "425000");
        assert_eq!(payload["total_display"], "₦425,000");
        assert_eq!(payload["milestones"][0]["label"], "Initial Deposit (20%)");
        assert_eq!(payload["milestones"][0]["display"], "₦85,000");
    });
}

#[test]
fn quote_displays_dollars_at_configured_rate() {
    with_env(&[("SCOPEWISE_PRICING_USD_RATE", "1700")], || {
        let args = SelectionArgs { standard_pages: Some(0), ..SelectionArgs::default() };
        let result = quote::run(&args, Currency::Usd);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["total"], "350000");
        assert_eq!(payload["total_display"], "$205.88");
    });
}

#[test]
fn quote_rejects_out_of_range_selection() {
    with_env(&[], || {
        let args = SelectionArgs { design_tier: Some(5), ..SelectionArgs::default() };
        let result = quote::run(&args, Currency::Ngn);
        assert_eq!(result.exit_code, 3);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "invalid_selection");
    });
}

#[test]
fn quote_reports_config_failure() {
    with_env(&[("SCOPEWISE_LLM_PROVIDER", "openai_compatible")], || {
        let result = quote::run(&SelectionArgs::default(), Currency::Ngn);
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "config_validation");
        assert!(payload["message"].as_str().unwrap_or_default().contains("llm.api_key"));
    });
}

#[test]
fn fit_drops_integrations_first() {
    with_env(&[], || {
        let args = SelectionArgs { apis: Some(1), ..SelectionArgs::default() };
        let result = fit::run(&args, Decimal::from(450_000), Currency::Ngn);
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["original_total_display"], "₦525,000");
        assert_eq!(payload["total"], "425000");
        assert_eq!(payload["within_budget"], true);
        assert_eq!(payload["reduced"], serde_json::json!(["apis"]));
        assert_eq!(payload["selections"]["apis"], 0);
    });
}

#[test]
fn fit_rejects_non_positive_budget() {
    with_env(&[], || {
        let result = fit::run(&SelectionArgs::default(), Decimal::ZERO, Currency::Ngn);
        assert_eq!(result.exit_code, 3);
        assert_eq!(parse_payload(&result.output)["error_class"], "invalid_budget");
    });
}

#[test]
fn fit_rejects_budget_that_overflows_conversion() {
    with_env(&[], || {
        let result = fit::run(&SelectionArgs::default(), Decimal::MAX, Currency::Usd);
        assert_eq!(result.exit_code, 3);
        assert_eq!(parse_payload(&result.output)["error_class"], "invalid_budget");
    });
}

#[test]
fn parse_reports_patch_and_visible_text() {
    let result = parse::run(
        "<internal_monologue>thinking</internal_monologue>Here you go [CALCULATOR_JSON]:{\"designTier\":2,\"standardPages\":5} thanks!",
    );
    assert_eq!(result.exit_code, 0);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "parse");
    assert_eq!(payload["reply"]["text"], "Here you go thanks!");
    assert_eq!(payload["reply"]["patch"]["selections"]["designTier"], 2);
    assert_eq!(payload["reply"]["patch"]["selections"]["standardPages"], 5);
    assert_eq!(payload["reply"]["calculating"], false);
}

#[test]
fn parse_reports_malformed_payload_without_patch() {
    let result = parse::run("[CALCULATOR_JSON]:{oops}");

    let payload = parse_payload(&result.output);
    assert_eq!(payload["reply"]["patch"], Value::Null);
    assert_eq!(payload["reply"]["failure"]["kind"], "invalid_json");
}

#[test]
fn prompt_uses_configured_rate_and_advisor() {
    with_env(
        &[("SCOPEWISE_PRICING_USD_RATE", "1600"), ("SCOPEWISE_CHAT_ADVISOR_NAME", "Zainab")],
        || {
            let result = prompt::run(true);
            assert_eq!(result.exit_code, 0);
            assert!(result.output.starts_with("You are 'Zainab'"));
            assert!(result.output.contains("1 USD = 1600 NGN"));
        },
    );
}

#[test]
fn config_redacts_api_key_and_attributes_env() {
    with_env(
        &[
            ("SCOPEWISE_LLM_PROVIDER", "openai_compatible"),
            ("SCOPEWISE_LLM_API_KEY", "sk-very-secret"),
            ("SCOPEWISE_LLM_BASE_URL", "https://api.example.com/v1"),
        ],
        || {
            let output = config::run();
            assert!(output.contains("- llm.api_key = sk-*** (source: env (SCOPEWISE_LLM_API_KEY))"));
            assert!(!output.contains("very-secret"));
            assert!(output.contains("- llm.model = llama3.1 (source: default)"));
        },
    );
}

#[tokio::test]
async fn chat_session_applies_agent_patch_and_user_edits() {
    let client = Arc::new(ScriptedLlmClient::new([
        "[ACTION:PRICING]",
        "Sure. [CALCULATOR_JSON]:{\"designTier\":2,\"standardPages\":5}",
    ]));
    let mut app_config = AppConfig::default();
    app_config.chat.calculating_min_ms = 0;
    app_config.chat.calculating_max_ms = 0;
    let runtime = AgentRuntime::from_config(&app_config, client.clone()).expect("runtime");
    let input = Cursor::new(
        "How much would my site cost?\n/assist\n/set apis=1 userAuth=true\n/quote\n/quit\n",
    );
    let mut output = Vec::new();

    let summary = chat::run_session(&runtime, input, &mut output).await.expect("session");

    let transcript = String::from_utf8(output).expect("utf8");
    assert!(transcript.starts_with("Amir: Hi! I'm Amir"));
    assert!(transcript.contains("(reply /calculator to open the estimator or /assist for help)"));
    assert!(transcript.contains("[estimator] updated: designTier, standardPages"));
    assert!(transcript.contains("[estimator] total ₦575,000"));
    assert!(transcript.contains("[estimator] total ₦795,000"));
    assert_eq!(summary.turns, 2);
    assert_eq!(summary.selections.apis, 1);
    assert!(summary.selections.user_auth);
    assert_eq!(client.requests()[1].latest, "Please assist me here.");
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    let _guard = env_lock().lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let keys = [
        "SCOPEWISE_LLM_PROVIDER",
        "SCOPEWISE_LLM_API_KEY",
        "SCOPEWISE_LLM_BASE_URL",
        "SCOPEWISE_LLM_MODEL",
        "SCOPEWISE_LLM_TEMPERATURE",
        "SCOPEWISE_LLM_TOP_P",
        "SCOPEWISE_LLM_MAX_TOKENS",
        "SCOPEWISE_LLM_TIMEOUT_SECS",
        "SCOPEWISE_LLM_MAX_RETRIES",
        "SCOPEWISE_SERVER_BIND_ADDRESS",
        "SCOPEWISE_SERVER_PORT",
        "SCOPEWISE_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "SCOPEWISE_SERVER_SESSION_IDLE_SECS",
        "SCOPEWISE_SERVER_MAX_SESSIONS",
        "SCOPEWISE_CHAT_ADVISOR_NAME",
        "SCOPEWISE_CHAT_OWNER_NAME",
        "SCOPEWISE_CHAT_CALCULATING_MIN_MS",
        "SCOPEWISE_CHAT_CALCULATING_MAX_MS",
        "SCOPEWISE_PRICING_USD_RATE",
        "SCOPEWISE_LOGGING_LEVEL",
        "SCOPEWISE_LOGGING_FORMAT",
        "SCOPEWISE_LOG_LEVEL",
        "SCOPEWISE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
