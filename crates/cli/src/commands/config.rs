use std::env;
use std::fs;
use std::path::Path;

use scopewise_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

struct Field {
    key: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }
    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let llm_api_key = match &config.llm.api_key {
        Some(key) => redact_token(key.expose_secret()),
        None => "<unset>".to_string(),
    };

    vec![
        field("llm.provider", &["SCOPEWISE_LLM_PROVIDER"], format!("{:?}", config.llm.provider)),
        field("llm.api_key", &["SCOPEWISE_LLM_API_KEY"], llm_api_key),
        field(
            "llm.base_url",
            &["SCOPEWISE_LLM_BASE_URL"],
            config.llm.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
        ),
        field("llm.model", &["SCOPEWISE_LLM_MODEL"], config.llm.model.clone()),
        field("llm.temperature", &["SCOPEWISE_LLM_TEMPERATURE"], config.llm.temperature.to_string()),
        field("llm.top_p", &["SCOPEWISE_LLM_TOP_P"], config.llm.top_p.to_string()),
        field("llm.max_tokens", &["SCOPEWISE_LLM_MAX_TOKENS"], config.llm.max_tokens.to_string()),
        field(
            "llm.timeout_secs",
            &["SCOPEWISE_LLM_TIMEOUT_SECS"],
            config.llm.timeout_secs.to_string(),
        ),
        field(
            "llm.max_retries",
            &["SCOPEWISE_LLM_MAX_RETRIES"],
            config.llm.max_retries.to_string(),
        ),
        field(
            "server.bind_address",
            &["SCOPEWISE_SERVER_BIND_ADDRESS"],
            config.server.bind_address.clone(),
        ),
        field("server.port", &["SCOPEWISE_SERVER_PORT"], config.server.port.to_string()),
        field(
            "server.graceful_shutdown_secs",
            &["SCOPEWISE_SERVER_GRACEFUL_SHUTDOWN_SECS"],
            config.server.graceful_shutdown_secs.to_string(),
        ),
        field(
            "server.session_idle_secs",
            &["SCOPEWISE_SERVER_SESSION_IDLE_SECS"],
            config.server.session_idle_secs.to_string(),
        ),
        field(
            "server.max_sessions",
            &["SCOPEWISE_SERVER_MAX_SESSIONS"],
            config.server.max_sessions.to_string(),
        ),
        field(
            "chat.advisor_name",
            &["SCOPEWISE_CHAT_ADVISOR_NAME"],
            config.chat.advisor_name.clone(),
        ),
        field("chat.owner_name", &["SCOPEWISE_CHAT_OWNER_NAME"], config.chat.owner_name.clone()),
        field(
            "chat.calculating_min_ms",
            &["SCOPEWISE_CHAT_CALCULATING_MIN_MS"],
            config.chat.calculating_min_ms.to_string(),
        ),
        field(
            "chat.calculating_max_ms",
            &["SCOPEWISE_CHAT_CALCULATING_MAX_MS"],
            config.chat.calculating_max_ms.to_string(),
        ),
        field("pricing.usd_rate", &["SCOPEWISE_PRICING_USD_RATE"], config.pricing.usd_rate.to_string()),
        field(
            "pricing.base_fee",
            &[],
            config.pricing.table.base_fee.to_string(),
        ),
        field(
            "logging.level",
            &["SCOPEWISE_LOGGING_LEVEL", "SCOPEWISE_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        field(
            "logging.format",
            &["SCOPEWISE_LOGGING_FORMAT", "SCOPEWISE_LOG_FORMAT"],
            format!("{:?}", config.logging.format),
        ),
    ]
}

fn field(key: &'static str, env_keys: &'static [&'static str], value: String) -> Field {
    Field { key, env_keys, value }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps a provider prefix such as `sk-` and hides the rest.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::{contains_path, redact_token};

    #[test]
    fn redaction_keeps_only_the_prefix() {
        assert_eq!(redact_token("sk-live-abcdef"), "sk-***");
        assert_eq!(redact_token("opaque"), "<redacted>");
        assert_eq!(redact_token("  "), "<empty>");
    }

    #[test]
    fn nested_keys_are_found_in_file_doc() {
        let doc = "[pricing]\nbase_fee = 300000\n".parse::<Value>().expect("toml");
        assert!(contains_path(&doc, "pricing.base_fee"));
        assert!(!contains_path(&doc, "pricing.per_api"));
    }
}
