use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pricing::currency::DEFAULT_USD_RATE;
use crate::pricing::PricingTable;

pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["scopewise.toml", "config/scopewise.toml"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub chat: ChatConfig,
    pub pricing: PricingConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
    /// Sessions untouched for this long are dropped on the next create.
    pub session_idle_secs: u64,
    pub max_sessions: u32,
}

#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub advisor_name: String,
    pub owner_name: String,
    pub skills: Vec<String>,
    pub services: Vec<String>,
    pub calculating_min_ms: u64,
    pub calculating_max_ms: u64,
}

#[derive(Clone, Debug)]
pub struct PricingConfig {
    pub table: PricingTable,
    /// NGN per USD, display only.
    pub usd_rate: Decimal,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    /// Any endpoint speaking the OpenAI chat-completions wire format.
    #[serde(rename = "openai_compatible", alias = "openai")]
    OpenAiCompatible,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_base_url: Option<String>,
    pub server_port: Option<u16>,
    pub usd_rate: Option<Decimal>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: Some("http://localhost:11434/v1".to_string()),
                model: "llama3.1".to_string(),
                temperature: 0.2,
                top_p: 0.8,
                max_tokens: 4096,
                timeout_secs: 60,
                max_retries: 2,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
                session_idle_secs: 3600,
                max_sessions: 1000,
            },
            chat: ChatConfig {
                advisor_name: "Amir".to_string(),
                owner_name: "Yusuf".to_string(),
                skills: [
                    "React",
                    "Next.js",
                    "TypeScript",
                    "Tailwind CSS",
                    "Node.js",
                    "Vercel",
                    "Docker",
                ]
                .map(str::to_string)
                .to_vec(),
                services: ["App Development", "Frontend Development", "eCommerce solutions"]
                    .map(str::to_string)
                    .to_vec(),
                calculating_min_ms: 2000,
                calculating_max_ms: 3000,
            },
            pricing: PricingConfig {
                table: PricingTable::default(),
                usd_rate: Decimal::from(DEFAULT_USD_RATE),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai_compatible" | "openai" => Ok(Self::OpenAiCompatible),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai_compatible|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(top_p) = llm.top_p {
                self.llm.top_p = top_p;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
            if let Some(session_idle_secs) = server.session_idle_secs {
                self.server.session_idle_secs = session_idle_secs;
            }
            if let Some(max_sessions) = server.max_sessions {
                self.server.max_sessions = max_sessions;
            }
        }

        if let Some(chat) = patch.chat {
            if let Some(advisor_name) = chat.advisor_name {
                self.chat.advisor_name = advisor_name;
            }
            if let Some(owner_name) = chat.owner_name {
                self.chat.owner_name = owner_name;
            }
            if let Some(skills) = chat.skills {
                self.chat.skills = skills;
            }
            if let Some(services) = chat.services {
                self.chat.services = services;
            }
            if let Some(calculating_min_ms) = chat.calculating_min_ms {
                self.chat.calculating_min_ms = calculating_min_ms;
            }
            if let Some(calculating_max_ms) = chat.calculating_max_ms {
                self.chat.calculating_max_ms = calculating_max_ms;
            }
        }

        if let Some(pricing) = patch.pricing {
            pricing.apply_to(&mut self.pricing);
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SCOPEWISE_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("SCOPEWISE_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("SCOPEWISE_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("SCOPEWISE_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("SCOPEWISE_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("SCOPEWISE_LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("SCOPEWISE_LLM_TOP_P") {
            self.llm.top_p = parse_f32("SCOPEWISE_LLM_TOP_P", &value)?;
        }
        if let Some(value) = read_env("SCOPEWISE_LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse_u32("SCOPEWISE_LLM_MAX_TOKENS", &value)?;
        }
        if let Some(value) = read_env("SCOPEWISE_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("SCOPEWISE_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("SCOPEWISE_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("SCOPEWISE_LLM_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("SCOPEWISE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SCOPEWISE_SERVER_PORT") {
            self.server.port = parse_u16("SCOPEWISE_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("SCOPEWISE_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("SCOPEWISE_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }
        if let Some(value) = read_env("SCOPEWISE_SERVER_SESSION_IDLE_SECS") {
            self.server.session_idle_secs =
                parse_u64("SCOPEWISE_SERVER_SESSION_IDLE_SECS", &value)?;
        }
        if let Some(value) = read_env("SCOPEWISE_SERVER_MAX_SESSIONS") {
            self.server.max_sessions = parse_u32("SCOPEWISE_SERVER_MAX_SESSIONS", &value)?;
        }

        if let Some(value) = read_env("SCOPEWISE_CHAT_ADVISOR_NAME") {
            self.chat.advisor_name = value;
        }
        if let Some(value) = read_env("SCOPEWISE_CHAT_OWNER_NAME") {
            self.chat.owner_name = value;
        }
        if let Some(value) = read_env("SCOPEWISE_CHAT_CALCULATING_MIN_MS") {
            self.chat.calculating_min_ms = parse_u64("SCOPEWISE_CHAT_CALCULATING_MIN_MS", &value)?;
        }
        if let Some(value) = read_env("SCOPEWISE_CHAT_CALCULATING_MAX_MS") {
            self.chat.calculating_max_ms = parse_u64("SCOPEWISE_CHAT_CALCULATING_MAX_MS", &value)?;
        }

        if let Some(value) = read_env("SCOPEWISE_PRICING_USD_RATE") {
            self.pricing.usd_rate = parse_decimal("SCOPEWISE_PRICING_USD_RATE", &value)?;
        }

        let log_level =
            read_env("SCOPEWISE_LOGGING_LEVEL").or_else(|| read_env("SCOPEWISE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SCOPEWISE_LOGGING_FORMAT").or_else(|| read_env("SCOPEWISE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = Some(llm_base_url);
        }
        if let Some(server_port) = overrides.server_port {
            self.server.port = server_port;
        }
        if let Some(usd_rate) = overrides.usd_rate {
            self.pricing.usd_rate = usd_rate;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_server(&self.server)?;
        validate_chat(&self.chat)?;
        validate_pricing(&self.pricing)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// Config file that `AppConfig::load` would read, if any.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    DEFAULT_CONFIG_FILES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }
    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }
    if llm.top_p <= 0.0 || llm.top_p > 1.0 {
        return Err(ConfigError::Validation("llm.top_p must be in range (0.0, 1.0]".to_string()));
    }
    if llm.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm.max_tokens must be greater than zero".to_string(),
        ));
    }

    let base_url = llm.base_url.as_deref().map(str::trim).unwrap_or_default();
    if base_url.is_empty() {
        return Err(ConfigError::Validation(
            "llm.base_url is required (e.g. `http://localhost:11434/v1` for ollama)".to_string(),
        ));
    }
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "llm.base_url must start with http:// or https://".to_string(),
        ));
    }

    if llm.provider == LlmProvider::OpenAiCompatible {
        let missing = llm
            .api_key
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if missing {
            return Err(ConfigError::Validation(
                "llm.api_key is required for the openai_compatible provider (set SCOPEWISE_LLM_API_KEY)"
                    .to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    if server.session_idle_secs == 0 || server.max_sessions == 0 {
        return Err(ConfigError::Validation(
            "server.session_idle_secs and server.max_sessions must be greater than zero"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_chat(chat: &ChatConfig) -> Result<(), ConfigError> {
    if chat.advisor_name.trim().is_empty() || chat.owner_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "chat.advisor_name and chat.owner_name must not be empty".to_string(),
        ));
    }
    if chat.calculating_min_ms > chat.calculating_max_ms {
        return Err(ConfigError::Validation(format!(
            "chat.calculating_min_ms ({}) must not exceed chat.calculating_max_ms ({})",
            chat.calculating_min_ms, chat.calculating_max_ms
        )));
    }
    if chat.calculating_max_ms > 60_000 {
        return Err(ConfigError::Validation(
            "chat.calculating_max_ms must be at most 60000".to_string(),
        ));
    }
    Ok(())
}

fn validate_pricing(pricing: &PricingConfig) -> Result<(), ConfigError> {
    if pricing.usd_rate <= Decimal::ZERO {
        return Err(ConfigError::Validation(
            "pricing.usd_rate must be greater than zero".to_string(),
        ));
    }
    pricing.table.validate().map_err(|error| ConfigError::Validation(error.to_string()))
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| invalid_override(key, value))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.trim().parse::<f32>().map_err(|_| invalid_override(key, value))
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.trim().parse::<Decimal>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    server: Option<ServerPatch>,
    chat: Option<ChatPatch>,
    pricing: Option<PricingPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    top_p: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
    session_idle_secs: Option<u64>,
    max_sessions: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatPatch {
    advisor_name: Option<String>,
    owner_name: Option<String>,
    skills: Option<Vec<String>>,
    services: Option<Vec<String>>,
    calculating_min_ms: Option<u64>,
    calculating_max_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PricingPatch {
    usd_rate: Option<Decimal>,
    base_fee: Option<Decimal>,
    design_unit: Option<Decimal>,
    standard_page: Option<Decimal>,
    complex_page: Option<Decimal>,
    system_page: Option<Decimal>,
    ecommerce_base: Option<Decimal>,
    per_product: Option<Decimal>,
    user_auth: Option<Decimal>,
    payment_gateway: Option<Decimal>,
    per_api: Option<Decimal>,
    cms: Option<CmsPatch>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CmsPatch {
    none: Option<Decimal>,
    headless: Option<Decimal>,
    traditional: Option<Decimal>,
}

impl PricingPatch {
    fn apply_to(self, pricing: &mut PricingConfig) {
        let table = &mut pricing.table;
        let slots = [
            (self.base_fee, &mut table.base_fee),
            (self.design_unit, &mut table.design_unit),
            (self.standard_page, &mut table.standard_page),
            (self.complex_page, &mut table.complex_page),
            (self.system_page, &mut table.system_page),
            (self.ecommerce_base, &mut table.ecommerce_base),
            (self.per_product, &mut table.per_product),
            (self.user_auth, &mut table.user_auth),
            (self.payment_gateway, &mut table.payment_gateway),
            (self.per_api, &mut table.per_api),
        ];
        for (value, slot) in slots {
            if let Some(value) = value {
                *slot = value;
            }
        }

        if let Some(cms) = self.cms {
            if let Some(none) = cms.none {
                table.cms.none = none;
            }
            if let Some(headless) = cms.headless {
                table.cms.headless = headless;
            }
            if let Some(traditional) = cms.traditional {
                table.cms.traditional = traditional;
            }
        }

        if let Some(usd_rate) = self.usd_rate {
            pricing.usd_rate = usd_rate;
        }
    }
}
