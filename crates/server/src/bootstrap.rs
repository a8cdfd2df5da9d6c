use std::sync::Arc;

use scopewise_agent::llm::{LlmClient, OpenAiCompatibleClient};
use scopewise_agent::runtime::AgentRuntime;
use scopewise_core::config::{AppConfig, ConfigError, LoadOptions};
use thiserror::Error;
use tracing::info;

use crate::sessions::{SessionLimits, SessionRegistry};

pub struct Application {
    pub config: AppConfig,
    pub runtime: Arc<AgentRuntime>,
    pub sessions: SessionRegistry,
    pub llm_endpoint: String,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("llm client initialization failed: {0}")]
    LlmClient(anyhow::Error),
    #[error("agent runtime initialization failed: {0}")]
    Runtime(anyhow::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        provider = ?config.llm.provider,
        model = %config.llm.model,
        "starting application bootstrap"
    );
    let client = OpenAiCompatibleClient::from_config(&config.llm).map_err(BootstrapError::LlmClient)?;
    let llm_endpoint = client.endpoint().to_string();
    bootstrap_with_client(config, Arc::new(client), llm_endpoint)
}

/// Wires an already built completion client; tests pass a scripted one.
pub fn bootstrap_with_client(
    config: AppConfig,
    client: Arc<dyn LlmClient>,
    llm_endpoint: String,
) -> Result<Application, BootstrapError> {
    let runtime = AgentRuntime::from_config(&config, client).map_err(BootstrapError::Runtime)?;
    info!(
        event_name = "system.bootstrap.runtime_ready",
        correlation_id = "bootstrap",
        llm_endpoint = %llm_endpoint,
        "agent runtime initialized"
    );

    let sessions = SessionRegistry::new(SessionLimits::from(&config.server));

    Ok(Application {
        config,
        runtime: Arc::new(runtime),
        sessions,
        llm_endpoint,
    })
}

#[cfg(test)]
mod tests {
    use scopewise_core::config::{ConfigOverrides, LlmProvider, LoadOptions};

    use crate::bootstrap::bootstrap;

    fn options(provider: LlmProvider) -> LoadOptions {
        LoadOptions {
            config_path: Some("does-not-exist.toml".into()),
            overrides: ConfigOverrides {
                llm_provider: Some(provider),
                llm_base_url: Some("http://localhost:11434/v1".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_hosted_api_key() {
        let result = bootstrap(options(LlmProvider::OpenAiCompatible)).await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("llm.api_key"), "unexpected error: {message}");
    }

    #[tokio::test]
    async fn bootstrap_wires_runtime_for_local_model() {
        let app = bootstrap(options(LlmProvider::Ollama)).await.expect("bootstrap");

        assert_eq!(app.llm_endpoint, "http://localhost:11434/v1/chat/completions");
        assert_eq!(app.sessions.len().await, 0);
        assert!(app.runtime.instructions().as_str().contains("[ACTION:PRICING]"));
    }
}
