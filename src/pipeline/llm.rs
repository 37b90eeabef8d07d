//! Completion backend: one prompt in, one completion text out.
//!
//! The interpreter only sees the [`CompletionModel`] trait. The production
//! implementation, [`ProviderModel`], sends a single user-role chat message
//! through an edgequake-llm provider; tests plug in scripted models through
//! [`crate::config::ExtractionConfig::completion_model`].

use crate::config::{ExtractionConfig, DEFAULT_PROVIDER};
use crate::error::{ModelError, ReportError};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// A text-generation backend.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Send `prompt` as the only user message and return the completion text.
    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;
}

/// [`CompletionModel`] backed by an edgequake-llm provider.
pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    api_timeout_secs: Option<u64>,
}

impl ProviderModel {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ExtractionConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
            api_timeout_secs: config.api_timeout_secs,
        }
    }
}

/// Build `CompletionOptions` from the extraction config.
fn build_options(config: &ExtractionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: config.max_tokens,
        ..Default::default()
    }
}

#[async_trait]
impl CompletionModel for ProviderModel {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let start = Instant::now();
        let messages = vec![ChatMessage::user(prompt)];

        let call = self.provider.chat(&messages, Some(&self.options));
        let result = match self.api_timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), call)
                .await
                .map_err(|_| ModelError::Timeout { secs })?,
            None => call.await,
        };

        let response = result.map_err(|e| ModelError::Api {
            message: e.to_string(),
        })?;

        debug!(
            "Completion: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(response.content)
    }
}

/// Resolve the completion backend for a run, from most-specific to
/// least-specific:
///
/// 1. **Pre-built completion model** (`config.completion_model`).
/// 2. **Pre-built provider** (`config.provider`).
/// 3. **Named provider** (`config.provider_name`) with `config.model` or
///    [`crate::config::DEFAULT_MODEL`]. The provider reads its own API key
///    from the environment.
/// 4. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`
///    (`config.model` still wins over `EDGEQUAKE_MODEL`).
/// 5. **OpenRouter** when `OPENROUTER_API_KEY` is set.
/// 6. **Full auto-detection** via [`ProviderFactory::from_env`].
pub fn resolve_completion_model(
    config: &ExtractionConfig,
) -> Result<Arc<dyn CompletionModel>, ReportError> {
    if let Some(ref model) = config.completion_model {
        return Ok(Arc::clone(model));
    }
    let provider = resolve_provider(config)?;
    Ok(Arc::new(ProviderModel::new(provider, config)))
}

fn resolve_provider(config: &ExtractionConfig) -> Result<Arc<dyn LLMProvider>, ReportError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_provider(name, config.model_or_default());
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            let model = config.model.as_deref().unwrap_or(&model);
            return create_provider(&prov, model);
        }
    }

    if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
        if !key.is_empty() {
            return create_provider(DEFAULT_PROVIDER, config.model_or_default());
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ReportError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENROUTER_API_KEY (default provider) or OPENAI_API_KEY, \
                or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ReportError> {
    debug!("Creating LLM provider {} with model {}", provider_name, model);
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ReportError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}
