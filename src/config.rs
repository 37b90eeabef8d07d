//! Configuration for a report extraction batch.
//!
//! Every knob lives in [`ExtractionConfig`], built via
//! [`ExtractionConfigBuilder`]. The config is created once per run and shared
//! read-only by the fetcher, the interpreter and the batch runner.

use crate::error::ReportError;
use crate::pipeline::llm::CompletionModel;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Provider used when nothing else is configured.
pub const DEFAULT_PROVIDER: &str = "openrouter";

/// Model used when no model is configured.
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";

/// Header sent with every report download.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

/// Configuration for a report extraction batch.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use report2json::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .model("google/gemini-2.5-flash")
///     .temperature(0.15)
///     .fetch_timeout_secs(60)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// LLM model identifier. If None, [`DEFAULT_MODEL`] is used.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openrouter", "openai", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed completion model. Takes precedence over everything
    /// provider-related; used to plug in non-edgequake backends and fakes.
    pub completion_model: Option<Arc<dyn CompletionModel>>,

    /// Sampling temperature for the completion. Default: 0.15.
    ///
    /// Extraction should be near-deterministic: the same report should give
    /// the same record on every run.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: provider default.
    pub max_tokens: Option<usize>,

    /// Timeout for one completion call in seconds. Default: none, the
    /// provider's own limits apply.
    pub api_timeout_secs: Option<u64>,

    /// Timeout for one report download in seconds. Default: 60.
    pub fetch_timeout_secs: u64,

    /// `User-Agent` header for report downloads. Default: `Mozilla/5.0`.
    ///
    /// Several report portals reject requests without a browser-like agent.
    pub user_agent: String,

    /// Custom prompt template. Must contain `{report_text}`.
    /// If None, the built-in extraction prompt is used.
    pub prompt_template: Option<String>,

    /// What to do with input entries that are not `{ "url": "<string>" }`
    /// objects. Default: [`MalformedEntryPolicy::Skip`].
    pub malformed_entries: MalformedEntryPolicy,

    /// Optional per-report progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            completion_model: None,
            temperature: 0.15,
            max_tokens: None,
            api_timeout_secs: None,
            fetch_timeout_secs: 60,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            prompt_template: None,
            malformed_entries: MalformedEntryPolicy::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field(
                "completion_model",
                &self.completion_model.as_ref().map(|_| "<dyn CompletionModel>"),
            )
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("prompt_template", &self.prompt_template.as_ref().map(|t| t.len()))
            .field("malformed_entries", &self.malformed_entries)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model identifier that will be requested.
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`ExtractionConfig`].
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl fmt::Debug for ExtractionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ExtractionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn completion_model(mut self, model: Arc<dyn CompletionModel>) -> Self {
        self.config.completion_model = Some(model);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = Some(n);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    pub fn prompt_template(mut self, template: impl Into<String>) -> Self {
        self.config.prompt_template = Some(template.into());
        self
    }

    pub fn malformed_entries(mut self, policy: MalformedEntryPolicy) -> Self {
        self.config.malformed_entries = policy;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ReportError> {
        let c = &self.config;
        if c.fetch_timeout_secs == 0 {
            return Err(ReportError::InvalidConfig(
                "Fetch timeout must be ≥ 1 second".into(),
            ));
        }
        if c.api_timeout_secs == Some(0) {
            return Err(ReportError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.user_agent.trim().is_empty() {
            return Err(ReportError::InvalidConfig("User agent must not be empty".into()));
        }
        if let Some(ref template) = c.prompt_template {
            if !template.contains(crate::prompts::REPORT_TEXT_PLACEHOLDER) {
                return Err(ReportError::InvalidConfig(format!(
                    "Prompt template must contain the {} placeholder",
                    crate::prompts::REPORT_TEXT_PLACEHOLDER
                )));
            }
        }
        if c.model.as_deref().is_some_and(|m| m.trim().is_empty()) {
            return Err(ReportError::InvalidConfig("Model name must not be empty".into()));
        }
        Ok(self.config)
    }
}

/// How the batch runner treats input entries that are not objects with a
/// string `url` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MalformedEntryPolicy {
    /// Log a warning and skip the entry, like an entry with an empty URL. (default)
    #[default]
    Skip,
    /// Fail the whole run with [`ReportError::InvalidInput`] before any
    /// report is fetched.
    Abort,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = ExtractionConfig::default();
        assert_eq!(c.temperature, 0.15);
        assert_eq!(c.fetch_timeout_secs, 60);
        assert_eq!(c.user_agent, "Mozilla/5.0");
        assert_eq!(c.api_timeout_secs, None);
        assert_eq!(c.malformed_entries, MalformedEntryPolicy::Skip);
        assert_eq!(c.model_or_default(), DEFAULT_MODEL);
    }

    #[test]
    fn temperature_is_clamped() {
        let c = ExtractionConfig::builder().temperature(5.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn zero_fetch_timeout_is_rejected() {
        let err = ExtractionConfig::builder()
            .fetch_timeout_secs(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ReportError::InvalidConfig(_)));
    }

    #[test]
    fn template_without_placeholder_is_rejected() {
        let err = ExtractionConfig::builder()
            .prompt_template("Extract the report.")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("{report_text}"), "got: {err}");
    }

    #[test]
    fn template_with_placeholder_is_accepted() {
        let c = ExtractionConfig::builder()
            .prompt_template("Report:\n{report_text}\nReturn JSON.")
            .build()
            .unwrap();
        assert!(c.prompt_template.is_some());
    }

    #[test]
    fn blank_model_is_rejected() {
        assert!(ExtractionConfig::builder().model("  ").build().is_err());
    }

    #[test]
    fn debug_hides_template_body() {
        let c = ExtractionConfig::builder()
            .prompt_template("secret {report_text}")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret"), "got: {dbg}");
    }
}
