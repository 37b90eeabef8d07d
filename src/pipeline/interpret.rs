//! Report text → [`ParsedReport`].
//!
//! One completion call per report. The interpreter never returns an error:
//! every failure mode becomes a [`ParsedReport::Failed`] with one of the
//! fixed messages below, so a batch always yields one result per report.
//! A reply that is nothing but `{"error": ...}` is the model's own failure
//! and is kept as one.

use crate::config::ExtractionConfig;
use crate::model::ParsedReport;
use crate::pipeline::llm::CompletionModel;
use crate::pipeline::repair::{self, Recovery};
use crate::prompts::build_extraction_prompt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Error recorded when the fetcher produced no text.
pub const NO_TEXT_ERROR: &str = "No text extracted from report.";

/// Error recorded when no JSON object could be recovered from the completion.
pub const NO_JSON_ERROR: &str = "No valid JSON found";

/// Prefix of the error recorded when the completion call itself failed.
pub const LLM_FAILURE_PREFIX: &str = "LLM parsing failed: ";

/// Turns extracted report text into a structured record.
#[derive(Clone)]
pub struct Interpreter {
    model: Arc<dyn CompletionModel>,
    prompt_template: Option<String>,
}

impl Interpreter {
    pub fn new(model: Arc<dyn CompletionModel>, config: &ExtractionConfig) -> Self {
        Self {
            model,
            prompt_template: config.prompt_template.clone(),
        }
    }

    /// Interpret one report's text.
    ///
    /// Text that is empty after trimming is rejected without calling the
    /// model. Non-empty text is sent untrimmed.
    pub async fn interpret(&self, text: &str) -> ParsedReport {
        if text.trim().is_empty() {
            warn!("No text to parse");
            return ParsedReport::failed(NO_TEXT_ERROR);
        }

        let prompt = build_extraction_prompt(text, self.prompt_template.as_deref());
        debug!("Prompt built ({} chars)", prompt.len());

        let completion = match self.model.complete(&prompt).await {
            Ok(c) => c,
            Err(e) => {
                warn!("LLM call failed: {}", e);
                return ParsedReport::failed(format!("{}{}", LLM_FAILURE_PREFIX, e));
            }
        };

        match repair::parse_completion(&completion) {
            Some((map, recovery)) => {
                match recovery {
                    Recovery::Direct => info!("LLM output parsed as JSON"),
                    Recovery::BraceSpan => {
                        info!("LLM output repaired: JSON object cut from surrounding text")
                    }
                }
                // Classified the same way as on read-back from disk.
                let parsed = ParsedReport::from_object(map);
                if let Some(error) = parsed.error() {
                    warn!("LLM reported an error: {}", error);
                }
                parsed
            }
            None => {
                warn!("No valid JSON in LLM output ({} chars)", completion.len());
                ParsedReport::failed_with_output(NO_JSON_ERROR, completion)
            }
        }
    }
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("model", &"<dyn CompletionModel>")
            .field("prompt_template", &self.prompt_template.as_ref().map(|t| t.len()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Returns a fixed reply and records every prompt it receives.
    struct ScriptedModel {
        reply: Result<String, ModelError>,
        calls: AtomicUsize,
        last_prompt: Mutex<Option<String>>,
    }

    impl ScriptedModel {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            })
        }

        fn failing(err: ModelError) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(err),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl CompletionModel for ScriptedModel {
        async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            self.reply.clone()
        }
    }

    fn interpreter(model: Arc<ScriptedModel>) -> Interpreter {
        Interpreter::new(model, &ExtractionConfig::default())
    }

    #[tokio::test]
    async fn blank_text_skips_the_model() {
        let model = ScriptedModel::replying("{}");
        let interp = interpreter(Arc::clone(&model));

        for text in ["", "   ", "\n\t\n"] {
            let out = interp.interpret(text).await;
            assert_eq!(out, ParsedReport::failed(NO_TEXT_ERROR));
        }
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn clean_reply_is_stored_verbatim() {
        let reply = r#"{"Patient_Name": "Ravi K", "Report_Date": null, "Test_Results": {}}"#;
        let model = ScriptedModel::replying(reply);
        let out = interpreter(Arc::clone(&model)).interpret("Hemoglobin 10.2").await;

        let ParsedReport::Parsed(map) = out else {
            panic!("expected parsed report, got {out:?}");
        };
        assert_eq!(map["Patient_Name"], json!("Ravi K"));
        assert_eq!(map["Report_Date"], json!(null));
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn wrapped_reply_is_recovered() {
        let model = ScriptedModel::replying("Sure!\n```json\n{\"Test_Name\": \"Lipid Profile\"}\n```");
        let out = interpreter(model).interpret("LDL 160").await;
        assert!(out.is_parsed());
        assert_eq!(out.record().unwrap().test_name.as_deref(), Some("Lipid Profile"));
    }

    #[tokio::test]
    async fn reply_without_json_keeps_raw_output() {
        let reply = "  I cannot parse this document.\n";
        let out = interpreter(ScriptedModel::replying(reply)).interpret("???").await;
        assert_eq!(out, ParsedReport::failed_with_output(NO_JSON_ERROR, reply));
    }

    #[tokio::test]
    async fn model_error_is_prefixed() {
        let model = ScriptedModel::failing(ModelError::Api {
            message: "429 Too Many Requests".into(),
        });
        let out = interpreter(model).interpret("CBC").await;
        assert_eq!(
            out.error(),
            Some("LLM parsing failed: 429 Too Many Requests")
        );
    }

    #[tokio::test]
    async fn text_is_sent_untrimmed_in_prompt() {
        let model = ScriptedModel::replying("{}");
        let text = "\n  Glucose 130 mg/dL  \n";
        interpreter(Arc::clone(&model)).interpret(text).await;

        let prompt = model.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains(text));
    }

    #[tokio::test]
    async fn custom_template_is_applied() {
        let model = ScriptedModel::replying("{}");
        let config = ExtractionConfig::builder()
            .prompt_template("JSON please: {report_text}")
            .build()
            .unwrap();
        Interpreter::new(Arc::clone(&model) as Arc<dyn CompletionModel>, &config)
            .interpret("TSH 5.1")
            .await;

        let prompt = model.last_prompt.lock().unwrap().clone().unwrap();
        assert_eq!(prompt, "JSON please: TSH 5.1");
    }

    #[tokio::test]
    async fn model_error_object_is_a_failure() {
        let reply = r#"{"error": "unreadable scan"}"#;
        let out = interpreter(ScriptedModel::replying(reply)).interpret("x").await;
        assert_eq!(out, ParsedReport::failed("unreadable scan"));
        assert!(!out.succeeded());
    }

    #[tokio::test]
    async fn error_key_beside_fields_is_kept_but_not_a_success() {
        let reply = r#"{"error": "partial scan", "Test_Name": null}"#;
        let out = interpreter(ScriptedModel::replying(reply)).interpret("x").await;
        assert!(out.is_parsed());
        assert!(!out.succeeded());
    }
}
