//! Dialogue generation: one prompt in, one validated [`DialogueScript`] out.
//!
//! The LLM is reached through the [`DialogueModel`] seam, which returns raw
//! text. [`generate_script`] composes three explicit pieces around it:
//!
//! 1. a per-attempt timeout (`api_timeout_secs`),
//! 2. the schema gate [`parse_script`],
//! 3. the [`RetryPolicy`]: re-send the same prompt on a schema failure, with
//!    exponential backoff, up to `max_attempts`.
//!
//! Transport, auth and timeout failures are not retried here; they end the
//! job as a generation error.

use crate::config::{PodcastConfig, RetryPolicy, DEFAULT_OPENAI_BASE_URL};
use crate::error::PodcastError;
use crate::prompts::build_dialogue_prompt;
use crate::script::{parse_script, DialogueScript};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, OpenAIProvider, ProviderFactory};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// The raw answer of one LLM call.
#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Send a prompt, get text back.
#[async_trait]
pub trait DialogueModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<ModelReply, PodcastError>;
}

/// [`DialogueModel`] backed by an edgequake-llm provider.
pub struct LlmDialogueModel {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl LlmDialogueModel {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &PodcastConfig) -> Self {
        Self {
            provider,
            options: CompletionOptions {
                temperature: config.temperature,
                max_tokens: Some(config.max_tokens),
                ..Default::default()
            },
        }
    }
}

#[async_trait]
impl DialogueModel for LlmDialogueModel {
    async fn complete(&self, prompt: &str) -> Result<ModelReply, PodcastError> {
        // Single user turn: reasoning models (o1-*) reject system messages.
        let messages = vec![ChatMessage::user(prompt)];
        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| PodcastError::GenerationFailed {
                message: e.to_string(),
            })?;

        Ok(ModelReply {
            content: response.content,
            input_tokens: response.prompt_tokens as u64,
            output_tokens: response.completion_tokens as u64,
        })
    }
}

/// Resolve the dialogue model, from most-specific to least-specific:
///
/// 1. `config.dialogue_model`: used as-is (tests, custom backends).
/// 2. `config.llm_provider`: a pre-built edgequake-llm provider.
/// 3. `config.llm_provider_name` + `config.text_model`: see [`llm_provider_for`].
pub fn dialogue_model_for(config: &PodcastConfig) -> Result<Arc<dyn DialogueModel>, PodcastError> {
    if let Some(ref model) = config.dialogue_model {
        return Ok(Arc::clone(model));
    }

    let provider = match config.llm_provider {
        Some(ref provider) => Arc::clone(provider),
        None => llm_provider_for(config)?,
    };

    Ok(Arc::new(LlmDialogueModel::new(provider, config)))
}

/// Build the named edgequake-llm provider for `config.text_model`.
///
/// `openai` uses the key and base URL carried by the config. Other providers
/// go through [`ProviderFactory::create_llm_provider`], which reads their
/// usual environment variables.
pub fn llm_provider_for(config: &PodcastConfig) -> Result<Arc<dyn LLMProvider>, PodcastError> {
    if config.llm_provider_name == "openai" {
        let key = config
            .openai_api_key
            .clone()
            .ok_or(PodcastError::MissingCredential {
                name: "OPENAI_API_KEY",
            })?;
        let provider = if config.openai_base_url == DEFAULT_OPENAI_BASE_URL {
            OpenAIProvider::new(key)
        } else {
            OpenAIProvider::compatible(key, &config.openai_base_url)
        };
        return Ok(Arc::new(provider.with_model(&config.text_model)));
    }

    ProviderFactory::create_llm_provider(&config.llm_provider_name, &config.text_model).map_err(
        |e| PodcastError::ProviderNotConfigured {
            provider: config.llm_provider_name.clone(),
            hint: format!("{e}"),
        },
    )
}

/// A validated script plus the cost of getting it.
#[derive(Debug, Clone)]
pub struct GeneratedScript {
    pub script: DialogueScript,
    /// Attempts made, including the successful one.
    pub attempts: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub duration_ms: u64,
}

/// Generate the dialogue script for `text`.
pub async fn generate_script(
    model: &dyn DialogueModel,
    text: &str,
    config: &PodcastConfig,
) -> Result<GeneratedScript, PodcastError> {
    let start = Instant::now();
    let prompt = build_dialogue_prompt(text, &config.template);
    let policy: RetryPolicy = config.retry;
    let per_call = Duration::from_secs(config.api_timeout_secs);

    info!(
        "Generating dialogue with {} ({} prompt chars, template {})",
        config.text_model,
        prompt.chars().count(),
        config.template.name
    );

    let mut input_tokens = 0u64;
    let mut output_tokens = 0u64;
    let mut attempt: u32 = 0;

    loop {
        let reply = match timeout(per_call, model.complete(&prompt)).await {
            Ok(reply) => reply?,
            Err(_) => {
                return Err(PodcastError::GenerationTimeout {
                    secs: config.api_timeout_secs,
                })
            }
        };
        input_tokens += reply.input_tokens;
        output_tokens += reply.output_tokens;

        match parse_script(&reply.content) {
            Ok(script) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                info!(
                    "Dialogue ready: {} lines after {} attempt(s), {}ms",
                    script.lines.len(),
                    attempt + 1,
                    duration_ms
                );
                debug!("Scratchpad: {} chars", script.scratchpad.chars().count());
                return Ok(GeneratedScript {
                    script,
                    attempts: attempt + 1,
                    input_tokens,
                    output_tokens,
                    duration_ms,
                });
            }
            Err(e) if attempt + 1 >= policy.max_attempts => {
                warn!("Attempt {}/{} invalid: {}; giving up", attempt + 1, policy.max_attempts, e);
                return Err(PodcastError::ScriptValidationExhausted {
                    attempts: attempt + 1,
                    last_error: e,
                });
            }
            Err(e) => {
                attempt += 1;
                let backoff = policy.delay_before(attempt);
                warn!(
                    "Attempt {}/{} invalid: {}; retrying after {}ms",
                    attempt,
                    policy.max_attempts,
                    e,
                    backoff.as_millis()
                );
                if let Some(ref cb) = config.progress_callback {
                    cb.on_generation_retry(attempt, policy.max_attempts, &e.to_string());
                }
                sleep(backoff).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScriptError;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    const VALID: &str = r#"{"scratchpad":"notes","dialogue":[
        {"speaker":"speaker-1","text":"hello"},
        {"speaker":"speaker-2","text":"world"}]}"#;

    /// Replays canned replies in order and counts calls.
    struct Scripted {
        replies: Mutex<VecDeque<Result<String, PodcastError>>>,
        calls: AtomicU32,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String, PodcastError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicU32::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DialogueModel for Scripted {
        async fn complete(&self, prompt: &str) -> Result<ModelReply, PodcastError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            let next = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("{}".to_string()));
            next.map(|content| ModelReply {
                content,
                input_tokens: 100,
                output_tokens: 50,
            })
        }
    }

    struct Hangs;

    #[async_trait]
    impl DialogueModel for Hangs {
        async fn complete(&self, _prompt: &str) -> Result<ModelReply, PodcastError> {
            sleep(Duration::from_secs(3600)).await;
            unreachable!()
        }
    }

    fn config(max_attempts: u32) -> PodcastConfig {
        PodcastConfig::builder()
            .openai_api_key("sk-test")
            .max_attempts(max_attempts)
            .retry_backoff_ms(0)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn malformed_then_valid_takes_two_calls() {
        let model = Scripted::new(vec![Ok("not json at all".into()), Ok(VALID.into())]);
        let out = generate_script(&model, "source", &config(4)).await.unwrap();

        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
        assert_eq!(out.attempts, 2);
        assert_eq!(out.script.lines.len(), 2);
        assert_eq!(out.input_tokens, 200);
        assert_eq!(out.output_tokens, 100);

        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts[0], prompts[1], "retry must resend the same prompt");
        assert!(prompts[0].contains("<input_text>\nsource\n</input_text>"));
    }

    #[tokio::test]
    async fn wrong_speaker_enum_is_retried() {
        let bad = r#"{"scratchpad":"","dialogue":[{"speaker":"speaker-3","text":"x"}]}"#;
        let model = Scripted::new(vec![Ok(bad.into()), Ok(VALID.into())]);
        let out = generate_script(&model, "t", &config(3)).await.unwrap();
        assert_eq!(out.attempts, 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let model = Scripted::new(vec![
            Ok("nope".into()),
            Ok(r#"{"scratchpad":"","dialogue":[]}"#.into()),
            Ok("still nope".into()),
        ]);
        let err = generate_script(&model, "t", &config(3)).await.unwrap_err();

        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
        match err {
            PodcastError::ScriptValidationExhausted { attempts, last_error } => {
                assert_eq!(attempts, 3);
                assert!(matches!(last_error, ScriptError::Malformed(_)));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_error_is_not_retried() {
        let model = Scripted::new(vec![
            Err(PodcastError::GenerationFailed {
                message: "401 Unauthorized".into(),
            }),
            Ok(VALID.into()),
        ]);
        let err = generate_script(&model, "t", &config(4)).await.unwrap_err();
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, PodcastError::GenerationFailed { .. }));
    }

    #[tokio::test]
    async fn slow_model_times_out() {
        let mut cfg = config(2);
        cfg.api_timeout_secs = 0;
        let err = generate_script(&Hangs, "t", &cfg).await.unwrap_err();
        assert!(matches!(err, PodcastError::GenerationTimeout { secs: 0 }));
    }

    #[test]
    fn override_model_is_used() {
        let model: Arc<dyn DialogueModel> = Arc::new(Scripted::new(vec![]));
        let cfg = PodcastConfig::builder()
            .dialogue_model(Arc::clone(&model))
            .speech_provider(Arc::new(NullSpeech))
            .build()
            .unwrap();
        let resolved = dialogue_model_for(&cfg).unwrap();
        assert!(Arc::ptr_eq(&resolved, &model));
    }

    #[test]
    fn openai_model_is_built_from_config_key() {
        std::env::remove_var("OPENAI_API_KEY");
        let cfg = PodcastConfig::builder()
            .openai_api_key("sk-from-config")
            .text_model("gpt-4o")
            .build()
            .unwrap();

        let provider = llm_provider_for(&cfg).unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.model(), "gpt-4o");
        assert!(dialogue_model_for(&cfg).is_ok());
    }

    #[test]
    fn openai_compatible_endpoint_keeps_the_model() {
        let cfg = PodcastConfig::builder()
            .openai_api_key("sk-local")
            .openai_base_url("http://localhost:8080/v1")
            .text_model("llama3")
            .build()
            .unwrap();
        assert_eq!(llm_provider_for(&cfg).unwrap().model(), "llama3");
    }

    #[test]
    fn openai_without_key_is_a_missing_credential() {
        let mut cfg = config(1);
        cfg.openai_api_key = None;
        assert!(matches!(
            llm_provider_for(&cfg),
            Err(PodcastError::MissingCredential { name: "OPENAI_API_KEY" })
        ));
    }

    #[test]
    fn temperature_is_omitted_unless_set() {
        let cfg = PodcastConfig::builder()
            .openai_api_key("sk-test")
            .text_model("o1-mini")
            .build()
            .unwrap();
        let model = LlmDialogueModel::new(llm_provider_for(&cfg).unwrap(), &cfg);
        assert_eq!(model.options.temperature, None);
        assert_eq!(model.options.max_tokens, Some(16384));

        let cfg = PodcastConfig::builder()
            .openai_api_key("sk-test")
            .temperature(0.3)
            .build()
            .unwrap();
        let model = LlmDialogueModel::new(llm_provider_for(&cfg).unwrap(), &cfg);
        assert_eq!(model.options.temperature, Some(0.3));
    }

    struct NullSpeech;

    #[async_trait]
    impl crate::speech::SpeechProvider for NullSpeech {
        fn name(&self) -> &'static str {
            "null"
        }

        async fn synthesize(
            &self,
            _text: &str,
            _voice_id: &str,
        ) -> Result<Vec<u8>, crate::error::SpeechError> {
            Ok(Vec::new())
        }
    }
}
