//! Configuration types for PDF-to-podcast jobs.
//!
//! Every knob a job reads lives in [`PodcastConfig`], built via
//! [`PodcastConfigBuilder`]. Library code never reads process globals: the
//! builder is the only place credentials enter, and [`PodcastConfig::from_env`]
//! is an explicit opt-in for seeding it from environment variables.
//! Validation happens once, in [`PodcastConfigBuilder::build`].

use crate::error::PodcastError;
use crate::pipeline::generate::DialogueModel;
use crate::progress::ProgressCallback;
use crate::prompts::InstructionTemplate;
use crate::script::Speaker;
use crate::speech::SpeechProvider;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

// ── Catalogues ───────────────────────────────────────────────────────────

/// OpenAI speech models.
pub const OPENAI_AUDIO_MODELS: &[&str] = &["tts-1", "tts-1-hd"];

/// OpenAI built-in voices.
pub const OPENAI_VOICES: &[&str] = &["alloy", "echo", "fable", "onyx", "nova", "shimmer"];

/// Fish Audio custom voices: display name → reference model id.
pub const FISH_AUDIO_VOICES: &[(&str, &str)] = &[
    ("zhou", "d8cb9a2a89844babbeeda24c974a0af2"),
    ("dong", "22436dbbbfe94e0bb4e137725d16c8c2"),
    ("xing", "07ea9673918042debb4080f4efdc2da3"),
    ("yang", "afb76b7abffd48c49bed68cc01054fab"),
];

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_FISH_AUDIO_BASE_URL: &str = "https://api.fish.audio";

// ── Enums ────────────────────────────────────────────────────────────────

/// Which TTS service voices the job. Fixed per job, never mixed per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TtsProvider {
    /// OpenAI `/audio/speech`: built-in voices, streamed response. (default)
    #[default]
    OpenAi,
    /// Fish Audio `/v1/tts`: custom reference voices, single-shot response.
    FishAudio,
}

impl TtsProvider {
    pub fn name(self) -> &'static str {
        match self {
            TtsProvider::OpenAi => "openai",
            TtsProvider::FishAudio => "fish-audio",
        }
    }

    /// Map a configured voice name to the id sent on the wire.
    ///
    /// OpenAI voices pass through after a catalogue check. Fish Audio voices
    /// are looked up by display name; a raw 32-hex reference id is accepted
    /// as-is.
    pub fn resolve_voice(self, voice: &str) -> Result<String, PodcastError> {
        match self {
            TtsProvider::OpenAi => {
                if OPENAI_VOICES.contains(&voice) {
                    Ok(voice.to_string())
                } else {
                    Err(PodcastError::UnknownVoice {
                        provider: self.name(),
                        voice: voice.to_string(),
                        known: OPENAI_VOICES.join(", "),
                    })
                }
            }
            TtsProvider::FishAudio => {
                if let Some((_, id)) = FISH_AUDIO_VOICES.iter().find(|(name, _)| *name == voice) {
                    return Ok((*id).to_string());
                }
                if voice.len() == 32 && voice.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Ok(voice.to_ascii_lowercase());
                }
                Err(PodcastError::UnknownVoice {
                    provider: self.name(),
                    voice: voice.to_string(),
                    known: FISH_AUDIO_VOICES
                        .iter()
                        .map(|(name, _)| *name)
                        .collect::<Vec<_>>()
                        .join(", "),
                })
            }
        }
    }
}

/// Voice names for the two speakers, interpreted by the selected provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerVoices {
    pub speaker_1: String,
    pub speaker_2: String,
}

impl SpeakerVoices {
    pub fn new(speaker_1: impl Into<String>, speaker_2: impl Into<String>) -> Self {
        Self {
            speaker_1: speaker_1.into(),
            speaker_2: speaker_2.into(),
        }
    }

    pub fn for_speaker(&self, speaker: Speaker) -> &str {
        match speaker {
            Speaker::SpeakerA => &self.speaker_1,
            Speaker::SpeakerB => &self.speaker_2,
        }
    }

    /// Resolve both names to wire ids for `provider`.
    pub fn resolve(&self, provider: TtsProvider) -> Result<SpeakerVoices, PodcastError> {
        Ok(SpeakerVoices {
            speaker_1: provider.resolve_voice(&self.speaker_1)?,
            speaker_2: provider.resolve_voice(&self.speaker_2)?,
        })
    }
}

/// Retry schedule for LLM answers that fail schema validation.
///
/// Transport and auth errors are never retried; only
/// [`crate::error::ScriptError`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first. Must be ≥ 1. Default: 4.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each further failure.
    /// Default: 500.
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            backoff_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait before 0-based `attempt`. Zero for the first attempt.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2u64.saturating_pow(attempt - 1);
        Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }
}

// ── PodcastConfig ────────────────────────────────────────────────────────

/// Configuration for one PDF-to-podcast job.
///
/// Built via [`PodcastConfig::builder()`] or [`PodcastConfig::from_env()`].
///
/// # Example
/// ```rust
/// use pdf2podcast::{PodcastConfig, TtsProvider};
///
/// let config = PodcastConfig::builder()
///     .openai_api_key("sk-test")
///     .text_model("gpt-4o")
///     .speaker_voices("nova", "onyx")
///     .concurrency(4)
///     .build()
///     .unwrap();
/// assert_eq!(config.tts_provider, TtsProvider::OpenAi);
/// ```
#[derive(Clone)]
pub struct PodcastConfig {
    /// LLM model id used for dialogue generation. Default: "gpt-4o-mini".
    pub text_model: String,

    /// edgequake-llm provider name. Default: "openai".
    pub llm_provider_name: String,

    /// Pre-constructed LLM provider. Takes precedence over `llm_provider_name`.
    pub llm_provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed dialogue model. Takes precedence over both LLM fields.
    pub dialogue_model: Option<Arc<dyn DialogueModel>>,

    /// TTS service for this job. Default: OpenAI.
    pub tts_provider: TtsProvider,

    /// OpenAI speech model. Default: "tts-1".
    pub audio_model: String,

    /// OpenAI voices for speaker-1 / speaker-2. Default: alloy / echo.
    pub voices: SpeakerVoices,

    /// Fish Audio voices for speaker-1 / speaker-2. Default: xing / dong.
    pub fish_voices: SpeakerVoices,

    /// Pre-constructed speech provider. Takes precedence over `tts_provider`.
    pub speech_provider: Option<Arc<dyn SpeechProvider>>,

    /// Key for OpenAI TTS, and the presence check for the OpenAI LLM.
    pub openai_api_key: Option<String>,

    /// Key for Fish Audio TTS.
    pub fish_audio_api_key: Option<String>,

    /// OpenAI REST base, including `/v1`.
    pub openai_base_url: String,

    /// Fish Audio REST base.
    pub fish_audio_base_url: String,

    /// Instruction template. Default: [`InstructionTemplate::podcast_zh`].
    pub template: InstructionTemplate,

    /// LLM sampling temperature. Default: `None` (the model's own default).
    ///
    /// Reasoning models (o1, o3, o4) reject anything but their default.
    pub temperature: Option<f32>,

    /// LLM output cap. Default: 16384.
    ///
    /// A long-form script easily exceeds 8k tokens; a truncated answer is
    /// invalid JSON and costs a full retry.
    pub max_tokens: usize,

    /// Validation-retry schedule for dialogue generation.
    pub retry: RetryPolicy,

    /// Maximum TTS requests in flight. Default: available parallelism.
    ///
    /// Lines beyond this are queued, not spawned. Lower it if the TTS
    /// provider answers `429`.
    pub concurrency: usize,

    /// Timeout for the LLM call, per attempt. Default: 600.
    pub api_timeout_secs: u64,

    /// Timeout for each TTS request. Default: 120.
    pub tts_timeout_secs: u64,

    /// Timeout for URL inputs. Default: 120.
    pub download_timeout_secs: u64,

    /// Directory receiving finished MP3 files. Default: "./tmp".
    pub output_dir: PathBuf,

    /// Optional stage/line event sink.
    pub progress_callback: Option<ProgressCallback>,
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Default for PodcastConfig {
    fn default() -> Self {
        Self {
            text_model: "gpt-4o-mini".to_string(),
            llm_provider_name: "openai".to_string(),
            llm_provider: None,
            dialogue_model: None,
            tts_provider: TtsProvider::default(),
            audio_model: "tts-1".to_string(),
            voices: SpeakerVoices::new("alloy", "echo"),
            fish_voices: SpeakerVoices::new("xing", "dong"),
            speech_provider: None,
            openai_api_key: None,
            fish_audio_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            fish_audio_base_url: DEFAULT_FISH_AUDIO_BASE_URL.to_string(),
            template: InstructionTemplate::default(),
            temperature: None,
            max_tokens: 16384,
            retry: RetryPolicy::default(),
            concurrency: default_concurrency(),
            api_timeout_secs: 600,
            tts_timeout_secs: 120,
            download_timeout_secs: 120,
            output_dir: PathBuf::from("./tmp"),
            progress_callback: None,
        }
    }
}

fn redact(key: &Option<String>) -> &'static str {
    if key.is_some() {
        "<set>"
    } else {
        "<unset>"
    }
}

impl fmt::Debug for PodcastConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PodcastConfig")
            .field("text_model", &self.text_model)
            .field("llm_provider_name", &self.llm_provider_name)
            .field("llm_provider", &self.llm_provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("dialogue_model", &self.dialogue_model.as_ref().map(|_| "<dyn DialogueModel>"))
            .field("tts_provider", &self.tts_provider)
            .field("audio_model", &self.audio_model)
            .field("voices", &self.voices)
            .field("fish_voices", &self.fish_voices)
            .field("speech_provider", &self.speech_provider.as_ref().map(|_| "<dyn SpeechProvider>"))
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("fish_audio_api_key", &redact(&self.fish_audio_api_key))
            .field("template", &self.template.name)
            .field("retry", &self.retry)
            .field("concurrency", &self.concurrency)
            .field("output_dir", &self.output_dir)
            .finish()
    }
}

impl PodcastConfig {
    /// Create a new builder for `PodcastConfig`.
    pub fn builder() -> PodcastConfigBuilder {
        PodcastConfigBuilder {
            config: Self::default(),
        }
    }

    /// A builder seeded from environment variables.
    ///
    /// Reads `OPENAI_API_KEY`, `FISH_AUDIO_API_KEY`, `OPENAI_BASE_URL` and
    /// `PDF2PODCAST_OUTPUT_DIR`. Empty values count as unset.
    pub fn from_env() -> PodcastConfigBuilder {
        fn var(name: &str) -> Option<String> {
            std::env::var(name).ok().filter(|v| !v.trim().is_empty())
        }

        let mut builder = Self::builder();
        if let Some(key) = var("OPENAI_API_KEY") {
            builder = builder.openai_api_key(key);
        }
        if let Some(key) = var("FISH_AUDIO_API_KEY") {
            builder = builder.fish_audio_api_key(key);
        }
        if let Some(url) = var("OPENAI_BASE_URL") {
            builder = builder.openai_base_url(url);
        }
        if let Some(dir) = var("PDF2PODCAST_OUTPUT_DIR") {
            builder = builder.output_dir(dir);
        }
        builder
    }

    /// Voices for the selected provider, before resolution.
    pub fn active_voices(&self) -> &SpeakerVoices {
        match self.tts_provider {
            TtsProvider::OpenAi => &self.voices,
            TtsProvider::FishAudio => &self.fish_voices,
        }
    }
}

/// Builder for [`PodcastConfig`].
pub struct PodcastConfigBuilder {
    config: PodcastConfig,
}

impl fmt::Debug for PodcastConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PodcastConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl PodcastConfigBuilder {
    pub fn text_model(mut self, model: impl Into<String>) -> Self {
        self.config.text_model = model.into();
        self
    }

    pub fn llm_provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.llm_provider_name = name.into();
        self
    }

    pub fn llm_provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.llm_provider = Some(provider);
        self
    }

    pub fn dialogue_model(mut self, model: Arc<dyn DialogueModel>) -> Self {
        self.config.dialogue_model = Some(model);
        self
    }

    pub fn tts_provider(mut self, provider: TtsProvider) -> Self {
        self.config.tts_provider = provider;
        self
    }

    pub fn audio_model(mut self, model: impl Into<String>) -> Self {
        self.config.audio_model = model.into();
        self
    }

    /// OpenAI voices for speaker-1 and speaker-2.
    pub fn speaker_voices(mut self, speaker_1: impl Into<String>, speaker_2: impl Into<String>) -> Self {
        self.config.voices = SpeakerVoices::new(speaker_1, speaker_2);
        self
    }

    /// Fish Audio voices (names or reference ids) for speaker-1 and speaker-2.
    pub fn fish_voices(mut self, speaker_1: impl Into<String>, speaker_2: impl Into<String>) -> Self {
        self.config.fish_voices = SpeakerVoices::new(speaker_1, speaker_2);
        self
    }

    pub fn speech_provider(mut self, provider: Arc<dyn SpeechProvider>) -> Self {
        self.config.speech_provider = Some(provider);
        self
    }

    pub fn openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.openai_api_key = Some(key.into());
        self
    }

    pub fn fish_audio_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.fish_audio_api_key = Some(key.into());
        self
    }

    pub fn openai_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.openai_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn fish_audio_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.fish_audio_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn template(mut self, template: InstructionTemplate) -> Self {
        self.config.template = template;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.retry.max_attempts = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry.backoff_ms = ms;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn tts_timeout_secs(mut self, secs: u64) -> Self {
        self.config.tts_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints and credentials.
    pub fn build(self) -> Result<PodcastConfig, PodcastError> {
        let c = &self.config;

        if c.concurrency == 0 {
            return Err(PodcastError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        if c.retry.max_attempts == 0 {
            return Err(PodcastError::InvalidConfig(
                "Retry policy must allow at least one attempt".into(),
            ));
        }
        if c.text_model.trim().is_empty() {
            return Err(PodcastError::InvalidConfig("Text model must not be empty".into()));
        }

        if c.speech_provider.is_none() {
            c.active_voices().resolve(c.tts_provider)?;
            match c.tts_provider {
                TtsProvider::OpenAi => {
                    if !OPENAI_AUDIO_MODELS.contains(&c.audio_model.as_str()) {
                        return Err(PodcastError::InvalidConfig(format!(
                            "Unknown audio model '{}'. Known: {}",
                            c.audio_model,
                            OPENAI_AUDIO_MODELS.join(", ")
                        )));
                    }
                    if c.openai_api_key.is_none() {
                        return Err(PodcastError::MissingCredential {
                            name: "OPENAI_API_KEY",
                        });
                    }
                }
                TtsProvider::FishAudio => {
                    if c.fish_audio_api_key.is_none() {
                        return Err(PodcastError::MissingCredential {
                            name: "FISH_AUDIO_API_KEY",
                        });
                    }
                }
            }
        }

        let llm_overridden = c.dialogue_model.is_some() || c.llm_provider.is_some();
        if !llm_overridden && c.llm_provider_name == "openai" && c.openai_api_key.is_none() {
            return Err(PodcastError::MissingCredential {
                name: "OPENAI_API_KEY",
            });
        }

        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = PodcastConfig::default();
        assert_eq!(c.text_model, "gpt-4o-mini");
        assert_eq!(c.audio_model, "tts-1");
        assert_eq!(c.voices, SpeakerVoices::new("alloy", "echo"));
        assert_eq!(c.fish_voices, SpeakerVoices::new("xing", "dong"));
        assert_eq!(c.retry.max_attempts, 4);
        assert!(c.concurrency >= 1);
        assert_eq!(c.output_dir, PathBuf::from("./tmp"));
    }

    #[test]
    fn build_requires_openai_key_by_default() {
        let err = PodcastConfig::builder().build().unwrap_err();
        assert!(matches!(
            err,
            PodcastError::MissingCredential {
                name: "OPENAI_API_KEY"
            }
        ));
    }

    #[test]
    fn fish_audio_requires_its_own_key() {
        let err = PodcastConfig::builder()
            .openai_api_key("sk-test")
            .tts_provider(TtsProvider::FishAudio)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            PodcastError::MissingCredential {
                name: "FISH_AUDIO_API_KEY"
            }
        ));
    }

    #[test]
    fn unknown_openai_voice_rejected() {
        let err = PodcastConfig::builder()
            .openai_api_key("sk-test")
            .speaker_voices("alloy", "darth")
            .build()
            .unwrap_err();
        match err {
            PodcastError::UnknownVoice { voice, known, .. } => {
                assert_eq!(voice, "darth");
                assert!(known.contains("shimmer"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn fish_voice_names_resolve_to_reference_ids() {
        let v = SpeakerVoices::new("zhou", "yang")
            .resolve(TtsProvider::FishAudio)
            .unwrap();
        assert_eq!(v.speaker_1, "d8cb9a2a89844babbeeda24c974a0af2");
        assert_eq!(v.speaker_2, "afb76b7abffd48c49bed68cc01054fab");
    }

    #[test]
    fn fish_accepts_raw_reference_id() {
        let id = "0123456789ABCDEF0123456789abcdef";
        assert_eq!(
            TtsProvider::FishAudio.resolve_voice(id).unwrap(),
            id.to_ascii_lowercase()
        );
        assert!(TtsProvider::FishAudio.resolve_voice("alloy").is_err());
    }

    #[test]
    fn concurrency_floor_is_one() {
        let c = PodcastConfig::builder()
            .openai_api_key("sk-test")
            .concurrency(0)
            .build()
            .unwrap();
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn zero_attempts_rejected() {
        let err = PodcastConfig::builder()
            .openai_api_key("sk-test")
            .max_attempts(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, PodcastError::InvalidConfig(_)));
    }

    #[test]
    fn retry_backoff_doubles() {
        let p = RetryPolicy {
            max_attempts: 4,
            backoff_ms: 500,
        };
        assert_eq!(p.delay_before(0), Duration::ZERO);
        assert_eq!(p.delay_before(1), Duration::from_millis(500));
        assert_eq!(p.delay_before(2), Duration::from_millis(1000));
        assert_eq!(p.delay_before(3), Duration::from_millis(2000));
    }

    #[test]
    fn debug_redacts_keys() {
        let c = PodcastConfig::builder()
            .openai_api_key("sk-secret-value")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-secret-value"));
        assert!(dbg.contains("<set>"));
    }

    #[test]
    fn base_urls_lose_trailing_slash() {
        let c = PodcastConfig::builder()
            .openai_api_key("sk-test")
            .openai_base_url("http://localhost:8080/v1/")
            .build()
            .unwrap();
        assert_eq!(c.openai_base_url, "http://localhost:8080/v1");
    }
}
