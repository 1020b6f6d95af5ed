//! # pdf2podcast
//!
//! Turn PDF documents into a two-speaker podcast: an MP3 file plus a
//! speaker-attributed transcript.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF(s)
//!  │
//!  ├─ 1. Input       resolve local files, download URLs
//!  ├─ 2. Extract     page text via pdfium (spawn_blocking)
//!  ├─ 3. Generate    LLM writes a JSON dialogue script, validated and retried
//!  ├─ 4. Synthesize  one TTS call per line, at most `concurrency` in flight
//!  ├─ 5. Assemble    reorder by line index, concatenate MP3 segments
//!  └─ 6. Store       unique podcast-*.mp3 in the output directory
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2podcast::{run_job, PodcastConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // OPENAI_API_KEY drives both the dialogue model and the voices.
//!     let config = PodcastConfig::from_env().build()?;
//!     let output = run_job(&["paper.pdf"], &config).await?;
//!     println!("{}", output.transcript);
//!     eprintln!("audio: {}", output.audio_path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2podcast` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## Voices
//!
//! | Provider | Speaker voices | Credential |
//! |----------|----------------|------------|
//! | OpenAI (default) | `alloy`, `echo`, `fable`, `onyx`, `nova`, `shimmer` | `OPENAI_API_KEY` |
//! | Fish Audio | `zhou`, `dong`, `xing`, `yang`, or a raw reference id | `FISH_AUDIO_API_KEY` |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod job;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod script;
pub mod speech;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PodcastConfig, PodcastConfigBuilder, RetryPolicy, SpeakerVoices, TtsProvider};
pub use error::{PodcastError, ScriptError, SpeechError};
pub use job::{run_job, run_job_sync, run_job_with_reader, JobStage};
pub use output::{JobOutput, JobStats};
pub use pipeline::extract::{DocumentReader, PdfiumReader};
pub use pipeline::generate::{DialogueModel, ModelReply};
pub use progress::{JobProgressCallback, NoopProgressCallback, ProgressCallback};
pub use prompts::InstructionTemplate;
pub use script::{DialogueLine, DialogueScript, Speaker};
pub use speech::{FishAudioSpeech, OpenAiSpeech, SpeechProvider};
pub use storage::AudioStore;
