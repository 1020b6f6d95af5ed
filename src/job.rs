//! Job runner: one call from document list to stored podcast.
//!
//! ```text
//! EXTRACTING ──▶ GENERATING ──▶ SYNTHESIZING ──▶ ASSEMBLING ──▶ DONE
//!      │              │               │               │
//!      └──────────────┴───────┬───────┴───────────────┘
//!                             ▼
//!                          FAILED
//! ```
//!
//! Stages run strictly in order and every stage is all-or-nothing: the first
//! error ends the job, nothing is written to the audio store, and the caller
//! gets a single [`PodcastError`].

use crate::config::PodcastConfig;
use crate::error::PodcastError;
use crate::output::{JobOutput, JobStats};
use crate::pipeline::assemble::assemble;
use crate::pipeline::extract::{extract_text, DocumentReader, PdfiumReader};
use crate::pipeline::generate::{dialogue_model_for, generate_script};
use crate::pipeline::input::resolve_documents;
use crate::pipeline::synthesize::{synthesis_requests, synthesize_lines};
use crate::speech::speech_provider_for;
use crate::storage::AudioStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Where a job is. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Extracting,
    Generating,
    Synthesizing,
    Assembling,
    Done,
    Failed,
}

impl JobStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStage::Done | JobStage::Failed)
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStage::Extracting => "extracting",
            JobStage::Generating => "generating",
            JobStage::Synthesizing => "synthesizing",
            JobStage::Assembling => "assembling",
            JobStage::Done => "done",
            JobStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Turn `documents` (paths or URLs) into a stored podcast.
///
/// # Errors
/// Any stage failure. On error no audio file is left in
/// `config.output_dir`.
pub async fn run_job<S: AsRef<str>>(
    documents: &[S],
    config: &PodcastConfig,
) -> Result<JobOutput, PodcastError> {
    run_job_with_reader(documents, config, Arc::new(PdfiumReader)).await
}

/// [`run_job`] with a caller-supplied PDF text reader.
pub async fn run_job_with_reader<S: AsRef<str>>(
    documents: &[S],
    config: &PodcastConfig,
    reader: Arc<dyn DocumentReader>,
) -> Result<JobOutput, PodcastError> {
    let outcome = run_stages(documents, config, reader).await;

    let terminal = match &outcome {
        Ok(output) => {
            info!(
                "Podcast ready: {} lines, {} bytes, {}ms total -> {}",
                output.stats.dialogue_lines,
                output.stats.audio_bytes,
                output.stats.total_duration_ms,
                output.audio_path.display()
            );
            JobStage::Done
        }
        Err(e) => {
            error!("Job failed while {}: {}", e.stage(), e);
            JobStage::Failed
        }
    };
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage(terminal);
    }

    outcome
}

/// Blocking wrapper around [`run_job`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_job_sync<S: AsRef<str>>(
    documents: &[S],
    config: &PodcastConfig,
) -> Result<JobOutput, PodcastError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PodcastError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run_job(documents, config))
}

async fn run_stages<S: AsRef<str>>(
    documents: &[S],
    config: &PodcastConfig,
    reader: Arc<dyn DocumentReader>,
) -> Result<JobOutput, PodcastError> {
    let total_start = Instant::now();
    let stage = |s: JobStage| {
        if let Some(ref cb) = config.progress_callback {
            cb.on_stage(s);
        }
    };

    // Both providers are built before any work so a bad credential costs
    // nothing.
    let model = dialogue_model_for(config)?;
    let speaker = speech_provider_for(config)?;
    let voices = match config.speech_provider {
        Some(_) => config.active_voices().clone(),
        None => config.active_voices().resolve(config.tts_provider)?,
    };

    // ── Extracting ───────────────────────────────────────────────────────
    stage(JobStage::Extracting);
    let extract_start = Instant::now();
    let docs = resolve_documents(documents, config.download_timeout_secs).await?;
    let source_text = extract_text(docs.paths(), reader).await?;
    if source_text.trim().is_empty() {
        return Err(PodcastError::NoExtractableText {
            documents: docs.len(),
        });
    }
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
    info!(
        "Extracted {} chars from {} document(s) in {}ms",
        source_text.chars().count(),
        docs.len(),
        extract_duration_ms
    );

    // ── Generating ───────────────────────────────────────────────────────
    stage(JobStage::Generating);
    let generated = generate_script(model.as_ref(), &source_text, config).await?;
    let script = generated.script;
    let tts_chars = script.character_count();
    if let Some(ref cb) = config.progress_callback {
        cb.on_script_ready(script.lines.len(), tts_chars);
    }

    // ── Synthesizing ─────────────────────────────────────────────────────
    stage(JobStage::Synthesizing);
    let synth_start = Instant::now();
    info!(
        "Synthesizing {} lines ({} chars) via {}, {} at a time",
        script.lines.len(),
        tts_chars,
        speaker.name(),
        config.concurrency
    );
    let requests = synthesis_requests(&script, &voices);
    let results = synthesize_lines(
        speaker,
        requests,
        config.concurrency,
        config.progress_callback.as_ref(),
    )
    .await?;
    let synthesize_duration_ms = synth_start.elapsed().as_millis() as u64;

    // ── Assembling ───────────────────────────────────────────────────────
    stage(JobStage::Assembling);
    let podcast = assemble(&script.lines, results)?;
    let audio_bytes = podcast.audio.len();
    let audio_path = AudioStore::new(&config.output_dir)
        .persist(podcast.audio)
        .await?;

    let stats = JobStats {
        documents: docs.len(),
        source_chars: source_text.chars().count(),
        dialogue_lines: script.lines.len(),
        tts_chars,
        audio_bytes,
        generation_attempts: generated.attempts,
        input_tokens: generated.input_tokens,
        output_tokens: generated.output_tokens,
        extract_duration_ms,
        generate_duration_ms: generated.duration_ms,
        synthesize_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    Ok(JobOutput {
        audio_path,
        transcript: podcast.transcript,
        source_text,
        script,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names() {
        assert_eq!(JobStage::Synthesizing.to_string(), "synthesizing");
        assert_eq!(
            serde_json::to_string(&JobStage::Failed).unwrap(),
            "\"failed\""
        );
    }

    #[test]
    fn only_done_and_failed_are_terminal() {
        assert!(JobStage::Done.is_terminal());
        assert!(JobStage::Failed.is_terminal());
        assert!(!JobStage::Assembling.is_terminal());
    }
}
