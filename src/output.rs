//! Types flowing out of the synthesis stage and out of a finished job.

use crate::script::DialogueScript;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One TTS request, derived from a dialogue line plus the speaker's voice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    /// 0-based position in the script.
    pub line_index: usize,
    pub text: String,
    /// OpenAI voice name, or Fish Audio reference id.
    pub voice_id: String,
}

/// Audio for one line, tagged with the line it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisResult {
    pub line_index: usize,
    pub audio: Vec<u8>,
}

/// Concatenated audio and the interleaved transcript, in line order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPodcast {
    pub audio: Vec<u8>,
    pub transcript: String,
}

/// The terminal artefact of one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutput {
    /// Opaque handle: the path of the stored MP3.
    pub audio_path: PathBuf,
    /// `"speaker-N: text"` entries, each followed by a blank line.
    pub transcript: String,
    /// Combined extracted text fed to the LLM.
    pub source_text: String,
    /// The validated script, scratchpad included.
    pub script: DialogueScript,
    pub stats: JobStats,
}

/// Timing and volume counters for one job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobStats {
    pub documents: usize,
    pub source_chars: usize,
    pub dialogue_lines: usize,
    /// Characters sent to the TTS provider.
    pub tts_chars: usize,
    pub audio_bytes: usize,
    /// LLM attempts including the successful one.
    pub generation_attempts: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub extract_duration_ms: u64,
    pub generate_duration_ms: u64,
    pub synthesize_duration_ms: u64,
    pub total_duration_ms: u64,
}
