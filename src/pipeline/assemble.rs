//! Assembly: put synthesized audio back into script order.
//!
//! Each result is written into the slot of its own line index, so arrival
//! order is irrelevant. The MP3 segments are then concatenated byte-for-byte:
//! MP3 is a sequence of self-contained frames, so independently encoded
//! segments play back-to-back without re-muxing.

use crate::error::PodcastError;
use crate::output::{AssembledPodcast, SynthesisResult};
use crate::script::DialogueLine;

/// `"speaker-N: text\n\n"` for every line, in order.
pub fn build_transcript(lines: &[DialogueLine]) -> String {
    let mut transcript = String::new();
    for line in lines {
        transcript.push_str(&line.transcript_entry());
        transcript.push_str("\n\n");
    }
    transcript
}

/// Reorder `results` by line index and join them with the transcript.
///
/// Requires exactly one result per line: a missing, duplicated or
/// out-of-range index is an internal error, never silently skipped.
pub fn assemble(
    lines: &[DialogueLine],
    results: Vec<SynthesisResult>,
) -> Result<AssembledPodcast, PodcastError> {
    if results.len() != lines.len() {
        return Err(PodcastError::Internal(format!(
            "{} synthesis results for {} dialogue lines",
            results.len(),
            lines.len()
        )));
    }

    let mut slots: Vec<Option<Vec<u8>>> = vec![None; lines.len()];
    for SynthesisResult { line_index, audio } in results {
        match slots.get_mut(line_index) {
            Some(slot @ None) => *slot = Some(audio),
            Some(Some(_)) => {
                return Err(PodcastError::Internal(format!(
                    "duplicate audio for line {}",
                    line_index + 1
                )))
            }
            None => {
                return Err(PodcastError::Internal(format!(
                    "audio for line {} but script has {} lines",
                    line_index + 1,
                    lines.len()
                )))
            }
        }
    }

    let total: usize = slots.iter().flatten().map(Vec::len).sum();
    let mut audio = Vec::with_capacity(total);
    for (idx, slot) in slots.into_iter().enumerate() {
        let segment = slot.ok_or_else(|| {
            PodcastError::Internal(format!("no audio for line {}", idx + 1))
        })?;
        audio.extend_from_slice(&segment);
    }

    Ok(AssembledPodcast {
        audio,
        transcript: build_transcript(lines),
    })
}
