//! The dialogue script: the typed contract between the LLM and the TTS fan-out.
//!
//! The LLM must answer with exactly this JSON shape:
//!
//! ```json
//! {
//!   "scratchpad": "brainstorming notes…",
//!   "dialogue": [
//!     { "speaker": "speaker-1", "text": "…" },
//!     { "speaker": "speaker-2", "text": "…" }
//!   ]
//! }
//! ```
//!
//! [`parse_script`] is the only correctness gate between free-form model
//! output and the synthesis stage. Anything it rejects is a [`ScriptError`]
//! and triggers a retry of the whole generation request.

use crate::error::ScriptError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two podcast voices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Speaker {
    /// Host.
    #[serde(rename = "speaker-1")]
    SpeakerA,
    /// Guest.
    #[serde(rename = "speaker-2")]
    SpeakerB,
}

impl Speaker {
    /// Wire label, also used as the transcript prefix.
    pub fn label(self) -> &'static str {
        match self {
            Speaker::SpeakerA => "speaker-1",
            Speaker::SpeakerB => "speaker-2",
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One attributed utterance. Its index in [`DialogueScript::lines`] fixes
/// both transcript order and audio order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueLine {
    pub speaker: Speaker,
    pub text: String,
}

impl DialogueLine {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }

    /// `"{speaker}: {text}"`, without the trailing separator.
    pub fn transcript_entry(&self) -> String {
        format!("{}: {}", self.speaker, self.text)
    }
}

/// The validated LLM output for one job.
///
/// `scratchpad` is the model's brainstorming notes; it is kept for
/// traceability and never voiced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueScript {
    pub scratchpad: String,
    #[serde(rename = "dialogue")]
    pub lines: Vec<DialogueLine>,
}

impl DialogueScript {
    /// Total characters that will be sent to the TTS provider.
    pub fn character_count(&self) -> usize {
        self.lines.iter().map(|l| l.text.chars().count()).sum()
    }
}

// Models often wrap JSON in ```json … ``` despite being told not to.
static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*```[A-Za-z]*\s*\n(.*?)\n?\s*```\s*$").unwrap());

fn strip_code_fence(raw: &str) -> &str {
    match FENCED_JSON.captures(raw).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => raw.trim(),
    }
}

/// Parse and validate raw model output into a [`DialogueScript`].
///
/// Accepts the bare JSON object or the same object inside a single Markdown
/// code fence. Rejects: invalid JSON, missing `scratchpad`/`dialogue`, a
/// speaker other than `speaker-1`/`speaker-2`, an empty dialogue, and any
/// line whose text is blank.
pub fn parse_script(raw: &str) -> Result<DialogueScript, ScriptError> {
    let script: DialogueScript = serde_json::from_str(strip_code_fence(raw))?;

    if script.lines.is_empty() {
        return Err(ScriptError::EmptyDialogue);
    }
    if let Some(index) = script.lines.iter().position(|l| l.text.trim().is_empty()) {
        return Err(ScriptError::BlankLine { index });
    }

    Ok(script)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "scratchpad": "outline",
        "dialogue": [
            {"speaker": "speaker-1", "text": "Welcome back."},
            {"speaker": "speaker-2", "text": "Glad to be here."}
        ]
    }"#;

    #[test]
    fn parses_valid_script_in_order() {
        let script = parse_script(VALID).unwrap();
        assert_eq!(script.scratchpad, "outline");
        assert_eq!(
            script.lines,
            vec![
                DialogueLine::new(Speaker::SpeakerA, "Welcome back."),
                DialogueLine::new(Speaker::SpeakerB, "Glad to be here."),
            ]
        );
    }

    #[test]
    fn accepts_fenced_json() {
        let fenced = format!("```json\n{VALID}\n```");
        assert_eq!(parse_script(&fenced).unwrap().lines.len(), 2);
    }

    #[test]
    fn rejects_unknown_speaker() {
        let raw = r#"{"scratchpad":"","dialogue":[{"speaker":"host","text":"hi"}]}"#;
        assert!(matches!(parse_script(raw), Err(ScriptError::Malformed(_))));
    }

    #[test]
    fn rejects_missing_scratchpad() {
        let raw = r#"{"dialogue":[{"speaker":"speaker-1","text":"hi"}]}"#;
        assert!(matches!(parse_script(raw), Err(ScriptError::Malformed(_))));
    }

    #[test]
    fn rejects_prose() {
        assert!(matches!(
            parse_script("Sure! Here is your podcast:"),
            Err(ScriptError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_empty_dialogue() {
        let raw = r#"{"scratchpad":"x","dialogue":[]}"#;
        assert!(matches!(parse_script(raw), Err(ScriptError::EmptyDialogue)));
    }

    #[test]
    fn rejects_blank_line_text() {
        let raw = r#"{"scratchpad":"x","dialogue":[
            {"speaker":"speaker-1","text":"ok"},
            {"speaker":"speaker-2","text":"   "}
        ]}"#;
        assert!(matches!(
            parse_script(raw),
            Err(ScriptError::BlankLine { index: 1 })
        ));
    }

    #[test]
    fn speaker_serialises_to_wire_label() {
        assert_eq!(
            serde_json::to_string(&Speaker::SpeakerB).unwrap(),
            "\"speaker-2\""
        );
        assert_eq!(Speaker::SpeakerA.to_string(), "speaker-1");
    }

    #[test]
    fn character_count_counts_chars_not_bytes() {
        let script = DialogueScript {
            scratchpad: String::new(),
            lines: vec![
                DialogueLine::new(Speaker::SpeakerA, "你好"),
                DialogueLine::new(Speaker::SpeakerB, "hey"),
            ],
        };
        assert_eq!(script.character_count(), 5);
    }
}
