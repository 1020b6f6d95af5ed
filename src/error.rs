//! Error types for the pdf2podcast library.
//!
//! Three error types, one per failure scope:
//!
//! * [`PodcastError`] (fatal): the job cannot produce audio (missing
//!   credential, unreadable PDF, LLM outage, a failed TTS line, disk full).
//!   Returned as `Err(PodcastError)` from [`crate::job::run_job`].
//!
//! * [`ScriptError`] (retryable): the LLM answered, but the answer does not
//!   parse into a [`crate::script::DialogueScript`]. Only this type makes the
//!   dialogue generator try again.
//!
//! * [`SpeechError`]: a single TTS request failed. The synthesizer wraps it in
//!   [`PodcastError::SynthesisFailed`] together with the line index.
//!
//! There is no partial-output mode: any fatal error means no audio and no
//! transcript.

use crate::job::JobStage;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2podcast library.
#[derive(Debug, Error)]
pub enum PodcastError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// A credential required by the selected provider is absent.
    #[error("{name} is not set.\nExport it or add it to .env before starting a job.")]
    MissingCredential { name: &'static str },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A speaker voice is not in the selected provider's catalogue.
    #[error("Unknown voice '{voice}' for provider '{provider}'. Known voices: {known}")]
    UnknownVoice {
        provider: &'static str,
        voice: String,
        known: String,
    },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// pdfium could not open the document or read a page's text layer.
    #[error("Could not extract text from '{path}': {detail}")]
    ExtractionFailed { path: PathBuf, detail: String },

    /// Every page of every document was empty: nothing to talk about.
    #[error("No extractable text in {documents} document(s).\nScanned PDFs need OCR before conversion.")]
    NoExtractableText { documents: usize },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium system-wide, or set PDFIUM_LIB_PATH to the directory\n\
containing libpdfium.so / libpdfium.dylib / pdfium.dll.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Generation errors ─────────────────────────────────────────────────
    /// The LLM provider could not be constructed.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM call failed for a reason other than a malformed answer.
    #[error("Dialogue generation failed: {message}")]
    GenerationFailed { message: String },

    /// The LLM call did not return before the configured timeout.
    #[error("Dialogue generation timed out after {secs}s")]
    GenerationTimeout { secs: u64 },

    /// Every attempt returned a response that failed schema validation.
    #[error("LLM returned an invalid dialogue script {attempts} time(s) in a row.\nLast error: {last_error}")]
    ScriptValidationExhausted {
        attempts: u32,
        #[source]
        last_error: ScriptError,
    },

    // ── Synthesis errors ──────────────────────────────────────────────────
    /// One dialogue line could not be voiced; the whole job is abandoned.
    #[error("Speech synthesis failed for dialogue line {} via {provider}: {source}", .line_index + 1)]
    SynthesisFailed {
        /// 0-based index into the dialogue script.
        line_index: usize,
        provider: &'static str,
        #[source]
        source: SpeechError,
    },

    // ── Persistence errors ────────────────────────────────────────────────
    /// Could not create or write the final audio file.
    #[error("Failed to write audio file '{path}': {source}")]
    AudioWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An audio handle does not name a file inside the store.
    #[error("Audio handle '{handle}' does not refer to a stored file")]
    UnknownAudioHandle { handle: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PodcastError {
    /// The job stage this error belongs to.
    ///
    /// Configuration errors surface before any stage starts and are reported
    /// as [`JobStage::Extracting`], the first stage the job would have entered.
    pub fn stage(&self) -> JobStage {
        use PodcastError::*;
        match self {
            MissingCredential { .. }
            | InvalidConfig(_)
            | UnknownVoice { .. }
            | FileNotFound { .. }
            | PermissionDenied { .. }
            | NotAPdf { .. }
            | DownloadFailed { .. }
            | DownloadTimeout { .. }
            | ExtractionFailed { .. }
            | NoExtractableText { .. }
            | PdfiumBindingFailed(_) => JobStage::Extracting,
            ProviderNotConfigured { .. }
            | GenerationFailed { .. }
            | GenerationTimeout { .. }
            | ScriptValidationExhausted { .. } => JobStage::Generating,
            SynthesisFailed { .. } => JobStage::Synthesizing,
            AudioWriteFailed { .. } | UnknownAudioHandle { .. } | Internal(_) => {
                JobStage::Assembling
            }
        }
    }

    /// True for errors raised while validating configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PodcastError::MissingCredential { .. }
                | PodcastError::InvalidConfig(_)
                | PodcastError::UnknownVoice { .. }
        )
    }
}

/// The LLM response did not match the dialogue-script schema.
///
/// Recoverable: the generator retries the whole request while its
/// [`crate::config::RetryPolicy`] allows.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Not JSON, missing fields, or a speaker outside `speaker-1`/`speaker-2`.
    #[error("response does not match the dialogue schema: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Parsed, but the dialogue array is empty.
    #[error("dialogue contains no lines")]
    EmptyDialogue,

    /// Parsed, but one line has no speakable text.
    #[error("dialogue line {} has empty text", .index + 1)]
    BlankLine { index: usize },
}

/// A single TTS request failed.
#[derive(Debug, Error)]
pub enum SpeechError {
    /// Connection, TLS or body-read failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The request exceeded the client timeout.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The provider answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The provider answered 200 with an empty body.
    #[error("provider returned no audio")]
    EmptyAudio,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesis_failure_names_the_line_one_based() {
        let e = PodcastError::SynthesisFailed {
            line_index: 2,
            provider: "openai",
            source: SpeechError::Http {
                status: 503,
                body: "overloaded".into(),
            },
        };
        let msg = e.to_string();
        assert!(msg.contains("line 3"), "got: {msg}");
        assert!(msg.contains("openai"), "got: {msg}");
        assert!(msg.contains("503"), "got: {msg}");
        assert_eq!(e.stage(), JobStage::Synthesizing);
    }

    #[test]
    fn missing_credential_display() {
        let e = PodcastError::MissingCredential {
            name: "FISH_AUDIO_API_KEY",
        };
        assert!(e.to_string().contains("FISH_AUDIO_API_KEY"));
        assert!(e.is_configuration());
    }

    #[test]
    fn validation_exhausted_keeps_source() {
        let e = PodcastError::ScriptValidationExhausted {
            attempts: 4,
            last_error: ScriptError::EmptyDialogue,
        };
        assert!(e.to_string().contains("4 time(s)"));
        assert!(std::error::Error::source(&e).is_some());
        assert_eq!(e.stage(), JobStage::Generating);
    }

    #[test]
    fn blank_line_display_is_one_based() {
        let e = ScriptError::BlankLine { index: 0 };
        assert_eq!(e.to_string(), "dialogue line 1 has empty text");
    }

    #[test]
    fn extraction_error_names_path() {
        let e = PodcastError::ExtractionFailed {
            path: PathBuf::from("/tmp/broken.pdf"),
            detail: "bad xref".into(),
        };
        assert!(e.to_string().contains("/tmp/broken.pdf"));
        assert_eq!(e.stage(), JobStage::Extracting);
    }
}
