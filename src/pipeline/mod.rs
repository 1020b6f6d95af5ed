//! Pipeline stages for PDF-to-podcast conversion.
//!
//! Each submodule implements one step; [`crate::job`] runs them in order.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ generate ──▶ synthesize ──▶ assemble
//! (URL/path)  (pdfium)   (LLM JSON)   (TTS fan-out)  (MP3 + transcript)
//! ```
//!
//! 1. [`input`]: local paths and downloaded URLs, `%PDF`-checked
//! 2. [`extract`]: page text via pdfium, on the blocking pool
//! 3. [`generate`]: one LLM call with schema validation and retry
//! 4. [`synthesize`]: one TTS request per line, bounded concurrency
//! 5. [`assemble`]: reorder by line index, concatenate, render transcript

pub mod assemble;
pub mod extract;
pub mod generate;
pub mod input;
pub mod synthesize;
