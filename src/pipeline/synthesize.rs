//! Speech synthesis fan-out: one TTS request per dialogue line.
//!
//! Requests are submitted in line order into a `buffer_unordered` window of
//! `concurrency` futures: at most that many calls are in flight and the rest
//! wait their turn. Results come back in completion order, tagged with
//! their line index; [`super::assemble`] restores script order.
//!
//! The first failing line ends the stage. Returning drops the stream, which
//! cancels every request still in flight.

use crate::config::SpeakerVoices;
use crate::error::PodcastError;
use crate::output::{SynthesisRequest, SynthesisResult};
use crate::progress::ProgressCallback;
use crate::script::DialogueScript;
use crate::speech::SpeechProvider;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, error};

/// One request per line, in line order, with the speaker's voice resolved.
pub fn synthesis_requests(script: &DialogueScript, voices: &SpeakerVoices) -> Vec<SynthesisRequest> {
    script
        .lines
        .iter()
        .enumerate()
        .map(|(line_index, line)| SynthesisRequest {
            line_index,
            text: line.text.clone(),
            voice_id: voices.for_speaker(line.speaker).to_string(),
        })
        .collect()
}

/// Voice every request with at most `concurrency` calls in flight.
///
/// Returns one result per request, in completion order.
pub async fn synthesize_lines(
    provider: Arc<dyn SpeechProvider>,
    requests: Vec<SynthesisRequest>,
    concurrency: usize,
    progress: Option<&ProgressCallback>,
) -> Result<Vec<SynthesisResult>, PodcastError> {
    let total = requests.len();
    let provider_name = provider.name();

    let mut pending = stream::iter(requests.into_iter().map(|req| {
        let provider = Arc::clone(&provider);
        let cb = progress.cloned();
        async move {
            if let Some(ref cb) = cb {
                cb.on_line_start(req.line_index, total);
            }
            debug!("Line {}/{}: {} chars", req.line_index + 1, total, req.text.chars().count());
            let outcome = provider.synthesize(&req.text, &req.voice_id).await;
            (req.line_index, outcome)
        }
    }))
    .buffer_unordered(concurrency.max(1));

    let mut results = Vec::with_capacity(total);
    while let Some((line_index, outcome)) = pending.next().await {
        match outcome {
            Ok(audio) => {
                if let Some(cb) = progress {
                    cb.on_line_complete(line_index, total, audio.len());
                }
                results.push(SynthesisResult { line_index, audio });
            }
            Err(source) => {
                error!("Line {}/{} failed via {}: {}", line_index + 1, total, provider_name, source);
                if let Some(cb) = progress {
                    cb.on_line_error(line_index, total, &source.to_string());
                }
                return Err(PodcastError::SynthesisFailed {
                    line_index,
                    provider: provider_name,
                    source,
                });
            }
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpeechError;
    use crate::script::{DialogueLine, Speaker};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Echoes `voice:text` as audio; tracks peak concurrency.
    struct Echo {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        delay_ms: u64,
    }

    impl Echo {
        fn new(delay_ms: u64) -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                delay_ms,
            }
        }
    }

    #[async_trait]
    impl SpeechProvider for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, SpeechError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(format!("{voice_id}:{text}").into_bytes())
        }
    }

    fn script(n: usize) -> DialogueScript {
        DialogueScript {
            scratchpad: String::new(),
            lines: (0..n)
                .map(|i| {
                    let speaker = if i % 2 == 0 { Speaker::SpeakerA } else { Speaker::SpeakerB };
                    DialogueLine::new(speaker, format!("line {i}"))
                })
                .collect(),
        }
    }

    #[test]
    fn requests_map_speakers_to_voices() {
        let reqs = synthesis_requests(&script(3), &SpeakerVoices::new("alloy", "echo"));
        let voices: Vec<&str> = reqs.iter().map(|r| r.voice_id.as_str()).collect();
        assert_eq!(voices, vec!["alloy", "echo", "alloy"]);
        assert_eq!(reqs[2].line_index, 2);
        assert_eq!(reqs[2].text, "line 2");
    }

    #[tokio::test]
    async fn in_flight_never_exceeds_concurrency() {
        let echo = Arc::new(Echo::new(10));
        let reqs = synthesis_requests(&script(12), &SpeakerVoices::new("a", "b"));
        let results = synthesize_lines(echo.clone(), reqs, 3, None).await.unwrap();

        assert_eq!(results.len(), 12);
        assert!(echo.peak.load(Ordering::SeqCst) <= 3);
        assert!(echo.peak.load(Ordering::SeqCst) >= 2, "requests should overlap");
    }

    #[tokio::test]
    async fn every_line_yields_exactly_one_result() {
        let reqs = synthesis_requests(&script(9), &SpeakerVoices::new("a", "b"));
        let results = synthesize_lines(Arc::new(Echo::new(1)), reqs, 4, None)
            .await
            .unwrap();
        let mut seen: Vec<usize> = results.iter().map(|r| r.line_index).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..9).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn empty_request_list_is_ok() {
        let results = synthesize_lines(Arc::new(Echo::new(0)), Vec::new(), 2, None)
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
