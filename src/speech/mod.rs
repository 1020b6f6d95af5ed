//! Text-to-speech providers.
//!
//! Both services are reached through the [`SpeechProvider`] capability:
//! "turn this text, spoken by this voice, into MP3 bytes". The synthesizer
//! only ever sees `Arc<dyn SpeechProvider>`, so the job can swap a provider
//! (or a test stub) without touching the fan-out logic.
//!
//! | Provider | Voices | Response |
//! |----------|--------|----------|
//! | [`OpenAiSpeech`] | `alloy`, `echo`, `fable`, `onyx`, `nova`, `shimmer` | streamed body, concatenated |
//! | [`FishAudioSpeech`] | custom reference ids (`zhou`, `dong`, `xing`, `yang`) | single-shot body |

pub mod fish_audio;
pub mod openai;

pub use fish_audio::FishAudioSpeech;
pub use openai::OpenAiSpeech;

use crate::config::{PodcastConfig, TtsProvider};
use crate::error::{PodcastError, SpeechError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Convert a text snippet into audio bytes with a given voice.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Short provider name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Synthesise `text` with `voice_id` (already resolved to a wire id).
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, SpeechError>;
}

/// The speech provider a job should use: the pre-built override if present,
/// otherwise an HTTP client for `config.tts_provider`.
pub fn speech_provider_for(config: &PodcastConfig) -> Result<Arc<dyn SpeechProvider>, PodcastError> {
    if let Some(ref provider) = config.speech_provider {
        return Ok(Arc::clone(provider));
    }

    let client = http_client(config.tts_timeout_secs)?;
    match config.tts_provider {
        TtsProvider::OpenAi => {
            let key = config
                .openai_api_key
                .clone()
                .ok_or(PodcastError::MissingCredential {
                    name: "OPENAI_API_KEY",
                })?;
            Ok(Arc::new(OpenAiSpeech::new(
                client,
                &config.openai_base_url,
                key,
                &config.audio_model,
                config.tts_timeout_secs,
            )))
        }
        TtsProvider::FishAudio => {
            let key = config
                .fish_audio_api_key
                .clone()
                .ok_or(PodcastError::MissingCredential {
                    name: "FISH_AUDIO_API_KEY",
                })?;
            Ok(Arc::new(FishAudioSpeech::new(
                client,
                &config.fish_audio_base_url,
                key,
                config.tts_timeout_secs,
            )))
        }
    }
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client, PodcastError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| PodcastError::Internal(format!("Failed to build HTTP client: {e}")))
}

/// Map a reqwest failure, separating timeouts from other transport errors.
pub(crate) fn transport_error(e: reqwest::Error, timeout_secs: u64) -> SpeechError {
    if e.is_timeout() {
        SpeechError::Timeout { secs: timeout_secs }
    } else {
        SpeechError::Transport(e)
    }
}

/// Turn a non-2xx response into [`SpeechError::Http`], keeping the body for
/// diagnosis.
pub(crate) async fn reject_status(resp: reqwest::Response) -> Result<reqwest::Response, SpeechError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(SpeechError::Http {
        status: status.as_u16(),
        body,
    })
}

/// A minimal one-shot HTTP/1.1 server for exercising the providers' wire
/// format without network access.
#[cfg(test)]
pub(crate) mod fake_http {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one request, answering `status` with `body`. The handle
    /// resolves to the raw request (headers and body) as text.
    pub async fn serve_once(status: u16, body: Vec<u8>) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                if request_complete(&raw) {
                    break;
                }
            }

            let reason = if status == 200 { "OK" } else { "Error" };
            let head = format!(
                "HTTP/1.1 {status} {reason}\r\nContent-Type: audio/mpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            socket.shutdown().await.ok();

            String::from_utf8_lossy(&raw).into_owned()
        });

        (url, handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|l| {
                let (name, value) = l.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        raw.len() >= header_end + 4 + content_length
    }

    /// The JSON body of a captured request.
    pub fn json_body(raw: &str) -> serde_json::Value {
        let body = raw.split_once("\r\n\r\n").map(|(_, b)| b).unwrap_or("");
        serde_json::from_str(body).unwrap()
    }
}
