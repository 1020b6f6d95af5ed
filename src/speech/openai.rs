//! OpenAI speech: `POST {base}/audio/speech`.
//!
//! The response body is consumed as a byte stream and concatenated, so a
//! long line never has to be buffered by reqwest as one allocation before
//! we see it.

use super::{reject_status, transport_error, SpeechProvider};
use crate::error::SpeechError;
use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use tracing::debug;

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'a str,
}

/// OpenAI TTS client for one audio model.
pub struct OpenAiSpeech {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

impl OpenAiSpeech {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: impl Into<String>,
        model: &str,
        timeout_secs: u64,
    ) -> Self {
        Self {
            client,
            endpoint: format!("{}/audio/speech", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.to_string(),
            timeout_secs,
        }
    }
}

#[async_trait]
impl SpeechProvider for OpenAiSpeech {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, SpeechError> {
        let body = SpeechRequest {
            model: &self.model,
            voice: voice_id,
            input: text,
            response_format: "mp3",
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout_secs))?;
        let resp = reject_status(resp).await?;

        let mut audio = Vec::new();
        let mut chunks = resp.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(|e| transport_error(e, self.timeout_secs))?;
            audio.extend_from_slice(&chunk);
        }

        if audio.is_empty() {
            return Err(SpeechError::EmptyAudio);
        }
        debug!("openai: {} chars → {} bytes ({})", text.chars().count(), audio.len(), voice_id);
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::fake_http::{json_body, serve_once};

    fn client() -> reqwest::Client {
        reqwest::Client::new()
    }

    #[tokio::test]
    async fn posts_model_voice_input_with_bearer_auth() {
        let mp3 = vec![0xFF, 0xFB, 0x90, 0x64, 1, 2, 3];
        let (url, server) = serve_once(200, mp3.clone()).await;

        let tts = OpenAiSpeech::new(client(), &format!("{url}/v1"), "sk-test", "tts-1-hd", 5);
        let audio = tts.synthesize("hello there", "nova").await.unwrap();
        assert_eq!(audio, mp3);

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /v1/audio/speech "), "got: {raw}");
        assert!(raw.to_ascii_lowercase().contains("authorization: bearer sk-test"));
        let body = json_body(&raw);
        assert_eq!(body["model"], "tts-1-hd");
        assert_eq!(body["voice"], "nova");
        assert_eq!(body["input"], "hello there");
    }

    #[tokio::test]
    async fn error_status_carries_body() {
        let (url, _server) = serve_once(401, b"invalid api key".to_vec()).await;
        let tts = OpenAiSpeech::new(client(), &url, "sk-bad", "tts-1", 5);
        match tts.synthesize("hi", "alloy").await {
            Err(SpeechError::Http { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid api key");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_body_is_an_error() {
        let (url, _server) = serve_once(200, Vec::new()).await;
        let tts = OpenAiSpeech::new(client(), &url, "sk-test", "tts-1", 5);
        assert!(matches!(
            tts.synthesize("hi", "alloy").await,
            Err(SpeechError::EmptyAudio)
        ));
    }
}
