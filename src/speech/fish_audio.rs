//! Fish Audio speech: `POST {base}/v1/tts` with a custom reference voice.

use super::{reject_status, transport_error, SpeechProvider};
use crate::error::SpeechError;
use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

#[derive(Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    reference_id: &'a str,
}

/// Fish Audio TTS client. The voice id is a reference model id.
pub struct FishAudioSpeech {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout_secs: u64,
}

impl FishAudioSpeech {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            client,
            endpoint: format!("{}/v1/tts", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            timeout_secs,
        }
    }
}

#[async_trait]
impl SpeechProvider for FishAudioSpeech {
    fn name(&self) -> &'static str {
        "fish-audio"
    }

    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, SpeechError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&TtsRequest {
                text,
                reference_id: voice_id,
            })
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout_secs))?;
        let resp = reject_status(resp).await?;

        let audio = resp
            .bytes()
            .await
            .map_err(|e| transport_error(e, self.timeout_secs))?
            .to_vec();

        if audio.is_empty() {
            return Err(SpeechError::EmptyAudio);
        }
        debug!("fish-audio: {} chars → {} bytes", text.chars().count(), audio.len());
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TtsProvider;
    use crate::speech::fake_http::{json_body, serve_once};

    #[tokio::test]
    async fn posts_text_and_reference_id() {
        let (url, server) = serve_once(200, vec![9, 8, 7]).await;
        let reference = TtsProvider::FishAudio.resolve_voice("dong").unwrap();

        let tts = FishAudioSpeech::new(reqwest::Client::new(), &url, "fish-key", 5);
        let audio = tts.synthesize("你好", &reference).await.unwrap();
        assert_eq!(audio, vec![9, 8, 7]);

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /v1/tts "), "got: {raw}");
        assert!(raw.to_ascii_lowercase().contains("authorization: bearer fish-key"));
        let body = json_body(&raw);
        assert_eq!(body["text"], "你好");
        assert_eq!(body["reference_id"], "22436dbbbfe94e0bb4e137725d16c8c2");
    }

    #[tokio::test]
    async fn non_200_is_http_error() {
        let (url, _server) = serve_once(402, b"insufficient balance".to_vec()).await;
        let tts = FishAudioSpeech::new(reqwest::Client::new(), &url, "fish-key", 5);
        match tts.synthesize("hi", "x").await {
            Err(SpeechError::Http { status, body }) => {
                assert_eq!(status, 402);
                assert!(body.contains("balance"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
