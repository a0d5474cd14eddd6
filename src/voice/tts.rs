//! Text-to-speech (TTS) synthesis

use crate::{Error, Result};

/// Synthesizes speech from text via an OpenAI-compatible speech API
#[derive(Debug)]
pub struct TextToSpeech {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    voice: String,
    speed: f32,
}

impl TextToSpeech {
    /// Create a new TTS instance
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(
        base_url: &str,
        api_key: String,
        model: String,
        voice: String,
        speed: f32,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("API key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            voice,
            speed,
        })
    }

    /// Synthesize text to speech
    ///
    /// # Returns
    ///
    /// Audio bytes (MP3 format)
    ///
    /// # Errors
    ///
    /// Returns `Error::Synthesis` if the request fails
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct SpeechRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
        };

        let url = format!("{}/audio/speech", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Synthesis(format!("request to {url} failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Synthesis(format!("TTS error {status}: {body}")));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| Error::Synthesis(format!("failed to read audio body: {e}")))?;
        Ok(audio.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_key_is_rejected() {
        let err = TextToSpeech::new(
            "https://api.openai.com/v1",
            String::new(),
            "tts-1".to_string(),
            "alloy".to_string(),
            1.0,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let tts = TextToSpeech::new(
            "https://api.openai.com/v1/",
            "key".to_string(),
            "tts-1".to_string(),
            "alloy".to_string(),
            1.0,
        )
        .unwrap();
        assert_eq!(tts.base_url, "https://api.openai.com/v1");
    }
}
