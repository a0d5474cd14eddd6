//! Voice output: speech synthesis, audio artifacts, and playback

mod playback;
mod tts;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::config::Config;
use crate::{Error, Result};

pub use playback::{AudioPlayback, Interrupt};
pub use tts::TextToSpeech;

/// Speaks a reply: synthesize, persist the audio artifact, play it back
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Speak `text`, keying any audio artifact by the turn's timestamp
    ///
    /// # Errors
    ///
    /// Returns `Error::Synthesis` or `Error::Audio` on failure; callers
    /// treat either as a recoverable per-turn condition.
    async fn speak(&self, text: &str, stamp: &str) -> Result<()>;
}

/// Full voice output path: HTTP synthesis, file artifact, cpal playback
pub struct VoiceOutput {
    tts: TextToSpeech,
    playback: AudioPlayback,
    sound_dir: PathBuf,
    keep_generated_file: bool,
    read_after_generate: bool,
}

impl VoiceOutput {
    /// Build the voice output stack from configuration. The `interrupt`
    /// handle must already have its listener installed.
    ///
    /// # Errors
    ///
    /// Returns error if the TTS client cannot be created or no audio
    /// output device is available.
    pub fn new(config: &Config, interrupt: Interrupt) -> Result<Self> {
        let tts = TextToSpeech::new(
            &config.voice.tts_base_url,
            config.api_key(),
            config.voice.tts_model.clone(),
            config.voice.tts_voice.clone(),
            config.voice.tts_speed,
        )?;
        let playback = AudioPlayback::new(interrupt)?;

        Ok(Self {
            tts,
            playback,
            sound_dir: config.artifacts.sound_dir.clone(),
            keep_generated_file: config.artifacts.keep_generated_file,
            read_after_generate: config.voice.read_after_generate,
        })
    }

    /// Artifact path for one turn: timestamped when kept, a reused
    /// scratch file otherwise
    fn audio_path(&self, stamp: &str) -> PathBuf {
        if self.keep_generated_file {
            self.sound_dir.join(format!("{stamp}-sound.mp3"))
        } else {
            self.sound_dir.join("stream.mp3")
        }
    }
}

#[async_trait]
impl SpeechEngine for VoiceOutput {
    async fn speak(&self, text: &str, stamp: &str) -> Result<()> {
        let audio = self.tts.synthesize(text).await?;

        let path = self.audio_path(stamp);
        std::fs::write(&path, &audio)
            .map_err(|e| Error::Synthesis(format!("failed to write {}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), bytes = audio.len(), "audio artifact written");

        if self.read_after_generate {
            self.playback.play_mp3(&audio).await?;
        }
        Ok(())
    }
}

/// No-op engine for headless operation (`--disable-voice`)
pub struct NullSpeech;

#[async_trait]
impl SpeechEngine for NullSpeech {
    async fn speak(&self, _text: &str, _stamp: &str) -> Result<()> {
        tracing::debug!("voice disabled, skipping synthesis");
        Ok(())
    }
}
