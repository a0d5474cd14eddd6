//! Configuration management for parley
//!
//! Settings are loaded once at startup from a TOML file and treated as an
//! immutable snapshot for the whole session. Every field has a default so
//! a missing config file still yields a working setup.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Default bot-name placeholder token in the system directive
pub const BOT_NAME_PLACEHOLDER: &str = "{botName}";

/// Parley configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat completion endpoint settings
    pub chat: ChatConfig,

    /// Session loop behavior
    pub session: SessionConfig,

    /// Voice synthesis and playback settings
    pub voice: VoiceConfig,

    /// Audio / transcript artifact policy
    pub artifacts: ArtifactsConfig,
}

/// Chat completion endpoint configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Model identifier sent with each completion request
    pub model: String,

    /// Base URL of the OpenAI-compatible API
    pub base_url: String,

    /// API key; falls back to `OPENAI_API_KEY` env when absent
    pub api_key: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "llama-3.1-8b-lexi-uncensored-v2".to_string(),
            base_url: "http://localhost:1234/v1".to_string(),
            api_key: None,
        }
    }
}

/// Session loop configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// System directive establishing the assistant's persona.
    /// May contain the `{botName}` placeholder, substituted at render time.
    pub system_directive: String,

    /// Display name used for the bot's lines in rendered history
    pub bot_name: String,

    /// Memory window size in turn-pairs (one user + one bot turn per pair)
    pub memory_message_count: usize,

    /// Remove `<think>…</think>` spans from replies before speaking/printing
    pub strip_think_tags: bool,

    /// Speak a greeting at session start and a farewell at exit
    pub speak_welcome: bool,

    /// Greeting text used when `speak_welcome` is set
    pub welcome_message: String,

    /// Print the generated reply to the console
    pub print_generated_text: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            system_directive: "You are a historian answering questions. \
                               You will state users question first than answer."
                .to_string(),
            bot_name: "Bot".to_string(),
            memory_message_count: 10,
            strip_think_tags: true,
            speak_welcome: true,
            welcome_message: "Hello! Ask me anything, or say bye to leave.".to_string(),
            print_generated_text: true,
        }
    }
}

/// Voice synthesis and playback configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Enable speech output (disabled also via `--disable-voice`)
    pub enabled: bool,

    /// Base URL of the OpenAI-compatible speech API
    pub tts_base_url: String,

    /// TTS model (e.g. "tts-1")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f32,

    /// Play the synthesized audio after generating it
    pub read_after_generate: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tts_base_url: "https://api.openai.com/v1".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            tts_speed: 1.0,
            read_after_generate: true,
        }
    }
}

/// Artifact policy: where generated audio and transcripts land
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Directory for generated audio files
    pub sound_dir: PathBuf,

    /// Directory for per-turn transcript files
    pub transcript_dir: PathBuf,

    /// Keep a timestamped audio file per turn instead of reusing a scratch file
    pub keep_generated_file: bool,

    /// Write a `{stamp}-transcript.txt` record per turn
    pub generate_transcript: bool,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            sound_dir: PathBuf::from("sound-streams"),
            transcript_dir: PathBuf::from("transcripts"),
            keep_generated_file: true,
            generate_transcript: true,
        }
    }
}

impl Config {
    /// Load configuration from the first existing location:
    /// an explicit `--config` path, `./parley.toml`, then the XDG config dir.
    /// No file at all means defaults.
    ///
    /// # Errors
    ///
    /// Returns error if an explicit path does not exist or any found file
    /// fails to parse.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            return Self::from_file(path);
        }

        for path in Self::search_paths() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        tracing::debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    /// Parse a config file, failing loudly on malformed TOML
    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))?;
        tracing::info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Candidate config locations, highest priority first
    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("parley.toml")];
        if let Some(dirs) = directories::ProjectDirs::from("dev", "parley", "parley") {
            paths.push(dirs.config_dir().join("parley.toml"));
        }
        paths
    }

    /// Resolve the API key: config file, then `OPENAI_API_KEY` env,
    /// then a logged placeholder (local servers typically ignore it)
    #[must_use]
    pub fn api_key(&self) -> String {
        if let Some(key) = &self.chat.api_key {
            return key.clone();
        }
        std::env::var("OPENAI_API_KEY").unwrap_or_else(|_| {
            tracing::warn!("OPENAI_API_KEY not set, using placeholder key");
            "your-api-key".to_string()
        })
    }

    /// Memory window capacity in turns (two per exchange)
    #[must_use]
    pub const fn window_capacity(&self) -> usize {
        2 * self.session.memory_message_count
    }

    /// Path of the scratch audio file reused when `keep_generated_file` is off
    #[must_use]
    pub fn scratch_audio_path(&self) -> PathBuf {
        self.artifacts.sound_dir.join("stream.mp3")
    }

    /// Create the artifact directories, failing before the loop starts
    ///
    /// # Errors
    ///
    /// Returns error if either directory cannot be created
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.artifacts.sound_dir)?;
        if self.artifacts.generate_transcript {
            std::fs::create_dir_all(&self.artifacts.transcript_dir)?;
        }
        Ok(())
    }
}
