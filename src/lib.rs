//! Parley - Voice-interactive chat assistant
//!
//! This library provides the core functionality for the parley CLI:
//! - Bounded conversational memory with a pinned system directive
//! - Turn orchestration (completion, reply filtering, speech, transcript)
//! - Voice output (TTS synthesis, audio artifacts, playback)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  SessionLoop                         │
//! │   prompt in  │  exit sentinel  │  per-turn recovery │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                  TurnPipeline                        │
//! │   render  │  complete  │  filter  │  commit  │  fx  │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │              External collaborators                  │
//! │   chat endpoint  │  TTS  │  playback  │  transcript │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod completion;
pub mod config;
pub mod console;
pub mod error;
pub mod history;
pub mod pipeline;
pub mod session;
pub mod transcript;
pub mod voice;

pub use completion::{CompletionClient, OpenAiChatClient};
pub use config::{ArtifactsConfig, ChatConfig, Config, SessionConfig, VoiceConfig};
pub use console::{ConsoleOutput, PromptSource, ReplySink, StdinPrompt};
pub use error::{Error, Result};
pub use history::{HistoryWindow, Role, Turn};
pub use pipeline::{TurnPipeline, TurnReport, TurnResult, strip_think_tags};
pub use session::SessionLoop;
pub use transcript::{FileTranscript, TranscriptSink};
pub use voice::{AudioPlayback, Interrupt, NullSpeech, SpeechEngine, TextToSpeech, VoiceOutput};
