//! Session loop: prompt in, turn out, until the user says bye
//!
//! The loop owns the history window for the whole session. A failed turn is
//! logged and abandoned; only initialization failures (before the first
//! prompt is read) abort the process.

use chrono::Local;

use crate::completion::CompletionClient;
use crate::config::Config;
use crate::console::{self, PromptSource, ReplySink};
use crate::history::HistoryWindow;
use crate::pipeline::TurnPipeline;
use crate::transcript::TranscriptSink;
use crate::voice::SpeechEngine;
use crate::Result;

/// Input whose case-insensitive trimmed value ends the session
const EXIT_SENTINEL: &str = "bye";

/// Farewell phrase spoken at the sentinel when `speak_welcome` is set
const FAREWELL: &str = "Goodbye!";

/// Top-level conversational loop over the external collaborators
pub struct SessionLoop {
    config: Config,
    history: HistoryWindow,
    completion: Box<dyn CompletionClient>,
    speech: Box<dyn SpeechEngine>,
    transcript: Box<dyn TranscriptSink>,
    output: Box<dyn ReplySink>,
    input: Box<dyn PromptSource>,
}

impl SessionLoop {
    /// Create a session seeded with the configured system directive
    #[must_use]
    pub fn new(
        config: Config,
        completion: Box<dyn CompletionClient>,
        speech: Box<dyn SpeechEngine>,
        transcript: Box<dyn TranscriptSink>,
        output: Box<dyn ReplySink>,
        input: Box<dyn PromptSource>,
    ) -> Self {
        let history = HistoryWindow::new(config.session.system_directive.clone());
        Self {
            config,
            history,
            completion,
            speech,
            transcript,
            output,
            input,
        }
    }

    /// Retained conversation state (for inspection after the loop ends)
    #[must_use]
    pub const fn history(&self) -> &HistoryWindow {
        &self.history
    }

    /// Run the session until the exit sentinel or end of input.
    /// Cleanup runs exactly once on the way out.
    ///
    /// # Errors
    ///
    /// Steady-state turn failures are recovered internally; an error here
    /// means the loop itself could not proceed.
    pub async fn run(&mut self) -> Result<()> {
        self.welcome().await;

        loop {
            let line = match self.input.read_prompt().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    tracing::info!("input closed, ending session");
                    break;
                }
                Err(e) => {
                    // Input failure is an end of session, not a crash
                    tracing::warn!(error = %e, "input failed, ending session");
                    break;
                }
            };

            if line.trim().eq_ignore_ascii_case(EXIT_SENTINEL) {
                self.farewell().await;
                break;
            }

            let stamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
            let pipeline = TurnPipeline::new(
                &self.config,
                self.completion.as_ref(),
                self.speech.as_ref(),
                self.transcript.as_ref(),
                self.output.as_ref(),
            );

            match pipeline.run(&mut self.history, &line, &stamp).await {
                Ok(report) => {
                    tracing::debug!(
                        %stamp,
                        spoken = report.spoken,
                        transcribed = report.transcribed,
                        "turn complete"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        prompt = %line,
                        %stamp,
                        error = %e,
                        "turn failed, continuing session"
                    );
                }
            }
        }

        self.cleanup();
        Ok(())
    }

    /// Optional spoken greeting at session start
    async fn welcome(&self) {
        if !self.config.session.speak_welcome {
            return;
        }
        let message = &self.config.session.welcome_message;
        if let Err(e) = self.speech.speak(message, "welcome").await {
            tracing::warn!(error = %e, "welcome greeting failed");
        }
    }

    /// Optional spoken farewell at the exit sentinel
    async fn farewell(&self) {
        if !self.config.session.speak_welcome {
            return;
        }
        if let Err(e) = self.speech.speak(FAREWELL, "farewell").await {
            tracing::warn!(error = %e, "farewell failed");
        }
    }

    /// Remove the reusable scratch audio file and print the exit banner
    fn cleanup(&self) {
        let scratch = self.config.scratch_audio_path();
        if scratch.exists() {
            match std::fs::remove_file(&scratch) {
                Ok(()) => tracing::debug!(path = %scratch.display(), "removed scratch audio"),
                Err(e) => {
                    tracing::warn!(path = %scratch.display(), error = %e, "cleanup failed");
                }
            }
        }
        console::print_farewell();
    }
}
