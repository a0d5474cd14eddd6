//! Turn pipeline: one conversational exchange end-to-end
//!
//! A turn is strictly sequential: render context, request a completion,
//! filter the reply for presentation, commit the exchange to memory, then
//! fire the speech and transcript side effects. Memory is committed before
//! any side effect runs, so a failed synthesis or transcript write never
//! loses the exchange. Speech and transcript are independent of each other.

use std::sync::LazyLock;

use regex::Regex;

use crate::completion::CompletionClient;
use crate::config::Config;
use crate::console::ReplySink;
use crate::history::HistoryWindow;
use crate::transcript::TranscriptSink;
use crate::voice::SpeechEngine;
use crate::Result;

/// Placeholder synthesized when the model returns an empty reply
const NO_ANSWER: &str = "no answer";

/// Matches one `<think>…</think>` span, non-greedy, across lines
static THINK_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid think-span regex"));

/// Ephemeral value produced per turn
#[derive(Debug, Clone)]
pub struct TurnResult {
    /// Reply after presentation filtering; what is printed and transcribed
    pub display_text: String,
    /// Unfiltered reply retained in history so future context is intact
    pub history_text: String,
    /// Sortable identifier naming this turn's artifact files
    pub timestamp: String,
}

/// Outcome of one turn, consumed by the session loop
#[derive(Debug)]
pub struct TurnReport {
    pub result: TurnResult,
    /// Whether speech synthesis and playback completed
    pub spoken: bool,
    /// Whether the transcript record was written
    pub transcribed: bool,
}

/// Orchestrates a single turn against the external collaborators
pub struct TurnPipeline<'a> {
    config: &'a Config,
    completion: &'a dyn CompletionClient,
    speech: &'a dyn SpeechEngine,
    transcript: &'a dyn TranscriptSink,
    output: &'a dyn ReplySink,
}

impl<'a> TurnPipeline<'a> {
    /// Wire up a pipeline over borrowed collaborators
    #[must_use]
    pub fn new(
        config: &'a Config,
        completion: &'a dyn CompletionClient,
        speech: &'a dyn SpeechEngine,
        transcript: &'a dyn TranscriptSink,
        output: &'a dyn ReplySink,
    ) -> Self {
        Self {
            config,
            completion,
            speech,
            transcript,
            output,
        }
    }

    /// Run one turn: on success the exchange is committed to `history` and
    /// the side effects have been attempted (their failures are recorded in
    /// the report, not raised).
    ///
    /// # Errors
    ///
    /// Returns `Error::Completion` if the completion call fails; in that
    /// case `history` is left untouched and the turn is abandoned.
    pub async fn run(
        &self,
        history: &mut HistoryWindow,
        prompt: &str,
        stamp: &str,
    ) -> Result<TurnReport> {
        let capacity = self.config.window_capacity();
        let bot_name = &self.config.session.bot_name;

        // Render: directive + recent turns become the system message
        let context = history.render(capacity, bot_name);

        // Complete: single attempt, no retry
        let raw = self.completion.complete(&context, prompt).await?;

        // Filter: presentation only, history keeps the raw reply
        let display_text = if self.config.session.strip_think_tags {
            strip_think_tags(&raw)
        } else {
            raw.clone()
        };
        let result = TurnResult {
            display_text,
            history_text: raw,
            timestamp: stamp.to_string(),
        };

        if self.config.session.print_generated_text {
            self.output.show(&result.display_text);
        }

        // Persist-memory: unconditional, before any side effect
        history.append(prompt, result.history_text.clone());
        history.trim(capacity);

        // Side effects: speech and transcript fail independently
        let spoken_input = if result.display_text.trim().is_empty() {
            NO_ANSWER
        } else {
            result.display_text.as_str()
        };
        let spoken = match self.speech.speak(spoken_input, stamp).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(stamp, error = %e, "speech synthesis failed, continuing");
                false
            }
        };

        let transcribed = if self.config.artifacts.generate_transcript {
            match self.transcript.persist(prompt, &result.display_text, stamp) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(stamp, error = %e, "transcript write failed, continuing");
                    false
                }
            }
        } else {
            false
        };

        Ok(TurnReport {
            result,
            spoken,
            transcribed,
        })
    }
}

/// Remove every paired `<think>…</think>` span. An unclosed opener
/// truncates the reply from the opener onward.
#[must_use]
pub fn strip_think_tags(input: &str) -> String {
    let stripped = THINK_SPAN.replace_all(input, "");
    match stripped.find("<think>") {
        Some(idx) => stripped[..idx].to_string(),
        None => stripped.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::Error;

    struct ScriptedCompletion {
        reply: Option<String>,
        calls: AtomicUsize,
    }

    impl ScriptedCompletion {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedCompletion {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .clone()
                .ok_or_else(|| Error::Completion("endpoint unreachable".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingSpeech {
        spoken: Mutex<Vec<String>>,
        fail: AtomicBool,
    }

    #[async_trait]
    impl SpeechEngine for RecordingSpeech {
        async fn speak(&self, text: &str, _stamp: &str) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::Synthesis("no audio device".to_string()));
            }
            self.spoken.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingTranscript {
        records: Mutex<Vec<(String, String)>>,
    }

    impl TranscriptSink for RecordingTranscript {
        fn persist(&self, prompt: &str, reply: &str, _stamp: &str) -> Result<()> {
            self.records
                .lock()
                .unwrap()
                .push((prompt.to_string(), reply.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingOutput {
        shown: Mutex<Vec<String>>,
    }

    impl ReplySink for RecordingOutput {
        fn show(&self, text: &str) {
            self.shown.lock().unwrap().push(text.to_string());
        }
    }

    fn test_config() -> Config {
        Config {
            session: crate::config::SessionConfig {
                memory_message_count: 2,
                print_generated_text: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn strips_each_paired_span_independently() {
        assert_eq!(
            strip_think_tags("A<think>hidden</think>B<think>more</think>C"),
            "ABC"
        );
    }

    #[test]
    fn strips_multiline_spans() {
        let input = "Sure.<think>\nline one\nline two\n</think> Here you go.";
        assert_eq!(strip_think_tags(input), "Sure. Here you go.");
    }

    #[test]
    fn unclosed_opener_truncates_the_rest() {
        assert_eq!(strip_think_tags("Answer<think>never closed"), "Answer");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(strip_think_tags("no markup here"), "no markup here");
    }

    #[tokio::test]
    async fn successful_turn_commits_memory_and_side_effects() {
        let config = test_config();
        let completion = ScriptedCompletion::replying("r1");
        let speech = RecordingSpeech::default();
        let transcript = RecordingTranscript::default();
        let output = RecordingOutput::default();
        let pipeline = TurnPipeline::new(&config, &completion, &speech, &transcript, &output);

        let mut history = HistoryWindow::new("d");
        let report = pipeline.run(&mut history, "p1", "stamp1").await.unwrap();

        assert!(report.spoken);
        assert!(report.transcribed);
        assert_eq!(history.len(), 2);
        assert_eq!(speech.spoken.lock().unwrap().as_slice(), ["r1"]);
        assert_eq!(
            transcript.records.lock().unwrap().as_slice(),
            [("p1".to_string(), "r1".to_string())]
        );
    }

    #[tokio::test]
    async fn filter_disabled_leaves_reply_unchanged() {
        let mut config = test_config();
        config.session.strip_think_tags = false;
        let completion = ScriptedCompletion::replying("a<think>b</think>c");
        let speech = RecordingSpeech::default();
        let transcript = RecordingTranscript::default();
        let output = RecordingOutput::default();
        let pipeline = TurnPipeline::new(&config, &completion, &speech, &transcript, &output);

        let mut history = HistoryWindow::new("d");
        let report = pipeline.run(&mut history, "p", "s").await.unwrap();
        assert_eq!(report.result.display_text, "a<think>b</think>c");
    }

    #[tokio::test]
    async fn history_keeps_unfiltered_reply() {
        let config = test_config();
        let completion = ScriptedCompletion::replying("visible<think>hidden</think>");
        let speech = RecordingSpeech::default();
        let transcript = RecordingTranscript::default();
        let output = RecordingOutput::default();
        let pipeline = TurnPipeline::new(&config, &completion, &speech, &transcript, &output);

        let mut history = HistoryWindow::new("d");
        let report = pipeline.run(&mut history, "p", "s").await.unwrap();

        assert_eq!(report.result.display_text, "visible");
        let stored: Vec<&str> = history.turns().map(|t| t.text.as_str()).collect();
        assert_eq!(stored, ["p", "visible<think>hidden</think>"]);
    }

    #[tokio::test]
    async fn empty_reply_is_spoken_as_no_answer_but_stored_verbatim() {
        let config = test_config();
        let completion = ScriptedCompletion::replying("");
        let speech = RecordingSpeech::default();
        let transcript = RecordingTranscript::default();
        let output = RecordingOutput::default();
        let pipeline = TurnPipeline::new(&config, &completion, &speech, &transcript, &output);

        let mut history = HistoryWindow::new("d");
        pipeline.run(&mut history, "p", "s").await.unwrap();

        assert_eq!(speech.spoken.lock().unwrap().as_slice(), ["no answer"]);
        let stored: Vec<&str> = history.turns().map(|t| t.text.as_str()).collect();
        assert_eq!(stored, ["p", ""]);
    }

    #[tokio::test]
    async fn synthesis_failure_does_not_roll_back_memory_or_block_transcript() {
        let config = test_config();
        let completion = ScriptedCompletion::replying("r1");
        let speech = RecordingSpeech::default();
        speech.fail.store(true, Ordering::SeqCst);
        let transcript = RecordingTranscript::default();
        let output = RecordingOutput::default();
        let pipeline = TurnPipeline::new(&config, &completion, &speech, &transcript, &output);

        let mut history = HistoryWindow::new("d");
        let report = pipeline.run(&mut history, "p1", "s").await.unwrap();

        assert!(!report.spoken);
        assert!(report.transcribed, "transcript must run despite speech failure");
        assert_eq!(history.len(), 2, "committed pair must survive synthesis failure");
    }

    #[tokio::test]
    async fn completion_failure_leaves_history_untouched() {
        let config = test_config();
        let completion = ScriptedCompletion::failing();
        let speech = RecordingSpeech::default();
        let transcript = RecordingTranscript::default();
        let output = RecordingOutput::default();
        let pipeline = TurnPipeline::new(&config, &completion, &speech, &transcript, &output);

        let mut history = HistoryWindow::new("d");
        let err = pipeline.run(&mut history, "p1", "s").await.unwrap_err();

        assert!(matches!(err, Error::Completion(_)));
        assert!(history.is_empty());
        assert!(speech.spoken.lock().unwrap().is_empty());
        assert!(transcript.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn window_stays_bounded_across_turns() {
        let config = test_config(); // 2 pairs = 4 turns
        let completion = ScriptedCompletion::replying("r");
        let speech = RecordingSpeech::default();
        let transcript = RecordingTranscript::default();
        let output = RecordingOutput::default();
        let pipeline = TurnPipeline::new(&config, &completion, &speech, &transcript, &output);

        let mut history = HistoryWindow::new("d");
        for i in 0..10 {
            pipeline
                .run(&mut history, &format!("p{i}"), "s")
                .await
                .unwrap();
        }
        assert_eq!(history.len(), 4);
    }

    #[tokio::test]
    async fn reply_printing_goes_through_the_injected_sink() {
        let mut config = test_config();
        config.session.print_generated_text = true;
        let completion = ScriptedCompletion::replying("r1<think>hidden</think>");
        let speech = RecordingSpeech::default();
        let transcript = RecordingTranscript::default();
        let output = RecordingOutput::default();
        let pipeline = TurnPipeline::new(&config, &completion, &speech, &transcript, &output);

        let mut history = HistoryWindow::new("d");
        pipeline.run(&mut history, "p1", "s").await.unwrap();

        assert_eq!(output.shown.lock().unwrap().as_slice(), ["r1"]);
    }

    #[tokio::test]
    async fn reply_printing_respects_the_config_gate() {
        let config = test_config(); // print_generated_text off
        let completion = ScriptedCompletion::replying("r1");
        let speech = RecordingSpeech::default();
        let transcript = RecordingTranscript::default();
        let output = RecordingOutput::default();
        let pipeline = TurnPipeline::new(&config, &completion, &speech, &transcript, &output);

        let mut history = HistoryWindow::new("d");
        pipeline.run(&mut history, "p1", "s").await.unwrap();

        assert!(output.shown.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn transcript_gating_respects_config() {
        let mut config = test_config();
        config.artifacts.generate_transcript = false;
        let completion = ScriptedCompletion::replying("r");
        let speech = RecordingSpeech::default();
        let transcript = RecordingTranscript::default();
        let output = RecordingOutput::default();
        let pipeline = TurnPipeline::new(&config, &completion, &speech, &transcript, &output);

        let mut history = HistoryWindow::new("d");
        let report = pipeline.run(&mut history, "p", "s").await.unwrap();

        assert!(!report.transcribed);
        assert!(transcript.records.lock().unwrap().is_empty());
    }
}
