//! Bounded conversational memory
//!
//! `HistoryWindow` keeps the pinned system directive out-of-band and a FIFO
//! buffer of the most recent turns. The directive is never subject to
//! trimming; the buffer holds at most two turns per retained exchange.

use std::collections::VecDeque;

use crate::config::BOT_NAME_PLACEHOLDER;

/// Speaker of a single turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Bot,
}

/// One utterance in the conversation, immutable once created
#[derive(Debug, Clone)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// Ordered window of recent turns plus the pinned system directive
#[derive(Debug, Clone)]
pub struct HistoryWindow {
    directive: String,
    turns: VecDeque<Turn>,
}

impl HistoryWindow {
    /// Create a window seeded with the system directive
    #[must_use]
    pub fn new(directive: impl Into<String>) -> Self {
        Self {
            directive: directive.into(),
            turns: VecDeque::new(),
        }
    }

    /// Append one exchange: the user prompt followed by the bot reply.
    /// Insertion order is preserved; always succeeds.
    pub fn append(&mut self, prompt: impl Into<String>, reply: impl Into<String>) {
        self.turns.push_back(Turn::new(Role::User, prompt));
        self.turns.push_back(Turn::new(Role::Bot, reply));
    }

    /// Drop the oldest turns until at most `capacity` remain.
    /// The directive lives outside the buffer and is never evicted.
    pub fn trim(&mut self, capacity: usize) {
        while self.turns.len() > capacity {
            self.turns.pop_front();
        }
    }

    /// Number of retained turns, excluding the directive
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// True when no turns are retained
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Retained turns in insertion order
    #[must_use]
    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    /// Render the directive plus the last `capacity` turns as a
    /// newline-terminated transcript. Each turn line is prefixed with the
    /// speaker label (`User` or the bot's display name); any `{botName}`
    /// placeholder in the directive is substituted with `bot_name`.
    #[must_use]
    pub fn render(&self, capacity: usize, bot_name: &str) -> String {
        let mut out = String::new();
        out.push_str(&self.directive.replace(BOT_NAME_PLACEHOLDER, bot_name));
        out.push('\n');

        let skip = self.turns.len().saturating_sub(capacity);
        for turn in self.turns.iter().skip(skip) {
            let label = match turn.role {
                Role::User => "User",
                Role::Bot => bot_name,
            };
            out.push_str(label);
            out.push_str(": ");
            out.push_str(&turn.text);
            out.push('\n');
        }
        out
    }
}
