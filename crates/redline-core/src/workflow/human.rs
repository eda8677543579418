//! Human gate port.
//!
//! The engine asks a `HumanChannel` for the next instruction whenever the run
//! reaches the human gate. Channels decide how the question is asked (a
//! terminal prompt, a queued reply from the command line, a test script).

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;

use thiserror::Error;

/// What the human is shown when asked for input.
#[derive(Debug, Clone, PartialEq)]
pub struct HumanPrompt {
    /// Latest draft, if a production round has completed.
    pub latest_draft: Option<String>,
    pub round: u32,
}

impl HumanPrompt {
    /// Question text shown at the gate.
    pub fn question(&self) -> &'static str {
        if self.latest_draft.is_some() {
            "Any further changes? (type 'done' to finish)"
        } else {
            "What should I write?"
        }
    }
}

/// One answer from the human channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HumanReply {
    /// Free text: either an instruction or a termination word.
    Message(String),
    /// No answer available now; the run suspends at the gate.
    Interrupted,
}

#[derive(Debug, Error)]
pub enum HumanError {
    #[error("human channel I/O error: {0}")]
    Io(String),

    #[error("human channel closed")]
    Closed,
}

/// Source of human input.
pub trait HumanChannel: Send + Sync {
    fn ask(
        &self,
        prompt: &HumanPrompt,
    ) -> impl Future<Output = Result<HumanReply, HumanError>> + Send;
}

/// Answers the first question with a fixed reply, then defers to `inner`.
///
/// Lets a run be started with its task already supplied.
pub struct PrefilledHuman<H> {
    first: Mutex<Option<String>>,
    inner: H,
}

impl<H: HumanChannel> PrefilledHuman<H> {
    pub fn new(first: Option<String>, inner: H) -> Self {
        Self {
            first: Mutex::new(first),
            inner,
        }
    }
}

impl<H: HumanChannel> HumanChannel for PrefilledHuman<H> {
    async fn ask(&self, prompt: &HumanPrompt) -> Result<HumanReply, HumanError> {
        let first = self
            .first
            .lock()
            .map_err(|_| HumanError::Io("prefilled reply lock poisoned".to_string()))?
            .take();
        match first {
            Some(text) => Ok(HumanReply::Message(text)),
            None => self.inner.ask(prompt).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Termination vocabulary
// ---------------------------------------------------------------------------

/// Case-insensitive, whitespace-trimmed set of words that end a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminationWords {
    words: Vec<String>,
}

impl TerminationWords {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    pub fn matches(&self, input: &str) -> bool {
        let input = input.trim().to_lowercase();
        self.words.iter().any(|w| *w == input)
    }
}

impl Default for TerminationWords {
    fn default() -> Self {
        Self::new(["exit", "quit", "stop", "bye", "done"])
    }
}

// ---------------------------------------------------------------------------
// Queued channel
// ---------------------------------------------------------------------------

/// Channel that answers from a fixed queue, then reports `Interrupted`.
///
/// Used for `resume --reply`, non-interactive runs, and tests.
#[derive(Debug, Default)]
pub struct QueuedHuman {
    replies: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<HumanPrompt>>,
}

impl QueuedHuman {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far.
    pub fn asked(&self) -> Vec<HumanPrompt> {
        self.asked.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

impl HumanChannel for QueuedHuman {
    async fn ask(&self, prompt: &HumanPrompt) -> Result<HumanReply, HumanError> {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(prompt.clone());
        }
        let next = self
            .replies
            .lock()
            .map_err(|_| HumanError::Io("reply queue lock poisoned".to_string()))?
            .pop_front();
        Ok(next.map_or(HumanReply::Interrupted, HumanReply::Message))
    }
}
