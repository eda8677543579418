//! Terminal human channel.
//!
//! Shows the latest draft, then reads one line with dialoguer on a blocking
//! thread while listening for Ctrl+C. An interrupt suspends the run at the
//! gate; the last checkpoint stays as it was.

use std::sync::atomic::{AtomicBool, Ordering};

use console::style;
use dialoguer::Input;
use redline_core::workflow::human::{HumanChannel, HumanError, HumanPrompt, HumanReply};

/// Set once the user pressed Ctrl+C at a prompt. The prompt thread is still
/// blocked on stdin then, so the binary exits explicitly.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

pub fn was_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

pub struct TerminalHuman {
    show_drafts: bool,
}

impl TerminalHuman {
    /// `show_drafts` is off for `--json` and `--quiet`, where stdout must
    /// stay clean; the prompt itself is written to stderr.
    pub fn new(show_drafts: bool) -> Self {
        Self { show_drafts }
    }

    fn show(&self, prompt: &HumanPrompt) {
        let Some(draft) = prompt.latest_draft.as_deref() else {
            return;
        };
        if !self.show_drafts {
            return;
        }
        println!();
        println!(
            "  {} after round {}",
            style("Latest draft").cyan().bold(),
            style(prompt.round).bold()
        );
        println!();
        for line in draft.lines() {
            println!("  {line}");
        }
        println!();
    }
}

impl HumanChannel for TerminalHuman {
    async fn ask(&self, prompt: &HumanPrompt) -> Result<HumanReply, HumanError> {
        self.show(prompt);

        let question = prompt.question().to_string();
        let input = tokio::task::spawn_blocking(move || {
            Input::<String>::new()
                .with_prompt(question)
                .interact_text()
        });

        tokio::select! {
            result = input => match result {
                Ok(Ok(text)) => Ok(HumanReply::Message(text)),
                Ok(Err(e)) => Err(HumanError::Io(e.to_string())),
                Err(e) => Err(HumanError::Io(format!("prompt task failed: {e}"))),
            },
            _ = tokio::signal::ctrl_c() => {
                INTERRUPTED.store(true, Ordering::SeqCst);
                eprintln!();
                Ok(HumanReply::Interrupted)
            }
        }
    }
}
