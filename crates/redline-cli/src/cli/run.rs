//! `redline run` and `redline resume`.

use anyhow::{Context, Result};
use console::style;
use redline_core::workflow::driver::DriverOutcome;
use redline_core::workflow::human::{PrefilledHuman, QueuedHuman};
use redline_types::run::{ExitReason, RunId, RunStatus, Stage};

use super::human::TerminalHuman;
use crate::state::AppState;

/// Start a new run, optionally with the first instruction given up front.
///
/// # Examples
///
/// ```bash
/// redline run
/// redline run --task "60-second explainer on https://example.com/story, neutral tone"
/// ```
pub async fn start_run(state: &AppState, task: Option<String>, json: bool, quiet: bool) -> Result<()> {
    let human = PrefilledHuman::new(task, TerminalHuman::new(!json && !quiet));
    let driver = state.driver(human)?;
    let outcome = driver.start().await.context("Run failed")?;
    report(&outcome, json, quiet)
}

/// Resume a run from its last checkpoint.
///
/// With `--reply`, the pending human question is answered with that text and
/// the run stops at the next human gate instead of prompting.
pub async fn resume_run(
    state: &AppState,
    run_id: RunId,
    reply: Option<String>,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let outcome = match reply {
        Some(reply) => {
            let human = PrefilledHuman::new(Some(reply), QueuedHuman::default());
            state.driver(human)?.resume(run_id).await
        }
        None => {
            let human = TerminalHuman::new(!json && !quiet);
            state.driver(human)?.resume(run_id).await
        }
    }
    .with_context(|| format!("Failed to resume run {run_id}"))?;

    report(&outcome, json, quiet)
}

fn report(outcome: &DriverOutcome, json: bool, quiet: bool) -> Result<()> {
    let run = &outcome.outcome;

    if json {
        let value = serde_json::json!({
            "run_id": run.run_id,
            "status": run.status,
            "next": run.next,
            "step": run.step,
            "round": run.state.round,
            "steps_executed": run.steps_executed,
            "final_draft": run.state.latest_draft(),
            "stage_exits": run.state.stage_exits,
            "artifacts": outcome.artifacts,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }
    if quiet {
        return Ok(());
    }

    println!();
    match run.status {
        RunStatus::Completed => {
            println!(
                "  {} Run {} finished after {} round{}",
                style("✓").green().bold(),
                style(run.run_id).cyan(),
                run.state.round,
                if run.state.round == 1 { "" } else { "s" }
            );
        }
        RunStatus::AwaitingHuman | RunStatus::Running => {
            println!(
                "  {} Run {} paused at {}",
                style("⏸").yellow().bold(),
                style(run.run_id).cyan(),
                style(&run.next).bold()
            );
            println!(
                "    Continue with: {}",
                style(format!("redline resume {}", run.run_id)).yellow()
            );
        }
    }

    for exit in &run.state.stage_exits {
        let stage = match exit.stage {
            Stage::Review => "review",
            Stage::Verify => "fact-check",
        };
        let reason = match exit.reason {
            ExitReason::Approved => style("approved").green(),
            ExitReason::Ceiling => style("round limit reached").yellow(),
        };
        println!("    {stage} passed in round {}: {reason}", exit.round);
    }

    if !outcome.artifacts.is_empty() {
        println!();
        for path in &outcome.artifacts {
            println!("    {} {}", style("wrote").dim(), path.display());
        }
    }
    println!();

    Ok(())
}
