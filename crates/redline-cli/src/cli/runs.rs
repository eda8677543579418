//! Run inspection commands: list, show, export.

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use redline_core::repository::CheckpointStore;
use redline_core::workflow::driver::export_run;
use redline_types::conversation::{Role, Turn};
use redline_types::run::{RunId, RunStatus};

use crate::state::AppState;

/// List every run, most recently updated first.
///
/// # Examples
///
/// ```bash
/// redline runs
/// redline runs --json
/// ```
pub async fn list_runs(state: &AppState, json: bool) -> Result<()> {
    let runs = state.store.list_runs().await.context("Failed to list runs")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }

    if runs.is_empty() {
        println!();
        println!(
            "  {} No runs yet. Start one with: {}",
            style("i").blue().bold(),
            style("redline run").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Run").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("Next").fg(Color::White),
        Cell::new("Step").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
    ]);

    for run in &runs {
        table.add_row(vec![
            Cell::new(run.run_id).fg(Color::Cyan),
            status_cell(run.status),
            Cell::new(&run.next).fg(Color::White),
            Cell::new(run.step).fg(Color::DarkGrey),
            Cell::new(run.updated_at.format("%Y-%m-%d %H:%M").to_string()).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} run{}",
        style(runs.len()).bold(),
        if runs.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

fn status_cell(status: RunStatus) -> Cell {
    let color = match status {
        RunStatus::Completed => Color::DarkGrey,
        RunStatus::AwaitingHuman => Color::Yellow,
        RunStatus::Running => Color::Green,
    };
    Cell::new(status).fg(color)
}

/// Show a run's checkpoint: status, counters, conversation, and optionally
/// the workflow graph.
pub async fn show_run(state: &AppState, run_id: RunId, graph: bool, json: bool) -> Result<()> {
    let checkpoint = state
        .store
        .load(&run_id)
        .await
        .with_context(|| format!("Run '{run_id}' not found"))?;

    if json {
        let mut value = serde_json::to_value(&checkpoint)?;
        if graph {
            value["graph"] = serde_json::Value::String(state.graph()?.describe());
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let run = &checkpoint.state;
    println!();
    println!("  {} {}", style("Run").bold(), style(checkpoint.run_id).cyan().bold());
    println!("    status   {}", checkpoint.status);
    println!("    next     {}", checkpoint.next);
    println!("    step     {}", checkpoint.step);
    println!(
        "    round    {} (review limit {}, fact-check limit {})",
        run.round, run.limits.max_review_rounds, run.limits.max_verify_rounds
    );
    println!(
        "    gates    reviewer {} / verifier {}",
        approval(run.reviewer_ok),
        approval(run.verifier_ok)
    );
    println!("    sources  {}", run.collected_inputs.len());
    println!("    updated  {}", checkpoint.updated_at.format("%Y-%m-%d %H:%M:%S"));
    println!();

    for turn in &run.conversation {
        print_turn(turn);
    }

    if graph {
        println!();
        println!("{}", state.graph()?.describe());
    }
    println!();

    Ok(())
}

fn approval(ok: bool) -> console::StyledObject<&'static str> {
    if ok {
        style("approved").green()
    } else {
        style("pending").dim()
    }
}

fn print_turn(turn: &Turn) {
    let label = match turn.role {
        Role::Human => style("human").blue().bold(),
        Role::Producer => style("producer").cyan().bold(),
        Role::Reviewer => style("reviewer").magenta().bold(),
        Role::Verifier => style("verifier").yellow().bold(),
        Role::ToolResult if turn.is_error => style("tool error").red().bold(),
        Role::ToolResult => style("tool").dim().bold(),
    };
    println!("  {label}");

    if !turn.tool_calls.is_empty() {
        let names: Vec<&str> = turn.tool_calls.iter().map(|c| c.name.as_str()).collect();
        println!("    {} {}", style("requested").dim(), names.join(", "));
    }
    for line in preview(&turn.content, turn.role == Role::ToolResult).lines() {
        println!("    {line}");
    }
    println!();
}

/// Tool output can be tens of kilobytes; only its start is shown.
fn preview(content: &str, truncate: bool) -> String {
    const TOOL_PREVIEW_CHARS: usize = 240;
    if !truncate {
        return content.to_string();
    }
    match content.char_indices().nth(TOOL_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

/// Write a run's artifacts regardless of its status.
pub async fn export(state: &AppState, run_id: RunId, json: bool) -> Result<()> {
    let paths = export_run(state.store.as_ref(), &state.artifact_writer(), run_id)
        .await
        .with_context(|| format!("Failed to export run '{run_id}'"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&paths)?);
        return Ok(());
    }

    println!();
    for path in &paths {
        println!("  {} {}", style("wrote").green(), path.display());
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_tool_output_only() {
        let long = "x".repeat(500);
        assert_eq!(preview(&long, false).len(), 500);
        let cut = preview(&long, true);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.len(), 243);
        assert_eq!(preview("short", true), "short");
    }
}
