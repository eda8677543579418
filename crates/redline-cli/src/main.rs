//! redline CLI entry point.
//!
//! Binary name: `redline`
//!
//! Parses CLI arguments, sets up tracing, opens the run database, and
//! dispatches to the command handlers.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;
use redline_observe::tracing_setup::{init_tracing, shutdown_tracing, verbosity_filter};

use cli::{Cli, Commands};
use state::AppState;

/// Exit status after Ctrl+C at a prompt (128 + SIGINT).
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(verbosity_filter(cli.quiet, cli.verbose), cli.otel) {
        eprintln!("Warning: failed to initialize tracing: {e}");
    }

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "redline", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init().await?;

    let result = match cli.command {
        Commands::Run { task } => cli::run::start_run(&state, task, cli.json, cli.quiet).await,
        Commands::Resume { run_id, reply } => {
            cli::run::resume_run(&state, run_id, reply, cli.json, cli.quiet).await
        }
        Commands::Runs => cli::runs::list_runs(&state, cli.json).await,
        Commands::Show { run_id, graph } => cli::runs::show_run(&state, run_id, graph, cli.json).await,
        Commands::Export { run_id } => cli::runs::export(&state, run_id, cli.json).await,
        Commands::Completions { .. } => Ok(()),
    };

    if let Err(e) = &result {
        tracing::debug!(error = ?e, "command failed");
    }
    shutdown_tracing();

    // The interrupted prompt thread is still blocked on stdin and would keep
    // the runtime alive, so leave directly. The checkpoint is already durable.
    if result.is_ok() && cli::human::was_interrupted() {
        std::process::exit(INTERRUPTED_EXIT_CODE);
    }
    result
}
