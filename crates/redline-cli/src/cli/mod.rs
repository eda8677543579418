//! CLI command definitions for the `redline` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod human;
pub mod run;
pub mod runs;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use redline_types::run::RunId;

/// Draft, review, and fact-check short scripts with a human in the loop.
#[derive(Parser)]
#[command(name = "redline", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans to stdout through OpenTelemetry.
    #[arg(long, global = true, env = "REDLINE_OTEL", hide = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a new run.
    Run {
        /// First instruction; asked interactively when omitted.
        #[arg(short, long)]
        task: Option<String>,
    },

    /// Continue a suspended or interrupted run.
    Resume {
        /// Run to continue.
        run_id: RunId,

        /// Answer the pending question with this text and stop at the next
        /// human gate instead of prompting.
        #[arg(short, long)]
        reply: Option<String>,
    },

    /// List runs, most recently updated first.
    #[command(alias = "ls")]
    Runs,

    /// Show a run's state and conversation.
    Show {
        run_id: RunId,

        /// Also print the workflow graph as a Mermaid flowchart.
        #[arg(long)]
        graph: bool,
    },

    /// Write a run's artifacts to the data directory.
    Export { run_id: RunId },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_resume_with_reply() {
        let id = RunId::new();
        let cli = Cli::try_parse_from(["redline", "resume", &id.to_string(), "--reply", "done", "--json"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Resume { run_id, reply } => {
                assert_eq!(run_id, id);
                assert_eq!(reply.as_deref(), Some("done"));
            }
            _ => panic!("expected resume"),
        }
    }

    #[test]
    fn test_rejects_bad_run_id() {
        assert!(Cli::try_parse_from(["redline", "show", "not-a-uuid"]).is_err());
    }
}
