//! Application state wiring the workflow to the concrete infra adapters.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use redline_core::workflow::driver::RunDriver;
use redline_core::workflow::engine::WorkflowEngine;
use redline_core::workflow::graph::{CompiledGraph, revision_pipeline};
use redline_core::workflow::human::{HumanChannel, TerminationWords};
use redline_core::workflow::retry::RetryPolicy;
use redline_core::workflow::steps::StepRunner;
use redline_infra::agent::build_agents;
use redline_infra::config::load_config;
use redline_infra::filesystem::{FsArtifactWriter, resolve_data_dir};
use redline_infra::llm::openai::OpenAiClient;
use redline_infra::sqlite::checkpoint::SqliteCheckpointStore;
use redline_infra::sqlite::pool::DatabasePool;
use redline_infra::tool::default_tools;
use redline_types::config::RedlineConfig;

/// Driver pinned to the SQLite store and filesystem artifacts.
pub type ConcreteDriver<H> = RunDriver<Arc<SqliteCheckpointStore>, H, FsArtifactWriter>;

pub struct AppState {
    pub data_dir: PathBuf,
    pub config: RedlineConfig,
    pub store: Arc<SqliteCheckpointStore>,
}

impl AppState {
    /// Resolve the data directory, load config, open the database.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let config = load_config(&data_dir).await;

        let pool = DatabasePool::open(&data_dir)
            .await
            .context("Failed to open the run database")?;

        Ok(Self {
            data_dir,
            config,
            store: Arc::new(SqliteCheckpointStore::new(pool)),
        })
    }

    pub fn graph(&self) -> anyhow::Result<CompiledGraph> {
        revision_pipeline()
            .compile()
            .context("Workflow graph is invalid")
    }

    pub fn artifact_writer(&self) -> FsArtifactWriter {
        FsArtifactWriter::new(&self.data_dir)
    }

    /// Build a driver backed by the LLM agents. Fails when the API key is
    /// not configured.
    pub fn driver<H: HumanChannel>(&self, human: H) -> anyhow::Result<ConcreteDriver<H>> {
        let llm = &self.config.llm;
        let client = OpenAiClient::from_env(
            &llm.api_key_env,
            llm.base_url.clone(),
            Duration::from_secs(llm.request_timeout_secs),
        )
        .context("Failed to create the model client")?;

        let tools = default_tools(&self.config.fetch).context("Failed to set up tools")?;
        let agents = build_agents(&self.config, Arc::new(client), &tools);

        let runner = StepRunner::new(agents, tools, human)
            .with_termination_words(TerminationWords::new(&self.config.termination_words))
            .with_retry(RetryPolicy::new(self.config.adapter_attempts));
        let engine = WorkflowEngine::new(self.graph()?, Arc::clone(&self.store), runner);

        Ok(RunDriver::new(engine, self.artifact_writer(), self.config.limits))
    }
}
