//! Connection pools for the run database (`{data_dir}/redline.db`).
//!
//! Every engine step ends in exactly one checkpoint upsert, so writes go
//! through a single-connection pool and never contend with each other. The
//! `runs` and `show` commands read through a separate read-only pool, which
//! WAL mode lets proceed while a run is writing.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

/// File name of the run database inside the data directory.
pub const DATABASE_FILE: &str = "redline.db";

const READER_CONNECTIONS: u32 = 8;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Reader and writer pools over the same SQLite file.
#[derive(Clone)]
pub struct DatabasePool {
    /// Read-only, up to eight connections.
    pub reader: SqlitePool,
    /// One connection; all checkpoint writes are serialized here.
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Open (creating if needed) the run database in `data_dir`.
    pub async fn open(data_dir: &Path) -> Result<Self, sqlx::Error> {
        Self::new(&format!("{}?mode=rwc", database_url(data_dir))).await
    }

    /// Connect both pools and bring the schema up to date.
    ///
    /// Migrations run on the writer before the reader pool is opened, so
    /// readers never observe a half-migrated schema.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let base_opts = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT)
            .create_if_missing(true);

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(base_opts.clone())
            .await?;
        sqlx::migrate!("../../migrations").run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(READER_CONNECTIONS)
            .connect_with(base_opts.read_only(true))
            .await?;

        tracing::debug!(url = database_url, "opened run database");
        Ok(Self { reader, writer })
    }
}

/// Database URL for `{data_dir}/redline.db`.
pub fn database_url(data_dir: &Path) -> String {
    format!("sqlite://{}", data_dir.join(DATABASE_FILE).display())
}
