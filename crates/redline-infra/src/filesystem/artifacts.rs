//! Filesystem `ArtifactWriter`.
//!
//! Each file is written to a temporary file in the target directory and then
//! renamed over the destination, so readers never observe a half-written
//! artifact.

use std::io::Write;
use std::path::{Path, PathBuf};

use redline_core::workflow::export::{ArtifactWriter, ExportError, RunRecord};

use super::run_dir;

pub const RECORD_FILE: &str = "pipeline_result.json";
pub const FINAL_DRAFT_FILE: &str = "final_draft.txt";

/// Writes `pipeline_result.json` and `final_draft.txt` under
/// `{data_dir}/runs/{run_id}/`.
pub struct FsArtifactWriter {
    data_dir: PathBuf,
}

impl FsArtifactWriter {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

fn write_atomic(dir: &Path, name: &str, contents: &[u8]) -> Result<PathBuf, ExportError> {
    let target = dir.join(name);
    let io = |e: std::io::Error| ExportError::Io(format!("{}: {e}", target.display()));

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io)?;
    tmp.write_all(contents).map_err(io)?;
    tmp.as_file().sync_all().map_err(io)?;
    tmp.persist(&target).map_err(|e| io(e.error))?;
    Ok(target)
}

impl ArtifactWriter for FsArtifactWriter {
    async fn write(&self, record: &RunRecord) -> Result<Vec<PathBuf>, ExportError> {
        let dir = run_dir(&self.data_dir, &record.run_id);
        let json = serde_json::to_vec_pretty(record).map_err(|e| ExportError::Serialize(e.to_string()))?;
        let final_draft = record.final_draft.clone();

        tokio::task::spawn_blocking(move || -> Result<Vec<PathBuf>, ExportError> {
            std::fs::create_dir_all(&dir)
                .map_err(|e| ExportError::Io(format!("{}: {e}", dir.display())))?;

            let mut written = vec![write_atomic(&dir, RECORD_FILE, &json)?];
            if let Some(draft) = final_draft {
                written.push(write_atomic(&dir, FINAL_DRAFT_FILE, draft.as_bytes())?);
            }
            tracing::debug!(dir = %dir.display(), files = written.len(), "wrote run artifacts");
            Ok(written)
        })
        .await
        .map_err(|e| ExportError::Io(format!("artifact writer task failed: {e}")))?
    }
}
