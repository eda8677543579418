//! Configuration loader for redline.
//!
//! Reads `config.toml` from the data directory (`~/.redline/` by default)
//! and deserializes it into [`RedlineConfig`]. Falls back to defaults when
//! the file is missing or malformed, so a bad edit never blocks a resume.

use std::path::Path;

use redline_types::config::RedlineConfig;

pub const CONFIG_FILE: &str = "config.toml";

/// Load configuration from `{data_dir}/config.toml`.
///
/// - Missing file: [`RedlineConfig::default()`], logged at debug.
/// - Unreadable or unparsable file: logged as a warning, defaults returned.
pub async fn load_config(data_dir: &Path) -> RedlineConfig {
    let config_path = data_dir.join(CONFIG_FILE);

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            return RedlineConfig::default();
        }
        Err(err) => {
            tracing::warn!(path = %config_path.display(), error = %err, "failed to read config, using defaults");
            return RedlineConfig::default();
        }
    };

    match toml::from_str::<RedlineConfig>(&content) {
        Ok(config) => sanitize(config),
        Err(err) => {
            tracing::warn!(path = %config_path.display(), error = %err, "failed to parse config, using defaults");
            RedlineConfig::default()
        }
    }
}

/// Clamp values that would stall or disable the workflow.
fn sanitize(mut config: RedlineConfig) -> RedlineConfig {
    if config.adapter_attempts == 0 {
        tracing::warn!("adapter_attempts = 0 is not allowed, using 1");
        config.adapter_attempts = 1;
    }
    config.termination_words.retain(|w| !w.trim().is_empty());
    if config.termination_words.is_empty() {
        tracing::warn!("termination_words is empty, using defaults");
        config.termination_words = RedlineConfig::default().termination_words;
    }
    config
}
