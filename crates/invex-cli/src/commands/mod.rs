pub mod batch;
pub mod config;
pub mod process;
pub mod serve;
pub mod templates;

use std::path::{Path, PathBuf};

use tracing::debug;

use invex_core::InvexConfig;

/// Per-user configuration file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("invex")
        .join("config.json")
}

/// Resolve the configuration file: the `--config` flag, else the per-user file.
pub fn config_path(explicit: Option<&str>) -> PathBuf {
    explicit.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load configuration. An explicit path must exist; the per-user file is optional.
pub fn load_config(explicit: Option<&str>) -> anyhow::Result<InvexConfig> {
    if let Some(path) = explicit {
        return InvexConfig::from_file(Path::new(path))
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path, e));
    }

    let path = default_config_path();
    if path.exists() {
        debug!("Loading config from {}", path.display());
        Ok(InvexConfig::from_file(&path)?)
    } else {
        Ok(InvexConfig::default())
    }
}
