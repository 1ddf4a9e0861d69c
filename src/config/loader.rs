// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{PipelineFile, RawPipelineFile};
use crate::errors::Result;

/// Deserialize a pipeline file without semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPipelineFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawPipelineFile = toml::from_str(&contents)?;
    debug!(path = %path.display(), tasks = config.task.len(), "loaded pipeline file");

    Ok(config)
}

/// Load a pipeline file and validate it: at least one task, known and
/// non-self dependencies, no cycles, sane schedule settings.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PipelineFile> {
    let raw = load_from_path(&path)?;
    let config = PipelineFile::try_from(raw)?;
    Ok(config)
}

/// `Pipeline.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Pipeline.toml")
}
