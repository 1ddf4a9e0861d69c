// src/config/mod.rs

//! Pipeline configuration.
//!
//! - [`model`] defines the `[schedule]` settings and `[task.<id>]` entries.
//! - [`loader`] reads TOML from disk.
//! - [`validate`] checks a raw file and computes its declaration order.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{PipelineFile, RawPipelineFile, SchedulerConfig, TaskEntry};
