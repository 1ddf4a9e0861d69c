// src/task/output.rs

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::task::{OutputHandle, TaskOutput};

/// Name of the marker file written into an output directory once the node
/// has succeeded.
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// Output backed by a filesystem directory.
///
/// The directory may be written to while the node runs; the output only
/// exists once [`SUCCESS_MARKER`] is present inside it. The handle given to
/// dependents is the directory `PathBuf`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTokenOutput {
    path: PathBuf,
}

impl FileTokenOutput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn marker(&self) -> PathBuf {
        self.path.join(SUCCESS_MARKER)
    }

    /// Create the output directory (and its parents) without marking it done.
    pub fn prepare(&self) -> io::Result<()> {
        fs::create_dir_all(&self.path)
    }

    /// Mark the output as complete. Idempotent.
    pub fn create(&self) -> io::Result<()> {
        self.prepare()?;
        fs::write(self.marker(), b"")
    }
}

impl TaskOutput for FileTokenOutput {
    fn exists(&self) -> bool {
        self.marker().is_file()
    }

    fn handle(&self) -> OutputHandle {
        Arc::new(self.path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_makes_output_exist() {
        let dir = tempfile::tempdir().unwrap();
        let output = FileTokenOutput::new(dir.path().join("tasks/a/2015-10-11T11"));
        assert!(!output.exists());

        output.create().unwrap();
        assert!(output.exists());
        output.create().unwrap();

        let handle = output.handle();
        assert_eq!(handle.downcast_ref::<PathBuf>(), Some(&output.path().to_path_buf()));
    }

    #[test]
    fn prepared_directory_is_not_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = FileTokenOutput::new(dir.path().join("tasks/a/2015-10-11T11"));

        output.prepare().unwrap();
        fs::write(output.path().join("data"), "partial").unwrap();
        assert!(output.path().is_dir());
        assert!(!output.exists());
    }
}
