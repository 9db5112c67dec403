use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub const OUTPUT_DIR_NAME: &str = "output";

/// Writable staging area for a single invocation.
///
/// Owns a fresh temporary directory with an `output/` subdirectory for the
/// model binary to write into. The whole tree is removed on drop, so a
/// workspace never outlives its invocation. The process working directory is
/// never changed; the model subprocess is pointed here instead.
#[derive(Debug)]
pub struct RunWorkspace {
    tempdir: TempDir,
    output_dir: PathBuf,
}

impl RunWorkspace {
    pub fn create() -> Result<Self, String> {
        let tempdir = TempDir::new()
            .map_err(|error| format!("failed to create workspace directory: {error}"))?;
        let output_dir = tempdir.path().join(OUTPUT_DIR_NAME);
        fs::create_dir(&output_dir)
            .map_err(|error| format!("failed to create workspace output directory: {error}"))?;
        Ok(Self { tempdir, output_dir })
    }

    pub fn root(&self) -> &Path {
        self.tempdir.path()
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_output_subdirectory() {
        let workspace = RunWorkspace::create().expect("workspace should create");
        assert!(workspace.root().is_dir());
        assert!(workspace.output_dir().is_dir());
        assert_eq!(workspace.output_dir(), workspace.root().join("output"));
    }

    #[test]
    fn removes_directory_on_drop() {
        let workspace = RunWorkspace::create().expect("workspace should create");
        let root = workspace.root().to_path_buf();
        drop(workspace);
        assert!(!root.exists());
    }

    #[test]
    fn workspaces_are_isolated() {
        let first = RunWorkspace::create().expect("workspace should create");
        let second = RunWorkspace::create().expect("workspace should create");
        assert_ne!(first.root(), second.root());
    }
}
