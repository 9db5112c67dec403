use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Seam between handler logic and the external model executable.
///
/// Handlers stay pure over this trait; tests substitute fake runners that
/// write outputs directly.
pub trait ModelRunner {
    /// Run the model synchronously with `workdir` as its working directory.
    ///
    /// When `log_path` is given, stdout and stderr are combined into that
    /// file; otherwise the subprocess inherits the handler's streams.
    fn run_model(&self, workdir: &Path, log_path: Option<&Path>) -> Result<(), String>;
}

#[derive(Debug, Clone)]
pub struct SubprocessModelRunner {
    binary_path: PathBuf,
}

impl SubprocessModelRunner {
    pub fn new(binary_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }
}

impl ModelRunner for SubprocessModelRunner {
    fn run_model(&self, workdir: &Path, log_path: Option<&Path>) -> Result<(), String> {
        let mut command = Command::new(&self.binary_path);
        command.current_dir(workdir);

        if let Some(log_path) = log_path {
            let log_file = File::create(log_path)
                .map_err(|error| format!("failed to create model log file: {error}"))?;
            let log_file_for_stderr = log_file
                .try_clone()
                .map_err(|error| format!("failed to clone model log handle: {error}"))?;
            command
                .stdout(Stdio::from(log_file))
                .stderr(Stdio::from(log_file_for_stderr));
        }

        let status = command.status().map_err(|error| {
            format!(
                "failed to launch model binary '{}': {error}",
                self.binary_path.display()
            )
        })?;

        if !status.success() {
            return Err(match status.code() {
                Some(code) => format!("model binary exited with status {code}"),
                None => "model binary was terminated by a signal".to_string(),
            });
        }

        Ok(())
    }
}
