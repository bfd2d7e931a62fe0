//! Training engine boundary.
//!
//! The pipeline never trains anything itself. It hands a [`TrainingRequest`]
//! to a [`TrainingEngine`] and expects the best model at
//! [`TrainingRequest::expected_model_path`] once the engine returns.

use crate::errors::TrainingEngineError;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// Everything an engine needs for one training run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingRequest {
    /// Initial weights file.
    pub weights_path: PathBuf,
    /// Dataset descriptor listing the manifests and classes.
    pub dataset_descriptor: PathBuf,
    /// Number of epochs.
    pub epochs: u32,
    /// Batch size.
    pub batch_size: u32,
    /// Directory the engine writes its runs into.
    pub output_dir: PathBuf,
    /// Name of this run's directory under `output_dir`.
    pub run_name: String,
}

impl TrainingRequest {
    /// Where the engine is expected to leave the best model.
    #[must_use]
    pub fn expected_model_path(&self) -> PathBuf {
        self.output_dir
            .join(&self.run_name)
            .join("weights")
            .join("best.pt")
    }
}

/// An external trainer.
#[async_trait]
pub trait TrainingEngine: Send + Sync {
    /// Runs training to completion.
    ///
    /// Returning `Ok` does not by itself prove a model was written; the
    /// caller checks [`TrainingRequest::expected_model_path`].
    async fn train(&self, request: &TrainingRequest) -> Result<(), TrainingEngineError>;
}

/// Engine that shells out to an Ultralytics-style `yolo` CLI.
#[derive(Debug, Clone)]
pub struct CommandTrainingEngine {
    program: PathBuf,
    extra_args: Vec<OsString>,
}

impl Default for CommandTrainingEngine {
    fn default() -> Self {
        Self::new("yolo")
    }
}

impl CommandTrainingEngine {
    /// Creates an engine invoking `program`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
        }
    }

    /// Appends an argument passed after the generated ones.
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<OsString>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Returns the program name.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Builds the argument list for `request`.
    #[must_use]
    pub fn args(&self, request: &TrainingRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "task=detect".into(),
            "mode=train".into(),
            key_value("model", request.weights_path.as_os_str()),
            key_value("data", request.dataset_descriptor.as_os_str()),
            format!("epochs={}", request.epochs).into(),
            format!("batch={}", request.batch_size).into(),
            key_value("project", request.output_dir.as_os_str()),
            format!("name={}", request.run_name).into(),
            "exist_ok=True".into(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

fn key_value(key: &str, value: &std::ffi::OsStr) -> OsString {
    let mut arg = OsString::from(key);
    arg.push("=");
    arg.push(value);
    arg
}

#[async_trait]
impl TrainingEngine for CommandTrainingEngine {
    async fn train(&self, request: &TrainingRequest) -> Result<(), TrainingEngineError> {
        let program = self.program.display().to_string();
        let args = self.args(request);
        debug!(program = %program, ?args, "Launching training engine");

        let output = Command::new(&self.program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| TrainingEngineError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(TrainingEngineError::Failed {
                program,
                exit_code: output.status.code(),
                stderr,
            });
        }

        info!(
            program = %program,
            run_name = %request.run_name,
            "Training engine finished"
        );
        Ok(())
    }
}
