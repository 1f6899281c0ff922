//! Running the app
//!
//! The app is either a directory holding an already synthesized assembly or
//! a shell command that writes one to the output directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context as _, Result};

use super::executable::{SynthError, Synthesizer};
use crate::domain::CloudAssembly;
use crate::storage::{load_assembly, Context};

/// Directory the app writes its assembly to
pub const OUTDIR_ENV: &str = "CDK_OUTDIR";

/// Context handed to the app, as a JSON object
pub const CONTEXT_ENV: &str = "CDK_CONTEXT_JSON";

/// Version of the running toolkit
pub const CLI_VERSION_ENV: &str = "STACKS_CLI_VERSION";

/// Synthesizes by running the configured app
#[derive(Debug, Clone)]
pub struct AppSynthesizer {
    app: String,
    output_dir: PathBuf,
    working_dir: PathBuf,
}

impl AppSynthesizer {
    pub fn new(
        app: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            app: app.into(),
            output_dir: output_dir.into(),
            working_dir: working_dir.into(),
        }
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// The assembly directory if `app` names one
    fn assembly_dir(&self) -> Option<PathBuf> {
        let path = self.working_dir.join(&self.app);
        path.is_dir().then_some(path)
    }

    fn shell(&self) -> Command {
        if cfg!(windows) {
            let mut command = Command::new("cmd");
            command.arg("/C").arg(&self.app);
            command
        } else {
            let mut command = Command::new("sh");
            command.arg("-c").arg(&self.app);
            command
        }
    }
}

impl Synthesizer for AppSynthesizer {
    fn synthesize(&self, context: &Context) -> Result<CloudAssembly> {
        if let Some(dir) = self.assembly_dir() {
            tracing::debug!("--app points to a cloud assembly, so we bypass synth");
            return load_assembly(&dir);
        }

        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                self.output_dir.display()
            )
        })?;

        let context_json =
            serde_json::to_string(&context.to_json()).context("Failed to serialize context")?;

        tracing::debug!("Running app: {}", self.app);
        let status = self
            .shell()
            .current_dir(&self.working_dir)
            .env(OUTDIR_ENV, &self.output_dir)
            .env(CONTEXT_ENV, context_json)
            .env(CLI_VERSION_ENV, env!("CARGO_PKG_VERSION"))
            .status()
            .with_context(|| format!("Failed to run app: {}", self.app))?;

        if !status.success() {
            return Err(SynthError::AppFailed {
                command: self.app.clone(),
                status: status
                    .code()
                    .map_or_else(|| "signal".to_string(), |code| code.to_string()),
            }
            .into());
        }

        load_assembly(&self.output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MANIFEST_FILE;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_manifest(dir: &Path) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join(MANIFEST_FILE),
            json!({
                "version": "36.0.0",
                "artifacts": {
                    "A": {
                        "type": "aws:cloudformation:stack",
                        "properties": {"templateFile": "A.template.json"}
                    }
                }
            })
            .to_string(),
        )
        .unwrap();
    }

    #[test]
    fn directory_app_is_loaded_directly() {
        let dir = TempDir::new().unwrap();
        write_manifest(&dir.path().join("prebuilt"));

        let synthesizer = AppSynthesizer::new("prebuilt", dir.path().join("out"), dir.path());
        let assembly = synthesizer.synthesize(&Context::new()).unwrap();

        assert_eq!(assembly.stacks().len(), 1);
        assert!(!dir.path().join("out").exists());
    }

    #[cfg(unix)]
    #[test]
    fn command_app_receives_outdir_and_context() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let source = dir.path().join("source");
        write_manifest(&source);

        let app = format!(
            "cp {}/{} \"$CDK_OUTDIR\" && printf '%s' \"$CDK_CONTEXT_JSON\" > context.seen",
            source.display(),
            MANIFEST_FILE
        );
        let synthesizer = AppSynthesizer::new(app, &out, dir.path());

        let mut context = Context::new();
        context.set("stage", json!("dev"));
        let assembly = synthesizer.synthesize(&context).unwrap();

        assert_eq!(assembly.stacks()[0].id, "A");
        let seen = fs::read_to_string(dir.path().join("context.seen")).unwrap();
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&seen).unwrap(),
            json!({"stage": "dev"})
        );
    }

    #[cfg(unix)]
    #[test]
    fn failing_app_reports_status() {
        let dir = TempDir::new().unwrap();
        let synthesizer = AppSynthesizer::new("exit 3", dir.path().join("out"), dir.path());

        let err = synthesizer.synthesize(&Context::new()).unwrap_err();
        assert_eq!(err.to_string(), "Subprocess exited with error 3: exit 3");
    }
}
