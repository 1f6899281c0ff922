//! Project management
//!
//! A project is the directory holding `stacks.toml` (or the working
//! directory when there is none). It resolves settings and provides access
//! to the context store and the assembly output directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use thiserror::Error;

use super::config::PROJECT_CONFIG_FILE;
use super::{Config, Context, ContextStore, Settings};
use crate::domain::SelectionConfig;

/// Default assembly output directory, relative to the project root
pub const DEFAULT_OUTPUT_DIR: &str = "assembly.out";

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("--app is required either on the command line or in {0}")]
    NoApp(String),
}

/// A stacks project
pub struct Project {
    root: PathBuf,
    config: Config,
    settings: Settings,
}

impl Project {
    /// Opens the project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let config = Config::for_project(&root)?;
        let settings = config.settings();

        Ok(Self {
            root,
            config,
            settings,
        })
    }

    /// Opens the project at the current directory or a parent
    ///
    /// Falls back to the current directory when no `stacks.toml` is found.
    pub fn open_current() -> Result<Self> {
        let root = match Config::find_project_root() {
            Some(root) => root,
            None => std::env::current_dir().context("Failed to read current directory")?,
        };

        Self::open(root)
    }

    /// Writes a `stacks.toml` unless one exists, then opens the project
    pub fn init(root: impl Into<PathBuf>, app: Option<&str>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create project directory: {}", root.display()))?;

        let config_path = root.join(PROJECT_CONFIG_FILE);
        if !config_path.exists() {
            let app_line = match app {
                Some(app) => format!("app = {}\n", toml::Value::String(app.to_string())),
                None => "# app = \"python3 app.py\"\n".to_string(),
            };
            let default_config = format!(
                r#"# stacks configuration

# Command that synthesizes the app (or a directory with a synthesized assembly)
{}
# Directory the app writes its assembly to
output = "{}"

# Look up missing context values during synthesis
lookups = true

# Context values handed to the app
[context]
"#,
                app_line, DEFAULT_OUTPUT_DIR
            );
            fs::write(&config_path, default_config)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        Self::open(root)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the effective settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Overlays command-line settings
    pub fn apply_overrides(&mut self, overrides: Settings) {
        self.settings = self.settings.clone().merge(overrides);
    }

    /// The synthesis command (or assembly directory)
    pub fn app(&self) -> Result<&str> {
        self.settings.app.as_deref().ok_or_else(|| {
            ProjectError::NoApp(self.root.join(PROJECT_CONFIG_FILE).display().to_string()).into()
        })
    }

    /// Directory the assembly is written to
    pub fn output_dir(&self) -> PathBuf {
        let output = self
            .settings
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
        self.root.join(output)
    }

    pub fn lookups(&self) -> bool {
        self.settings.lookups.unwrap_or(true)
    }

    pub fn version_reporting(&self) -> bool {
        self.settings.version_reporting.unwrap_or(true)
    }

    /// Returns the context store
    pub fn context_store(&self) -> ContextStore {
        ContextStore::for_project(&self.root)
    }

    /// Saved context with configured values on top
    pub fn load_context(&self) -> Result<Context> {
        let saved = self.context_store().load()?;
        Ok(Context::from_saved(saved).with_overrides(self.settings.context_json()?))
    }

    /// Selector settings from the toolkit version, environment and configuration
    pub fn selection_config(&self) -> SelectionConfig {
        let resolved = SelectionConfig::from_env();
        SelectionConfig {
            legacy_id_selection: resolved.legacy_id_selection
                && self.settings.legacy_id_selection.unwrap_or(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn init_writes_config_once() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path(), Some("node bin/app.js")).unwrap();
        assert_eq!(project.app().unwrap(), "node bin/app.js");
        assert_eq!(project.output_dir(), dir.path().join(DEFAULT_OUTPUT_DIR));

        // Second init keeps the existing file
        let project = Project::init(dir.path(), Some("other")).unwrap();
        assert_eq!(project.app().unwrap(), "node bin/app.js");
    }

    #[test]
    fn init_without_app_requires_one_later() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path(), None).unwrap();
        let err = project.app().unwrap_err();
        assert!(err.to_string().contains("--app is required"));
    }

    #[test]
    fn overrides_apply() {
        let dir = TempDir::new().unwrap();
        let mut project = Project::init(dir.path(), Some("app")).unwrap();
        assert!(project.lookups());

        project.apply_overrides(Settings {
            app: Some("cli-app".to_string()),
            output: Some(PathBuf::from("out")),
            lookups: Some(false),
            ..Default::default()
        });

        assert_eq!(project.app().unwrap(), "cli-app");
        assert_eq!(project.output_dir(), dir.path().join("out"));
        assert!(!project.lookups());
        assert!(project.version_reporting());
    }

    #[test]
    fn context_combines_store_and_settings() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            "app = \"x\"\n[context]\nstage = \"dev\"\n",
        )
        .unwrap();
        let project = Project::open(dir.path()).unwrap();

        let mut saved = Context::new();
        saved.set("looked-up", serde_json::json!(42));
        project.context_store().save(&saved).unwrap();

        let context = project.load_context().unwrap();
        assert_eq!(context.get("stage"), Some(&serde_json::json!("dev")));
        assert_eq!(context.get("looked-up"), Some(&serde_json::json!(42)));
    }

    #[test]
    fn legacy_selection_can_be_disabled_in_config() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            "legacy_id_selection = false\n",
        )
        .unwrap();
        let project = Project::open(dir.path()).unwrap();
        assert!(!project.selection_config().legacy_id_selection);
    }

    #[test]
    fn selection_config_defaults_to_environment() {
        let dir = TempDir::new().unwrap();
        let project = Project::open(dir.path()).unwrap();
        assert_eq!(project.selection_config(), SelectionConfig::from_env());
    }
}
