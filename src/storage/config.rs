//! Configuration handling
//!
//! Settings are layered: `~/.config/stacks/config.toml` (global), then
//! `stacks.toml` in the project root, then command-line flags. Later layers
//! win; `context` tables are merged key by key.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Project configuration file name
pub const PROJECT_CONFIG_FILE: &str = "stacks.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// One layer of settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Command that synthesizes the app, or a directory holding an assembly
    pub app: Option<String>,

    /// Directory the app writes its assembly to
    pub output: Option<PathBuf>,

    /// Look up missing context values
    pub lookups: Option<bool>,

    /// Add the metadata resource to templates of old assemblies
    pub version_reporting: Option<bool>,

    /// Allow selecting stacks by their legacy artifact id
    pub legacy_id_selection: Option<bool>,

    /// Context values handed to the app
    pub context: toml::Table,
}

impl Settings {
    /// Overlays `other` on top of `self`
    pub fn merge(mut self, other: Settings) -> Settings {
        self.app = other.app.or(self.app);
        self.output = other.output.or(self.output);
        self.lookups = other.lookups.or(self.lookups);
        self.version_reporting = other.version_reporting.or(self.version_reporting);
        self.legacy_id_selection = other.legacy_id_selection.or(self.legacy_id_selection);
        for (key, value) in other.context {
            self.context.insert(key, value);
        }
        self
    }

    /// The `context` table as JSON
    pub fn context_json(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        match serde_json::to_value(&self.context).context("Failed to convert context settings")? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(ConfigError::Invalid("context must be a table".to_string()).into()),
        }
    }

    fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }
}

/// Combined configuration (global + project)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: Settings,
    pub global: Settings,
    pub project_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from default locations
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let project_root = Self::find_project_root();
        let project = match &project_root {
            Some(root) => Self::load_project_config(root)?,
            None => Settings::default(),
        };

        Ok(Self {
            project,
            global,
            project_root,
        })
    }

    /// Loads configuration for a specific project
    pub fn for_project(project_root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(project_root)?;

        Ok(Self {
            project,
            global,
            project_root: Some(project_root.to_path_buf()),
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "stacks", "stacks").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    fn load_global() -> Result<Settings> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(Settings::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        Settings::parse(&content).context("Failed to parse global config")
    }

    /// Loads project configuration from a specific root
    fn load_project_config(project_root: &Path) -> Result<Settings> {
        let config_path = project_root.join(PROJECT_CONFIG_FILE);

        if !config_path.exists() {
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read project config: {}", config_path.display()))?;

        Settings::parse(&content).context("Failed to parse project config")
    }

    /// Finds the project root by looking for `stacks.toml`
    pub fn find_project_root() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;

        loop {
            if current.join(PROJECT_CONFIG_FILE).is_file() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Returns true if we're in a project
    pub fn is_in_project(&self) -> bool {
        self.project_root.is_some()
    }

    /// Global settings overlaid with project settings
    pub fn settings(&self) -> Settings {
        self.global.clone().merge(self.project.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parse_project_settings() {
        let toml = r#"
app = "python3 app.py"
output = "cdk.out"
lookups = false

[context]
"@aws-cdk/core:newStyleStackSynthesis" = true
env = "prod"
"#;

        let settings = Settings::parse(toml).unwrap();
        assert_eq!(settings.app.as_deref(), Some("python3 app.py"));
        assert_eq!(settings.output, Some(PathBuf::from("cdk.out")));
        assert_eq!(settings.lookups, Some(false));
        assert_eq!(settings.version_reporting, None);

        let context = settings.context_json().unwrap();
        assert_eq!(context["env"], serde_json::json!("prod"));
        assert_eq!(
            context["@aws-cdk/core:newStyleStackSynthesis"],
            serde_json::json!(true)
        );
    }

    #[test]
    fn parse_error_is_reported() {
        let err = Settings::parse("app = [").unwrap_err();
        assert!(err.to_string().contains("Failed to parse configuration"));
    }

    #[test]
    fn later_layers_win() {
        let global = Settings::parse(
            r#"
app = "global-app"
lookups = false
[context]
a = 1
b = 1
"#,
        )
        .unwrap();
        let project = Settings::parse(
            r#"
app = "project-app"
[context]
b = 2
"#,
        )
        .unwrap();

        let merged = global.merge(project);
        assert_eq!(merged.app.as_deref(), Some("project-app"));
        assert_eq!(merged.lookups, Some(false));
        assert_eq!(merged.context["a"].as_integer(), Some(1));
        assert_eq!(merged.context["b"].as_integer(), Some(2));
    }

    #[test]
    fn load_project_config_from_root() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PROJECT_CONFIG_FILE), "app = \"./synth.sh\"\n").unwrap();

        let settings = Config::load_project_config(dir.path()).unwrap();
        assert_eq!(settings.app.as_deref(), Some("./synth.sh"));
    }

    #[test]
    fn missing_project_config_is_default() {
        let dir = TempDir::new().unwrap();
        let settings = Config::load_project_config(dir.path()).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn config_not_in_project() {
        let config = Config {
            project: Settings::default(),
            global: Settings::default(),
            project_root: None,
        };

        assert!(!config.is_in_project());
        assert_eq!(config.settings(), Settings::default());
    }
}
