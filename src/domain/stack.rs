//! Stack artifact domain model
//!
//! A stack is the deployable unit of a cloud assembly. It is identified by
//! a hierarchical id (its display name, e.g. `Prod/Database`), falling back
//! to the flat artifact id when no display name was emitted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Placeholder account for environment-agnostic stacks
pub const UNKNOWN_ACCOUNT: &str = "unknown-account";

/// Placeholder region for environment-agnostic stacks
pub const UNKNOWN_REGION: &str = "unknown-region";

#[derive(Debug, Error, PartialEq)]
pub enum EnvironmentError {
    #[error("Invalid environment: expected 'aws://ACCOUNT/REGION', got '{0}'")]
    Invalid(String),
}

/// The target account and region of a stack
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Environment {
    pub account: String,
    pub region: String,
    pub name: String,
}

impl Environment {
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        let account = account.into();
        let region = region.into();
        let name = format!("aws://{}/{}", account, region);
        Self {
            account,
            region,
            name,
        }
    }

    /// An environment with neither account nor region
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_ACCOUNT, UNKNOWN_REGION)
    }

    /// Returns true if the region is not known at synthesis time
    pub fn is_region_agnostic(&self) -> bool {
        self.region == UNKNOWN_REGION
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl FromStr for Environment {
    type Err = EnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("aws://")
            .ok_or_else(|| EnvironmentError::Invalid(s.to_string()))?;

        match rest.split_once('/') {
            Some((account, region))
                if !account.is_empty() && !region.is_empty() && !region.contains('/') =>
            {
                Ok(Self::new(account, region))
            }
            _ => Err(EnvironmentError::Invalid(s.to_string())),
        }
    }
}

/// A declared dependency of one stack on another artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyRef {
    /// Artifact id of the dependency
    pub id: String,

    /// Display name of the dependency, if the manifest recorded one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl DependencyRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// The hierarchical id this dependency refers to
    pub fn target(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

/// Severity of a synthesis message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

impl MessageLevel {
    /// Maps a metadata entry type to a message level
    ///
    /// Returns `None` for entry types that are not synthesis messages.
    pub fn from_entry_type(entry_type: &str) -> Option<Self> {
        match entry_type {
            "aws:cdk:info" => Some(MessageLevel::Info),
            "aws:cdk:warning" => Some(MessageLevel::Warning),
            "aws:cdk:error" => Some(MessageLevel::Error),
            _ => None,
        }
    }

    /// Prefix used when printing a message
    pub fn label(&self) -> &'static str {
        match self {
            MessageLevel::Info => "Info",
            MessageLevel::Warning => "Warning",
            MessageLevel::Error => "Error",
        }
    }
}

/// A message attached to a construct during synthesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisMessage {
    /// Construct path the message was attached to
    pub id: String,
    pub level: MessageLevel,
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<String>,
}

impl SynthesisMessage {
    pub fn new(id: impl Into<String>, level: MessageLevel, data: impl Into<serde_json::Value>) -> Self {
        Self {
            id: id.into(),
            level,
            data: data.into(),
            trace: Vec::new(),
        }
    }

    /// Message text; non-string payloads are rendered as JSON
    pub fn text(&self) -> String {
        match &self.data {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// A synthesized stack
#[derive(Debug, Clone, PartialEq)]
pub struct StackArtifact {
    /// Artifact id (flat, legacy identifier)
    pub id: String,

    /// Hierarchical id (display name, or the artifact id)
    pub hierarchical_id: String,

    /// Physical stack name
    pub stack_name: String,

    pub environment: Environment,

    /// Declared dependencies, in manifest order
    pub dependencies: Vec<DependencyRef>,

    /// Synthesis messages, in manifest order
    pub messages: Vec<SynthesisMessage>,

    /// Absolute path to the template file
    pub template_path: PathBuf,
}

impl StackArtifact {
    /// Creates a stack whose hierarchical id and stack name equal its id
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            hierarchical_id: id.clone(),
            stack_name: id.clone(),
            template_path: PathBuf::from(format!("{}.template.json", id)),
            id,
            environment: Environment::unknown(),
            dependencies: Vec::new(),
            messages: Vec::new(),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.hierarchical_id = display_name.into();
        self
    }

    pub fn with_stack_name(mut self, stack_name: impl Into<String>) -> Self {
        self.stack_name = stack_name.into();
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_dependency(mut self, dependency: DependencyRef) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn with_message(mut self, message: SynthesisMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_template_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_path = path.into();
        self
    }

    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    /// Returns true if this stack declares a dependency on `hierarchical_id`
    pub fn depends_on(&self, hierarchical_id: &str) -> bool {
        self.dependencies.iter().any(|d| d.target() == hierarchical_id)
    }
}
