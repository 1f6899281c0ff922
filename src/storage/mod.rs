//! # Storage Layer
//!
//! Everything that touches the filesystem: assembly manifests, persisted
//! context and configuration.
//!
//! ## Files
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Assembly | JSON | `{output}/manifest.json` (+ nested assembly directories) |
//! | Context | JSON object | `stacks.context.json` |
//! | Project config | TOML | `stacks.toml` |
//! | Global config | TOML | `~/.config/stacks/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - [`ContextStore`] uses file locking (`fs2`) and atomic writes (temp file + rename)
//!
//! ## Key Types
//!
//! - [`Project`] - Entry point for settings, context and output paths
//! - [`load_assembly`] - Reads a cloud assembly directory
//! - [`ContextStore`] - Read/write persisted context values
//! - [`Config`] - Global and project settings

mod config;
mod context;
mod manifest;
mod project;

pub use config::{Config, ConfigError, Settings, PROJECT_CONFIG_FILE};
pub use context::{
    is_transient, Context, ContextStore, CONTEXT_FILE, PROVIDER_ERROR_KEY, TRANSIENT_CONTEXT_KEY,
};
pub use manifest::{load_assembly, MANIFEST_FILE};
pub use project::{Project, ProjectError, DEFAULT_OUTPUT_DIR};
