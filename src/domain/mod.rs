//! Domain models for stack selection
//!
//! Contains the core selection logic without any I/O concerns.

mod assembly;
mod collection;
mod details;
mod graph;
mod pattern;
mod selection;
mod stack;
mod version;

pub use assembly::{AssemblyCapabilities, CloudAssembly, MissingContext, NestedAssembly, RuntimeInfo};
pub use collection::{CollectionError, MessageError, MessageOptions, MessageSummary, StackCollection};
pub use details::{DependencyDetails, StackDetails};
pub use graph::{DependencyGraph, Direction};
pub use pattern::StackPattern;
pub use selection::{
    DefaultSelection, ExtendedStackSelection, SelectStacksOptions, SelectionConfig, SelectionError,
    StackSelector, StackSelectorCriteria, DISABLE_SELECT_BY_ID_ENV,
};
pub use stack::{
    DependencyRef, Environment, EnvironmentError, MessageLevel, StackArtifact, SynthesisMessage,
    UNKNOWN_ACCOUNT, UNKNOWN_REGION,
};
pub use version::{SchemaVersion, VersionError};
