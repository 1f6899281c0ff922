//! # Synthesis
//!
//! Turns an app into a cloud assembly.
//!
//! ## Flow
//!
//! ```text
//! CloudExecutable            AppSynthesizer               app
//!  │                               │                        │
//!  ├── synthesize(context) ───────►├── sh -c "$app" ───────►│
//!  │                               │   CDK_OUTDIR           │
//!  │                               │   CDK_CONTEXT_JSON     │
//!  │◄── CloudAssembly ─────────────┤◄── manifest.json ──────┤
//!  │
//!  ├── missing context? ──► ContextProvider ──► ContextStore::save ──► again
//!  │
//!  └── old schema? ──► add_metadata_resource (templates rewritten in place)
//! ```
//!
//! ## Key Types
//!
//! - [`CloudExecutable`] - Convergence loop and assembly cache
//! - [`Synthesizer`] - Produces an assembly from a context
//! - [`ContextProvider`] - Resolves missing context values

mod app;
mod executable;
mod metadata;
mod providers;

pub use app::{AppSynthesizer, CLI_VERSION_ENV, CONTEXT_ENV, OUTDIR_ENV};
pub use executable::{CloudExecutable, ExecutableOptions, SynthError, Synthesizer};
pub use metadata::{
    add_metadata_resource, fn_or, format_modules, metadata_available_condition,
    region_has_metadata, MetadataError, METADATA_CONDITION, METADATA_REGIONS, METADATA_RESOURCE,
};
pub use providers::{ContextProvider, ErrorRecordingProvider};
