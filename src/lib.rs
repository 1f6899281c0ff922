//! stacks - select, extend and synthesize stacks from a cloud assembly
//!
//! An app synthesizes into a cloud assembly: a directory with a manifest
//! listing stacks, their dependencies and nested assemblies. This crate
//! loads assemblies, resolves stack selections (glob patterns, defaults,
//! upstream/downstream closures) and drives the synthesis loop that fills
//! in missing context.

pub mod domain;
pub mod storage;
pub mod synth;
pub mod cli;

pub use domain::{CloudAssembly, StackArtifact, StackCollection, StackSelector};
