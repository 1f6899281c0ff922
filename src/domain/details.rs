//! Detailed stack listings
//!
//! Expands each stack's dependencies recursively for `stacks list --long`.

use serde::Serialize;

use super::assembly::CloudAssembly;
use super::collection::StackCollection;
use super::stack::{Environment, StackArtifact};

/// A dependency and, recursively, its own dependencies
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyDetails {
    pub id: String,
    pub dependencies: Vec<DependencyDetails>,
}

/// A stack with its environment and dependency tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackDetails {
    pub id: String,
    pub name: String,
    pub environment: Environment,
    pub dependencies: Vec<DependencyDetails>,
}

impl StackDetails {
    pub fn for_stack(stack: &StackArtifact, assembly: &CloudAssembly) -> Self {
        let mut path = vec![stack.hierarchical_id.clone()];
        Self {
            id: stack.hierarchical_id.clone(),
            name: stack.stack_name.clone(),
            environment: stack.environment.clone(),
            dependencies: expand(stack, assembly, &mut path),
        }
    }

    pub fn for_collection(collection: &StackCollection<'_>, assembly: &CloudAssembly) -> Vec<Self> {
        collection
            .iter()
            .map(|stack| Self::for_stack(stack, assembly))
            .collect()
    }
}

/// Expands dependencies that name stacks of the assembly
///
/// A dependency already on `path` is emitted without children.
fn expand(
    stack: &StackArtifact,
    assembly: &CloudAssembly,
    path: &mut Vec<String>,
) -> Vec<DependencyDetails> {
    stack
        .dependencies
        .iter()
        .filter_map(|dep| assembly.get_stack(dep.target()))
        .map(|dep| {
            let id = dep.hierarchical_id.clone();
            if path.contains(&id) {
                return DependencyDetails {
                    id,
                    dependencies: Vec::new(),
                };
            }

            path.push(id.clone());
            let dependencies = expand(dep, assembly, path);
            path.pop();

            DependencyDetails { id, dependencies }
        })
        .collect()
}
