//! Cloud assembly domain model
//!
//! An assembly is the output of one synthesis run: an ordered list of
//! top-level stacks plus nested assemblies, each with their own stacks.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::stack::StackArtifact;
use super::version::SchemaVersion;

/// Behaviour switches derived from the schema version
///
/// Resolved once when the assembly is constructed so that selection code
/// never compares version strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblyCapabilities {
    /// Stacks of nested assemblies take part in selection
    pub nested_stack_enumeration: bool,

    /// The framework writes its own metadata resource into templates
    pub framework_analytics: bool,
}

impl AssemblyCapabilities {
    pub fn for_version(version: &SchemaVersion) -> Self {
        Self {
            nested_stack_enumeration: version.major() >= SchemaVersion::NESTED_ENUMERATION_MAJOR,
            framework_analytics: *version >= SchemaVersion::FRAMEWORK_ANALYTICS,
        }
    }
}

/// A context value the app asked for but did not find
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingContext {
    pub key: String,
    pub provider: String,
    #[serde(default)]
    pub props: serde_json::Value,
}

/// Library versions recorded by the app at synthesis time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeInfo {
    #[serde(default)]
    pub libraries: BTreeMap<String, String>,
}

/// A nested assembly and the artifact that declared it
#[derive(Debug, Clone)]
pub struct NestedAssembly {
    pub id: String,
    pub display_name: String,
    pub assembly: CloudAssembly,
}

/// A loaded cloud assembly
#[derive(Debug, Clone)]
pub struct CloudAssembly {
    directory: PathBuf,
    version: SchemaVersion,
    capabilities: AssemblyCapabilities,
    stacks: Vec<StackArtifact>,
    nested: Vec<NestedAssembly>,
    missing: Vec<MissingContext>,
    runtime: Option<RuntimeInfo>,
}

impl CloudAssembly {
    /// Creates an assembly with the given top-level stacks
    pub fn new(
        directory: impl Into<PathBuf>,
        version: SchemaVersion,
        stacks: Vec<StackArtifact>,
    ) -> Self {
        Self {
            directory: directory.into(),
            capabilities: AssemblyCapabilities::for_version(&version),
            version,
            stacks,
            nested: Vec::new(),
            missing: Vec::new(),
            runtime: None,
        }
    }

    pub fn with_nested(mut self, nested: NestedAssembly) -> Self {
        self.nested.push(nested);
        self
    }

    pub fn with_missing(mut self, missing: Vec<MissingContext>) -> Self {
        self.missing = missing;
        self
    }

    pub fn with_runtime(mut self, runtime: RuntimeInfo) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn version(&self) -> &SchemaVersion {
        &self.version
    }

    pub fn capabilities(&self) -> AssemblyCapabilities {
        self.capabilities
    }

    /// Top-level stacks in manifest order
    pub fn stacks(&self) -> &[StackArtifact] {
        &self.stacks
    }

    pub fn nested_assemblies(&self) -> &[NestedAssembly] {
        &self.nested
    }

    pub fn missing(&self) -> &[MissingContext] {
        &self.missing
    }

    pub fn runtime(&self) -> Option<&RuntimeInfo> {
        self.runtime.as_ref()
    }

    /// All stacks: own stacks first, then each nested assembly depth-first
    pub fn stacks_recursively(&self) -> Vec<&StackArtifact> {
        let mut result: Vec<&StackArtifact> = self.stacks.iter().collect();
        for nested in &self.nested {
            result.extend(nested.assembly.stacks_recursively());
        }
        result
    }

    /// The stacks that take part in selection
    pub fn selectable_stacks(&self) -> Vec<&StackArtifact> {
        if self.capabilities.nested_stack_enumeration {
            self.stacks_recursively()
        } else {
            self.stacks.iter().collect()
        }
    }

    /// Finds a stack by artifact id or hierarchical id, searching nested assemblies
    pub fn get_stack(&self, id: &str) -> Option<&StackArtifact> {
        self.stacks_recursively()
            .into_iter()
            .find(|s| s.id == id || s.hierarchical_id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested_assembly(version: SchemaVersion) -> CloudAssembly {
        let inner = CloudAssembly::new(
            "out/assembly-Stage",
            version.clone(),
            vec![StackArtifact::new("StageA").with_display_name("Stage/A")],
        );

        CloudAssembly::new("out", version, vec![StackArtifact::new("Top")]).with_nested(
            NestedAssembly {
                id: "assembly-Stage".to_string(),
                display_name: "Stage".to_string(),
                assembly: inner,
            },
        )
    }

    #[test]
    fn capabilities_follow_version() {
        let old = AssemblyCapabilities::for_version(&SchemaVersion::new(5, 0, 0));
        assert!(!old.nested_stack_enumeration);
        assert!(!old.framework_analytics);

        let mid = AssemblyCapabilities::for_version(&SchemaVersion::new(9, 9, 9));
        assert!(!mid.nested_stack_enumeration);
        assert!(mid.framework_analytics);

        let new = AssemblyCapabilities::for_version(&SchemaVersion::new(10, 0, 0));
        assert!(new.nested_stack_enumeration);
        assert!(new.framework_analytics);
    }

    #[test]
    fn prerelease_does_not_reach_release_capabilities() {
        let rc: SchemaVersion = "6.0.0-rc.1".parse().unwrap();
        assert!(!AssemblyCapabilities::for_version(&rc).framework_analytics);

        let rc: SchemaVersion = "10.0.0-beta.1".parse().unwrap();
        let caps = AssemblyCapabilities::for_version(&rc);
        assert!(caps.nested_stack_enumeration);
        assert!(caps.framework_analytics);
    }

    #[test]
    fn recursive_enumeration_includes_nested() {
        let asm = nested_assembly(SchemaVersion::new(36, 0, 0));
        let ids: Vec<_> = asm
            .stacks_recursively()
            .iter()
            .map(|s| s.hierarchical_id.as_str())
            .collect();
        assert_eq!(ids, vec!["Top", "Stage/A"]);
        assert_eq!(asm.stacks().len(), 1);
    }

    #[test]
    fn selectable_stacks_respect_capability() {
        let new = nested_assembly(SchemaVersion::new(36, 0, 0));
        assert_eq!(new.selectable_stacks().len(), 2);

        let old = nested_assembly(SchemaVersion::new(9, 0, 0));
        assert_eq!(old.selectable_stacks().len(), 1);
        // Recursive enumeration is still available for other uses
        assert_eq!(old.stacks_recursively().len(), 2);
    }

    #[test]
    fn get_stack_by_either_id() {
        let asm = nested_assembly(SchemaVersion::new(36, 0, 0));
        assert_eq!(asm.get_stack("StageA").unwrap().hierarchical_id, "Stage/A");
        assert_eq!(asm.get_stack("Stage/A").unwrap().id, "StageA");
        assert!(asm.get_stack("Nope").is_none());
    }
}
