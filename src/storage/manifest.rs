//! Cloud assembly manifest loading
//!
//! An assembly directory holds a `manifest.json` listing its artifacts in
//! order. Stack artifacts point at template files in the same directory;
//! nested assemblies live in subdirectories with their own manifest.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::domain::{
    CloudAssembly, DependencyRef, Environment, MessageLevel, MissingContext, NestedAssembly,
    RuntimeInfo, SchemaVersion, StackArtifact, SynthesisMessage,
};

/// Manifest file name inside an assembly directory
pub const MANIFEST_FILE: &str = "manifest.json";

const STACK_ARTIFACT: &str = "aws:cloudformation:stack";
const NESTED_ASSEMBLY_ARTIFACT: &str = "cdk:cloud-assembly";

#[derive(Debug, Deserialize)]
struct AssemblyManifest {
    version: SchemaVersion,
    #[serde(default)]
    artifacts: IndexMap<String, ArtifactManifest>,
    #[serde(default)]
    missing: Vec<MissingContext>,
    #[serde(default)]
    runtime: Option<RuntimeInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactManifest {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    environment: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    properties: ArtifactProperties,
    #[serde(default)]
    metadata: IndexMap<String, Vec<MetadataEntry>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactProperties {
    template_file: Option<String>,
    stack_name: Option<String>,
    directory_name: Option<String>,
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetadataEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
    #[serde(default)]
    trace: Vec<String>,
}

/// Loads the assembly in `directory`, including nested assemblies
pub fn load_assembly(directory: &Path) -> Result<CloudAssembly> {
    let manifest_path = directory.join(MANIFEST_FILE);
    let content = fs::read_to_string(&manifest_path)
        .with_context(|| format!("Failed to read manifest: {}", manifest_path.display()))?;

    let manifest: AssemblyManifest = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse manifest: {}", manifest_path.display()))?;

    let mut stacks = Vec::new();
    let mut nested = Vec::new();

    for (id, artifact) in &manifest.artifacts {
        match artifact.kind.as_str() {
            STACK_ARTIFACT => stacks.push(
                stack_from_manifest(directory, id, artifact, &manifest.artifacts)
                    .with_context(|| format!("Invalid stack artifact '{}'", id))?,
            ),
            NESTED_ASSEMBLY_ARTIFACT => {
                let directory_name = artifact
                    .properties
                    .directory_name
                    .as_deref()
                    .with_context(|| format!("Nested assembly '{}' has no directoryName", id))?;

                let assembly = load_assembly(&directory.join(directory_name))
                    .with_context(|| format!("Failed to load nested assembly '{}'", id))?;

                nested.push(NestedAssembly {
                    id: id.clone(),
                    display_name: artifact
                        .properties
                        .display_name
                        .clone()
                        .or_else(|| artifact.display_name.clone())
                        .unwrap_or_else(|| id.clone()),
                    assembly,
                });
            }
            other => tracing::debug!("Skipping artifact '{}' of type {}", id, other),
        }
    }

    let mut assembly = CloudAssembly::new(directory, manifest.version, stacks)
        .with_missing(manifest.missing);
    if let Some(runtime) = manifest.runtime {
        assembly = assembly.with_runtime(runtime);
    }
    for n in nested {
        assembly = assembly.with_nested(n);
    }

    Ok(assembly)
}

fn stack_from_manifest(
    directory: &Path,
    id: &str,
    artifact: &ArtifactManifest,
    artifacts: &IndexMap<String, ArtifactManifest>,
) -> Result<StackArtifact> {
    let environment = match &artifact.environment {
        Some(env) => env.parse::<Environment>()?,
        None => Environment::unknown(),
    };

    let template_file = artifact
        .properties
        .template_file
        .clone()
        .unwrap_or_else(|| format!("{}.template.json", id));

    let mut stack = StackArtifact::new(id)
        .with_environment(environment)
        .with_template_path(directory.join(template_file));

    if let Some(display_name) = &artifact.display_name {
        stack = stack.with_display_name(display_name.clone());
    }
    if let Some(stack_name) = &artifact.properties.stack_name {
        stack = stack.with_stack_name(stack_name.clone());
    }

    for dep_id in &artifact.dependencies {
        let mut dep = DependencyRef::new(dep_id.clone());
        if let Some(display_name) = artifacts.get(dep_id).and_then(|a| a.display_name.clone()) {
            dep = dep.with_display_name(display_name);
        }
        stack = stack.with_dependency(dep);
    }

    for (path, entries) in &artifact.metadata {
        for entry in entries {
            if let Some(level) = MessageLevel::from_entry_type(&entry.kind) {
                let mut message = SynthesisMessage::new(path.clone(), level, entry.data.clone());
                message.trace = entry.trace.clone();
                stack = stack.with_message(message);
            }
        }
    }

    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_manifest(dir: &Path, manifest: serde_json::Value) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join(MANIFEST_FILE),
            serde_json::to_string_pretty(&manifest).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn load_stacks_in_manifest_order() {
        let dir = TempDir::new().unwrap();
        write_manifest(
            dir.path(),
            serde_json::json!({
                "version": "36.0.0",
                "artifacts": {
                    "Zeta": {"type": "aws:cloudformation:stack", "environment": "aws://111111111111/eu-west-1"},
                    "Alpha": {
                        "type": "aws:cloudformation:stack",
                        "dependencies": ["Zeta", "Zeta.assets"],
                        "properties": {"templateFile": "alpha.json", "stackName": "alpha-prod"}
                    },
                    "Zeta.assets": {"type": "cdk:asset-manifest"}
                }
            }),
        );

        let asm = load_assembly(dir.path()).unwrap();
        let ids: Vec<_> = asm.stacks().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["Zeta", "Alpha"]);

        let alpha = &asm.stacks()[1];
        assert_eq!(alpha.stack_name, "alpha-prod");
        assert_eq!(alpha.template_path, dir.path().join("alpha.json"));
        assert!(alpha.environment.is_region_agnostic());
        assert_eq!(alpha.dependencies.len(), 2);
        assert_eq!(alpha.dependencies[0].target(), "Zeta");

        let zeta = &asm.stacks()[0];
        assert_eq!(zeta.environment.region, "eu-west-1");
        assert_eq!(zeta.template_path, dir.path().join("Zeta.template.json"));
    }

    #[test]
    fn dependencies_carry_display_names() {
        let dir = TempDir::new().unwrap();
        write_manifest(
            dir.path(),
            serde_json::json!({
                "version": "36.0.0",
                "artifacts": {
                    "StageA1234": {"type": "aws:cloudformation:stack", "displayName": "Stage/A"},
                    "StageB5678": {
                        "type": "aws:cloudformation:stack",
                        "displayName": "Stage/B",
                        "dependencies": ["StageA1234"]
                    }
                }
            }),
        );

        let asm = load_assembly(dir.path()).unwrap();
        let b = asm.get_stack("Stage/B").unwrap();
        assert_eq!(b.id, "StageB5678");
        assert_eq!(b.dependencies[0].id, "StageA1234");
        assert_eq!(b.dependencies[0].target(), "Stage/A");
    }

    #[test]
    fn load_nested_assemblies_and_messages() {
        let dir = TempDir::new().unwrap();
        write_manifest(
            dir.path(),
            serde_json::json!({
                "version": "36.0.0",
                "runtime": {"libraries": {"aws-cdk-lib": "2.100.0"}},
                "missing": [{"key": "vpc:123", "provider": "vpc-provider", "props": {}}],
                "artifacts": {
                    "Top": {
                        "type": "aws:cloudformation:stack",
                        "metadata": {
                            "/Top/Bucket": [
                                {"type": "aws:cdk:logicalId", "data": "Bucket83908E77"},
                                {"type": "aws:cdk:warning", "data": "be careful", "trace": ["at x"]}
                            ]
                        }
                    },
                    "assembly-Stage": {
                        "type": "cdk:cloud-assembly",
                        "properties": {"directoryName": "assembly-Stage", "displayName": "Stage"}
                    }
                }
            }),
        );
        write_manifest(
            &dir.path().join("assembly-Stage"),
            serde_json::json!({
                "version": "36.0.0",
                "artifacts": {
                    "StageApi": {"type": "aws:cloudformation:stack", "displayName": "Stage/Api"}
                }
            }),
        );

        let asm = load_assembly(dir.path()).unwrap();
        assert_eq!(asm.nested_assemblies().len(), 1);
        assert_eq!(asm.nested_assemblies()[0].display_name, "Stage");
        assert_eq!(asm.stacks_recursively().len(), 2);
        assert_eq!(asm.missing()[0].key, "vpc:123");
        assert_eq!(
            asm.runtime().unwrap().libraries.get("aws-cdk-lib").map(String::as_str),
            Some("2.100.0")
        );

        let top = &asm.stacks()[0];
        assert_eq!(top.messages.len(), 1);
        assert_eq!(top.messages[0].level, MessageLevel::Warning);
        assert_eq!(top.messages[0].id, "/Top/Bucket");
        assert_eq!(top.messages[0].trace, vec!["at x"]);
    }

    #[test]
    fn missing_manifest_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = load_assembly(dir.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to read manifest"));
    }

    #[test]
    fn invalid_environment_is_an_error() {
        let dir = TempDir::new().unwrap();
        write_manifest(
            dir.path(),
            serde_json::json!({
                "version": "36.0.0",
                "artifacts": {
                    "Bad": {"type": "aws:cloudformation:stack", "environment": "eu-west-1"}
                }
            }),
        );
        let err = load_assembly(dir.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid environment"));
    }
}
