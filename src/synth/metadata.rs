//! Metadata resource injection
//!
//! Assemblies written before the framework reported its own analytics get an
//! `AWS::CDK::Metadata` resource added to each template after synthesis. For
//! region-agnostic stacks the resource is guarded by a `CDKMetadataAvailable`
//! condition listing the regions where the resource type exists.

use std::fs;

use anyhow::{Context as _, Result};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::domain::{CloudAssembly, RuntimeInfo, StackArtifact};

/// Logical id of the injected resource
pub const METADATA_RESOURCE: &str = "CDKMetadata";

/// Name of the condition guarding the resource in region-agnostic stacks
pub const METADATA_CONDITION: &str = "CDKMetadataAvailable";

const METADATA_RESOURCE_TYPE: &str = "AWS::CDK::Metadata";

/// `Fn::Or` accepts at most this many operands
const FN_OR_MAX_OPERANDS: usize = 10;

/// Regions where the metadata resource type is available
pub const METADATA_REGIONS: &[&str] = &[
    "af-south-1",
    "ap-east-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-south-1",
    "ap-south-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-southeast-3",
    "ca-central-1",
    "cn-north-1",
    "cn-northwest-1",
    "eu-central-1",
    "eu-central-2",
    "eu-north-1",
    "eu-south-1",
    "eu-south-2",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "me-central-1",
    "me-south-1",
    "sa-east-1",
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
];

#[derive(Debug, Error, PartialEq)]
pub enum MetadataError {
    #[error("Cannot build `Fn::Or` with zero operands")]
    EmptyFnOr,

    #[error("Template of stack '{0}' is not a JSON object")]
    InvalidTemplate(String),
}

/// Returns true if the metadata resource can be deployed to `region`
pub fn region_has_metadata(region: &str) -> bool {
    METADATA_REGIONS.contains(&region)
}

/// `stacks=VERSION` followed by the app's libraries sorted by name
pub fn format_modules(runtime: &RuntimeInfo) -> String {
    let mut modules = vec![format!("stacks={}", env!("CARGO_PKG_VERSION"))];
    // BTreeMap iterates in key order
    modules.extend(
        runtime
            .libraries
            .iter()
            .map(|(name, version)| format!("{}={}", name, version)),
    );
    modules.join(",")
}

/// Combines operands into nested `Fn::Or` expressions of at most ten operands
pub fn fn_or(mut operands: Vec<Value>) -> Result<Value, MetadataError> {
    match operands.len() {
        0 => Err(MetadataError::EmptyFnOr),
        1 => Ok(operands.remove(0)),
        n if n <= FN_OR_MAX_OPERANDS => Ok(json!({ "Fn::Or": operands })),
        _ => {
            let groups = operands
                .chunks(FN_OR_MAX_OPERANDS)
                .map(|group| fn_or(group.to_vec()))
                .collect::<Result<Vec<_>, _>>()?;
            fn_or(groups)
        }
    }
}

/// The `CDKMetadataAvailable` condition body
pub fn metadata_available_condition() -> Result<Value, MetadataError> {
    fn_or(
        METADATA_REGIONS
            .iter()
            .map(|region| json!({ "Fn::Equals": [{ "Ref": "AWS::Region" }, region] }))
            .collect(),
    )
}

/// Adds the metadata resource to every template of the assembly, nested ones included
///
/// Does nothing when the assembly carries no runtime information. Returns the
/// number of templates rewritten.
pub fn add_metadata_resource(assembly: &CloudAssembly) -> Result<usize> {
    let runtime = match assembly.runtime() {
        Some(runtime) => runtime,
        None => return Ok(0),
    };
    let modules = format_modules(runtime);

    let mut rewritten = 0;
    for stack in assembly.stacks_recursively() {
        if process_stack(stack, &modules)? {
            rewritten += 1;
        }
    }

    tracing::debug!("Added metadata resource to {} template(s)", rewritten);
    Ok(rewritten)
}

fn process_stack(stack: &StackArtifact, modules: &str) -> Result<bool> {
    let region_agnostic = stack.environment.is_region_agnostic();
    if !region_agnostic && !region_has_metadata(&stack.environment.region) {
        return Ok(false);
    }

    let path = stack.template_path();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read template: {}", path.display()))?;
    let mut template: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse template: {}", path.display()))?;

    if !inject(&mut template, stack, modules)? {
        return Ok(false);
    }

    let mut output = serde_json::to_string_pretty(&template).context("Failed to serialize template")?;
    output.push('\n');
    fs::write(path, output)
        .with_context(|| format!("Failed to write template: {}", path.display()))?;

    Ok(true)
}

/// Adds the resource (and condition) to an in-memory template
///
/// Returns false if the template already had the resource.
fn inject(template: &mut Value, stack: &StackArtifact, modules: &str) -> Result<bool> {
    let root = template
        .as_object_mut()
        .ok_or_else(|| MetadataError::InvalidTemplate(stack.id.clone()))?;

    let resources = object_entry(root, "Resources", &stack.id)?;
    if resources.contains_key(METADATA_RESOURCE) {
        return Ok(false);
    }

    let mut resource = Map::new();
    resource.insert("Type".to_string(), json!(METADATA_RESOURCE_TYPE));
    resource.insert("Properties".to_string(), json!({ "Modules": modules }));

    if stack.environment.is_region_agnostic() {
        let conditions = object_entry(root, "Conditions", &stack.id)?;
        if conditions.contains_key(METADATA_CONDITION) {
            tracing::warn!(
                "The stack {} already includes a {} condition",
                stack.id,
                METADATA_CONDITION
            );
        } else {
            conditions.insert(
                METADATA_CONDITION.to_string(),
                metadata_available_condition()?,
            );
            resource.insert("Condition".to_string(), json!(METADATA_CONDITION));
        }
    }

    object_entry(root, "Resources", &stack.id)?
        .insert(METADATA_RESOURCE.to_string(), Value::Object(resource));

    Ok(true)
}

/// The object under `key`, created if absent
fn object_entry<'a>(
    root: &'a mut Map<String, Value>,
    key: &str,
    stack_id: &str,
) -> Result<&'a mut Map<String, Value>> {
    root.entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| MetadataError::InvalidTemplate(stack_id.to_string()).into())
}
