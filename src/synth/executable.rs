//! The cloud executable: runs the app until its context is complete
//!
//! Each pass synthesizes the app with the current context. When the
//! assembly reports missing context, the provider looks it up, the context is
//! saved, and the app runs again. The loop stops when nothing is missing or
//! when two consecutive passes report the same missing keys.

use std::collections::BTreeSet;

use anyhow::Result;
use thiserror::Error;

use super::app::AppSynthesizer;
use super::metadata::add_metadata_resource;
use super::providers::{ContextProvider, ErrorRecordingProvider};
use crate::domain::{CloudAssembly, MissingContext};
use crate::storage::{Context, ContextStore, Project};

#[derive(Debug, Error)]
pub enum SynthError {
    #[error(
        "Context lookups have been disabled. Make sure all necessary context is already in \
         'stacks.context.json' by running 'stacks synth' with lookups enabled and committing \
         the result. Missing context keys: '{}'",
        .keys.join(", ")
    )]
    LookupsDisabled { keys: Vec<String> },

    #[error("Subprocess exited with error {status}: {command}")]
    AppFailed { command: String, status: String },
}

/// Produces a cloud assembly from the current context
pub trait Synthesizer {
    fn synthesize(&self, context: &Context) -> Result<CloudAssembly>;
}

/// Switches read from settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutableOptions {
    /// Look up missing context
    pub lookups: bool,

    /// Add the metadata resource to templates of old assemblies
    pub version_reporting: bool,
}

impl Default for ExecutableOptions {
    fn default() -> Self {
        Self {
            lookups: true,
            version_reporting: true,
        }
    }
}

/// Synthesizes an app and resolves its missing context
pub struct CloudExecutable {
    synthesizer: Box<dyn Synthesizer>,
    provider: Box<dyn ContextProvider>,
    context: Context,
    store: Option<ContextStore>,
    options: ExecutableOptions,
    cached: Option<CloudAssembly>,
}

impl CloudExecutable {
    pub fn new(synthesizer: impl Synthesizer + 'static, context: Context) -> Self {
        Self {
            synthesizer: Box::new(synthesizer),
            provider: Box::new(ErrorRecordingProvider),
            context,
            store: None,
            options: ExecutableOptions::default(),
            cached: None,
        }
    }

    /// Runs the project's app with the project's context and settings
    pub fn for_project(project: &Project) -> Result<Self> {
        let synthesizer = AppSynthesizer::new(project.app()?, project.output_dir(), project.root());

        Ok(Self::new(synthesizer, project.load_context()?)
            .with_store(project.context_store())
            .with_options(ExecutableOptions {
                lookups: project.lookups(),
                version_reporting: project.version_reporting(),
            }))
    }

    pub fn with_provider(mut self, provider: impl ContextProvider + 'static) -> Self {
        self.provider = Box::new(provider);
        self
    }

    /// Saves looked-up context to `store`
    pub fn with_store(mut self, store: ContextStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_options(mut self, options: ExecutableOptions) -> Self {
        self.options = options;
        self
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Returns the assembly, synthesizing it on first use or when `cache` is false
    pub fn synthesize(&mut self, cache: bool) -> Result<&CloudAssembly> {
        let assembly = match self.cached.take() {
            Some(assembly) if cache => assembly,
            _ => self.do_synthesize()?,
        };
        Ok(&*self.cached.insert(assembly))
    }

    fn do_synthesize(&mut self) -> Result<CloudAssembly> {
        let mut previously_missing: Option<BTreeSet<String>> = None;

        loop {
            let assembly = self.synthesizer.synthesize(&self.context)?;

            if !assembly.missing().is_empty() {
                let missing_keys = missing_context_keys(assembly.missing());

                if !self.options.lookups {
                    return Err(SynthError::LookupsDisabled {
                        keys: missing_keys.into_iter().collect(),
                    }
                    .into());
                }

                let try_lookup = previously_missing.as_ref() != Some(&missing_keys);
                if !try_lookup {
                    tracing::debug!(
                        "Not making progress trying to resolve environmental context. Giving up."
                    );
                }
                previously_missing = Some(missing_keys);

                if try_lookup {
                    tracing::debug!("Some context information is missing. Fetching...");
                    self.provider.provide(assembly.missing(), &mut self.context)?;
                    if let Some(store) = &self.store {
                        store.save(&self.context)?;
                    }
                    continue;
                }
            }

            if self.options.version_reporting && !assembly.capabilities().framework_analytics {
                add_metadata_resource(&assembly)?;
            }

            return Ok(assembly);
        }
    }
}

fn missing_context_keys(missing: &[MissingContext]) -> BTreeSet<String> {
    missing.iter().map(|m| m.key.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RuntimeInfo, SchemaVersion, StackArtifact};
    use crate::synth::metadata::METADATA_RESOURCE;
    use serde_json::{json, Value};
    use std::cell::Cell;
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::PathBuf;
    use std::rc::Rc;
    use tempfile::TempDir;

    /// Reports every required key that is not yet in the context
    struct FakeApp {
        required: Vec<&'static str>,
        calls: Rc<Cell<usize>>,
        version: SchemaVersion,
        template: Option<PathBuf>,
    }

    impl FakeApp {
        fn new(required: &[&'static str]) -> (Self, Rc<Cell<usize>>) {
            let calls = Rc::new(Cell::new(0));
            (
                Self {
                    required: required.to_vec(),
                    calls: calls.clone(),
                    version: SchemaVersion::new(36, 0, 0),
                    template: None,
                },
                calls,
            )
        }
    }

    impl Synthesizer for FakeApp {
        fn synthesize(&self, context: &Context) -> Result<CloudAssembly> {
            self.calls.set(self.calls.get() + 1);
            let missing = self
                .required
                .iter()
                .filter(|key| !context.contains(key))
                .map(|key| MissingContext {
                    key: key.to_string(),
                    provider: "test".to_string(),
                    props: json!({}),
                })
                .collect();

            let mut stack = StackArtifact::new("A");
            if let Some(template) = &self.template {
                stack = stack.with_template_path(template);
            }
            let mut libraries = BTreeMap::new();
            libraries.insert("lib".to_string(), "1.0.0".to_string());

            Ok(CloudAssembly::new("out", self.version.clone(), vec![stack])
                .with_missing(missing)
                .with_runtime(RuntimeInfo { libraries }))
        }
    }

    /// Resolves nothing
    struct StubbornProvider;

    impl ContextProvider for StubbornProvider {
        fn provide(&self, _: &[MissingContext], _: &mut Context) -> Result<()> {
            Ok(())
        }
    }

    /// Resolves every key to its own name
    struct EchoProvider;

    impl ContextProvider for EchoProvider {
        fn provide(&self, missing: &[MissingContext], context: &mut Context) -> Result<()> {
            for m in missing {
                context.set(m.key.clone(), json!(m.key));
            }
            Ok(())
        }
    }

    #[test]
    fn complete_context_synthesizes_once() {
        let (app, calls) = FakeApp::new(&[]);
        let mut executable = CloudExecutable::new(app, Context::new());

        let assembly = executable.synthesize(true).unwrap();
        assert!(assembly.missing().is_empty());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn missing_context_is_looked_up_and_saved() {
        let dir = TempDir::new().unwrap();
        let store = ContextStore::for_project(dir.path());
        let (app, calls) = FakeApp::new(&["vpc", "azs"]);
        let mut executable = CloudExecutable::new(app, Context::new())
            .with_provider(EchoProvider)
            .with_store(ContextStore::for_project(dir.path()));

        let assembly = executable.synthesize(true).unwrap();
        assert!(assembly.missing().is_empty());
        assert_eq!(calls.get(), 2);

        let saved = store.load().unwrap();
        assert_eq!(saved.get("vpc"), Some(&json!("vpc")));
        assert_eq!(saved.get("azs"), Some(&json!("azs")));
    }

    #[test]
    fn no_progress_stops_retrying() {
        let (app, calls) = FakeApp::new(&["vpc"]);
        let mut executable =
            CloudExecutable::new(app, Context::new()).with_provider(StubbornProvider);

        let assembly = executable.synthesize(true).unwrap();
        // Returned with the context still missing
        assert_eq!(assembly.missing().len(), 1);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn error_values_resolve_missing_keys_without_persisting() {
        let dir = TempDir::new().unwrap();
        let (app, calls) = FakeApp::new(&["vpc"]);
        let mut executable = CloudExecutable::new(app, Context::new())
            .with_store(ContextStore::for_project(dir.path()));

        executable.synthesize(true).unwrap();
        assert_eq!(calls.get(), 2);
        assert!(executable.context().contains("vpc"));
        assert!(ContextStore::for_project(dir.path())
            .load()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn lookups_disabled_names_missing_keys() {
        let (app, calls) = FakeApp::new(&["vpc", "azs"]);
        let mut executable = CloudExecutable::new(app, Context::new()).with_options(
            ExecutableOptions {
                lookups: false,
                version_reporting: true,
            },
        );

        let err = executable.synthesize(true).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Context lookups have been disabled"));
        assert!(message.contains("'azs, vpc'"));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn lookups_disabled_is_fine_when_nothing_is_missing() {
        let (app, _) = FakeApp::new(&[]);
        let mut executable = CloudExecutable::new(app, Context::new()).with_options(
            ExecutableOptions {
                lookups: false,
                version_reporting: false,
            },
        );

        assert!(executable.synthesize(true).is_ok());
    }

    #[test]
    fn assembly_is_cached() {
        let (app, calls) = FakeApp::new(&[]);
        let mut executable = CloudExecutable::new(app, Context::new());

        executable.synthesize(true).unwrap();
        executable.synthesize(true).unwrap();
        assert_eq!(calls.get(), 1);

        executable.synthesize(false).unwrap();
        assert_eq!(calls.get(), 2);
    }

    fn template_after_synth(version: SchemaVersion, version_reporting: bool) -> Value {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("A.template.json");
        fs::write(&path, "{}").unwrap();

        let (mut app, _) = FakeApp::new(&[]);
        app.version = version;
        app.template = Some(path.clone());
        let mut executable = CloudExecutable::new(app, Context::new()).with_options(
            ExecutableOptions {
                lookups: true,
                version_reporting,
            },
        );
        executable.synthesize(true).unwrap();

        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap()
    }

    #[test]
    fn old_assemblies_get_metadata_resource() {
        let template = template_after_synth(SchemaVersion::new(5, 0, 0), true);
        assert!(template["Resources"].get(METADATA_RESOURCE).is_some());
    }

    #[test]
    fn new_assemblies_are_untouched() {
        let template = template_after_synth(SchemaVersion::new(6, 0, 0), true);
        assert_eq!(template, json!({}));
    }

    #[test]
    fn version_reporting_off_leaves_templates_alone() {
        let template = template_after_synth(SchemaVersion::new(5, 0, 0), false);
        assert_eq!(template, json!({}));
    }
}
