//! `stacks synth`

use std::fs;

use anyhow::{Context as _, Result};
use clap::Args;

use super::output::Output;
use crate::domain::{
    DefaultSelection, ExtendedStackSelection, MessageOptions, SelectStacksOptions, StackSelector,
    StackSelectorCriteria,
};
use crate::storage::Project;
use crate::synth::CloudExecutable;

#[derive(Args)]
pub struct SynthArgs {
    /// Stack patterns (wildcards are supported)
    pub patterns: Vec<String>,

    /// Only synthesize the given stacks, not their dependencies
    #[arg(long, short = 'e')]
    pub exclusively: bool,

    /// Fail on warnings as well as errors
    #[arg(long)]
    pub strict: bool,

    /// Do not fail on error messages
    #[arg(long)]
    pub ignore_errors: bool,

    /// Do not print the template
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

pub fn run(args: SynthArgs, project: Project, output: &Output) -> Result<()> {
    let mut executable = CloudExecutable::for_project(&project)?;
    let assembly = executable.synthesize(true)?;

    let selector = StackSelector::new(assembly, project.selection_config());
    let stacks = selector.select_stacks(
        &StackSelectorCriteria::patterns(args.patterns),
        &SelectStacksOptions {
            extend: if args.exclusively {
                ExtendedStackSelection::None
            } else {
                ExtendedStackSelection::Upstream
            },
            default_behavior: DefaultSelection::MainAssembly,
            ignore_no_stacks: false,
        },
    )?;

    let summary = stacks.process_metadata_messages(&MessageOptions {
        strict: args.strict,
        ignore_errors: args.ignore_errors,
        verbose: output.is_verbose(),
    })?;
    output.verbose_ctx(
        "synth",
        &format!(
            "{} error(s), {} warning(s), {} info message(s)",
            summary.errors, summary.warnings, summary.info
        ),
    );

    if stacks.stack_count() == 1 {
        if !args.quiet {
            let stack = stacks.first_stack()?;
            let path = stack.template_path();
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read template: {}", path.display()))?;
            let template: serde_json::Value = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse template: {}", path.display()))?;
            output.data(&template)?;
        }
        return Ok(());
    }

    let directory = assembly.directory().display().to_string();
    if output.is_json() {
        output.data(&serde_json::json!({
            "directory": directory,
            "stacks": stacks.hierarchical_ids(),
        }))
    } else {
        output.success(&format!("Successfully synthesized to {}", directory));
        output.success(&format!(
            "Supply a stack id ({}) to display its template.",
            stacks.hierarchical_ids().join(", ")
        ));
        Ok(())
    }
}
