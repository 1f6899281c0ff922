//! `stacks select`

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use super::output::Output;
use crate::domain::{
    DefaultSelection, ExtendedStackSelection, SelectStacksOptions, StackArtifact, StackSelector,
    StackSelectorCriteria,
};
use crate::storage::Project;
use crate::synth::CloudExecutable;

#[derive(Args)]
pub struct SelectArgs {
    /// Stack patterns (wildcards are supported)
    pub patterns: Vec<String>,

    /// Select every top-level stack
    #[arg(long, conflicts_with = "patterns")]
    pub all: bool,

    /// Also select dependencies (upstream) or dependents (downstream)
    #[arg(long, short = 'e', default_value = "none")]
    pub extend: ExtendedStackSelection,

    /// What to select without patterns: none, single, main or all
    #[arg(long, short = 'd', default_value = "none")]
    pub default: DefaultSelection,

    /// Return an empty selection for an app without stacks
    #[arg(long)]
    pub ignore_no_stacks: bool,

    /// Print the selection in reverse order
    #[arg(long)]
    pub reverse: bool,
}

/// One selected stack in JSON output
#[derive(Debug, Serialize)]
struct SelectedStack<'a> {
    id: &'a str,
    artifact_id: &'a str,
    stack_name: &'a str,
    environment: &'a str,
}

impl<'a> From<&'a StackArtifact> for SelectedStack<'a> {
    fn from(stack: &'a StackArtifact) -> Self {
        Self {
            id: &stack.hierarchical_id,
            artifact_id: &stack.id,
            stack_name: &stack.stack_name,
            environment: &stack.environment.name,
        }
    }
}

pub fn run(args: SelectArgs, project: Project, output: &Output) -> Result<()> {
    let mut executable = CloudExecutable::for_project(&project)?;
    let assembly = executable.synthesize(true)?;

    let criteria = if args.all {
        StackSelectorCriteria::all_top_level()
    } else {
        StackSelectorCriteria::patterns(args.patterns)
    };
    let options = SelectStacksOptions {
        extend: args.extend,
        default_behavior: args.default,
        ignore_no_stacks: args.ignore_no_stacks,
    };
    output.verbose_ctx(
        "select",
        &format!(
            "extend={}, default={}, ignore_no_stacks={}",
            options.extend, options.default_behavior, options.ignore_no_stacks
        ),
    );

    let selector = StackSelector::new(assembly, project.selection_config());
    let mut stacks = selector.select_stacks(&criteria, &options)?;
    if args.reverse {
        stacks = stacks.reversed();
    }

    if output.is_json() {
        let selected: Vec<SelectedStack<'_>> = stacks.iter().map(SelectedStack::from).collect();
        output.data(&selected)
    } else {
        for stack in stacks.iter() {
            output.row(&[stack.hierarchical_id.as_str(), stack.environment.name.as_str()]);
        }
        Ok(())
    }
}
