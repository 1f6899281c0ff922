//! `stacks list`

use anyhow::Result;
use clap::Args;

use super::output::Output;
use crate::domain::{
    DefaultSelection, SelectStacksOptions, StackDetails, StackSelector, StackSelectorCriteria,
};
use crate::storage::Project;
use crate::synth::CloudExecutable;

#[derive(Args)]
pub struct ListArgs {
    /// Stack patterns (wildcards are supported); all stacks when empty
    pub patterns: Vec<String>,

    /// Show environment and dependency details
    #[arg(long, short = 'l')]
    pub long: bool,
}

pub fn run(args: ListArgs, project: Project, output: &Output) -> Result<()> {
    let mut executable = CloudExecutable::for_project(&project)?;
    let assembly = executable.synthesize(true)?;

    let selector = StackSelector::new(assembly, project.selection_config());
    let stacks = selector.select_stacks(
        &StackSelectorCriteria::patterns(args.patterns),
        &SelectStacksOptions {
            default_behavior: DefaultSelection::AllStacks,
            ..Default::default()
        },
    )?;
    output.verbose_ctx("list", &format!("Selected {} stack(s)", stacks.stack_count()));

    if args.long {
        output.data(&StackDetails::for_collection(&stacks, assembly))
    } else {
        output.lines(&stacks.hierarchical_ids())
    }
}
