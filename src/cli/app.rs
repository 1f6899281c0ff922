//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::output::{Output, OutputFormat};
use super::{context_cmd, list, logging, select, synth_cmd};
use crate::storage::{Project, Settings};

#[derive(Parser)]
#[command(name = "stacks")]
#[command(author, version, about = "Select, extend and synthesize stacks from a cloud assembly")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Command that synthesizes the app, or a directory with a synthesized assembly
    #[arg(long, short = 'a', global = true, env = "STACKS_APP")]
    pub app: Option<String>,

    /// Directory the app writes its assembly to
    #[arg(long, short = 'o', global = true)]
    pub output: Option<PathBuf>,

    /// Fail instead of looking up missing context
    #[arg(long, global = true)]
    pub no_lookups: bool,

    /// Do not add the metadata resource to templates
    #[arg(long, global = true)]
    pub no_version_reporting: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Settings given on the command line
    fn settings(&self) -> Settings {
        Settings {
            app: self.app.clone(),
            output: self.output.clone(),
            lookups: self.no_lookups.then_some(false),
            version_reporting: self.no_version_reporting.then_some(false),
            ..Default::default()
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a stacks.toml in a directory
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// List the stacks of the app
    #[command(visible_alias = "ls")]
    List(list::ListArgs),

    /// Print the stacks a selection resolves to
    Select(select::SelectArgs),

    /// Synthesize the app and print the selected template
    #[command(visible_alias = "synthesize")]
    Synth(synth_cmd::SynthArgs),

    /// Show or reset saved context values
    Context(context_cmd::ContextArgs),
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let output = Output::new(cli.format, cli.verbose);
    let overrides = cli.settings();

    match cli.command {
        Commands::Init { path } => {
            output.verbose_ctx("init", &format!("Initializing project at: {}", path));
            let project = Project::init(&path, overrides.app.as_deref())?;
            output.success(&format!(
                "Initialized stacks project at {}",
                project.root().display()
            ));
        }

        Commands::List(args) => list::run(args, open_project(overrides, &output)?, &output)?,
        Commands::Select(args) => select::run(args, open_project(overrides, &output)?, &output)?,
        Commands::Synth(args) => synth_cmd::run(args, open_project(overrides, &output)?, &output)?,
        Commands::Context(args) => {
            context_cmd::run(args, open_project(overrides, &output)?, &output)?
        }
    }

    Ok(())
}

/// Opens the current project with command-line settings on top
fn open_project(overrides: Settings, output: &Output) -> Result<Project> {
    let mut project = Project::open_current()?;
    project.apply_overrides(overrides);
    output.verbose_ctx(
        "project",
        &format!("Opened project at: {}", project.root().display()),
    );
    Ok(project)
}
