//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Purpose | Examples |
//! |---------|---------|----------|
//! | `init` | Write `stacks.toml` | `stacks init --app "python3 app.py"` |
//! | `list` | Stack ids or details | `stacks list 'Prod/*' --long` |
//! | `select` | Resolve a selection | `stacks select B --extend upstream` |
//! | `synth` | Synthesize and print a template | `stacks synth MyStack --strict` |
//! | `context` | Saved context values | `stacks context --reset KEY` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug logs on stderr:
//! ```bash
//! stacks --verbose synth
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod context_cmd;
mod list;
mod logging;
mod output;
mod select;
mod synth_cmd;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
