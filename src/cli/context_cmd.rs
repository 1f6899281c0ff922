//! `stacks context`

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use super::output::Output;
use crate::storage::{is_transient, Project};

#[derive(Args)]
pub struct ContextArgs {
    /// Remove a saved context value so it is looked up again
    #[arg(long, short = 'r', value_name = "KEY", conflicts_with = "clear")]
    pub reset: Option<String>,

    /// Remove all saved context values
    #[arg(long)]
    pub clear: bool,
}

#[derive(Debug, Serialize)]
struct ContextEntry<'a> {
    key: &'a str,
    value: &'a serde_json::Value,
    source: &'static str,
}

pub fn run(args: ContextArgs, project: Project, output: &Output) -> Result<()> {
    let store = project.context_store();

    if let Some(key) = args.reset {
        if store.reset(&key)? {
            output.success(&format!(
                "Context value {} reset. It will be refreshed on next synthesis",
                key
            ));
            return Ok(());
        }
        if project.load_context()?.is_override(&key) {
            anyhow::bail!(
                "Context value {} is set in configuration; remove it from stacks.toml instead",
                key
            );
        }
        anyhow::bail!("No context value with key: {}", key);
    }

    if args.clear {
        let count = store.clear()?;
        output.success(&format!("Cleared {} context value(s)", count));
        return Ok(());
    }

    let context = project.load_context()?;
    output.verbose_ctx(
        "context",
        &format!("Read context from: {}", store.path().display()),
    );

    let mut entries = Vec::new();
    for key in context.keys() {
        if let Some(value) = context.get(key) {
            let source = if context.is_override(key) {
                "config"
            } else if is_transient(value) {
                "transient"
            } else {
                "saved"
            };
            entries.push(ContextEntry { key, value, source });
        }
    }

    if output.is_json() {
        return output.data(&entries);
    }

    if entries.is_empty() {
        println!("This project has no context values.");
        return Ok(());
    }

    println!("Context found in {}:", store.path().display());
    println!("{:<50} {:<8} VALUE", "KEY", "SOURCE");
    println!("{}", "-".repeat(80));
    for entry in &entries {
        println!("{:<50} {:<8} {}", entry.key, entry.source, entry.value);
    }
    println!();
    println!("Run `stacks context --reset KEY` to refresh a saved value.");

    Ok(())
}
