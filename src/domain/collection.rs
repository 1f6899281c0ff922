//! Ordered collections of selected stacks
//!
//! A [`StackCollection`] borrows its stacks from a [`CloudAssembly`](super::CloudAssembly)
//! and never mutates them. Every derived collection is a new value.

use thiserror::Error;

use super::stack::{MessageLevel, StackArtifact, SynthesisMessage};

#[derive(Debug, Error, PartialEq)]
pub enum CollectionError {
    #[error("StackCollection contains no stack artifacts (trying to access the first one)")]
    EmptyCollection,
}

#[derive(Debug, Error, PartialEq)]
pub enum MessageError {
    #[error("Found errors")]
    FoundErrors,

    #[error("Found warnings (--strict mode)")]
    FoundWarnings,
}

/// How synthesis messages turn into failures
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageOptions {
    /// Fail if any warnings were found
    pub strict: bool,

    /// Do not fail on errors
    pub ignore_errors: bool,

    /// Print construct traces along with each message
    pub verbose: bool,
}

/// Counts of the messages seen by [`StackCollection::process_metadata_messages`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageSummary {
    pub info: usize,
    pub warnings: usize,
    pub errors: usize,
}

/// An ordered list of stacks
#[derive(Debug, Clone, Default)]
pub struct StackCollection<'a> {
    stacks: Vec<&'a StackArtifact>,
}

impl<'a> StackCollection<'a> {
    pub fn new(stacks: Vec<&'a StackArtifact>) -> Self {
        Self { stacks }
    }

    pub fn empty() -> Self {
        Self { stacks: Vec::new() }
    }

    pub fn stack_count(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    pub fn first_stack(&self) -> Result<&'a StackArtifact, CollectionError> {
        self.stacks
            .first()
            .copied()
            .ok_or(CollectionError::EmptyCollection)
    }

    /// Artifact ids in order
    pub fn stack_ids(&self) -> Vec<&'a str> {
        self.stacks.iter().map(|s| s.id.as_str()).collect()
    }

    /// Hierarchical ids in order
    pub fn hierarchical_ids(&self) -> Vec<&'a str> {
        self.stacks
            .iter()
            .map(|s| s.hierarchical_id.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a StackArtifact> + '_ {
        self.stacks.iter().copied()
    }

    pub fn reversed(&self) -> Self {
        let mut stacks = self.stacks.clone();
        stacks.reverse();
        Self { stacks }
    }

    pub fn filter(&self, predicate: impl Fn(&StackArtifact) -> bool) -> Self {
        Self {
            stacks: self.stacks.iter().copied().filter(|s| predicate(s)).collect(),
        }
    }

    /// Appends `other`; stacks present in both appear twice
    pub fn concat(&self, other: &Self) -> Self {
        let mut stacks = self.stacks.clone();
        stacks.extend(other.stacks.iter().copied());
        Self { stacks }
    }

    /// Prints the synthesis messages of every stack and applies the failure policy
    pub fn process_metadata_messages(
        &self,
        options: &MessageOptions,
    ) -> Result<MessageSummary, MessageError> {
        let mut summary = MessageSummary::default();

        for stack in &self.stacks {
            for message in &stack.messages {
                match message.level {
                    MessageLevel::Warning => summary.warnings += 1,
                    MessageLevel::Error => summary.errors += 1,
                    MessageLevel::Info => summary.info += 1,
                }
                print_message(message, options.verbose);
            }
        }

        if summary.errors > 0 && !options.ignore_errors {
            return Err(MessageError::FoundErrors);
        }
        if options.strict && summary.warnings > 0 {
            return Err(MessageError::FoundWarnings);
        }

        Ok(summary)
    }
}

fn print_message(message: &SynthesisMessage, verbose: bool) {
    let mut text = format!(
        "[{} at {}] {}",
        message.level.label(),
        message.id,
        message.text()
    );
    if verbose && !message.trace.is_empty() {
        text.push_str(&format!("\n  {}", message.trace.join("\n  ")));
    }

    match message.level {
        MessageLevel::Warning => tracing::warn!("{}", text),
        MessageLevel::Error => tracing::error!("{}", text),
        MessageLevel::Info => tracing::info!("{}", text),
    }
}
