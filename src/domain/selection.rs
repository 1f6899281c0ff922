//! Stack selection
//!
//! Turns user-supplied criteria (glob patterns, "all top-level", or a
//! default policy) into an ordered [`StackCollection`], optionally extended
//! with upstream dependencies or downstream dependents.
//!
//! The output is always a subsequence of the assembly's stack order: matches
//! and closures only decide membership, and the result is produced by
//! filtering the ordered working set against that membership.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::assembly::CloudAssembly;
use super::collection::StackCollection;
use super::graph::{DependencyGraph, Direction};
use super::pattern::StackPattern;
use super::stack::StackArtifact;
use super::version::SchemaVersion;

/// Environment variable that turns off selection by legacy artifact id
pub const DISABLE_SELECT_BY_ID_ENV: &str = "CXAPI_DISABLE_SELECT_BY_ID";

/// Toolkit major version from which selection by legacy id is gone
const LEGACY_ID_REMOVAL_MAJOR: u64 = 2;

#[derive(Debug, Error, PartialEq)]
pub enum SelectionError {
    #[error("This app contains no stacks")]
    EmptyAssembly,

    #[error("No stack found in the main cloud assembly. Use \"list\" to print manifest")]
    NoTopLevelStack,

    #[error(
        "Since this app includes more than a single stack, specify which stacks to use (wildcards are supported) or specify `--all`\nStacks: {}",
        .0.join(" · ")
    )]
    AmbiguousSelection(Vec<String>),

    #[error("invalid default behavior: {0}")]
    InvalidDefaultPolicy(String),

    #[error("invalid stack extension: {0} (expected none, upstream or downstream)")]
    InvalidExtension(String),

    #[error("Stack not found: {0}")]
    StackNotFound(String),
}

/// What to select when no patterns were given
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefaultSelection {
    /// Select nothing
    #[default]
    None,
    /// The only top-level stack; ambiguous if there are several
    OnlySingle,
    /// All top-level stacks
    MainAssembly,
    /// All stacks, including nested assemblies
    AllStacks,
}

impl DefaultSelection {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefaultSelection::None => "none",
            DefaultSelection::OnlySingle => "single",
            DefaultSelection::MainAssembly => "main",
            DefaultSelection::AllStacks => "all",
        }
    }
}

impl fmt::Display for DefaultSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DefaultSelection {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(DefaultSelection::None),
            "single" => Ok(DefaultSelection::OnlySingle),
            "main" => Ok(DefaultSelection::MainAssembly),
            "all" => Ok(DefaultSelection::AllStacks),
            other => Err(SelectionError::InvalidDefaultPolicy(other.to_string())),
        }
    }
}

/// Which other stacks to pull in because of dependencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtendedStackSelection {
    #[default]
    None,
    /// Include stacks the selected stacks depend on
    Upstream,
    /// Include stacks that depend on the selected stacks
    Downstream,
}

impl ExtendedStackSelection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtendedStackSelection::None => "none",
            ExtendedStackSelection::Upstream => "upstream",
            ExtendedStackSelection::Downstream => "downstream",
        }
    }
}

impl fmt::Display for ExtendedStackSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtendedStackSelection {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(ExtendedStackSelection::None),
            "upstream" => Ok(ExtendedStackSelection::Upstream),
            "downstream" => Ok(ExtendedStackSelection::Downstream),
            other => Err(SelectionError::InvalidExtension(other.to_string())),
        }
    }
}

/// What the user asked for
#[derive(Debug, Clone, Default)]
pub struct StackSelectorCriteria {
    /// Glob patterns matched against hierarchical ids
    pub patterns: Vec<String>,

    /// Select every top-level stack, ignoring patterns
    pub all_top_level: bool,
}

impl StackSelectorCriteria {
    pub fn patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
            all_top_level: false,
        }
    }

    pub fn all_top_level() -> Self {
        Self {
            patterns: Vec::new(),
            all_top_level: true,
        }
    }
}

/// How a selection is carried out
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectStacksOptions {
    pub extend: ExtendedStackSelection,
    pub default_behavior: DefaultSelection,

    /// Return an empty collection instead of failing on an empty assembly
    pub ignore_no_stacks: bool,
}

/// Selector settings resolved once by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionConfig {
    /// A pattern equal to a stack's artifact id also selects it
    pub legacy_id_selection: bool,
}

impl SelectionConfig {
    /// Resolves the settings for a toolkit version and the kill switch value
    pub fn resolve(toolkit: SchemaVersion, disable_select_by_id: Option<&str>) -> Self {
        Self {
            legacy_id_selection: toolkit.major() < LEGACY_ID_REMOVAL_MAJOR
                && disable_select_by_id != Some("1"),
        }
    }

    /// Resolves the settings from this toolkit's version and the process environment
    pub fn from_env() -> Self {
        let disable = std::env::var(DISABLE_SELECT_BY_ID_ENV).ok();
        Self::resolve(SchemaVersion::toolkit(), disable.as_deref())
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            legacy_id_selection: false,
        }
    }
}

/// Selects stacks from one assembly
pub struct StackSelector<'a> {
    assembly: &'a CloudAssembly,
    config: SelectionConfig,
}

impl<'a> StackSelector<'a> {
    pub fn new(assembly: &'a CloudAssembly, config: SelectionConfig) -> Self {
        Self { assembly, config }
    }

    pub fn select_stacks(
        &self,
        criteria: &StackSelectorCriteria,
        options: &SelectStacksOptions,
    ) -> Result<StackCollection<'a>, SelectionError> {
        let top_level: Vec<&'a StackArtifact> = self.assembly.stacks().iter().collect();
        let stacks = self.assembly.selectable_stacks();
        let patterns = sanitize_patterns(&criteria.patterns);

        if stacks.is_empty() {
            if options.ignore_no_stacks {
                return Ok(StackCollection::empty());
            }
            return Err(SelectionError::EmptyAssembly);
        }

        if criteria.all_top_level {
            self.select_top_level_stacks(&stacks, &top_level, options.extend)
        } else if !patterns.is_empty() {
            Ok(self.select_matching_stacks(&stacks, &patterns, options.extend))
        } else {
            select_default_stacks(&stacks, &top_level, options.default_behavior)
        }
    }

    /// A collection holding the stack with the given artifact or hierarchical id
    pub fn stack_by_id(&self, id: &str) -> Result<StackCollection<'a>, SelectionError> {
        self.assembly
            .get_stack(id)
            .map(|stack| StackCollection::new(vec![stack]))
            .ok_or_else(|| SelectionError::StackNotFound(id.to_string()))
    }

    fn select_top_level_stacks(
        &self,
        stacks: &[&'a StackArtifact],
        top_level: &[&'a StackArtifact],
        extend: ExtendedStackSelection,
    ) -> Result<StackCollection<'a>, SelectionError> {
        if top_level.is_empty() {
            return Err(SelectionError::NoTopLevelStack);
        }
        Ok(extend_stacks(top_level, stacks, extend))
    }

    fn select_matching_stacks(
        &self,
        stacks: &[&'a StackArtifact],
        patterns: &[String],
        extend: ExtendedStackSelection,
    ) -> StackCollection<'a> {
        let mut matched: Vec<&'a StackArtifact> = Vec::new();
        for pattern in patterns {
            let glob = StackPattern::new(pattern);
            for &stack in stacks {
                if self.matches(stack, pattern, &glob) {
                    matched.push(stack);
                }
            }
        }
        extend_stacks(&matched, stacks, extend)
    }

    fn matches(&self, stack: &StackArtifact, pattern: &str, glob: &StackPattern) -> bool {
        if glob.matches(&stack.hierarchical_id) {
            return true;
        }

        if self.config.legacy_id_selection && stack.id == pattern {
            tracing::warn!(
                "Selecting stack by identifier \"{}\". This identifier is deprecated and will be removed in a future major version. Please use \"{}\" instead.",
                stack.id,
                stack.hierarchical_id
            );
            tracing::warn!("Run \"stacks list\" to see a list of all stack identifiers");
            return true;
        }

        false
    }
}

fn select_default_stacks<'a>(
    stacks: &[&'a StackArtifact],
    top_level: &[&'a StackArtifact],
    default_behavior: DefaultSelection,
) -> Result<StackCollection<'a>, SelectionError> {
    match default_behavior {
        DefaultSelection::MainAssembly => Ok(StackCollection::new(top_level.to_vec())),
        DefaultSelection::AllStacks => Ok(StackCollection::new(stacks.to_vec())),
        DefaultSelection::None => Ok(StackCollection::empty()),
        DefaultSelection::OnlySingle => {
            if top_level.len() == 1 {
                Ok(StackCollection::new(top_level.to_vec()))
            } else {
                Err(SelectionError::AmbiguousSelection(
                    stacks.iter().map(|s| s.hierarchical_id.clone()).collect(),
                ))
            }
        }
    }
}

/// Extends `matched` along dependency edges and orders the result like `all`
fn extend_stacks<'a>(
    matched: &[&'a StackArtifact],
    all: &[&'a StackArtifact],
    extend: ExtendedStackSelection,
) -> StackCollection<'a> {
    let seed: BTreeSet<String> = matched.iter().map(|s| s.hierarchical_id.clone()).collect();

    let direction = match extend {
        ExtendedStackSelection::None => None,
        ExtendedStackSelection::Upstream => Some(Direction::Upstream),
        ExtendedStackSelection::Downstream => Some(Direction::Downstream),
    };

    let selected = match direction {
        Some(direction) => {
            let graph = DependencyGraph::from_stacks(all.iter().copied());
            let closed = graph.closure(&seed, direction);
            report_added(all, &seed, &closed, direction);
            closed
        }
        None => seed,
    };

    // Filter the original list because it is in the right order
    let mut seen = BTreeSet::new();
    StackCollection::new(
        all.iter()
            .copied()
            .filter(|s| {
                selected.contains(&s.hierarchical_id) && seen.insert(s.hierarchical_id.clone())
            })
            .collect(),
    )
}

fn report_added(
    all: &[&StackArtifact],
    seed: &BTreeSet<String>,
    closed: &BTreeSet<String>,
    direction: Direction,
) {
    let added: Vec<&str> = all
        .iter()
        .map(|s| s.hierarchical_id.as_str())
        .filter(|id| closed.contains(*id) && !seed.contains(*id))
        .collect();

    if added.is_empty() {
        return;
    }

    match direction {
        Direction::Upstream => {
            tracing::info!("Including dependency stacks: {}", added.join(", "))
        }
        Direction::Downstream => {
            tracing::info!("Including depending stacks: {}", added.join(", "))
        }
    }
}

/// Drops empty patterns and duplicates, keeping first occurrences
fn sanitize_patterns(patterns: &[String]) -> Vec<String> {
    let mut sanitized: Vec<String> = Vec::new();
    for pattern in patterns {
        if !pattern.is_empty() && !sanitized.contains(pattern) {
            sanitized.push(pattern.clone());
        }
    }
    sanitized
}
