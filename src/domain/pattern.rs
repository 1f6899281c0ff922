//! Stack name patterns
//!
//! Shell-style globs over hierarchical ids. `*` and `?` stay within one
//! `/`-separated segment and a `**` segment crosses segments. `**` inside a
//! segment behaves like `*`. `{a,b}` alternatives are expanded before
//! matching, nested groups included; a group without a comma is literal.

use glob::{MatchOptions, Pattern};

/// A compiled stack pattern: one glob per brace alternative
#[derive(Debug, Clone)]
pub struct StackPattern {
    alternatives: Vec<Pattern>,
}

impl StackPattern {
    pub fn new(pattern: &str) -> Self {
        let alternatives = expand_braces(pattern)
            .iter()
            .map(|alternative| compile(alternative))
            .collect();
        Self { alternatives }
    }

    /// True when any alternative matches `id`
    pub fn matches(&self, id: &str) -> bool {
        self.alternatives
            .iter()
            .any(|glob| glob.matches_with(id, match_options()))
    }
}

/// Expands the first brace group with a top-level comma, recursively
fn expand_braces(pattern: &str) -> Vec<String> {
    let Some((open, close, commas)) = find_brace_group(pattern) else {
        return vec![pattern.to_string()];
    };

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];

    let mut bounds = Vec::with_capacity(commas.len() + 2);
    bounds.push(open);
    bounds.extend(commas);
    bounds.push(close);

    bounds
        .windows(2)
        .flat_map(|w| expand_braces(&format!("{}{}{}", prefix, &pattern[w[0] + 1..w[1]], suffix)))
        .collect()
}

/// Byte offsets of the first `{...}` group holding a top-level comma
fn find_brace_group(pattern: &str) -> Option<(usize, usize, Vec<usize>)> {
    let bytes = pattern.as_bytes();
    let mut start = 0;

    while let Some(offset) = pattern[start..].find('{') {
        let open = start + offset;
        let mut depth = 0usize;
        let mut commas = Vec::new();
        let mut close = None;

        for (i, &b) in bytes.iter().enumerate().skip(open) {
            match b {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(i);
                        break;
                    }
                }
                b',' if depth == 1 => commas.push(i),
                _ => {}
            }
        }

        match close {
            Some(close) if !commas.is_empty() => return Some((open, close, commas)),
            // Literal group: keep looking inside and after it
            Some(_) => start = open + 1,
            None => return None,
        }
    }

    None
}

/// Collapses `**` to `*` in every segment that is not exactly `**`
fn normalize_globstars(pattern: &str) -> String {
    pattern
        .split('/')
        .map(|segment| {
            if segment == "**" || !segment.contains("**") {
                return segment.to_string();
            }
            let mut collapsed = String::with_capacity(segment.len());
            for c in segment.chars() {
                if !(c == '*' && collapsed.ends_with('*')) {
                    collapsed.push(c);
                }
            }
            collapsed
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Compiles one alternative; invalid glob syntax matches literally
fn compile(alternative: &str) -> Pattern {
    let normalized = normalize_globstars(alternative);
    Pattern::new(&normalized).unwrap_or_else(|e| {
        tracing::debug!(
            "Pattern '{}' is not a valid glob ({}), matching literally",
            alternative,
            e
        );
        Pattern::new(&Pattern::escape(alternative)).unwrap_or_default()
    })
}

fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}
