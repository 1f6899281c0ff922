//! Context values for synthesis
//!
//! Context is a key/value bag handed to the app on every synthesis. Values
//! looked up on behalf of the app are persisted in `stacks.context.json`
//! next to the project config so later runs do not repeat the lookups.
//! Uses file locking for concurrent access safety.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use fs2::FileExt;
use serde_json::{Map, Value};

/// Context file name in the project root
pub const CONTEXT_FILE: &str = "stacks.context.json";

/// Marks a value that is handed to the app but never persisted
pub const TRANSIENT_CONTEXT_KEY: &str = "$dontSaveContext";

/// Error message recorded by a provider that could not resolve a key
pub const PROVIDER_ERROR_KEY: &str = "$providerError";

/// Context values: saved lookups plus configured overrides
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    /// Values that belong in the context file
    saved: Map<String, Value>,

    /// Values from configuration; shadow saved values and are never written
    overrides: Map<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_saved(saved: Map<String, Value>) -> Self {
        Self {
            saved,
            overrides: Map::new(),
        }
    }

    pub fn with_overrides(mut self, overrides: Map<String, Value>) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.overrides.get(key).or_else(|| self.saved.get(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.saved.insert(key.into(), value);
    }

    /// Removes a saved value
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.saved.shift_remove(key)
    }

    pub fn clear(&mut self) {
        self.saved.clear();
    }

    /// All keys, saved first
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.saved.keys().map(String::as_str).collect();
        for key in self.overrides.keys() {
            if !self.saved.contains_key(key) {
                keys.push(key);
            }
        }
        keys
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.saved.is_empty() && self.overrides.is_empty()
    }

    /// Returns true if the key is shadowed by configuration
    pub fn is_override(&self, key: &str) -> bool {
        self.overrides.contains_key(key)
    }

    /// Everything the app sees
    pub fn to_json(&self) -> Value {
        let mut merged = self.saved.clone();
        for (key, value) in &self.overrides {
            merged.insert(key.clone(), value.clone());
        }
        Value::Object(merged)
    }

    /// Saved values minus transient ones
    pub fn persistable(&self) -> Map<String, Value> {
        self.saved
            .iter()
            .filter(|(_, value)| !is_transient(value))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Returns true if a value must not be written to the context file
pub fn is_transient(value: &Value) -> bool {
    value
        .get(TRANSIENT_CONTEXT_KEY)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Store for persisted context values
pub struct ContextStore {
    path: PathBuf,
}

impl ContextStore {
    /// Creates a new context store at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates the default store for a project
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(CONTEXT_FILE))
    }

    /// Returns the path to the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the saved context values
    pub fn load(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open context file: {}", self.path.display()))?;

        // Acquire shared lock for reading
        file.lock_shared()
            .context("Failed to acquire read lock on context file")?;

        let value: Value = serde_json::from_reader(BufReader::new(&file))
            .with_context(|| format!("Failed to parse context file: {}", self.path.display()))?;

        match value {
            Value::Object(map) => Ok(map),
            _ => anyhow::bail!(
                "Context file must contain a JSON object: {}",
                self.path.display()
            ),
        }
    }

    /// Writes the persistable values of `context` (full rewrite)
    pub fn save(&self, context: &Context) -> Result<()> {
        self.write(&context.persistable())
    }

    fn write(&self, values: &Map<String, Value>) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        // Write to temp file first
        let temp_path = self.path.with_extension("json.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            // Acquire exclusive lock
            file.lock_exclusive()
                .context("Failed to acquire write lock on context file")?;

            let mut writer = BufWriter::new(&file);
            serde_json::to_writer_pretty(&mut writer, values)
                .context("Failed to serialize context")?;
            writeln!(writer).context("Failed to write context")?;
            writer.flush().context("Failed to flush context file")?;
        }

        // Atomic rename
        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        Ok(())
    }

    /// Removes one saved key; returns false if it was not present
    pub fn reset(&self, key: &str) -> Result<bool> {
        let mut values = self.load()?;
        let removed = values.shift_remove(key).is_some();
        if removed {
            self.write(&values)?;
        }
        Ok(removed)
    }

    /// Removes all saved keys; returns how many there were
    pub fn clear(&self) -> Result<usize> {
        let count = self.load()?.len();
        self.write(&Map::new())?;
        Ok(count)
    }
}
