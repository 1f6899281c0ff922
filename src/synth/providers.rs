//! Context providers
//!
//! A provider resolves the context values an app reported as missing.

use serde_json::json;

use crate::domain::MissingContext;
use crate::storage::{Context, PROVIDER_ERROR_KEY, TRANSIENT_CONTEXT_KEY};

/// Resolves missing context values into the context
pub trait ContextProvider {
    fn provide(&self, missing: &[MissingContext], context: &mut Context) -> anyhow::Result<()>;
}

/// Provider used when no lookup backend is available
///
/// Each missing key gets a transient error value, so the app sees why the
/// lookup failed and the value never reaches the context file.
#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorRecordingProvider;

impl ContextProvider for ErrorRecordingProvider {
    fn provide(&self, missing: &[MissingContext], context: &mut Context) -> anyhow::Result<()> {
        for entry in missing {
            let message = format!(
                "No context provider available for '{}' (key '{}')",
                entry.provider, entry.key
            );
            tracing::warn!("{}", message);
            context.set(
                entry.key.clone(),
                json!({ PROVIDER_ERROR_KEY: message, TRANSIENT_CONTEXT_KEY: true }),
            );
        }
        Ok(())
    }
}
