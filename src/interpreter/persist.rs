use super::{command::CommandRegistry, Context};
use crate::value::Value;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};
use thiserror::Error;
use tracing::debug;

pub const CONTEXT_STATE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Unsupported context state version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("Failed to encode context state: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Everything about a [`Context`] that outlives the process. Commands are
/// behaviour rather than data and are supplied again on restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextState {
    pub version: u32,
    pub variables: BTreeMap<CompactString, Value>,
    pub stack: Vec<Value>,
    /// Programs run so far. Restored contexts keep counting from here so new
    /// programs never share an origin with persisted functions.
    pub sources: u64,
}

impl ContextState {
    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, PersistError> {
        Ok(serde_json::from_str(text)?)
    }
}

impl Context {
    pub fn snapshot(&self) -> ContextState {
        ContextState {
            version: CONTEXT_STATE_VERSION,
            variables: self
                .variables
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
            stack: self.stack.clone(),
            sources: self.sources,
        }
    }

    pub fn restore(
        state: ContextState,
        commands: Arc<CommandRegistry>,
    ) -> Result<Context, PersistError> {
        if state.version != CONTEXT_STATE_VERSION {
            return Err(PersistError::UnsupportedVersion {
                found: state.version,
                expected: CONTEXT_STATE_VERSION,
            });
        }
        debug!(
            variables = state.variables.len(),
            stack = state.stack.len(),
            "restoring context"
        );
        let mut context = Context::new(commands);
        context.stack = state.stack;
        context.variables = state.variables.into_iter().collect();
        context.sources = state.sources;
        context.origin = state.sources;
        Ok(context)
    }
}
