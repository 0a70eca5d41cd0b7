//! Recorded, reversible state change

use serde_json::{Map, Value};

/// Tracked state of a history controller: one settings tree
pub type State = Map<String, Value>;

/// Full before/after snapshots of one recorded mutation.
///
/// Immutable once created; undo and redo only move it between stacks.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryCommand {
    before: State,
    after: State,
    description: String,
    metadata: Map<String, Value>,
}

impl HistoryCommand {
    pub fn new(
        before: State,
        after: State,
        description: impl Into<String>,
        metadata: Map<String, Value>,
    ) -> Self {
        Self {
            before,
            after,
            description: description.into(),
            metadata,
        }
    }

    /// State restored by undo
    pub fn before(&self) -> &State {
        &self.before
    }

    /// State restored by redo
    pub fn after(&self) -> &State {
        &self.after
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Free-form tags (origin, source panel, preset id, ...)
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }
}
