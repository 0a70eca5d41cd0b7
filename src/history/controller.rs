//! Patch-based change history over a settings tree
//!
//! A `PatchHistoryController` mirrors one logical state tree (a UI panel's
//! section, or the store's whole `current` section). Every mutation goes
//! through `apply_state`/`apply_patch`, which snapshot the state before and
//! after, optionally record a reversible command, and notify listeners in the
//! exact order mutations happen.
//!
//! Single-threaded by design: there is no internal locking, and listeners run
//! synchronously inside the mutating call. A panicking listener is not caught.

use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

use crate::constants::history::{
    DEFAULT_MAX_DEPTH, ORIGIN_BOOTSTRAP, ORIGIN_REDO, ORIGIN_UNDO, ORIGIN_USER,
};
use crate::history::command::{HistoryCommand, State};
use crate::history::stack::HistoryStack;
use crate::tree::{self, merge_maps};

/// What listeners are told about a notification
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeContext {
    /// `bootstrap`, `undo`, `redo`, or the origin supplied by the caller
    pub origin: String,
    pub description: String,
    /// Caller metadata (for undo/redo: the command's metadata)
    pub metadata: Map<String, Value>,
}

/// Describes a mutation passed to `apply_state` / `apply_patch`
#[derive(Debug, Clone)]
pub struct Change {
    pub description: String,
    pub origin: String,
    pub record: bool,
    pub metadata: Map<String, Value>,
}

impl Change {
    /// Recorded change with the default `user` origin
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            origin: ORIGIN_USER.to_string(),
            record: true,
            metadata: Map::new(),
        }
    }

    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Apply and notify without adding an undoable command
    pub fn untracked(mut self) -> Self {
        self.record = false;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Identifies a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

type Listener = Box<dyn FnMut(&State, &ChangeContext)>;

pub struct PatchHistoryController {
    state: State,
    history: HistoryStack<HistoryCommand>,
    listeners: Vec<(ListenerHandle, Listener)>,
    next_listener: u64,
}

impl fmt::Debug for PatchHistoryController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatchHistoryController")
            .field("state", &self.state)
            .field("undo_len", &self.history.undo_len())
            .field("redo_len", &self.history.redo_len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for PatchHistoryController {
    fn default() -> Self {
        Self::new()
    }
}

impl PatchHistoryController {
    /// Empty state, history depth from `DEFAULT_MAX_DEPTH`
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    /// Empty state with a custom history depth (0 = unbounded)
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            state: State::new(),
            history: HistoryStack::with_max_depth(max_depth),
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    // ==========================================================================
    // Mutations
    // ==========================================================================

    /// Replace the tracked state wholesale and clear all history.
    /// Never records a command; used for the initial load.
    pub fn bootstrap(&mut self, state: State, notify: bool) {
        self.state = state;
        self.history.clear();
        debug!(keys = self.state.len(), notify, "History controller bootstrapped");
        if notify {
            self.notify(ChangeContext {
                origin: ORIGIN_BOOTSTRAP.to_string(),
                description: ORIGIN_BOOTSTRAP.to_string(),
                metadata: Map::new(),
            });
        }
    }

    /// Replace the tracked state with `state`
    pub fn apply_state(&mut self, state: State, change: Change) {
        let before = std::mem::replace(&mut self.state, state);
        self.commit(before, change);
    }

    /// Deep-merge `patch` into the tracked state
    pub fn apply_patch(&mut self, patch: State, change: Change) {
        let before = self.state.clone();
        merge_maps(&mut self.state, patch);
        self.commit(before, change);
    }

    /// Restore the state before the most recent command.
    /// Returns the undone command, or `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<HistoryCommand> {
        let command = self.history.undo()?.clone();
        self.state = command.before().clone();
        debug!(description = %command.description(), "Undo");
        self.notify(ChangeContext {
            origin: ORIGIN_UNDO.to_string(),
            description: command.description().to_string(),
            metadata: command.metadata().clone(),
        });
        Some(command)
    }

    /// Re-apply the most recently undone command
    pub fn redo(&mut self) -> Option<HistoryCommand> {
        let command = self.history.redo()?.clone();
        self.state = command.after().clone();
        debug!(description = %command.description(), "Redo");
        self.notify(ChangeContext {
            origin: ORIGIN_REDO.to_string(),
            description: command.description().to_string(),
            metadata: command.metadata().clone(),
        });
        Some(command)
    }

    /// Drop all undo/redo history, keeping the current state
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    fn commit(&mut self, before: State, change: Change) {
        let Change {
            description,
            origin,
            record,
            metadata,
        } = change;

        // A recorded mutation that changed nothing adds no command but still
        // ends the redo branch
        if record && before == self.state {
            self.history.clear_redo();
        } else if record {
            let mut command_metadata = metadata.clone();
            command_metadata
                .entry("origin")
                .or_insert_with(|| Value::from(origin.as_str()));
            self.history.record(HistoryCommand::new(
                before,
                self.state.clone(),
                description.clone(),
                command_metadata,
            ));
        }

        self.notify(ChangeContext {
            origin,
            description,
            metadata,
        });
    }

    // ==========================================================================
    // Listeners
    // ==========================================================================

    /// Register a callback receiving `(snapshot, context)` after every mutation
    pub fn register_listener<F>(&mut self, listener: F) -> ListenerHandle
    where
        F: FnMut(&State, &ChangeContext) + 'static,
    {
        let handle = ListenerHandle(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((handle, Box::new(listener)));
        handle
    }

    /// Remove a listener. Returns false if the handle was already removed.
    pub fn unregister_listener(&mut self, handle: ListenerHandle) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(h, _)| *h != handle);
        self.listeners.len() != before
    }

    fn notify(&mut self, context: ChangeContext) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&self.state, &context);
        }
    }

    // ==========================================================================
    // Queries
    // ==========================================================================

    /// Independent copy of the tracked state
    pub fn snapshot(&self) -> State {
        self.state.clone()
    }

    /// Dotted-path read over the tracked state (owned copy)
    pub fn get(&self, path: &str) -> Option<Value> {
        let segments = tree::split_path(path).ok()?;
        tree::get_in_map(&self.state, &segments).cloned()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_len(&self) -> usize {
        self.history.undo_len()
    }

    pub fn redo_len(&self) -> usize {
        self.history.redo_len()
    }

    /// Description of the command the next undo would revert
    pub fn undo_description(&self) -> Option<&str> {
        self.history.peek_undo().map(HistoryCommand::description)
    }

    /// Description of the command the next redo would re-apply
    pub fn redo_description(&self) -> Option<&str> {
        self.history.peek_redo().map(HistoryCommand::description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn state(value: Value) -> State {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    /// Collects every (snapshot, context) pair a controller emits
    fn recorder(
        controller: &mut PatchHistoryController,
    ) -> (ListenerHandle, Rc<RefCell<Vec<(State, ChangeContext)>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let handle = controller.register_listener(move |snapshot, context| {
            sink.borrow_mut().push((snapshot.clone(), context.clone()));
        });
        (handle, seen)
    }

    #[test]
    fn test_bootstrap_clears_history_and_notifies() {
        let mut controller = PatchHistoryController::new();
        controller.apply_patch(state(json!({"a": 1})), Change::new("seed"));
        assert!(controller.can_undo());

        let (_, seen) = recorder(&mut controller);
        controller.bootstrap(state(json!({"b": 2})), true);

        assert!(!controller.can_undo());
        assert!(!controller.can_redo());
        assert_eq!(controller.snapshot(), state(json!({"b": 2})));
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1.origin, "bootstrap");
    }

    #[test]
    fn test_bootstrap_silent() {
        let mut controller = PatchHistoryController::new();
        let (_, seen) = recorder(&mut controller);
        controller.bootstrap(state(json!({"b": 2})), false);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_patch_merges_and_undo_restores_siblings() {
        let mut controller = PatchHistoryController::new();
        controller.apply_patch(
            state(json!({"lighting": {"key": {"brightness": 1.0}}})),
            Change::new("t1"),
        );
        controller.apply_patch(
            state(json!({"lighting": {"key": {"color": "#fff"}}})),
            Change::new("t2"),
        );
        assert_eq!(
            controller.snapshot(),
            state(json!({"lighting": {"key": {"brightness": 1.0, "color": "#fff"}}}))
        );

        let undone = controller.undo().unwrap();
        assert_eq!(undone.description(), "t2");
        assert_eq!(controller.get("lighting.key.brightness"), Some(json!(1.0)));
        assert_eq!(controller.get("lighting.key.color"), None);

        controller.undo();
        assert_eq!(controller.get("lighting.key.brightness"), None);
        assert_eq!(controller.undo(), None);
    }

    #[test]
    fn test_redo_restores_after() {
        let mut controller = PatchHistoryController::new();
        controller.apply_patch(state(json!({"x": 1})), Change::new("one"));
        controller.apply_patch(state(json!({"x": 2})), Change::new("two"));
        let final_state = controller.snapshot();

        controller.undo();
        controller.undo();
        assert!(controller.snapshot().is_empty());

        assert_eq!(controller.redo().map(|c| c.description().to_string()), Some("one".into()));
        controller.redo();
        assert_eq!(controller.snapshot(), final_state);
        assert_eq!(controller.redo(), None);
    }

    #[test]
    fn test_new_patch_invalidates_redo() {
        let mut controller = PatchHistoryController::new();
        controller.apply_patch(state(json!({"x": 1})), Change::new("one"));
        controller.undo();
        assert!(controller.can_redo());

        controller.apply_patch(state(json!({"y": 1})), Change::new("branch"));
        assert!(!controller.can_redo());
        assert_eq!(controller.redo(), None);
    }

    #[test]
    fn test_apply_state_replaces_wholesale() {
        let mut controller = PatchHistoryController::new();
        controller.bootstrap(state(json!({"a": {"b": 1}, "c": 2})), false);
        controller.apply_state(state(json!({"a": {"z": 9}})), Change::new("preset"));

        assert_eq!(controller.snapshot(), state(json!({"a": {"z": 9}})));
        let undone = controller.undo().unwrap();
        assert_eq!(undone.before(), &state(json!({"a": {"b": 1}, "c": 2})));
        assert_eq!(undone.after(), &state(json!({"a": {"z": 9}})));
        assert_eq!(controller.snapshot(), state(json!({"a": {"b": 1}, "c": 2})));
    }

    #[test]
    fn test_untracked_change_notifies_without_recording() {
        let mut controller = PatchHistoryController::new();
        let (_, seen) = recorder(&mut controller);
        controller.apply_patch(
            state(json!({"fps": 60})),
            Change::new("sync").origin("simulation").untracked(),
        );

        assert!(!controller.can_undo());
        let seen = seen.borrow();
        assert_eq!(seen[0].1.origin, "simulation");
        assert_eq!(seen[0].1.description, "sync");
        assert_eq!(seen[0].0, state(json!({"fps": 60})));
    }

    #[test]
    fn test_noop_patch_not_recorded() {
        let mut controller = PatchHistoryController::new();
        controller.bootstrap(state(json!({"fps": 60})), false);
        controller.apply_patch(state(json!({"fps": 60})), Change::new("same"));
        assert!(!controller.can_undo());
    }

    #[test]
    fn test_noop_patch_after_undo_clears_redo() {
        let mut controller = PatchHistoryController::new();
        controller.apply_patch(state(json!({"x": 1})), Change::new("t1"));
        controller.apply_patch(state(json!({"y": 2})), Change::new("t2"));
        controller.undo();
        assert!(controller.can_redo());

        // {x: 1} is already in the state
        controller.apply_patch(state(json!({"x": 1})), Change::new("t3"));
        assert_eq!(controller.redo(), None);
        assert_eq!(controller.undo_description(), Some("t1"));
        assert_eq!(controller.undo_len(), 1);
    }

    #[test]
    fn test_untracked_noop_keeps_redo() {
        let mut controller = PatchHistoryController::new();
        controller.apply_patch(state(json!({"x": 1})), Change::new("t1"));
        controller.undo();
        controller.apply_patch(state(json!({})), Change::new("sync").untracked());
        assert!(controller.can_redo());
    }

    #[test]
    fn test_listener_context_and_order() {
        let mut controller = PatchHistoryController::new();
        let (_, seen) = recorder(&mut controller);

        controller.apply_patch(
            state(json!({"x": 1})),
            Change::new("first").origin("panel").with_metadata("preset", "track"),
        );
        controller.apply_patch(state(json!({"x": 2})), Change::new("second"));
        controller.undo();
        controller.redo();

        let seen = seen.borrow();
        let origins: Vec<&str> = seen.iter().map(|(_, c)| c.origin.as_str()).collect();
        assert_eq!(origins, vec!["panel", "user", "undo", "redo"]);
        assert_eq!(seen[0].1.metadata.get("preset"), Some(&json!("track")));
        assert_eq!(seen[2].1.description, "second");
        assert_eq!(seen[2].0, state(json!({"x": 1})));
        assert_eq!(seen[3].0, state(json!({"x": 2})));
    }

    #[test]
    fn test_command_metadata_carries_origin() {
        let mut controller = PatchHistoryController::new();
        controller.apply_patch(
            state(json!({"x": 1})),
            Change::new("first").origin("panel").with_metadata("preset", "track"),
        );
        let command = controller.undo().unwrap();
        assert_eq!(command.metadata().get("origin"), Some(&json!("panel")));
        assert_eq!(command.metadata().get("preset"), Some(&json!("track")));
    }

    #[test]
    fn test_unregister_listener() {
        let mut controller = PatchHistoryController::new();
        let (handle, seen) = recorder(&mut controller);

        controller.apply_patch(state(json!({"x": 1})), Change::new("one"));
        assert!(controller.unregister_listener(handle));
        assert!(!controller.unregister_listener(handle));
        controller.apply_patch(state(json!({"x": 2})), Change::new("two"));

        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let mut controller = PatchHistoryController::new();
        controller.apply_patch(state(json!({"x": 1})), Change::new("one"));
        let mut copy = controller.snapshot();
        copy.insert("x".into(), json!(99));
        assert_eq!(controller.get("x"), Some(json!(1)));
    }

    #[test]
    fn test_descriptions_and_depth_limit() {
        let mut controller = PatchHistoryController::with_max_depth(2);
        for i in 0..5 {
            controller.apply_patch(state(json!({"i": i})), Change::new(format!("step {i}")));
        }
        assert_eq!(controller.undo_len(), 2);
        assert_eq!(controller.undo_description(), Some("step 4"));
        controller.undo();
        assert_eq!(controller.redo_description(), Some("step 4"));
        assert_eq!(controller.redo_len(), 1);
    }
}
