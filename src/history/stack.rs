//! Two-stack undo/redo container

use std::collections::VecDeque;
use tracing::debug;

/// Undo and redo stacks of commands.
///
/// Recording a command clears the redo stack; undo and redo move the top
/// command from one stack to the other without copying it. When a depth limit
/// is set, the oldest undoable command is dropped on overflow.
#[derive(Debug, Clone)]
pub struct HistoryStack<C> {
    undo: VecDeque<C>,
    redo: Vec<C>,
    max_depth: Option<usize>,
}

impl<C> Default for HistoryStack<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> HistoryStack<C> {
    /// Unbounded history
    pub fn new() -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            max_depth: None,
        }
    }

    /// History keeping at most `max_depth` undoable commands (0 means unbounded)
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth: (max_depth > 0).then_some(max_depth),
            ..Self::new()
        }
    }

    pub fn record(&mut self, command: C) {
        self.undo.push_back(command);
        self.redo.clear();
        if let Some(max) = self.max_depth {
            while self.undo.len() > max {
                self.undo.pop_front();
                debug!(max_depth = max, "History full, dropped oldest command");
            }
        }
    }

    /// Move the most recent command onto the redo stack and return it
    pub fn undo(&mut self) -> Option<&C> {
        let command = self.undo.pop_back()?;
        self.redo.push(command);
        self.redo.last()
    }

    /// Move the most recently undone command back onto the undo stack and return it
    pub fn redo(&mut self) -> Option<&C> {
        let command = self.redo.pop()?;
        self.undo.push_back(command);
        self.undo.back()
    }

    /// Drop every undone command, keeping the undo stack intact
    pub fn clear_redo(&mut self) {
        self.redo.clear();
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Command the next undo would revert
    pub fn peek_undo(&self) -> Option<&C> {
        self.undo.back()
    }

    /// Command the next redo would re-apply
    pub fn peek_redo(&self) -> Option<&C> {
        self.redo.last()
    }
}
