//! Undo/redo change history
//!
//! - **stack**: generic two-stack undo/redo container
//! - **command**: immutable before/after snapshot of one mutation
//! - **controller**: tracked state tree with patch application and listeners

pub mod command;
pub mod controller;
pub mod stack;

pub use command::{HistoryCommand, State};
pub use controller::{Change, ChangeContext, ListenerHandle, PatchHistoryController};
pub use stack::HistoryStack;
