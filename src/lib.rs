#![forbid(unsafe_code)]

//! Configuration store and change history for the PSS simulator
//!
//! - **config**: persisted settings document, unit migrations, the config store
//! - **history**: undo/redo stacks and the patch history controller
//! - **tree**: dotted-path access and deep merge over JSON values
//! - **persistence**: atomic JSON writes with a durability barrier

pub mod config;
pub mod constants;
pub mod error;
pub mod history;
pub mod logging;
pub mod persistence;
pub mod tree;

pub use config::{ConfigDocument, ConfigStore, StoreOptions};
pub use error::{ConfigError, Result};
pub use history::{Change, ChangeContext, HistoryCommand, HistoryStack, PatchHistoryController};
