//! Settings document, migrations and the config store
//!
//! - **document**: the persisted `{current, defaults_snapshot, metadata}` unit
//! - **migration**: idempotent unit/key migrations run on every load
//! - **paths**: settings file path resolution
//! - **store**: dotted-path access, defaults handling and atomic save

pub mod document;
pub mod migration;
pub mod paths;
pub mod store;

// Re-export commonly used types
pub use document::ConfigDocument;
pub use migration::{migrate, Conversion, MigrationReport};
pub use paths::{PathResolver, PathSource};
pub use store::{ConfigStore, StoreOptions};
