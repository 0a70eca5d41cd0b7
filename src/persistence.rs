//! Atomic JSON persistence
//!
//! Writes go to `{path}.tmp`, are flushed and fsynced, then renamed over the
//! target. A failed fsync is logged and tolerated (not every filesystem
//! supports it); every other I/O error is returned to the caller.

use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, warn};

use crate::config::paths::temp_path;
use crate::error::{ConfigError, Result};

/// Durability policy for [`write_json_atomic`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Durability {
    /// Flush and fsync the file (and its directory on unix) before returning
    Sync,
    /// Flush only; used by tests and callers batching many writes
    FlushOnly,
}

/// Serialize `value` as pretty-printed JSON (2-space indent) and atomically replace `path`.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T, durability: Durability) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| ConfigError::persistence(parent, e))?;
    }

    // Serialize before touching the disk so an encoding error leaves no temp file
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');

    let tmp = temp_path(path);
    if let Err(err) = write_and_sync(&tmp, &bytes, durability, File::sync_all) {
        let _ = fs::remove_file(&tmp);
        return Err(ConfigError::persistence(&tmp, err));
    }

    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(ConfigError::persistence(path, err));
    }

    if durability == Durability::Sync {
        sync_parent_dir(path);
    }

    debug!(path = %path.display(), bytes = bytes.len(), "Wrote settings file");
    Ok(())
}

fn write_and_sync<S>(tmp: &Path, bytes: &[u8], durability: Durability, sync: S) -> std::io::Result<()>
where
    S: FnOnce(&File) -> std::io::Result<()>,
{
    let file = File::create(tmp)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes)?;
    writer.flush()?;

    if durability == Durability::Sync
        && let Err(err) = sync(writer.get_ref())
    {
        warn!(path = %tmp.display(), error = %err, "fsync failed, continuing without durability barrier");
    }
    Ok(())
}

/// Persist the rename itself. Best effort: directories cannot be fsynced everywhere.
fn sync_parent_dir(path: &Path) {
    #[cfg(unix)]
    {
        let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
            return;
        };
        match File::open(parent).and_then(|dir| dir.sync_all()) {
            Ok(()) => {}
            Err(err) => {
                warn!(path = %parent.display(), error = %err, "Directory fsync failed");
            }
        }
    }
    #[cfg(not(unix))]
    let _ = path;
}
