//! Settings file path resolution
//!
//! Priority: explicit argument > `PSS_SETTINGS_FILE` > CWD-relative >
//! project-root-relative > explicit (or CWD) path returned as given.
//! Only existing files win a step; the final fallback may not exist, in which
//! case `ConfigStore::load` reports `NotFound` for that path.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::{config, env};

/// Where a resolved path came from (for diagnostics)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSource {
    Explicit,
    Environment,
    WorkingDirectory,
    ProjectRoot,
    Fallback,
}

/// Inputs to path resolution.
/// `env` is injected so resolution can be tested without touching the process environment.
pub struct PathResolver<'a> {
    pub explicit: Option<&'a Path>,
    pub cwd: PathBuf,
    pub project_root: Option<PathBuf>,
    pub env: &'a dyn Fn(&str) -> Option<String>,
}

impl<'a> PathResolver<'a> {
    /// Resolver over the real process environment and working directory
    pub fn from_process(
        explicit: Option<&'a Path>,
        project_root: Option<PathBuf>,
        env: &'a dyn Fn(&str) -> Option<String>,
    ) -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            explicit,
            cwd,
            project_root,
            env,
        }
    }

    fn verbose(&self) -> bool {
        (self.env)(env::VERBOSE_CONFIG).as_deref() == Some("1")
    }

    /// Line echoed to stdout for each candidate when `PSS_VERBOSE_CONFIG=1`
    fn verbose_line(&self, source: PathSource, path: &Path, exists: bool) -> Option<String> {
        self.verbose()
            .then(|| format!("[settings] {source:?}: {} (exists: {exists})", path.display()))
    }

    fn trace(&self, source: PathSource, path: &Path, exists: bool) {
        debug!(source = ?source, path = %path.display(), exists, "Settings path candidate");
        if let Some(line) = self.verbose_line(source, path, exists) {
            println!("{line}");
        }
    }

    fn cwd_candidate(&self) -> PathBuf {
        self.cwd.join(config::CONFIG_DIR).join(config::FILENAME)
    }

    fn project_candidate(&self) -> Option<PathBuf> {
        match &self.project_root {
            Some(root) => Some(root.join(config::CONFIG_DIR).join(config::FILENAME)),
            None => dirs::config_dir().map(|dir| dir.join(config::APP_DIR).join(config::FILENAME)),
        }
    }

    /// Resolve the settings file path
    pub fn resolve(&self) -> (PathBuf, PathSource) {
        if let Some(explicit) = self.explicit {
            let path = self.absolutize(explicit);
            let exists = path.exists();
            self.trace(PathSource::Explicit, &path, exists);
            if exists {
                return (path, PathSource::Explicit);
            }
        }

        if let Some(value) = (self.env)(env::SETTINGS_FILE)
            && !value.trim().is_empty()
        {
            let path = self.absolutize(Path::new(value.trim()));
            let exists = path.exists();
            self.trace(PathSource::Environment, &path, exists);
            if exists {
                return (path, PathSource::Environment);
            }
        }

        let cwd_path = self.cwd_candidate();
        let exists = cwd_path.exists();
        self.trace(PathSource::WorkingDirectory, &cwd_path, exists);
        if exists {
            return (cwd_path, PathSource::WorkingDirectory);
        }

        if let Some(project_path) = self.project_candidate() {
            let exists = project_path.exists();
            self.trace(PathSource::ProjectRoot, &project_path, exists);
            if exists {
                return (project_path, PathSource::ProjectRoot);
            }
        }

        let fallback = match self.explicit {
            Some(explicit) => self.absolutize(explicit),
            None => cwd_path,
        };
        self.trace(PathSource::Fallback, &fallback, false);
        (fallback, PathSource::Fallback)
    }

    fn absolutize(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}

/// Temporary sibling used by atomic writes (`app_settings.json.tmp`)
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| config::FILENAME.into());
    name.push(config::TEMP_SUFFIX);
    path.with_file_name(name)
}
