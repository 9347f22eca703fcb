//! `scriptc.toml` configuration.
//!
//! ```toml
//! allow_nontyped_objects = true
//! group = "General"
//! search_paths = ["lib", "/opt/scripts/common"]
//! ```

use std::path::{Path, PathBuf};

use scriptc_core::script::FileSystemProvider;
use scriptc_core::ScriptCompilerOptions;
use serde::Deserialize;

/// Config file looked up in the current directory when `--config` is absent.
pub(crate) const DEFAULT_CONFIG: &str = "scriptc.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ScriptcConfig {
    pub allow_nontyped_objects: bool,
    pub group: String,
    /// Directories searched for imports after the script's own directory.
    /// Relative entries are taken relative to the config file.
    pub search_paths: Vec<PathBuf>,
}

impl ScriptcConfig {
    pub fn compiler_options(&self) -> ScriptCompilerOptions {
        ScriptCompilerOptions {
            allow_nontyped_objects: self.allow_nontyped_objects,
            group: self.group.clone(),
        }
    }

    /// Provider that searches `script_dir` first, then the configured paths.
    pub fn provider(&self, script_dir: &Path) -> FileSystemProvider {
        self.search_paths
            .iter()
            .fold(FileSystemProvider::new().with_search_path(script_dir), |p, dir| {
                p.with_search_path(dir)
            })
    }

    /// Applies command-line overrides.
    pub fn with_overrides(mut self, allow_nontyped: bool, group: Option<&str>) -> Self {
        if allow_nontyped {
            self.allow_nontyped_objects = true;
        }
        if let Some(group) = group {
            self.group = group.to_owned();
        }
        self
    }
}

/// Read and parse a config file from `path`.
///
/// Returns a human-readable error string on failure.
pub(crate) fn read_config(path: &Path) -> Result<ScriptcConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;

    let mut config: ScriptcConfig = toml::from_str(&content)
        .map_err(|e| format!("could not parse '{}': {}", path.display(), e))?;

    let base = path.parent().unwrap_or(Path::new(""));
    for dir in &mut config.search_paths {
        if dir.is_relative() {
            *dir = base.join(&*dir);
        }
    }
    Ok(config)
}

/// An explicit `--config` must exist; the default file is optional.
pub(crate) fn load_config(explicit: Option<&Path>) -> Result<ScriptcConfig, String> {
    match explicit {
        Some(path) => read_config(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG);
            if default.is_file() {
                read_config(default)
            } else {
                Ok(ScriptcConfig::default())
            }
        }
    }
}
