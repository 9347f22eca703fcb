//! Resource provider abstraction used to open imported scripts.
//!
//! The [`ResourceProvider`] trait keeps file I/O out of the compiler passes.
//! [`FileSystemProvider`] searches configured directories;
//! [`InMemoryProvider`] serves scripts from a map for tests and embedding.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Opens a named script resource within a resource group.
pub trait ResourceProvider {
    /// Read the full text of `name`. A `NotFound` error means the import is
    /// skipped, not that the compile fails.
    fn open_resource(&self, name: &str, group: &str) -> Result<String, io::Error>;
}

/// Normalize a path by resolving `.` and `..` components without touching
/// the filesystem.
fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                components.pop();
            }
            other => components.push(other),
        }
    }
    components.iter().collect()
}

/// Filesystem-backed provider.
///
/// Absolute names are read directly. Relative names are tried against the
/// group's directories first and then against the general search paths, in
/// registration order.
#[derive(Debug, Clone, Default)]
pub struct FileSystemProvider {
    search_paths: Vec<PathBuf>,
    groups: HashMap<String, Vec<PathBuf>>,
}

impl FileSystemProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_paths.push(dir.into());
        self
    }

    pub fn add_group_path(&mut self, group: &str, dir: impl Into<PathBuf>) {
        self.groups
            .entry(group.to_owned())
            .or_default()
            .push(dir.into());
    }

    fn candidates(&self, name: &str, group: &str) -> Vec<PathBuf> {
        let path = Path::new(name);
        if path.is_absolute() {
            return vec![path.to_path_buf()];
        }
        let group_dirs = self.groups.get(group).into_iter().flatten();
        let mut out: Vec<PathBuf> = group_dirs
            .chain(self.search_paths.iter())
            .map(|dir| dir.join(path))
            .collect();
        if out.is_empty() {
            out.push(path.to_path_buf());
        }
        out
    }
}

impl ResourceProvider for FileSystemProvider {
    fn open_resource(&self, name: &str, group: &str) -> Result<String, io::Error> {
        for candidate in self.candidates(name, group) {
            match std::fs::read_to_string(&candidate) {
                Ok(text) => return Ok(text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            }
        }
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("resource '{}' not found in group '{}'", name, group),
        ))
    }
}

/// In-memory provider. Scripts registered without a group are visible from
/// every group.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    files: HashMap<(Option<String>, PathBuf), String>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: &str, text: &str) -> Self {
        self.insert(None, name, text);
        self
    }

    pub fn with_group_file(mut self, group: &str, name: &str, text: &str) -> Self {
        self.insert(Some(group), name, text);
        self
    }

    pub fn insert(&mut self, group: Option<&str>, name: &str, text: &str) {
        self.files.insert(
            (group.map(str::to_owned), normalize_path(Path::new(name))),
            text.to_owned(),
        );
    }
}

impl ResourceProvider for InMemoryProvider {
    fn open_resource(&self, name: &str, group: &str) -> Result<String, io::Error> {
        let normalized = normalize_path(Path::new(name));
        self.files
            .get(&(Some(group.to_owned()), normalized.clone()))
            .or_else(|| self.files.get(&(None, normalized.clone())))
            .cloned()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("resource not found in memory: {}", normalized.display()),
                )
            })
    }
}
