//! Discovered files and the workspace folders that own them.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Scheme of a resource on the local file system.
pub const LOCAL_SCHEME: &str = "file";

/// Virtual scheme used by collaboration sessions. Resources with this scheme
/// have no local file behind them.
pub const LIVE_SHARE_SCHEME: &str = "vsls";

/// A discovered file-like resource.
///
/// Immutable after construction. `folder` is the index of the owning
/// [`WorkspaceFolder`], or `None` when the path lies outside every folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Resource {
    scheme: String,
    path: PathBuf,
    folder: Option<usize>,
}

impl Resource {
    /// A resource backed by a local file.
    #[must_use]
    pub fn local(path: impl Into<PathBuf>, folder: Option<usize>) -> Self {
        Self::with_scheme(LOCAL_SCHEME, path, folder)
    }

    #[must_use]
    pub fn with_scheme(
        scheme: impl Into<String>,
        path: impl Into<PathBuf>,
        folder: Option<usize>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            path: path.into(),
            folder,
        }
    }

    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn folder(&self) -> Option<usize> {
        self.folder
    }

    /// Whether this resource only exists inside a collaboration session.
    #[must_use]
    pub fn is_live_share(&self) -> bool {
        self.scheme.eq_ignore_ascii_case(LIVE_SHARE_SCHEME)
    }

    /// Lowercased file name, used for case-insensitive pattern checks.
    #[must_use]
    pub fn file_name_lower(&self) -> Option<String> {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
    }
}

/// A top-level root directory opened by the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceFolder {
    index: usize,
    root: PathBuf,
    name: String,
}

impl WorkspaceFolder {
    #[must_use]
    pub fn new(index: usize, root: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            index,
            root: root.into(),
            name: name.into(),
        }
    }

    /// Build a folder whose display name is the last component of `root`.
    #[must_use]
    pub fn from_root(index: usize, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());
        Self { index, root, name }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}
