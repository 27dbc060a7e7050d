//! Launch targets: candidate codebases the analysis server can be started against.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// What kind of build unit a [`LaunchTarget`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchTargetKind {
    Solution,
    Project,
    ProjectJson,
    Folder,
    Csx,
    Cake,
    LiveShare,
}

impl LaunchTargetKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Solution => "solution",
            Self::Project => "project",
            Self::ProjectJson => "projectjson",
            Self::Folder => "folder",
            Self::Csx => "csx",
            Self::Cake => "cake",
            Self::LiveShare => "liveshare",
        }
    }

    /// Whether a target of this kind can be handed to the server process.
    #[must_use]
    pub const fn is_launchable(self) -> bool {
        !matches!(self, Self::LiveShare)
    }
}

impl std::fmt::Display for LaunchTargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate codebase produced by classification.
///
/// `directory` becomes the server's working directory; `target` is the path
/// passed as the launch argument (a solution file, or a directory).
/// Fields are private; values are never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchTarget {
    label: String,
    description: String,
    directory: PathBuf,
    target: PathBuf,
    kind: LaunchTargetKind,
}

impl LaunchTarget {
    #[must_use]
    pub fn new(
        kind: LaunchTargetKind,
        label: impl Into<String>,
        description: impl Into<String>,
        directory: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
    ) -> Self {
        Self {
            label: label.into(),
            description: description.into(),
            directory: directory.into(),
            target: target.into(),
            kind,
        }
    }

    /// Sentinel returned when every discovered resource lives in a
    /// collaboration session and nothing local can be analyzed.
    #[must_use]
    pub fn live_share() -> Self {
        Self::new(
            LaunchTargetKind::LiveShare,
            "VSLS",
            "Local files are not available in the current Live Share session.",
            PathBuf::new(),
            PathBuf::new(),
        )
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    #[must_use]
    pub fn kind(&self) -> LaunchTargetKind {
        self.kind
    }
}

impl std::fmt::Display for LaunchTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.description.is_empty() {
            write!(f, "{} [{}]", self.label, self.kind)
        } else {
            write!(f, "{} [{}] {}", self.label, self.kind, self.description)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_share_sentinel_is_not_launchable() {
        let target = LaunchTarget::live_share();
        assert_eq!(target.kind(), LaunchTargetKind::LiveShare);
        assert!(!target.kind().is_launchable());
        assert_eq!(target.directory(), Path::new(""));
    }

    #[test]
    fn display_omits_empty_description() {
        let target = LaunchTarget::new(LaunchTargetKind::Folder, "shop", "", "/ws", "/ws");
        assert_eq!(target.to_string(), "shop [folder]");

        let target = LaunchTarget::new(
            LaunchTargetKind::Solution,
            "Shop.sln",
            "shop",
            "/ws",
            "/ws/Shop.sln",
        );
        assert_eq!(target.to_string(), "Shop.sln [solution] shop");
    }

    #[test]
    fn serializes_kind_in_lowercase() {
        let target = LaunchTarget::new(
            LaunchTargetKind::ProjectJson,
            "project.json",
            "web",
            "/ws/web",
            "/ws/web",
        );
        let json = serde_json::to_value(&target).unwrap();
        assert_eq!(json["kind"], "projectjson");
        assert_eq!(json["target"], "/ws/web");
    }
}
