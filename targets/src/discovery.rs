//! Workspace discovery: find the project-related files under each workspace
//! folder and attribute them to their owning folder.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::{DirEntry, WalkBuilder};
use kindle_types::{Resource, WorkspaceFolder};

use crate::config::DiscoveryConfig;

/// Files that can define a launch target.
const PROJECT_FILE_GLOBS: &[&str] = &[
    "**/*.sln",
    "**/*.slnf",
    "**/*.csproj",
    "**/project.json",
    "**/*.csx",
    "**/*.cake",
];

/// Plain sources; one match is enough to know a folder has loose code.
const SOURCE_FILE_GLOB: &str = "**/*.cs";

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Invalid glob '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

fn build_glob_set<'a>(
    patterns: impl IntoIterator<Item = &'a str>,
) -> Result<GlobSet, DiscoveryError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            continue;
        }
        let glob = GlobBuilder::new(trimmed)
            .case_insensitive(true)
            .build()
            .map_err(|source| DiscoveryError::InvalidGlob {
                pattern: trimmed.to_string(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| DiscoveryError::InvalidGlob {
        pattern: "<set>".to_string(),
        source,
    })
}

/// Directories to skip without descending: an exclude pattern `X/**` covers
/// the whole subtree of every directory matching `X`.
fn build_prune_set(patterns: &[String]) -> Result<GlobSet, DiscoveryError> {
    build_glob_set(
        patterns
            .iter()
            .filter_map(|pattern| pattern.trim().strip_suffix("/**")),
    )
}

fn is_pruned(prune: &GlobSet, root: &Path, path: &Path, is_dir: bool) -> bool {
    is_dir
        && path
            .strip_prefix(root)
            .is_ok_and(|relative| !relative.as_os_str().is_empty() && prune.is_match(relative))
}

/// The folder whose root is the longest prefix of `path`.
///
/// Nested workspace folders own the files beneath them.
#[must_use]
pub fn folder_for_path<'a>(
    folders: &'a [WorkspaceFolder],
    path: &Path,
) -> Option<&'a WorkspaceFolder> {
    folders
        .iter()
        .filter(|f| path.starts_with(f.root()))
        .max_by_key(|f| f.root().components().count())
}

/// Walk every workspace folder and report matching files.
///
/// Project files are capped at `max_project_results` (zero or negative means
/// unlimited); at most one plain source file is reported. Project files come
/// first, then the source file. A path is reported at most once even when
/// folders nest.
pub fn discover_resources(
    folders: &[WorkspaceFolder],
    config: &DiscoveryConfig,
) -> Result<Vec<Resource>, DiscoveryError> {
    let include = build_glob_set(PROJECT_FILE_GLOBS.iter().copied())?;
    let sources = build_glob_set([SOURCE_FILE_GLOB])?;
    let exclude = build_glob_set(config.exclude.iter().map(String::as_str))?;
    let prune = build_prune_set(&config.exclude)?;
    let project_cap = usize::try_from(config.max_project_results)
        .ok()
        .filter(|&cap| cap > 0);

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut projects: Vec<Resource> = Vec::new();
    let mut source: Option<Resource> = None;

    'folders: for folder in folders {
        let root = folder.root().to_path_buf();
        let prune = prune.clone();
        let walker = WalkBuilder::new(folder.root())
            .hidden(false)
            .git_ignore(config.respect_gitignore)
            .git_global(config.respect_gitignore)
            .git_exclude(config.respect_gitignore)
            .filter_entry(move |entry: &DirEntry| {
                let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
                !is_pruned(&prune, &root, entry.path(), is_dir)
            })
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(folder = %folder.root().display(), "Skipping entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(folder.root()).unwrap_or(path);
            if exclude.is_match(relative) {
                continue;
            }

            let is_project = include.is_match(relative);
            let is_source = source.is_none() && sources.is_match(relative);
            if !is_project && !is_source {
                continue;
            }
            if !seen.insert(path.to_path_buf()) {
                continue;
            }

            let owner = folder_for_path(folders, path).map(WorkspaceFolder::index);
            if is_project && project_cap.is_none_or(|cap| projects.len() < cap) {
                projects.push(Resource::local(path, owner));
            } else if is_source {
                source = Some(Resource::local(path, owner));
            }

            let projects_full = project_cap.is_some_and(|cap| projects.len() >= cap);
            if projects_full && source.is_some() {
                break 'folders;
            }
        }
    }

    tracing::debug!(
        projects = projects.len(),
        has_source = source.is_some(),
        "Workspace discovery finished"
    );

    projects.extend(source);
    Ok(projects)
}
