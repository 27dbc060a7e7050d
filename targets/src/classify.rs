//! Classification of discovered resources into ranked launch targets.
//!
//! Pure and synchronous: the input lists are already materialized by the
//! discovery step, nothing here touches the file system.

use std::collections::HashMap;
use std::path::Path;

use kindle_types::{LaunchTarget, LaunchTargetKind, Resource, WorkspaceFolder};

/// The file categories that participate in classification. Every other file
/// is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileCategory {
    Solution,
    ProjectJson,
    CSharpProject,
    Script,
    BuildScript,
    Source,
}

fn categorize(resource: &Resource) -> Option<FileCategory> {
    let name = resource.file_name_lower()?;
    let ext = Path::new(&name).extension().and_then(|e| e.to_str());

    if matches!(ext, Some("sln" | "slnf")) {
        Some(FileCategory::Solution)
    } else if name.ends_with("project.json") {
        Some(FileCategory::ProjectJson)
    } else {
        match ext {
            Some("csproj") => Some(FileCategory::CSharpProject),
            Some("csx") => Some(FileCategory::Script),
            Some("cake") => Some(FileCategory::BuildScript),
            Some("cs") => Some(FileCategory::Source),
            _ => None,
        }
    }
}

/// What a single folder scan saw.
#[derive(Debug, Default)]
struct FolderScan {
    has_solution: bool,
    has_project: bool,
    has_project_json: bool,
    has_project_json_at_root: bool,
    has_csx: bool,
    has_cake: bool,
    has_cs: bool,
}

/// Target buckets, concatenated in a fixed priority order at the end.
#[derive(Debug, Default)]
struct Buckets {
    other: Vec<LaunchTarget>,
    solutions: Vec<LaunchTarget>,
    folders: Vec<LaunchTarget>,
    project_jsons: Vec<LaunchTarget>,
    projects: Vec<LaunchTarget>,
}

impl Buckets {
    fn into_ranked(mut self) -> Vec<LaunchTarget> {
        // `other` keeps discovery order.
        sort_by_directory(&mut self.solutions);
        sort_by_directory(&mut self.folders);
        sort_by_directory(&mut self.project_jsons);
        sort_by_directory(&mut self.projects);

        let mut ranked = self.other;
        ranked.append(&mut self.solutions);
        ranked.append(&mut self.folders);
        ranked.append(&mut self.project_jsons);
        ranked.append(&mut self.projects);
        ranked
    }
}

/// Byte-wise string order on the directory, not component order: `/a-b`
/// sorts before `/a/b`.
fn sort_by_directory(targets: &mut [LaunchTarget]) {
    targets.sort_by(|a, b| a.directory().as_os_str().cmp(b.directory().as_os_str()));
}

/// Turn a bag of discovered resources into a ranked list of launch targets.
///
/// `max_results` truncates the final list when positive; zero or negative
/// means unlimited. Out-of-scope resources are dropped silently and the
/// function never fails.
#[must_use]
pub fn classify(
    resources: &[Resource],
    folders: &[WorkspaceFolder],
    max_results: i64,
) -> Vec<LaunchTarget> {
    if resources.is_empty() {
        return Vec::new();
    }

    let local: Vec<&Resource> = resources.iter().filter(|r| !r.is_live_share()).collect();
    if local.is_empty() {
        tracing::debug!(
            count = resources.len(),
            "Only collaboration-session resources found"
        );
        return vec![LaunchTarget::live_share()];
    }

    let multi_root = folders.len() > 1;
    let mut buckets = Buckets::default();
    for (folder, members) in bucket_by_folder(&local, folders) {
        classify_folder(folder, &members, multi_root, &mut buckets);
    }

    let mut ranked = buckets.into_ranked();
    if let Ok(limit) = usize::try_from(max_results)
        && limit > 0
    {
        ranked.truncate(limit);
    }
    ranked
}

/// Group resources by owning folder, keeping the order in which folders
/// were first seen. Resources with no known folder are dropped.
fn bucket_by_folder<'a>(
    resources: &[&'a Resource],
    folders: &'a [WorkspaceFolder],
) -> Vec<(&'a WorkspaceFolder, Vec<&'a Resource>)> {
    let mut groups: Vec<(&WorkspaceFolder, Vec<&Resource>)> = Vec::new();
    let mut position: HashMap<usize, usize> = HashMap::new();

    for &resource in resources {
        let Some(index) = resource.folder() else {
            tracing::trace!(path = %resource.path().display(), "Resource outside workspace");
            continue;
        };
        if let Some(&slot) = position.get(&index) {
            groups[slot].1.push(resource);
            continue;
        }
        let Some(folder) = folders.iter().find(|f| f.index() == index) else {
            tracing::trace!(
                index,
                path = %resource.path().display(),
                "Resource references unknown workspace folder"
            );
            continue;
        };
        position.insert(index, groups.len());
        groups.push((folder, vec![resource]));
    }

    groups
}

fn classify_folder(
    folder: &WorkspaceFolder,
    resources: &[&Resource],
    multi_root: bool,
    buckets: &mut Buckets,
) {
    let root = folder.root();
    let mut scan = FolderScan::default();

    for resource in resources {
        let Some(category) = categorize(resource) else {
            continue;
        };
        let path = resource.path();
        let dir = path.parent().unwrap_or(root);
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match category {
            FileCategory::Solution => {
                scan.has_solution = true;
                buckets.solutions.push(LaunchTarget::new(
                    LaunchTargetKind::Solution,
                    label,
                    describe(dir, folder, multi_root),
                    dir,
                    path,
                ));
            }
            FileCategory::ProjectJson => {
                scan.has_project_json = true;
                scan.has_project_json_at_root |= dir == root;
                buckets.project_jsons.push(LaunchTarget::new(
                    LaunchTargetKind::ProjectJson,
                    label,
                    describe(dir, folder, multi_root),
                    dir,
                    dir,
                ));
            }
            FileCategory::CSharpProject => {
                scan.has_project = true;
                buckets.projects.push(LaunchTarget::new(
                    LaunchTargetKind::Project,
                    label,
                    describe(dir, folder, multi_root),
                    dir,
                    dir,
                ));
            }
            FileCategory::Script => scan.has_csx = true,
            FileCategory::BuildScript => scan.has_cake = true,
            FileCategory::Source => scan.has_cs = true,
        }
    }

    tracing::debug!(folder = %root.display(), ?scan, "Classified workspace folder");

    // Loose projects get a folder rollup unless a solution already covers
    // them; nested project.json files get one unless the root has its own.
    if (scan.has_project && !scan.has_solution)
        || (scan.has_project_json && !scan.has_project_json_at_root)
    {
        buckets.folders.push(folder_target(folder));
    }

    if scan.has_csx {
        buckets.other.push(LaunchTarget::new(
            LaunchTargetKind::Csx,
            "CSX",
            folder.name(),
            root,
            root,
        ));
    }

    if scan.has_cake {
        buckets.other.push(LaunchTarget::new(
            LaunchTargetKind::Cake,
            "Cake",
            folder.name(),
            root,
            root,
        ));
    }

    if scan.has_cs
        && !scan.has_solution
        && !scan.has_project
        && !scan.has_project_json
        && !scan.has_project_json_at_root
    {
        buckets.other.push(folder_target(folder));
    }
}

fn folder_target(folder: &WorkspaceFolder) -> LaunchTarget {
    LaunchTarget::new(
        LaunchTargetKind::Folder,
        folder.name(),
        "",
        folder.root(),
        folder.root(),
    )
}

/// Directory relative to its workspace folder, prefixed with the folder name
/// when more than one folder is open. The folder root itself is described by
/// the folder name.
fn describe(dir: &Path, folder: &WorkspaceFolder, multi_root: bool) -> String {
    let Ok(relative) = dir.strip_prefix(folder.root()) else {
        return dir.display().to_string();
    };
    let relative = relative.to_string_lossy().replace('\\', "/");
    if relative.is_empty() {
        folder.name().to_string()
    } else if multi_root {
        format!("{}/{relative}", folder.name())
    } else {
        relative
    }
}
