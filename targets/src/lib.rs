//! Launch target discovery and classification.
//!
//! [`discover_resources`] finds project-related files under the workspace
//! folders, [`classify`] ranks them into [`LaunchTarget`]s, and
//! [`auto_select`] picks one when the choice is unambiguous.

mod classify;
mod config;
mod discovery;
mod select;

pub use classify::classify;
pub use config::DiscoveryConfig;
pub use discovery::{DiscoveryError, discover_resources, folder_for_path};
pub use select::auto_select;

use kindle_types::{LaunchTarget, WorkspaceFolder};

/// Discover and classify in one step.
///
/// An empty folder list yields no targets.
pub fn find_launch_targets(
    folders: &[WorkspaceFolder],
    config: &DiscoveryConfig,
) -> Result<Vec<LaunchTarget>, DiscoveryError> {
    if folders.is_empty() {
        return Ok(Vec::new());
    }
    let resources = discover_resources(folders, config)?;
    Ok(classify(&resources, folders, config.max_project_results))
}
