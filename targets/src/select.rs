//! Picking a launch target without asking the user.

use std::path::Path;

use kindle_types::LaunchTarget;

/// Choose a target when the answer is unambiguous.
///
/// Priority:
/// - a target whose file name equals `default_solution`
/// - a target equal to the previously chosen `preferred` path
/// - the only launchable target
///
/// Returns `None` when the user has to choose.
#[must_use]
pub fn auto_select<'a>(
    targets: &'a [LaunchTarget],
    default_solution: Option<&str>,
    preferred: Option<&Path>,
) -> Option<&'a LaunchTarget> {
    let mut launchable = targets.iter().filter(|t| t.kind().is_launchable());

    if let Some(name) = default_solution.filter(|n| !n.is_empty())
        && let Some(found) = launchable
            .clone()
            .find(|t| t.target().file_name().is_some_and(|f| f == name))
    {
        return Some(found);
    }

    if let Some(preferred) = preferred
        && let Some(found) = launchable.clone().find(|t| t.target() == preferred)
    {
        return Some(found);
    }

    let first = launchable.next()?;
    if launchable.next().is_some() {
        return None;
    }
    Some(first)
}
