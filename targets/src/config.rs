use serde::Deserialize;

const fn default_true() -> bool {
    true
}

const fn default_max_project_results() -> i64 {
    250
}

fn default_exclude() -> Vec<String> {
    ["**/node_modules/**", "**/.git/**", "**/bower_components/**"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Workspace discovery settings.
///
/// ```toml
/// [discovery]
/// max_project_results = 250
/// exclude = ["**/node_modules/**", "**/.git/**"]
/// default_launch_solution = "Shop.sln"
/// respect_gitignore = true
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// Cap on discovered project files and on returned targets.
    /// Zero or negative means unlimited.
    #[serde(default = "default_max_project_results")]
    pub max_project_results: i64,
    /// Globs (relative to each workspace folder) that are never reported.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    /// File name of the solution to pick without asking, e.g. `"Shop.sln"`.
    #[serde(default)]
    pub default_launch_solution: Option<String>,
    #[serde(default = "default_true")]
    pub respect_gitignore: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_project_results: default_max_project_results(),
            exclude: default_exclude(),
            default_launch_solution: None,
            respect_gitignore: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_matches_default() {
        let parsed: DiscoveryConfig = toml::from_str("").unwrap();
        let default = DiscoveryConfig::default();
        assert_eq!(parsed.max_project_results, default.max_project_results);
        assert_eq!(parsed.exclude, default.exclude);
        assert!(parsed.default_launch_solution.is_none());
        assert!(parsed.respect_gitignore);
    }

    #[test]
    fn parse_overrides() {
        let parsed: DiscoveryConfig = toml::from_str(
            r#"
max_project_results = 0
exclude = ["**/bin/**"]
default_launch_solution = "Shop.sln"
respect_gitignore = false
"#,
        )
        .unwrap();
        assert_eq!(parsed.max_project_results, 0);
        assert_eq!(parsed.exclude, vec!["**/bin/**"]);
        assert_eq!(parsed.default_launch_solution.as_deref(), Some("Shop.sln"));
        assert!(!parsed.respect_gitignore);
    }
}
