//! `~/.kindle/config.toml` loading.
//!
//! ```toml
//! [launch]
//! server_path = "${KINDLE_HOME}/server/Server.dll"
//! use_modern_net = true
//!
//! [discovery]
//! max_project_results = 250
//! default_launch_solution = "Shop.sln"
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use kindle_launcher::LaunchOptions;
use kindle_targets::DiscoveryConfig;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct KindleConfig {
    pub launch: Option<LaunchOptions>,
    pub discovery: Option<DiscoveryConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

impl KindleConfig {
    /// Load the user config. A missing file is not an error.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {}: {}", path.display(), err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str::<Self>(&content) {
            Ok(config) => Ok(config.expanded()),
            Err(err) => {
                tracing::warn!("Failed to parse config at {}: {}", path.display(), err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// Launch options, or defaults when the section is absent.
    #[must_use]
    pub fn launch_options(&self) -> LaunchOptions {
        self.launch.clone().unwrap_or_default()
    }

    #[must_use]
    pub fn discovery_config(&self) -> DiscoveryConfig {
        self.discovery.clone().unwrap_or_default()
    }

    fn expanded(mut self) -> Self {
        if let Some(launch) = self.launch.as_mut() {
            for path in [
                &mut launch.server_path,
                &mut launch.dotnet_path,
                &mut launch.mono_path,
            ] {
                if let Some(p) = path.as_mut() {
                    *p = expand_path(p);
                }
            }
        }
        self
    }
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".kindle").join("config.toml"))
}

/// Replace `${VAR}` references with their values. Unset variables expand to
/// nothing; an unterminated `${` is kept as written.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        if !name.is_empty() {
            out.push_str(&env::var(name).unwrap_or_default());
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

/// Expand `${VAR}` references and a leading `~` in a configured path.
#[must_use]
pub fn expand_path(path: &Path) -> PathBuf {
    let expanded = expand_env_vars(&path.to_string_lossy());
    if expanded == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = expanded
        .strip_prefix("~/")
        .or_else(|| expanded.strip_prefix("~\\"))
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn expand_env_vars_passes_plain_text() {
        assert_eq!(expand_env_vars("/opt/server"), "/opt/server");
    }

    #[test]
    fn expand_env_vars_substitutes_values() {
        unsafe {
            env::set_var("KINDLE_TEST_PREFIX", "/opt");
            env::set_var("KINDLE_TEST_NAME", "server");
        }
        assert_eq!(
            expand_env_vars("${KINDLE_TEST_PREFIX}/${KINDLE_TEST_NAME}.dll"),
            "/opt/server.dll"
        );
        unsafe {
            env::remove_var("KINDLE_TEST_PREFIX");
            env::remove_var("KINDLE_TEST_NAME");
        }
    }

    #[test]
    fn expand_env_vars_missing_var_becomes_empty() {
        unsafe {
            env::remove_var("KINDLE_TEST_MISSING");
        }
        assert_eq!(expand_env_vars("a${KINDLE_TEST_MISSING}b"), "ab");
        assert_eq!(expand_env_vars("a${}b"), "ab");
    }

    #[test]
    fn expand_env_vars_keeps_unclosed_reference() {
        assert_eq!(expand_env_vars("x ${UNCLOSED"), "x ${UNCLOSED");
    }

    #[test]
    fn expand_path_resolves_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(
            expand_path(Path::new("~/server/Server.dll")),
            home.join("server/Server.dll")
        );
        assert_eq!(expand_path(Path::new("~")), home);
        assert_eq!(
            expand_path(Path::new("/abs/~/x")),
            PathBuf::from("/abs/~/x")
        );
    }

    #[test]
    fn load_from_reads_both_sections() {
        let (_dir, path) = write_config(
            r#"
[launch]
use_modern_net = false
server_path = "/opt/server/Server.exe"

[discovery]
max_project_results = 10
default_launch_solution = "Shop.sln"
"#,
        );
        let config = KindleConfig::load_from(&path).unwrap();
        let launch = config.launch_options();
        assert!(!launch.use_modern_net);
        assert_eq!(
            launch.server_path,
            Some(PathBuf::from("/opt/server/Server.exe"))
        );
        let discovery = config.discovery_config();
        assert_eq!(discovery.max_project_results, 10);
        assert_eq!(discovery.default_launch_solution.as_deref(), Some("Shop.sln"));
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let (_dir, path) = write_config("");
        let config = KindleConfig::load_from(&path).unwrap();
        assert!(config.launch.is_none());
        assert!(config.launch_options().use_modern_net);
        assert_eq!(config.discovery_config().max_project_results, 250);
    }

    #[test]
    fn load_from_expands_paths() {
        unsafe {
            env::set_var("KINDLE_TEST_MONO", "/opt/mono");
        }
        let (_dir, path) = write_config(
            r#"
[launch]
mono_path = "${KINDLE_TEST_MONO}"
"#,
        );
        let config = KindleConfig::load_from(&path).unwrap();
        assert_eq!(
            config.launch_options().mono_path,
            Some(PathBuf::from("/opt/mono"))
        );
        unsafe {
            env::remove_var("KINDLE_TEST_MONO");
        }
    }

    #[test]
    fn parse_error_reports_path() {
        let (_dir, path) = write_config("[launch\nuse_modern_net = ");
        let err = KindleConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(err.path(), path.as_path());
    }

    #[test]
    fn read_error_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = KindleConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert_eq!(err.path(), path.as_path());
    }
}
