//! Host executable resolvers: locate and validate the runtime that will run
//! the server.

use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::sync::LazyLock;

use regex::Regex;
use tokio::process::Command;

use crate::options::LaunchOptions;
use crate::platform::PlatformInfo;

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)\.(\d+)").expect("valid version regex"));

/// A `major.minor.patch` runtime version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl HostVersion {
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Extract the first `x.y.z` triple from version output such as
    /// `8.0.100` or `Mono JIT compiler version 6.12.0.182 (tarball)`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let caps = VERSION_RE.captures(text)?;
        Some(Self {
            major: caps[1].parse().ok()?,
            minor: caps[2].parse().ok()?,
            patch: caps[3].parse().ok()?,
        })
    }
}

impl fmt::Display for HostVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A resolved, validated runtime host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostExecutableInfo {
    pub path: PathBuf,
    pub version: HostVersion,
    /// Complete environment for the server process.
    pub env: HashMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("{program} not found: {detail}")]
    NotFound { program: String, detail: String },
    #[error("failed to run {}: {source}", path.display())]
    Probe {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} --version exited with {status}: {stderr}", path.display())]
    ProbeFailed {
        path: PathBuf,
        status: String,
        stderr: String,
    },
    #[error("could not read a version from {} output: {output:?}", path.display())]
    UnparsableVersion { path: PathBuf, output: String },
    #[error("{} is version {found}, at least {minimum} is required", path.display())]
    TooOld {
        path: PathBuf,
        found: HostVersion,
        minimum: HostVersion,
    },
    #[error("invalid PATH entry {}", path.display())]
    InvalidPath { path: PathBuf },
}

pub type ResolverFut<'a> =
    Pin<Box<dyn Future<Output = Result<HostExecutableInfo, ResolveError>> + Send + 'a>>;

/// Locates the runtime host for one launch strategy.
///
/// Whether results are cached is up to the implementation.
pub trait HostExecutableResolver: Send + Sync {
    fn host_executable_info<'a>(&'a self, options: &'a LaunchOptions) -> ResolverFut<'a>;
}

/// Run `<path> --version` with the given environment and parse the result.
async fn probe_version(
    path: &Path,
    env: &HashMap<String, String>,
) -> Result<HostVersion, ResolveError> {
    let output = Command::new(path)
        .arg("--version")
        .env_clear()
        .envs(env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|source| ResolveError::Probe {
            path: path.to_path_buf(),
            source,
        })?;

    if !output.status.success() {
        return Err(ResolveError::ProbeFailed {
            path: path.to_path_buf(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    HostVersion::parse(&stdout).ok_or_else(|| ResolveError::UnparsableVersion {
        path: path.to_path_buf(),
        output: stdout.trim().to_string(),
    })
}

fn ensure_minimum(
    path: &Path,
    found: HostVersion,
    minimum: HostVersion,
) -> Result<(), ResolveError> {
    if found < minimum {
        return Err(ResolveError::TooOld {
            path: path.to_path_buf(),
            found,
            minimum,
        });
    }
    Ok(())
}

fn current_env() -> HashMap<String, String> {
    env::vars_os()
        .map(|(k, v)| {
            (
                k.to_string_lossy().into_owned(),
                v.to_string_lossy().into_owned(),
            )
        })
        .collect()
}

fn path_var_key(env: &HashMap<String, String>) -> String {
    // Windows environment keys are case-insensitive; keep whatever spelling is present.
    env.keys()
        .find(|k| k.eq_ignore_ascii_case("PATH"))
        .cloned()
        .unwrap_or_else(|| "PATH".to_string())
}

/// Put `dir` first on the environment's `PATH`.
fn prepend_path(
    mut env: HashMap<String, String>,
    dir: &Path,
) -> Result<HashMap<String, String>, ResolveError> {
    let key = path_var_key(&env);
    let existing: Vec<PathBuf> = env
        .get(&key)
        .map(|p| env::split_paths(p).collect())
        .unwrap_or_default();
    let joined: OsString = env::join_paths(std::iter::once(dir.to_path_buf()).chain(existing))
        .map_err(|_| ResolveError::InvalidPath {
            path: dir.to_path_buf(),
        })?;
    env.insert(key, joined.to_string_lossy().into_owned());
    Ok(env)
}

/// Environment in which the bare host name resolves to `host`.
fn dotnet_environment(
    env: HashMap<String, String>,
    host: &Path,
) -> Result<HashMap<String, String>, ResolveError> {
    match host.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        Some(dir) => prepend_path(env, dir),
        None => Ok(env),
    }
}

/// Resolves the managed runtime (`dotnet`).
#[derive(Debug, Clone)]
pub struct DotnetResolver {
    platform: PlatformInfo,
    minimum: HostVersion,
}

impl DotnetResolver {
    pub const MINIMUM_VERSION: HostVersion = HostVersion::new(6, 0, 100);

    #[must_use]
    pub fn new(platform: PlatformInfo) -> Self {
        Self {
            platform,
            minimum: Self::MINIMUM_VERSION,
        }
    }

    #[must_use]
    pub fn with_minimum(mut self, minimum: HostVersion) -> Self {
        self.minimum = minimum;
        self
    }

    fn locate(&self, options: &LaunchOptions) -> Result<PathBuf, ResolveError> {
        let name = self.platform.dotnet_executable_name();
        match &options.dotnet_path {
            Some(configured) if configured.is_dir() => Ok(configured.join(name)),
            Some(configured) => Ok(configured.clone()),
            None => which::which(name).map_err(|e| ResolveError::NotFound {
                program: name.to_string(),
                detail: e.to_string(),
            }),
        }
    }
}

impl HostExecutableResolver for DotnetResolver {
    fn host_executable_info<'a>(&'a self, options: &'a LaunchOptions) -> ResolverFut<'a> {
        Box::pin(async move {
            let path = self.locate(options)?;
            // The launch runs the bare host name, so the checked host must win the PATH lookup.
            let env = dotnet_environment(current_env(), &path)?;
            let version = probe_version(&path, &env).await?;
            ensure_minimum(&path, version, self.minimum)?;
            tracing::debug!(path = %path.display(), %version, "Resolved dotnet host");
            Ok(HostExecutableInfo { path, version, env })
        })
    }
}

/// Resolves the legacy runtime (`mono`).
#[derive(Debug, Clone)]
pub struct MonoResolver {
    minimum: HostVersion,
}

impl Default for MonoResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MonoResolver {
    pub const MINIMUM_VERSION: HostVersion = HostVersion::new(6, 4, 0);

    #[must_use]
    pub fn new() -> Self {
        Self {
            minimum: Self::MINIMUM_VERSION,
        }
    }

    #[must_use]
    pub fn with_minimum(mut self, minimum: HostVersion) -> Self {
        self.minimum = minimum;
        self
    }
}

/// Environment for a mono installation: with a prefix, `<prefix>/bin` goes
/// first on `PATH` and `MONO_GAC_PREFIX` points at the prefix.
pub fn mono_environment(
    env: HashMap<String, String>,
    mono_path: Option<&Path>,
) -> Result<HashMap<String, String>, ResolveError> {
    let Some(prefix) = mono_path else {
        return Ok(env);
    };

    let mut env = prepend_path(env, &prefix.join("bin"))?;
    env.insert(
        "MONO_GAC_PREFIX".to_string(),
        prefix.to_string_lossy().into_owned(),
    );
    Ok(env)
}

impl HostExecutableResolver for MonoResolver {
    fn host_executable_info<'a>(&'a self, options: &'a LaunchOptions) -> ResolverFut<'a> {
        Box::pin(async move {
            let env = mono_environment(current_env(), options.mono_path.as_deref())?;
            let search_path = env.get(&path_var_key(&env)).cloned();
            let cwd = env::current_dir().unwrap_or_default();
            let path = which::which_in("mono", search_path, cwd).map_err(|e| {
                ResolveError::NotFound {
                    program: "mono".to_string(),
                    detail: e.to_string(),
                }
            })?;
            let version = probe_version(&path, &env).await?;
            ensure_minimum(&path, version, self.minimum)?;
            tracing::debug!(path = %path.display(), %version, "Resolved mono host");
            Ok(HostExecutableInfo { path, version, env })
        })
    }
}
