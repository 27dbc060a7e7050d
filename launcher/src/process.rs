//! Strategy selection and spawning of the server process.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::{Child, Command};

use crate::command::{LaunchCommand, LaunchStrategy, compose_command, formatting_args};
use crate::error::LaunchError;
use crate::options::LaunchOptions;
use crate::platform::PlatformInfo;
use crate::resolver::{HostExecutableResolver, HostVersion, ResolveError};

/// Pick the launch strategy. Only the chosen strategy's resolver is consulted.
pub async fn select_strategy(
    platform: PlatformInfo,
    options: &LaunchOptions,
    mono: &dyn HostExecutableResolver,
    dotnet: &dyn HostExecutableResolver,
) -> Result<LaunchStrategy, ResolveError> {
    if options.use_modern_net {
        let host = dotnet.host_executable_info(options).await?;
        Ok(LaunchStrategy::ModernNet { host })
    } else if platform.is_windows() {
        Ok(LaunchStrategy::WindowsShell)
    } else {
        let host = mono.host_executable_info(options).await?;
        Ok(LaunchStrategy::LegacyMono { host })
    }
}

/// Issue the spawn for a composed command. All three standard streams are piped.
pub fn spawn(command: &LaunchCommand) -> Result<Child, LaunchError> {
    let mut cmd = Command::new(&command.program);
    apply_args(&mut cmd, command);
    cmd.current_dir(&command.cwd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    if let Some(env) = &command.env
        && !env.is_empty()
    {
        cmd.env_clear().envs(env);
    }

    cmd.spawn().map_err(|source| LaunchError::Spawn {
        program: command.program.display().to_string(),
        source,
    })
}

#[cfg(windows)]
fn apply_args(cmd: &mut Command, command: &LaunchCommand) {
    use std::os::windows::process::CommandExt;

    if command.verbatim {
        for arg in &command.args {
            cmd.as_std_mut().raw_arg(arg);
        }
    } else {
        cmd.args(&command.args);
    }
}

#[cfg(not(windows))]
fn apply_args(cmd: &mut Command, command: &LaunchCommand) {
    cmd.args(&command.args);
}

/// A process that has been issued but not yet confirmed as started.
#[derive(Debug)]
pub struct IntermediateLaunchResult {
    process: Child,
    command: String,
    program: String,
    strategy: LaunchStrategy,
}

impl IntermediateLaunchResult {
    /// Resolve the first lifecycle signal: a process id means the OS started it.
    ///
    /// A child that has already been reaped reports no id, so a handle that
    /// was waited on before confirmation fails with `ExitedBeforeSpawn`.
    pub fn confirm(self) -> Result<LaunchResult, LaunchError> {
        let Some(pid) = self.process.id() else {
            return Err(LaunchError::ExitedBeforeSpawn {
                program: self.program,
            });
        };
        let host = self.strategy.host();
        Ok(LaunchResult {
            pid,
            command: self.command,
            host_is_mono: self.strategy.host_is_mono(),
            host_version: host.map(|h| h.version),
            host_path: host.map(|h| h.path.clone()),
            process: self.process,
        })
    }
}

/// A started server process plus launch metadata. The caller owns the process.
#[derive(Debug)]
pub struct LaunchResult {
    process: Child,
    pid: u32,
    command: String,
    host_is_mono: bool,
    host_version: Option<HostVersion>,
    host_path: Option<PathBuf>,
}

impl LaunchResult {
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// The launch path the server was started from.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    #[must_use]
    pub fn host_is_mono(&self) -> bool {
        self.host_is_mono
    }

    #[must_use]
    pub fn host_version(&self) -> Option<HostVersion> {
        self.host_version
    }

    #[must_use]
    pub fn host_path(&self) -> Option<&Path> {
        self.host_path.as_deref()
    }

    pub fn process_mut(&mut self) -> &mut Child {
        &mut self.process
    }

    #[must_use]
    pub fn into_process(self) -> Child {
        self.process
    }
}

/// Start the server at `launch_path` with `args`.
///
/// Fails if the host cannot be resolved or the process never starts.
/// Failures after start arrive on the returned process handle.
pub async fn launch(
    cwd: &Path,
    mut args: Vec<String>,
    launch_path: &str,
    platform: PlatformInfo,
    options: &LaunchOptions,
    mono: &dyn HostExecutableResolver,
    dotnet: &dyn HostExecutableResolver,
) -> Result<LaunchResult, LaunchError> {
    if options.use_editor_formatting_settings {
        args.extend(formatting_args(&options.formatting));
    }

    let strategy = select_strategy(platform, options, mono, dotnet).await?;
    let command = compose_command(&strategy, platform, cwd, &args, launch_path, options);

    tracing::info!(
        strategy = %strategy,
        cwd = %cwd.display(),
        command = %command.display_line(),
        "Launching server"
    );

    let process = spawn(&command)?;
    let result = IntermediateLaunchResult {
        process,
        command: launch_path.to_string(),
        program: command.program.display().to_string(),
        strategy,
    }
    .confirm()?;

    tracing::info!(pid = result.pid(), "Server started");
    Ok(result)
}
