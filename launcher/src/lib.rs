//! Launcher for the C# analysis server: resolves a runtime host, composes the
//! command line for the chosen strategy, and spawns the process.

mod command;
mod error;
mod options;
mod platform;
mod process;
mod resolver;

pub use command::{
    ASSEMBLY_LOADER_STRICT, DEBUGGER_AGENT, LaunchCommand, LaunchStrategy,
    MANAGED_ASSEMBLY_EXTENSION, compose_command, escape_windows_arg, formatting_args,
    windows_shell_argument,
};
pub use error::LaunchError;
pub use options::{DEFAULT_TAB_SIZE, EditorFormatting, FormattingSettings, LaunchOptions};
pub use platform::{Os, PlatformInfo};
pub use process::{IntermediateLaunchResult, LaunchResult, launch, select_strategy, spawn};
pub use resolver::{
    DotnetResolver, HostExecutableInfo, HostExecutableResolver, HostVersion, MonoResolver,
    ResolveError, ResolverFut, mono_environment,
};
