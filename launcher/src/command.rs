//! Command composition for the three launch strategies.
//!
//! Everything here is pure: it turns a strategy plus inputs into a
//! [`LaunchCommand`] value. Only [`crate::spawn`] touches the OS.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::options::{EditorFormatting, LaunchOptions};
use crate::platform::PlatformInfo;
use crate::resolver::HostExecutableInfo;

/// Managed assemblies are started through the host; anything else is run directly.
pub const MANAGED_ASSEMBLY_EXTENSION: &str = ".dll";

pub const ASSEMBLY_LOADER_STRICT: &str = "--assembly-loader=strict";

pub const DEBUGGER_AGENT: &str =
    "--debugger-agent=transport=dt_socket,server=y,address=127.0.0.1:55555";

/// How the server process is started. Chosen once per launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchStrategy {
    /// Managed runtime host, or a self-contained server executable.
    ModernNet { host: HostExecutableInfo },
    /// Indirect execution through `cmd` on Windows.
    WindowsShell,
    /// Legacy cross-platform runtime.
    LegacyMono { host: HostExecutableInfo },
}

impl LaunchStrategy {
    #[must_use]
    pub fn host(&self) -> Option<&HostExecutableInfo> {
        match self {
            Self::ModernNet { host } | Self::LegacyMono { host } => Some(host),
            Self::WindowsShell => None,
        }
    }

    #[must_use]
    pub fn host_is_mono(&self) -> bool {
        matches!(self, Self::LegacyMono { .. })
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ModernNet { .. } => "dotnet",
            Self::WindowsShell => "cmd",
            Self::LegacyMono { .. } => "mono",
        }
    }
}

impl fmt::Display for LaunchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fully assembled command line, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Arguments must reach the process untouched, without re-quoting.
    pub verbatim: bool,
    /// Replacement environment. `None` inherits the parent's.
    pub env: Option<HashMap<String, String>>,
    pub cwd: PathBuf,
}

impl LaunchCommand {
    /// Single-line rendering for logs.
    #[must_use]
    pub fn display_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// The three `formattingOptions:*` server arguments.
#[must_use]
pub fn formatting_args(formatting: &EditorFormatting) -> [String; 3] {
    [
        format!("formattingOptions:useTabs={}", formatting.use_tabs()),
        format!("formattingOptions:tabSize={}", formatting.tab_size()),
        format!(
            "formattingOptions:indentationSize={}",
            formatting.indentation_size()
        ),
    ]
}

fn is_fully_quoted(arg: &str) -> bool {
    arg.len() >= 2 && arg.starts_with('"') && arg.ends_with('"')
}

/// Escape one argument for `cmd /s /c`.
///
/// Arguments with whitespace are wrapped in double quotes unless already
/// quoted; otherwise `&` becomes `^&` so the shell does not split the command.
#[must_use]
pub fn escape_windows_arg(arg: &str) -> Cow<'_, str> {
    if arg.contains(char::is_whitespace) && !is_fully_quoted(arg) {
        Cow::Owned(format!("\"{arg}\""))
    } else if arg.contains('&') {
        Cow::Owned(arg.replace('&', "^&"))
    } else {
        Cow::Borrowed(arg)
    }
}

/// The single verbatim argument handed to `cmd`.
#[must_use]
pub fn windows_shell_argument(launch_path: &str, args: &[String]) -> String {
    let joined = std::iter::once(launch_path)
        .chain(args.iter().map(String::as_str))
        .map(escape_windows_arg)
        .collect::<Vec<_>>()
        .join(" ");
    format!("/s /c \"{joined}\"")
}

fn is_managed_assembly(launch_path: &str) -> bool {
    launch_path
        .to_ascii_lowercase()
        .ends_with(MANAGED_ASSEMBLY_EXTENSION)
}

/// Assemble the command line for `strategy`.
///
/// `args` already carries any formatting arguments; strategy-specific
/// arguments are prepended here.
#[must_use]
pub fn compose_command(
    strategy: &LaunchStrategy,
    platform: PlatformInfo,
    cwd: &Path,
    args: &[String],
    launch_path: &str,
    options: &LaunchOptions,
) -> LaunchCommand {
    match strategy {
        LaunchStrategy::ModernNet { host } => {
            let (program, args) = if is_managed_assembly(launch_path) {
                let mut with_assembly = Vec::with_capacity(args.len() + 1);
                with_assembly.push(launch_path.to_string());
                with_assembly.extend_from_slice(args);
                (
                    PathBuf::from(platform.dotnet_executable_name()),
                    with_assembly,
                )
            } else {
                (PathBuf::from(launch_path), args.to_vec())
            };
            LaunchCommand {
                program,
                args,
                verbatim: false,
                env: Some(host.env.clone()),
                cwd: cwd.to_path_buf(),
            }
        }
        LaunchStrategy::WindowsShell => LaunchCommand {
            program: PathBuf::from("cmd"),
            args: vec![windows_shell_argument(launch_path, args)],
            verbatim: true,
            env: None,
            cwd: cwd.to_path_buf(),
        },
        LaunchStrategy::LegacyMono { host } => {
            let mut mono_args = Vec::with_capacity(args.len() + 4);
            if options.wait_for_debugger {
                mono_args.push("--debug".to_string());
                mono_args.push(DEBUGGER_AGENT.to_string());
            }
            mono_args.push(ASSEMBLY_LOADER_STRICT.to_string());
            mono_args.push(launch_path.to_string());
            mono_args.extend_from_slice(args);
            LaunchCommand {
                program: PathBuf::from("mono"),
                args: mono_args,
                verbatim: false,
                env: Some(host.env.clone()),
                cwd: cwd.to_path_buf(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Os;
    use crate::resolver::HostVersion;

    fn host(path: &str) -> HostExecutableInfo {
        HostExecutableInfo {
            path: PathBuf::from(path),
            version: HostVersion::new(8, 0, 100),
            env: [("PATH".to_string(), "/usr/bin".to_string())].into(),
        }
    }

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    const LINUX: PlatformInfo = PlatformInfo::new(Os::Linux);
    const WINDOWS: PlatformInfo = PlatformInfo::new(Os::Windows);

    #[test]
    fn escape_wraps_unquoted_whitespace() {
        assert_eq!(escape_windows_arg("C:\\My Projects"), "\"C:\\My Projects\"");
        assert_eq!(escape_windows_arg("\"already quoted\""), "\"already quoted\"");
    }

    #[test]
    fn escape_carets_ampersands() {
        assert_eq!(escape_windows_arg("a&b"), "a^&b");
        assert_eq!(escape_windows_arg("a&b&c"), "a^&b^&c");
        assert_eq!(escape_windows_arg("plain"), "plain");
        assert!(matches!(escape_windows_arg("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn escape_quotes_take_precedence_over_carets() {
        assert_eq!(escape_windows_arg("R&D folder"), "\"R&D folder\"");
    }

    #[test]
    fn windows_shell_wraps_whole_command() {
        let command = compose_command(
            &LaunchStrategy::WindowsShell,
            WINDOWS,
            Path::new("C:\\ws"),
            &args(&["-s", "C:\\My Projects\\Shop.sln", "a&b"]),
            "C:\\server\\Server.exe",
            &LaunchOptions::default(),
        );
        assert_eq!(command.program, PathBuf::from("cmd"));
        assert!(command.verbatim);
        assert!(command.env.is_none());
        assert_eq!(
            command.args,
            vec![
                "/s /c \"C:\\server\\Server.exe -s \"C:\\My Projects\\Shop.sln\" a^&b\""
                    .to_string()
            ]
        );
    }

    #[test]
    fn modern_net_runs_assembly_through_host() {
        let command = compose_command(
            &LaunchStrategy::ModernNet {
                host: host("/usr/share/dotnet/dotnet"),
            },
            LINUX,
            Path::new("/ws"),
            &args(&["-s", "/ws"]),
            "/opt/server/Server.dll",
            &LaunchOptions::default(),
        );
        assert_eq!(command.program, PathBuf::from("dotnet"));
        assert_eq!(command.args, args(&["/opt/server/Server.dll", "-s", "/ws"]));
        assert_eq!(command.env.as_ref().unwrap()["PATH"], "/usr/bin");
        assert_eq!(command.cwd, PathBuf::from("/ws"));
    }

    #[test]
    fn modern_net_uses_exe_host_name_on_windows() {
        let command = compose_command(
            &LaunchStrategy::ModernNet {
                host: host("C:\\dotnet\\dotnet.exe"),
            },
            WINDOWS,
            Path::new("C:\\ws"),
            &[],
            "C:\\server\\Server.DLL",
            &LaunchOptions::default(),
        );
        assert_eq!(command.program, PathBuf::from("dotnet.exe"));
        assert_eq!(command.args, args(&["C:\\server\\Server.DLL"]));
    }

    #[test]
    fn modern_net_runs_bundled_executable_directly() {
        let command = compose_command(
            &LaunchStrategy::ModernNet {
                host: host("/usr/bin/dotnet"),
            },
            LINUX,
            Path::new("/ws"),
            &args(&["-s", "/ws"]),
            "/opt/server/Server",
            &LaunchOptions::default(),
        );
        assert_eq!(command.program, PathBuf::from("/opt/server/Server"));
        assert_eq!(command.args, args(&["-s", "/ws"]));
    }

    #[test]
    fn legacy_mono_prepends_strict_loader() {
        let command = compose_command(
            &LaunchStrategy::LegacyMono {
                host: host("/usr/bin/mono"),
            },
            LINUX,
            Path::new("/ws"),
            &args(&["-s", "/ws"]),
            "/opt/server/Server.exe",
            &LaunchOptions::default(),
        );
        assert_eq!(command.program, PathBuf::from("mono"));
        assert_eq!(
            command.args,
            args(&[ASSEMBLY_LOADER_STRICT, "/opt/server/Server.exe", "-s", "/ws"])
        );
    }

    #[test]
    fn legacy_mono_debugger_argument_order() {
        let options = LaunchOptions {
            wait_for_debugger: true,
            ..LaunchOptions::default()
        };
        let command = compose_command(
            &LaunchStrategy::LegacyMono {
                host: host("/usr/bin/mono"),
            },
            LINUX,
            Path::new("/ws"),
            &args(&["-s", "/ws"]),
            "/opt/server/Server.exe",
            &options,
        );
        assert_eq!(
            command.args,
            args(&[
                "--debug",
                "--debugger-agent=transport=dt_socket,server=y,address=127.0.0.1:55555",
                "--assembly-loader=strict",
                "/opt/server/Server.exe",
                "-s",
                "/ws",
            ])
        );
    }

    #[test]
    fn formatting_args_follow_settings() {
        let formatting = EditorFormatting::default();
        assert_eq!(
            formatting_args(&formatting),
            [
                "formattingOptions:useTabs=false".to_string(),
                "formattingOptions:tabSize=4".to_string(),
                "formattingOptions:indentationSize=4".to_string(),
            ]
        );
    }

    #[test]
    fn display_line_joins_program_and_args() {
        let command = LaunchCommand {
            program: PathBuf::from("mono"),
            args: args(&["--assembly-loader=strict", "Server.exe"]),
            verbatim: false,
            env: None,
            cwd: PathBuf::from("/ws"),
        };
        assert_eq!(
            command.display_line(),
            "mono --assembly-loader=strict Server.exe"
        );
    }
}
