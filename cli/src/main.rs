//! `kindle`: pick a launch target in the workspace and start the C# analysis
//! server against it, proxying its stdio.

use std::fs::{self, OpenOptions};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{ExitCode, ExitStatus};
use std::sync::Mutex;
use std::thread;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use kindle_config::KindleConfig;
use kindle_launcher::{DotnetResolver, MonoResolver, PlatformInfo, launch};
use kindle_targets::{auto_select, find_launch_targets};
use kindle_types::{LaunchTarget, WorkspaceFolder};
use tokio::io::{self, AsyncWrite, AsyncWriteExt};
use tokio::process::Child;
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const INPUT_CHANNEL_CAPACITY: usize = 64;

const INPUT_CHUNK_SIZE: usize = 8192;

#[derive(Parser, Debug)]
#[command(name = "kindle")]
#[command(about = "Start the C# analysis server for a workspace", long_about = None)]
#[command(version)]
struct Cli {
    /// Workspace folders. Defaults to the current directory.
    roots: Vec<PathBuf>,

    /// Print the ranked launch targets and exit
    #[arg(long)]
    list: bool,

    /// Print the target list as JSON
    #[arg(long, requires = "list")]
    json: bool,

    /// Launch the N-th target of `--list` (1-based)
    #[arg(short, long, value_name = "N")]
    target: Option<usize>,

    /// Target path to prefer when several are found
    #[arg(long, value_name = "PATH", conflicts_with = "target")]
    prefer: Option<PathBuf>,

    /// Server executable or assembly
    #[arg(long, env = "KINDLE_SERVER_PATH")]
    server_path: Option<PathBuf>,

    /// Cap on discovered project files and returned targets (0 = unlimited)
    #[arg(long)]
    max_results: Option<i64>,

    /// Extra arguments passed to the server
    #[arg(last = true)]
    extra: Vec<String>,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_kindle_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // stdout belongs to the server protocol.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
    for warning in init_warnings {
        tracing::warn!("{warning}");
    }
}

fn open_kindle_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in kindle_log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => warnings.push(format!(
                "Failed to open log file {}: {e}",
                candidate.display()
            )),
        }
    }

    (None, warnings)
}

fn kindle_log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(config_path) = KindleConfig::path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("kindle.log"));
    }

    candidates.push(PathBuf::from(".kindle").join("logs").join("kindle.log"));
    candidates
}

fn workspace_folders(roots: &[PathBuf]) -> Result<Vec<WorkspaceFolder>> {
    let roots = if roots.is_empty() {
        vec![std::env::current_dir().context("reading current directory")?]
    } else {
        roots.to_vec()
    };

    roots
        .iter()
        .enumerate()
        .map(|(index, root)| {
            let root = root
                .canonicalize()
                .with_context(|| format!("workspace folder {}", root.display()))?;
            Ok(WorkspaceFolder::from_root(index, root))
        })
        .collect()
}

fn print_targets(targets: &[LaunchTarget], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(targets)?);
        return Ok(());
    }
    if targets.is_empty() {
        println!("No launch targets found.");
        return Ok(());
    }
    for (i, target) in targets.iter().enumerate() {
        println!("{:>3}. {target}", i + 1);
    }
    Ok(())
}

fn choose_target<'a>(
    targets: &'a [LaunchTarget],
    index: Option<usize>,
    default_solution: Option<&str>,
    preferred: Option<&Path>,
) -> Result<&'a LaunchTarget> {
    let chosen = match index {
        Some(n) => n
            .checked_sub(1)
            .and_then(|i| targets.get(i))
            .ok_or_else(|| anyhow!("--target {n} is out of range (1..={})", targets.len()))?,
        None => {
            if targets.is_empty() {
                bail!("no launch targets found in the workspace");
            }
            auto_select(targets, default_solution, preferred).ok_or_else(|| {
                let mut message = String::from(
                    "several launch targets found; choose one with --target N:",
                );
                for (i, target) in targets.iter().enumerate() {
                    message.push_str(&format!("\n{:>3}. {target}", i + 1));
                }
                anyhow!(message)
            })?
        }
    };

    if !chosen.kind().is_launchable() {
        bail!("{}: {}", chosen.label(), chosen.description());
    }
    Ok(chosen)
}

/// Base server arguments for `target`, followed by `extra`.
fn server_args(target: &Path, host_pid: u32, log_level: &str, extra: &[String]) -> Vec<String> {
    let mut args = vec![
        "-z".to_string(),
        "-s".to_string(),
        target.display().to_string(),
        "--hostPID".to_string(),
        host_pid.to_string(),
        "DotNet:enablePackageRestore=false".to_string(),
        "--encoding".to_string(),
        "utf-8".to_string(),
        "--loglevel".to_string(),
        log_level.to_string(),
    ];
    args.extend_from_slice(extra);
    args
}

/// Read `reader` on a dedicated thread and forward chunks over a channel.
///
/// The runtime never joins this thread, so a read parked on an idle parent
/// stdin cannot keep the process alive after the server exits.
fn spawn_input_pump<R>(mut reader: R) -> Result<mpsc::Receiver<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
    thread::Builder::new()
        .name("kindle-stdin".to_string())
        .spawn(move || {
            let mut buf = vec![0u8; INPUT_CHUNK_SIZE];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        // Receiver gone: the server has exited.
                        if tx.blocking_send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) => {
                        tracing::warn!("Reading stdin failed: {e}");
                        break;
                    }
                }
            }
        })
        .context("starting stdin reader")?;
    Ok(rx)
}

/// Shuttle `input` into the server and its output into `out`/`err` until the
/// server exits.
async fn proxy_stdio<O, E>(
    mut child: Child,
    mut input: mpsc::Receiver<Vec<u8>>,
    mut out: O,
    mut err: E,
) -> Result<ExitStatus>
where
    O: AsyncWrite + Unpin + Send + 'static,
    E: AsyncWrite + Unpin + Send + 'static,
{
    let input_task = child.stdin.take().map(|mut server_in| {
        tokio::spawn(async move {
            // Dropping `server_in` at the end closes the server's stdin.
            while let Some(chunk) = input.recv().await {
                if server_in.write_all(&chunk).await.is_err() || server_in.flush().await.is_err()
                {
                    break;
                }
            }
        })
    });
    let stdout_task = child
        .stdout
        .take()
        .map(|mut server_out| tokio::spawn(async move { io::copy(&mut server_out, &mut out).await }));
    let stderr_task = child
        .stderr
        .take()
        .map(|mut server_err| tokio::spawn(async move { io::copy(&mut server_err, &mut err).await }));

    let status = child.wait().await.context("waiting for the server")?;
    for task in [stdout_task, stderr_task].into_iter().flatten() {
        if let Ok(Err(e)) = task.await {
            tracing::warn!("Server output forwarding failed: {e}");
        }
    }
    if let Some(task) = input_task {
        task.abort();
    }
    Ok(status)
}

fn exit_code(status: ExitStatus) -> ExitCode {
    status
        .code()
        .and_then(|code| u8::try_from(code).ok())
        .map_or(ExitCode::FAILURE, ExitCode::from)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing();

    let config = KindleConfig::load()
        .context("loading ~/.kindle/config.toml")?
        .unwrap_or_default();

    let mut discovery = config.discovery_config();
    if let Some(max) = cli.max_results {
        discovery.max_project_results = max;
    }

    let folders = workspace_folders(&cli.roots)?;
    let targets = find_launch_targets(&folders, &discovery)?;
    tracing::debug!(count = targets.len(), "Classified launch targets");

    if cli.list {
        print_targets(&targets, cli.json)?;
        return Ok(ExitCode::SUCCESS);
    }

    let target = choose_target(
        &targets,
        cli.target,
        discovery.default_launch_solution.as_deref(),
        cli.prefer.as_deref(),
    )?;
    tracing::info!(target = %target.target().display(), kind = %target.kind(), "Selected launch target");

    let mut options = config.launch_options();
    if let Some(path) = cli.server_path {
        options.server_path = Some(path);
    }
    let Some(server_path) = options.server_path.clone() else {
        bail!("no server path configured; pass --server-path or set launch.server_path");
    };

    let platform = PlatformInfo::current();
    let args = server_args(
        target.target(),
        std::process::id(),
        &options.logging_level,
        &cli.extra,
    );
    let result = launch(
        target.directory(),
        args,
        &server_path.to_string_lossy(),
        platform,
        &options,
        &MonoResolver::new(),
        &DotnetResolver::new(platform),
    )
    .await
    .with_context(|| format!("launching {}", server_path.display()))?;

    let pid = result.pid();
    let input = spawn_input_pump(std::io::stdin())?;
    let status = proxy_stdio(result.into_process(), input, io::stdout(), io::stderr()).await?;

    tracing::info!(pid, %status, "Server exited");
    Ok(exit_code(status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kindle_types::LaunchTargetKind;

    fn target(kind: LaunchTargetKind, path: &str) -> LaunchTarget {
        let path = PathBuf::from(path);
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        LaunchTarget::new(kind, "label", "desc", directory, path)
    }

    #[test]
    fn cli_parses_extra_arguments() {
        let cli = Cli::parse_from([
            "kindle", "/ws", "--target", "2", "--", "--verbose", "x",
        ]);
        assert_eq!(cli.roots, vec![PathBuf::from("/ws")]);
        assert_eq!(cli.target, Some(2));
        assert_eq!(cli.extra, vec!["--verbose".to_string(), "x".to_string()]);
    }

    #[test]
    fn json_requires_list() {
        assert!(Cli::try_parse_from(["kindle", "--json"]).is_err());
        assert!(Cli::try_parse_from(["kindle", "--list", "--json"]).is_ok());
    }

    #[test]
    fn server_args_start_with_base_arguments() {
        let args = server_args(
            Path::new("/ws/Shop.sln"),
            42,
            "debug",
            &["--extra".to_string()],
        );
        assert_eq!(
            args,
            vec![
                "-z",
                "-s",
                "/ws/Shop.sln",
                "--hostPID",
                "42",
                "DotNet:enablePackageRestore=false",
                "--encoding",
                "utf-8",
                "--loglevel",
                "debug",
                "--extra",
            ]
        );
    }

    #[test]
    fn choose_by_index_is_one_based() {
        let targets = vec![
            target(LaunchTargetKind::Solution, "/ws/A.sln"),
            target(LaunchTargetKind::Solution, "/ws/b/B.sln"),
        ];
        let chosen = choose_target(&targets, Some(2), None, None).unwrap();
        assert_eq!(chosen.target(), Path::new("/ws/b/B.sln"));
        assert!(choose_target(&targets, Some(0), None, None).is_err());
        assert!(choose_target(&targets, Some(3), None, None).is_err());
    }

    #[test]
    fn ambiguous_choice_lists_candidates() {
        let targets = vec![
            target(LaunchTargetKind::Solution, "/ws/A.sln"),
            target(LaunchTargetKind::Solution, "/ws/b/B.sln"),
        ];
        let err = choose_target(&targets, None, None, None).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("--target"));
        assert!(message.contains("  1. "));
        assert!(message.contains("  2. "));
    }

    #[test]
    fn preferred_path_resolves_ambiguity() {
        let targets = vec![
            target(LaunchTargetKind::Solution, "/ws/A.sln"),
            target(LaunchTargetKind::Solution, "/ws/b/B.sln"),
        ];
        let chosen =
            choose_target(&targets, None, None, Some(Path::new("/ws/b/B.sln"))).unwrap();
        assert_eq!(chosen.target(), Path::new("/ws/b/B.sln"));
    }

    /// A reader that never returns, like the stdin of an editor that keeps
    /// the pipe open.
    #[cfg(unix)]
    struct IdleInput;

    #[cfg(unix)]
    impl Read for IdleInput {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            loop {
                thread::park();
            }
        }
    }

    #[cfg(unix)]
    fn shell(script: &str) -> Child {
        tokio::process::Command::new("/bin/sh")
            .args(["-c", script])
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .unwrap()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn proxy_returns_when_server_exits_with_idle_stdin() {
        let input = spawn_input_pump(IdleInput).unwrap();
        let status = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            proxy_stdio(shell("echo ran; exit 3"), input, io::sink(), io::sink()),
        )
        .await
        .expect("proxy waited on stdin instead of the server")
        .unwrap();
        assert_eq!(status.code(), Some(3));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn proxy_forwards_input_to_server() {
        let input = spawn_input_pump(std::io::Cursor::new(b"hello\n".to_vec())).unwrap();
        let status = proxy_stdio(
            shell(r#"read line; [ "$line" = hello ]"#),
            input,
            io::sink(),
            io::sink(),
        )
        .await
        .unwrap();
        assert!(status.success());
    }

    #[test]
    fn live_share_target_is_refused() {
        let targets = vec![LaunchTarget::live_share()];
        assert!(choose_target(&targets, Some(1), None, None).is_err());
        assert!(choose_target(&targets, None, None, None).is_err());
    }
}
