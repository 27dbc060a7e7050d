use crate::resolver::ResolveError;

/// Why a launch did not produce a running server.
///
/// Failures after the process has started are not represented here; they
/// surface on the process handle itself.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("Could not resolve the runtime host: {0}")]
    Resolve(#[from] ResolveError),
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited before it reported a process id")]
    ExitedBeforeSpawn { program: String },
}
