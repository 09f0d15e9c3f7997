use std::path::PathBuf;

/// Everything that can abort a sandbox launch.
///
/// None of these are recovered from: the caller reports the error and exits
/// non-zero instead of continuing unsandboxed.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("invalid sandbox command '{name}'. Must be one of [docker podman sandbox-exec]")]
    InvalidBackendName { name: String },

    #[error("missing sandbox command '{command}' (from {origin})")]
    MissingExecutable { command: String, origin: String },

    #[error(
        "sandboxing is enabled but no sandbox command could be determined; \
         install docker or podman, or set HOPBOX_SANDBOX to a sandbox command"
    )]
    NoBackendAvailable,

    #[error("sandbox image is not specified for '{backend}'")]
    MissingImageConfiguration { backend: String },

    #[error("'{command} images' failed while checking for {image}")]
    ImageProbeFailed {
        command: String,
        image: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to pull image {image} with {command}")]
    ImagePullFailed {
        command: String,
        image: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to obtain sandbox image {image} after pull attempt")]
    ImageUnavailableAfterPull { image: String },

    #[error("missing macOS seatbelt profile '{name}'")]
    UnknownProfileName { name: String },

    #[error("failed to {action} temp profile file")]
    ProfileFileIo {
        action: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("executable not found: {0}")]
    ExecutableNotFound(String),

    #[error("failed to exec {program}")]
    ProcessReplacementFailed {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to get current working directory")]
    WorkingDirectoryUnavailable(#[source] std::io::Error),

    #[error("failed to determine {0} directory")]
    HomeOrCacheDirUnavailable(&'static str),
}

pub type Result<T> = std::result::Result<T, SandboxError>;
