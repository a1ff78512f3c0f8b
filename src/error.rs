//! Error types for the driver lifecycle, the capture engine, and configuration loading.
//!
//! Every enum exposes `kind()` returning the variant name, so callers and tests can
//! distinguish failure categories without matching on message text.

use std::path::PathBuf;

/// Failure of a single Npcap installation attempt. Terminal for that attempt; the
/// caller decides whether to retry.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// The bundled installer payload could not be read.
    #[error("failed to read installer payload")]
    PayloadRead(#[source] std::io::Error),

    /// The payload could not be written to the temp directory.
    #[error("failed to write installer to {}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The installer could not be launched or exited unsuccessfully.
    #[error("installer process failed: {0}")]
    ProcessFailed(String),

    /// The installer finished but the driver is still not detected.
    #[error("installation appears to have failed, please install Npcap manually")]
    VerificationFailed,
}

impl InstallError {
    pub fn kind(&self) -> &'static str {
        match self {
            InstallError::PayloadRead(_) => "PayloadRead",
            InstallError::WriteFailed { .. } => "WriteFailed",
            InstallError::ProcessFailed(_) => "ProcessFailed",
            InstallError::VerificationFailed => "VerificationFailed",
        }
    }
}

/// Failure to determine the installed driver version.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("failed to install Npcap")]
    Install(#[from] InstallError),

    /// Every version source failed and the driver is not detected.
    #[error("unable to determine Npcap version")]
    Unresolvable,
}

impl ResolveError {
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::Install(_) => "Install",
            ResolveError::Unresolvable => "Unresolvable",
        }
    }
}

/// Driver readiness failure reported to the startup sequence.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("Npcap check failed")]
    Resolve(#[from] ResolveError),

    /// Driver present but older than the minimum version.
    #[error("Npcap {current} is older than the required {required}, please upgrade")]
    Incompatible { current: String, required: String },
}

impl DriverError {
    pub fn kind(&self) -> &'static str {
        match self {
            DriverError::Resolve(_) => "Resolve",
            DriverError::Incompatible { .. } => "Incompatible",
        }
    }
}

/// Failure to bring up a capture session.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to open interface {interface}: {reason}")]
    OpenFailed { interface: String, reason: String },

    #[error("filter {filter:?} rejected: {reason}")]
    FilterRejected { filter: String, reason: String },

    #[error("failed to spawn capture worker")]
    Spawn(#[source] std::io::Error),

    #[error("capture worker panicked")]
    WorkerPanicked,
}

impl CaptureError {
    pub fn kind(&self) -> &'static str {
        match self {
            CaptureError::OpenFailed { .. } => "OpenFailed",
            CaptureError::FilterRejected { .. } => "FilterRejected",
            CaptureError::Spawn(_) => "Spawn",
            CaptureError::WorkerPanicked => "WorkerPanicked",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "Read",
            ConfigError::Parse { .. } => "Parse",
        }
    }
}
