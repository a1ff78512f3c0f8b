//! Silent Npcap installation from the bundled installer payload.
//!
//! The payload is written to the temp directory, run with silent/WinPcap-compatible
//! flags, deleted, and the install is then verified by polling the presence probe.

use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config;
use crate::driver::command::CommandRunner;
use crate::driver::probe::DriverProbe;
use crate::driver::settle::{self, SettlePolicy};
use crate::error::InstallError;

/// Source of the installer executable bytes.
pub trait InstallerPayload: Send + Sync {
    fn read(&self) -> io::Result<Cow<'_, [u8]>>;
}

/// Installer compiled into the binary (see `build.rs`).
#[cfg(embedded_installer)]
pub struct EmbeddedPayload;

#[cfg(embedded_installer)]
impl InstallerPayload for EmbeddedPayload {
    fn read(&self) -> io::Result<Cow<'_, [u8]>> {
        static BYTES: &[u8] = include_bytes!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/resources/npcap-installer.exe"
        ));
        Ok(Cow::Borrowed(BYTES))
    }
}

/// Installer shipped as a separate file.
#[derive(Debug, Clone)]
pub struct FilePayload {
    path: PathBuf,
}

impl FilePayload {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl InstallerPayload for FilePayload {
    fn read(&self) -> io::Result<Cow<'_, [u8]>> {
        std::fs::read(&self.path).map(Cow::Owned)
    }
}

/// Removes the extracted installer when dropped, on every exit path.
struct TempInstaller {
    path: PathBuf,
}

impl TempInstaller {
    fn write(dir: &Path, bytes: &[u8]) -> Result<Self, InstallError> {
        let path = dir.join(config::INSTALLER_FILE_NAME);
        tracing::debug!("Creating temporary installer: {}", path.display());
        let write_failed = |source| InstallError::WriteFailed {
            path: path.clone(),
            source,
        };
        std::fs::write(&path, bytes).map_err(write_failed)?;
        let installer = Self { path: path.clone() };
        mark_executable(&installer.path).map_err(write_failed)?;
        Ok(installer)
    }
}

impl Drop for TempInstaller {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!("Failed to remove temporary installer {}: {e}", self.path.display());
        }
    }
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

pub struct DriverInstaller {
    payload: Box<dyn InstallerPayload>,
    runner: Arc<dyn CommandRunner>,
    probe: DriverProbe,
    temp_dir: PathBuf,
    settle: SettlePolicy,
}

impl DriverInstaller {
    pub fn new(
        payload: Box<dyn InstallerPayload>,
        runner: Arc<dyn CommandRunner>,
        probe: DriverProbe,
    ) -> Self {
        Self {
            payload,
            runner,
            probe,
            temp_dir: std::env::temp_dir(),
            settle: config::install_settle_policy(),
        }
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    pub fn with_settle(mut self, settle: SettlePolicy) -> Self {
        self.settle = settle;
        self
    }

    /// Install the driver and verify it is detected afterwards.
    ///
    /// Does not check whether the driver is already present; callers short-circuit.
    pub fn install(&self) -> Result<(), InstallError> {
        tracing::debug!("Extracting Npcap installer...");
        let bytes = self.payload.read().map_err(InstallError::PayloadRead)?;

        let installer = TempInstaller::write(&self.temp_dir, &bytes)?;

        tracing::info!("Launching Npcap installer...");
        let output = self
            .runner
            .run(installer.path.as_os_str(), config::INSTALLER_ARGS)
            .map_err(|e| InstallError::ProcessFailed(e.to_string()))?;
        if !output.success {
            return Err(InstallError::ProcessFailed(output.status));
        }

        drop(installer);

        tracing::debug!("Waiting for the driver to register...");
        if settle::poll_until(&self.settle, || self.probe.is_installed().then_some(())).is_none() {
            return Err(InstallError::VerificationFailed);
        }

        tracing::info!("Npcap installed successfully");
        Ok(())
    }
}
