//! Npcap driver lifecycle: presence probe, silent install, version resolution, and
//! the minimum-version gate that runs before any capture is attempted.
//!
//! - [`probe`]: install-directory presence check
//! - [`installer`]: payload extraction and silent install
//! - [`resolver`]: version lookup with a default fallback
//! - [`version`]: `major.minor` parsing and compatibility
//! - [`settle`]: bounded polling for post-install convergence
//! - [`command`]: OS process invocation seam

pub mod command;
pub mod installer;
pub mod probe;
pub mod resolver;
pub mod settle;
pub mod version;

use std::path::PathBuf;
use std::sync::Arc;

pub use command::{CommandOutput, CommandRunner, SystemRunner};
pub use installer::{DriverInstaller, FilePayload, InstallerPayload};
pub use probe::DriverProbe;
pub use resolver::VersionResolver;
pub use version::{is_compatible, DriverVersion};

use crate::config::{self, Config};
use crate::error::DriverError;

/// Resolve the installed driver version (installing if needed) and check it against `required`.
pub fn ensure_ready(
    resolver: &VersionResolver,
    required: DriverVersion,
) -> Result<DriverVersion, DriverError> {
    tracing::debug!("Checking Npcap dependency...");
    let current = resolver.resolve()?;

    if !current.satisfies(&required) {
        return Err(DriverError::Incompatible {
            current: current.to_string(),
            required: required.to_string(),
        });
    }

    tracing::info!("Npcap dependency check passed (version {current})");
    Ok(current)
}

/// Installer payload for this build: embedded when available, otherwise read from disk.
pub fn default_payload(config: Option<&Config>) -> Box<dyn InstallerPayload> {
    #[cfg(embedded_installer)]
    {
        let _ = config;
        Box::new(installer::EmbeddedPayload)
    }

    #[cfg(not(embedded_installer))]
    {
        let path = config
            .and_then(|c| c.installer_path.clone())
            .unwrap_or_else(default_installer_path);
        Box::new(FilePayload::new(path))
    }
}

#[cfg(not(embedded_installer))]
fn default_installer_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(config::DEFAULT_INSTALLER_PATH)))
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_INSTALLER_PATH))
}

/// The production resolver: default probe dirs, host commands, minimum version fallback.
pub fn system_resolver(payload: Box<dyn InstallerPayload>) -> VersionResolver {
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let probe = DriverProbe::default();
    let installer = DriverInstaller::new(payload, Arc::clone(&runner), probe.clone());
    let fallback = DriverVersion::parse(config::MIN_REQUIRED_VERSION)
        .unwrap_or(DriverVersion::new(1, 60));
    VersionResolver::new(probe, installer, runner, fallback)
}


#[cfg(test)]
mod tests {
    use super::testing::FakeRunner;
    use super::*;
    use crate::driver::settle::SettlePolicy;
    use crate::driver::testing::StaticPayload;

    fn resolver_reporting(stdout: &str, temp: &std::path::Path) -> VersionResolver {
        let dir = temp.join("Npcap");
        std::fs::create_dir_all(&dir).unwrap();
        let probe = DriverProbe::new(vec![dir]);
        let runner: Arc<dyn CommandRunner> = Arc::new(FakeRunner::default().respond(
            "reg query",
            Ok(CommandOutput {
                success: true,
                status: "exit code: 0".into(),
                stdout: stdout.into(),
            }),
        ));
        let installer = DriverInstaller::new(
            Box::new(StaticPayload(Vec::new())),
            Arc::clone(&runner),
            probe.clone(),
        )
        .with_temp_dir(temp)
        .with_settle(SettlePolicy::immediate());
        VersionResolver::new(probe, installer, runner, DriverVersion::new(1, 60))
            .with_post_install_settle(SettlePolicy::immediate())
    }

    #[test]
    fn test_ensure_ready_accepts_newer_driver() {
        let temp = tempfile::tempdir().unwrap();
        let resolver = resolver_reporting("Version REG_SZ 1.79", temp.path());
        let version = ensure_ready(&resolver, DriverVersion::new(1, 60)).unwrap();
        assert_eq!(version, DriverVersion::new(1, 79));
    }

    #[test]
    fn test_ensure_ready_rejects_older_driver() {
        let temp = tempfile::tempdir().unwrap();
        let resolver = resolver_reporting("Version REG_SZ 1.55", temp.path());
        let err = ensure_ready(&resolver, DriverVersion::new(1, 60)).unwrap_err();
        assert_eq!(err.kind(), "Incompatible");
        assert!(err.to_string().contains("1.55"));
    }

    #[test]
    fn test_ensure_ready_compares_minor_numerically() {
        let temp = tempfile::tempdir().unwrap();
        let resolver = resolver_reporting("Version REG_SZ 1.100", temp.path());
        let version = ensure_ready(&resolver, DriverVersion::new(1, 60)).unwrap();
        assert_eq!(version, DriverVersion::new(1, 100));
    }

    #[test]
    fn test_ensure_ready_accepts_fallback_version() {
        let temp = tempfile::tempdir().unwrap();
        // No version anywhere, driver present: the fallback equals the requirement.
        let resolver = resolver_reporting("", temp.path());
        let version = ensure_ready(&resolver, DriverVersion::new(1, 60)).unwrap();
        assert_eq!(version, DriverVersion::new(1, 60));
    }

    #[test]
    fn test_file_payload_from_config_path() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("npcap.exe");
        std::fs::write(&path, b"MZ").unwrap();
        let payload = FilePayload::new(&path);
        assert_eq!(payload.read().unwrap().as_ref(), b"MZ");
    }
}
