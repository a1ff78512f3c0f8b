//! Installed-driver version resolution.
//!
//! Sources are tried in order and the first one yielding a version wins:
//! registry value, then the file version of each known installed binary. When
//! all of them fail but the driver is detected, the minimum required version is
//! assumed rather than failing startup.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config;
use crate::driver::command::CommandRunner;
use crate::driver::installer::DriverInstaller;
use crate::driver::probe::DriverProbe;
use crate::driver::settle::{self, SettlePolicy};
use crate::driver::version::DriverVersion;
use crate::error::ResolveError;

/// One read-only way of asking the host for the driver version.
pub trait VersionSource: Send + Sync {
    fn describe(&self) -> String;

    /// `None` on any failure: missing tool, non-zero exit, or no version in the output.
    fn query(&self, runner: &dyn CommandRunner) -> Option<DriverVersion>;
}

/// `reg query <key> /v <value>`.
#[derive(Debug, Clone)]
pub struct RegistryVersion {
    pub key: String,
    pub value: String,
}

impl VersionSource for RegistryVersion {
    fn describe(&self) -> String {
        format!("registry {}\\{}", self.key, self.value)
    }

    fn query(&self, runner: &dyn CommandRunner) -> Option<DriverVersion> {
        let output = runner
            .run(OsStr::new("reg"), &["query", &self.key, "/v", &self.value])
            .ok()?;
        if !output.success {
            return None;
        }
        DriverVersion::find_in(&output.stdout)
    }
}

/// File version metadata of an installed binary, read through PowerShell.
#[derive(Debug, Clone)]
pub struct FileVersion {
    pub path: PathBuf,
}

impl VersionSource for FileVersion {
    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    fn query(&self, runner: &dyn CommandRunner) -> Option<DriverVersion> {
        let script = format!(
            "(Get-Item '{}').VersionInfo.FileVersion",
            self.path.display()
        );
        let output = runner
            .run(OsStr::new("powershell"), &["-NoProfile", "-Command", &script])
            .ok()?;
        if !output.success {
            return None;
        }
        DriverVersion::find_in(output.stdout.trim())
    }
}

/// Registry first, then each known installed file.
pub fn default_sources() -> Vec<Box<dyn VersionSource>> {
    let mut sources: Vec<Box<dyn VersionSource>> = vec![Box::new(RegistryVersion {
        key: config::DRIVER_REGISTRY_KEY.to_string(),
        value: config::DRIVER_REGISTRY_VALUE.to_string(),
    })];
    sources.extend(config::DRIVER_VERSION_FILES.iter().map(|path| {
        Box::new(FileVersion {
            path: PathBuf::from(path),
        }) as Box<dyn VersionSource>
    }));
    sources
}

pub struct VersionResolver {
    probe: DriverProbe,
    installer: DriverInstaller,
    runner: Arc<dyn CommandRunner>,
    sources: Vec<Box<dyn VersionSource>>,
    fallback: DriverVersion,
    post_install_settle: SettlePolicy,
}

impl VersionResolver {
    pub fn new(
        probe: DriverProbe,
        installer: DriverInstaller,
        runner: Arc<dyn CommandRunner>,
        fallback: DriverVersion,
    ) -> Self {
        Self {
            probe,
            installer,
            runner,
            sources: default_sources(),
            fallback,
            post_install_settle: config::post_install_settle_policy(),
        }
    }

    pub fn with_sources(mut self, sources: Vec<Box<dyn VersionSource>>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_post_install_settle(mut self, settle: SettlePolicy) -> Self {
        self.post_install_settle = settle;
        self
    }

    /// Resolve the installed version, installing the driver first if it is absent.
    pub fn resolve(&self) -> Result<DriverVersion, ResolveError> {
        tracing::debug!("Resolving Npcap version...");

        let found = if self.probe.is_installed() {
            self.query_sources()
        } else {
            tracing::info!("Npcap not installed, installing...");
            self.installer.install()?;
            tracing::debug!("Waiting for the installed driver to report its version...");
            settle::poll_until(&self.post_install_settle, || self.query_sources())
        };

        if let Some(version) = found {
            return Ok(version);
        }

        if self.probe.is_installed() {
            tracing::warn!(
                "Unable to read the Npcap version but the driver is installed, assuming {}",
                self.fallback
            );
            return Ok(self.fallback);
        }

        Err(ResolveError::Unresolvable)
    }

    fn query_sources(&self) -> Option<DriverVersion> {
        self.sources.iter().find_map(|source| {
            tracing::debug!("Querying Npcap version from {}", source.describe());
            let version = source.query(self.runner.as_ref());
            if let Some(v) = version {
                tracing::debug!("Got Npcap version {v} from {}", source.describe());
            }
            version
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::command::CommandOutput;
    use crate::driver::testing::{FailingPayload, FakeRunner, StaticPayload};
    use std::io;

    const REQUIRED: DriverVersion = DriverVersion::new(1, 60);

    fn ok(stdout: &str) -> Result<CommandOutput, io::ErrorKind> {
        Ok(CommandOutput {
            success: true,
            status: "exit code: 0".into(),
            stdout: stdout.into(),
        })
    }

    fn failed() -> Result<CommandOutput, io::ErrorKind> {
        Ok(CommandOutput {
            success: false,
            status: "exit code: 1".into(),
            stdout: String::new(),
        })
    }

    fn resolver(
        runner: Arc<FakeRunner>,
        probe: DriverProbe,
        temp: &std::path::Path,
    ) -> VersionResolver {
        let installer = DriverInstaller::new(
            Box::new(StaticPayload(b"MZ".to_vec())),
            Arc::clone(&runner) as Arc<dyn CommandRunner>,
            probe.clone(),
        )
        .with_temp_dir(temp)
        .with_settle(SettlePolicy::immediate());
        VersionResolver::new(probe, installer, runner, REQUIRED)
            .with_post_install_settle(SettlePolicy::immediate())
    }

    fn installed_probe(temp: &std::path::Path) -> DriverProbe {
        let dir = temp.join("Npcap");
        std::fs::create_dir_all(&dir).unwrap();
        DriverProbe::new(vec![dir])
    }

    #[test]
    fn test_registry_version_wins() {
        let temp = tempfile::tempdir().unwrap();
        let runner = Arc::new(
            FakeRunner::default()
                .respond("reg query", ok("    Version    REG_SZ    1.79\r\n"))
                .respond("NPFInstall.exe", ok("1.55.0.0")),
        );
        let version = resolver(Arc::clone(&runner), installed_probe(temp.path()), temp.path())
            .resolve()
            .unwrap();

        assert_eq!(version, DriverVersion::new(1, 79));
        assert_eq!(runner.calls().len(), 1);
        assert_eq!(runner.calls()[0].program, "reg");
        assert_eq!(
            runner.calls()[0].args,
            vec!["query", r"HKLM\SOFTWARE\Npcap", "/v", "Version"]
        );
    }

    #[test]
    fn test_falls_back_to_file_version_in_order() {
        let temp = tempfile::tempdir().unwrap();
        let runner = Arc::new(
            FakeRunner::default()
                .respond("reg query", failed())
                .respond(r"System32\Npcap\NPFInstall.exe", Err(io::ErrorKind::NotFound))
                .respond(r"System32\Npcap\npcap.dll", ok("1.72.0.0\r\n"))
                .respond(r"Program Files\Npcap\NPFInstall.exe", ok("1.99")),
        );
        let version = resolver(Arc::clone(&runner), installed_probe(temp.path()), temp.path())
            .resolve()
            .unwrap();

        assert_eq!(version, DriverVersion::new(1, 72));
        let programs: Vec<_> = runner.calls().iter().map(|c| c.program.clone()).collect();
        assert_eq!(programs, vec!["reg", "powershell", "powershell"]);
        assert!(runner.calls()[2].args[2].contains("npcap.dll"));
    }

    #[test]
    fn test_malformed_outputs_are_skipped() {
        let temp = tempfile::tempdir().unwrap();
        let runner = Arc::new(
            FakeRunner::default()
                .respond("reg query", ok("Version REG_SZ unknown"))
                .respond("NPFInstall.exe", ok(""))
                .respond("npcap.dll", ok("garbage")),
        );
        // Every source fails, driver present: minimum version is assumed.
        let version = resolver(Arc::clone(&runner), installed_probe(temp.path()), temp.path())
            .resolve()
            .unwrap();
        assert_eq!(version, REQUIRED);
        assert_eq!(runner.calls().len(), 1 + config::DRIVER_VERSION_FILES.len());
    }

    #[test]
    fn test_install_that_never_registers_is_install_error() {
        let temp = tempfile::tempdir().unwrap();
        let runner = Arc::new(
            FakeRunner::default()
                .respond(config::INSTALLER_FILE_NAME, ok(""))
                .respond("reg query", failed())
                .respond("powershell", failed()),
        );
        let probe = DriverProbe::new(vec![temp.path().join("Npcap")]);
        let sources: Vec<Box<dyn VersionSource>> = Vec::new();
        let err = resolver(Arc::clone(&runner), probe.clone(), temp.path())
            .with_sources(sources)
            .resolve()
            .unwrap_err();
        // The installer ran but the driver never appeared.
        assert_eq!(err.kind(), "Install");
        assert!(!probe.is_installed());
    }

    #[test]
    fn test_installs_when_missing_then_resolves() {
        let temp = tempfile::tempdir().unwrap();
        let driver_dir = temp.path().join("Npcap");
        let runner = Arc::new(
            FakeRunner::default()
                .on_run_create_dir(driver_dir.clone())
                .respond("reg query", ok("Version REG_SZ 1.80")),
        );
        let version = resolver(
            Arc::clone(&runner),
            DriverProbe::new(vec![driver_dir]),
            temp.path(),
        )
        .resolve()
        .unwrap();

        assert_eq!(version, DriverVersion::new(1, 80));
        let calls = runner.calls();
        assert!(calls[0].program.ends_with(config::INSTALLER_FILE_NAME));
        assert_eq!(calls[1].program, "reg");
    }

    #[test]
    fn test_install_payload_failure_surfaces_as_install_error() {
        let temp = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::default());
        let probe = DriverProbe::new(vec![temp.path().join("Npcap")]);
        let installer = DriverInstaller::new(
            Box::new(FailingPayload),
            Arc::clone(&runner) as Arc<dyn CommandRunner>,
            probe.clone(),
        )
        .with_temp_dir(temp.path())
        .with_settle(SettlePolicy::immediate());
        let err = VersionResolver::new(
            probe,
            installer,
            Arc::clone(&runner) as Arc<dyn CommandRunner>,
            REQUIRED,
        )
        .resolve()
        .unwrap_err();

        match err {
            ResolveError::Install(inner) => assert_eq!(inner.kind(), "PayloadRead"),
            other => panic!("expected install error, got {other:?}"),
        }
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_driver_vanishing_before_fallback_is_unresolvable() {
        let temp = tempfile::tempdir().unwrap();
        let driver_dir = temp.path().join("Npcap");
        let probe = installed_probe(temp.path());
        let runner = Arc::new(FakeRunner::default().on_run_remove_dir(driver_dir));
        let sources: Vec<Box<dyn VersionSource>> = vec![Box::new(RegistryVersion {
            key: config::DRIVER_REGISTRY_KEY.into(),
            value: config::DRIVER_REGISTRY_VALUE.into(),
        })];
        let err = resolver(Arc::clone(&runner), probe, temp.path())
            .with_sources(sources)
            .resolve()
            .unwrap_err();
        assert_eq!(err.kind(), "Unresolvable");
    }

    #[test]
    fn test_default_sources_order() {
        let described: Vec<String> = default_sources().iter().map(|s| s.describe()).collect();
        assert_eq!(described.len(), 5);
        assert!(described[0].starts_with("registry"));
        assert!(described[1].contains(r"System32\Npcap\NPFInstall.exe"));
        assert!(described[2].contains("npcap.dll"));
    }
}
