//! `config.json` loading and the fixed values behind driver setup and capture.
//!
//! Npcap install paths and post-install settle timings sit alongside the
//! user-facing config.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::driver::settle::SettlePolicy;
use crate::error::ConfigError;

/// Default location of the configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Per-packet snapshot length handed to the capture handle (bytes).
pub const SNAPLEN: i32 = 1600;

/// Minimum Npcap version the capture path has been validated against.
pub const MIN_REQUIRED_VERSION: &str = "1.60";

/// Directories whose presence indicates an Npcap installation.
pub const DRIVER_INSTALL_DIRS: &[&str] = &[
    r"C:\Windows\System32\Npcap",
    r"C:\Program Files\Npcap",
    r"C:\Program Files (x86)\Npcap",
];

/// Registry key and value queried first for the installed Npcap version.
pub const DRIVER_REGISTRY_KEY: &str = r"HKLM\SOFTWARE\Npcap";
pub const DRIVER_REGISTRY_VALUE: &str = "Version";

/// Installed files whose embedded version metadata is queried when the registry has no answer.
pub const DRIVER_VERSION_FILES: &[&str] = &[
    r"C:\Windows\System32\Npcap\NPFInstall.exe",
    r"C:\Windows\System32\Npcap\npcap.dll",
    r"C:\Program Files\Npcap\NPFInstall.exe",
    r"C:\Program Files (x86)\Npcap\NPFInstall.exe",
];

/// File name of the installer once extracted to the temp directory.
pub const INSTALLER_FILE_NAME: &str = "npcap-installer.exe";

/// Silent install, WinPcap API-compatible mode.
pub const INSTALLER_ARGS: &[&str] = &["/S", "/winpcap_mode=yes"];

/// Installer location used when the binary was built without an embedded payload.
pub const DEFAULT_INSTALLER_PATH: &str = "resources/npcap-installer.exe";

/// Worst-case wait for the driver directories to appear after the installer exits (seconds).
pub const INSTALL_SETTLE_SECS: u64 = 10;

/// Worst-case wait for the version sources to answer after a fresh install (seconds).
pub const POST_INSTALL_SETTLE_SECS: u64 = 15;

/// First and largest interval between settle polls (milliseconds).
pub const SETTLE_INITIAL_INTERVAL_MS: u64 = 500;
pub const SETTLE_MAX_INTERVAL_MS: u64 = 4000;

/// Pause after a non-timeout read error before the capture loop retries (milliseconds).
pub const READ_ERROR_BACKOFF_MS: u64 = 100;

pub fn install_settle_policy() -> SettlePolicy {
    SettlePolicy::new(
        Duration::from_secs(INSTALL_SETTLE_SECS),
        Duration::from_millis(SETTLE_INITIAL_INTERVAL_MS),
        Duration::from_millis(SETTLE_MAX_INTERVAL_MS),
    )
}

pub fn post_install_settle_policy() -> SettlePolicy {
    SettlePolicy::new(
        Duration::from_secs(POST_INSTALL_SETTLE_SECS),
        Duration::from_millis(SETTLE_INITIAL_INTERVAL_MS),
        Duration::from_millis(SETTLE_MAX_INTERVAL_MS),
    )
}

/// Contents of `config.json`. Unknown keys are ignored.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Config {
    /// Capture device name, e.g. `\Device\NPF_{GUID}` on Windows.
    pub interface: String,
    /// BPF filter expression installed on the capture handle.
    pub display_filter: String,
    /// Read timeout for the capture handle. Absent means the read blocks until a packet arrives.
    #[serde(default)]
    pub read_timeout_ms: Option<i32>,
    /// Installer location for builds without an embedded payload.
    #[serde(default)]
    pub installer_path: Option<PathBuf>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_config() {
        let cfg = Config::parse(r#"{"interface": "eth0", "display_filter": "tcp port 1935"}"#)
            .unwrap();
        assert_eq!(cfg.interface, "eth0");
        assert_eq!(cfg.display_filter, "tcp port 1935");
        assert_eq!(cfg.read_timeout_ms, None);
        assert_eq!(cfg.installer_path, None);
    }

    #[test]
    fn test_parse_ignores_legacy_tshark_path() {
        let cfg = Config::parse(
            r#"{"interface": "eth0", "display_filter": "tcp", "tshark_path": "C:\\tshark.exe"}"#,
        )
        .unwrap();
        assert_eq!(cfg.interface, "eth0");
    }

    #[test]
    fn test_parse_optional_fields() {
        let cfg = Config::parse(
            r#"{"interface": "eth0", "display_filter": "tcp", "read_timeout_ms": 250,
                "installer_path": "C:\\tools\\npcap.exe"}"#,
        )
        .unwrap();
        assert_eq!(cfg.read_timeout_ms, Some(250));
        assert_eq!(cfg.installer_path, Some(PathBuf::from(r"C:\tools\npcap.exe")));
    }

    #[test]
    fn test_parse_missing_filter_is_error() {
        assert!(Config::parse(r#"{"interface": "eth0"}"#).is_err());
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("absent.json")).unwrap_err();
        assert_eq!(err.kind(), "Read");
    }

    #[test]
    fn test_load_malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert_eq!(err.kind(), "Parse");
    }

    #[test]
    fn test_load_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"interface": "lo", "display_filter": "tcp"}}"#).unwrap();
        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.interface, "lo");
    }

    #[test]
    fn test_settle_policies_keep_worst_case_bounds() {
        assert_eq!(install_settle_policy().timeout, Duration::from_secs(10));
        assert_eq!(post_install_settle_policy().timeout, Duration::from_secs(15));
    }

    /// Zero snaplen or settle intervals would stall capture and polling.
    #[test]
    fn test_capture_and_settle_constants_nonzero() {
        const _: () = assert!(SNAPLEN > 0);
        const _: () = assert!(INSTALL_SETTLE_SECS > 0);
        const _: () = assert!(POST_INSTALL_SETTLE_SECS > 0);
        const _: () = assert!(SETTLE_INITIAL_INTERVAL_MS > 0);
        const _: () = assert!(SETTLE_MAX_INTERVAL_MS >= SETTLE_INITIAL_INTERVAL_MS);
        const _: () = assert!(READ_ERROR_BACKOFF_MS > 0);
    }
}
