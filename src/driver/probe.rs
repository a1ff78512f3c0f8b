//! Npcap presence detection by checking well-known install directories.

use std::path::PathBuf;

use crate::config;

/// Reports whether the capture driver is installed. Recomputed on every call.
#[derive(Debug, Clone)]
pub struct DriverProbe {
    dirs: Vec<PathBuf>,
}

impl DriverProbe {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    pub fn is_installed(&self) -> bool {
        for dir in &self.dirs {
            tracing::debug!("Checking for Npcap at {}", dir.display());
            // Permission and other stat errors count as absent.
            if matches!(dir.try_exists(), Ok(true)) {
                tracing::debug!("Found Npcap at {}", dir.display());
                return true;
            }
        }
        tracing::debug!("Npcap installation not found");
        false
    }
}

impl Default for DriverProbe {
    fn default() -> Self {
        Self::new(config::DRIVER_INSTALL_DIRS.iter().map(PathBuf::from).collect())
    }
}
