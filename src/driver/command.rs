//! Thin seam over OS process invocation.
//!
//! The installer launch and the read-only version queries (`reg`, `powershell`)
//! go through [`CommandRunner`] so the lifecycle can be exercised without a
//! Windows host.

use std::ffi::OsStr;
use std::io;
use std::process::Command;

/// Result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    /// Human-readable exit status, e.g. `exit code: 2`.
    pub status: String,
    pub stdout: String,
}

pub trait CommandRunner: Send + Sync {
    /// Run `program` to completion and capture its stdout. No timeout is applied.
    fn run(&self, program: &OsStr, args: &[&str]) -> io::Result<CommandOutput>;
}

/// Runs commands on the host with `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &OsStr, args: &[&str]) -> io::Result<CommandOutput> {
        let mut cmd = Command::new(program);
        cmd.args(args);

        #[cfg(target_os = "windows")]
        {
            use std::os::windows::process::CommandExt;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        let output = cmd.output()?;
        Ok(CommandOutput {
            success: output.status.success(),
            status: output.status.to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}
