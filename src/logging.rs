//! Log level selection and `tracing-subscriber` initialization.
//!
//! Built once from the command line and applied by [`init`] before any component logs.
//! `RUST_LOG`, when set, takes precedence over the command-line level.

use std::fmt;

/// Verbosity, most verbose first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Case-insensitive; anything unrecognized falls back to `Info`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "TRACE" => LogLevel::Trace,
            "DEBUG" => LogLevel::Debug,
            "INFO" => LogLevel::Info,
            "WARN" | "WARNING" => LogLevel::Warn,
            "ERROR" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LogLevel,
    /// Debug mode: at least `Debug` verbosity regardless of `level`.
    pub debug: bool,
}

impl LogSettings {
    pub fn new(level: LogLevel, debug: bool) -> Self {
        Self { level, debug }
    }

    pub fn effective_level(&self) -> LogLevel {
        if self.debug {
            self.level.min(LogLevel::Debug)
        } else {
            self.level
        }
    }

    /// `EnvFilter` directive scoped to this crate.
    pub fn directive(&self) -> String {
        format!("{}={}", env!("CARGO_CRATE_NAME"), self.effective_level())
    }
}

pub fn init(settings: &LogSettings) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| settings.directive().into()),
        )
        .init();
    tracing::debug!("Log level set to {}", settings.effective_level());
}
