//! Tracing subscriber setup for hosts and tools built on the call core
//!
//! Without `RUST_LOG`, the dialer's own targets log at the configured level
//! and every other crate stays at `WARN` or quieter. `RUST_LOG` replaces
//! those defaults entirely.

use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{CallCoreError, CallCoreResult};

/// Target of everything the call core logs
pub const CALL_CORE_TARGET: &str = "dialer_call_core";

/// Stream the subscriber writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogWriter {
    #[default]
    Stdout,
    /// Keeps logs apart from a tool's own report on stdout
    Stderr,
}

/// Configuration for the logging system
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level for the dialer targets
    pub level: Level,
    /// Emit JSON lines instead of text
    pub json: bool,
    /// Include file and line of each event
    pub file_info: bool,
    pub writer: LogWriter,
    /// Targets logged at `level`
    pub targets: Vec<String>,
    pub app_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: Level::INFO,
            json: false,
            file_info: false,
            writer: LogWriter::Stdout,
            targets: vec![CALL_CORE_TARGET.to_string()],
            app_name: "dialer".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn new(level: Level, app_name: impl Into<String>) -> Self {
        LoggingConfig {
            level,
            app_name: app_name.into(),
            ..Default::default()
        }
    }

    pub fn with_json(mut self) -> Self {
        self.json = true;
        self
    }

    pub fn with_file_info(mut self) -> Self {
        self.file_info = true;
        self
    }

    pub fn with_writer(mut self, writer: LogWriter) -> Self {
        self.writer = writer;
        self
    }

    /// Log `target` (usually the host's crate name) at the configured level too
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        let target = target.into();
        if !self.targets.contains(&target) {
            self.targets.push(target);
        }
        self
    }

    /// Filter directives used when `RUST_LOG` is not set
    pub fn filter_directives(&self) -> String {
        let level = self.level.to_string().to_lowercase();
        // Other crates never log more than the dialer itself
        let base = std::cmp::min(self.level, Level::WARN).to_string().to_lowercase();
        let mut directives = vec![base];
        directives.extend(self.targets.iter().map(|t| format!("{}={}", t, level)));
        directives.join(",")
    }
}

/// Install a global subscriber built from `config`
///
/// Fails if the directives do not parse or a global subscriber is already
/// installed.
pub fn setup_logging(config: LoggingConfig) -> CallCoreResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.filter_directives())
            .map_err(|e| CallCoreError::logging(e.to_string()))?,
    };

    let writer = match config.writer {
        LogWriter::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogWriter::Stderr => BoxMakeWriter::new(std::io::stderr),
    };

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_file(config.file_info)
        .with_line_number(config.file_info);

    let installed = if config.json {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };
    installed.map_err(|e| CallCoreError::logging(e.to_string()))?;

    tracing::debug!(app = %config.app_name, json = config.json, writer = ?config.writer, "Logging initialised");
    Ok(())
}

pub fn parse_log_level(level: &str) -> CallCoreResult<Level> {
    Level::from_str(level).map_err(|_| CallCoreError::config(format!("Invalid log level: {}", level)))
}

/// First line a host logs after installing the subscriber
pub fn log_welcome(app_name: &str, version: &str) {
    tracing::info!(app = app_name, version, core = crate::VERSION, "Dialer starting");
}
