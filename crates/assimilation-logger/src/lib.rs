// SPDX-License-Identifier: GPL-3.0-or-later

//! Assimilation Logger
//!
//! Aggregates and reformats the structured JSON log lines emitted by
//! Assimilation Project nanoprobes and the CMA. Carries no protocol logic of
//! its own; it is a pure log sink.
//!
//! # Features
//!
//! - **Collection**: line-delimited JSON on stdin, or one JSON object per
//!   UDP datagram
//! - **Multiple formats**: JSON (ELK-ready), plain text, syslog (RFC 5424)
//! - **Flexible output**: file (with rotation), stdout, syslog daemon
//! - **Filtering**: by level, node id, component, peer
//!
//! # Example
//!
//! ```rust,ignore
//! use assimilation_logger::{LogCollector, LogConfig, OutputFormat};
//!
//! let config = LogConfig::builder()
//!     .format(OutputFormat::Json)
//!     .output_file("logs/assimilation.log")
//!     .level(LogLevel::Debug)
//!     .build();
//!
//! let mut collector = LogCollector::new(config)?;
//! collector.run()?;
//! ```

mod collector;
mod filter;
mod formatter;
mod output;

pub use collector::{CollectorStats, InputSource, LogCollector, LogEntry, LogSource, StopHandle};
pub use filter::{LogFilter, LogLevel};
pub use formatter::{LogFormatter, OutputFormat};
pub use output::{FileRotation, LogOutput, OutputConfig};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Logger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Output format.
    pub format: OutputFormat,
    /// Output configuration.
    pub output: OutputConfig,
    /// Log filter settings.
    pub filter: LogFilter,
    /// Where incoming JSON log lines come from.
    pub source: InputSource,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            output: OutputConfig::Stdout,
            filter: LogFilter::default(),
            source: InputSource::Stdin,
        }
    }
}

impl LogConfig {
    /// Create a new builder.
    pub fn builder() -> LogConfigBuilder {
        LogConfigBuilder::default()
    }
}

/// Builder for `LogConfig`.
#[derive(Debug, Default)]
pub struct LogConfigBuilder {
    format: Option<OutputFormat>,
    output: Option<OutputConfig>,
    filter: Option<LogFilter>,
    source: Option<InputSource>,
}

impl LogConfigBuilder {
    /// Set output format.
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Set output to file with no rotation.
    pub fn output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(OutputConfig::File {
            path: path.into(),
            rotation: None,
        });
        self
    }

    /// Set output to file with rotation.
    pub fn output_file_rotated(mut self, path: impl Into<PathBuf>, rotation: FileRotation) -> Self {
        self.output = Some(OutputConfig::File {
            path: path.into(),
            rotation: Some(rotation),
        });
        self
    }

    /// Set output to stdout.
    pub fn output_stdout(mut self) -> Self {
        self.output = Some(OutputConfig::Stdout);
        self
    }

    /// Set output to syslog.
    pub fn output_syslog(mut self, facility: SyslogFacility) -> Self {
        self.output = Some(OutputConfig::Syslog { facility });
        self
    }

    /// Set minimum log level.
    pub fn level(mut self, level: LogLevel) -> Self {
        let mut filter = self.filter.take().unwrap_or_default();
        filter.min_level = level;
        self.filter = Some(filter);
        self
    }

    /// Set node id filter (glob pattern).
    pub fn node_filter(mut self, pattern: impl Into<String>) -> Self {
        let mut filter = self.filter.take().unwrap_or_default();
        filter.node_pattern = Some(pattern.into());
        self.filter = Some(filter);
        self
    }

    /// Set component filter (glob pattern).
    pub fn component_filter(mut self, pattern: impl Into<String>) -> Self {
        let mut filter = self.filter.take().unwrap_or_default();
        filter.component_pattern = Some(pattern.into());
        self.filter = Some(filter);
        self
    }

    /// Read line-delimited JSON from stdin.
    pub fn source_stdin(mut self) -> Self {
        self.source = Some(InputSource::Stdin);
        self
    }

    /// Read one JSON object per UDP datagram bound at `bind_addr`.
    pub fn source_udp(mut self, bind_addr: impl Into<String>) -> Self {
        self.source = Some(InputSource::Udp {
            bind_addr: bind_addr.into(),
        });
        self
    }

    /// Build the configuration.
    pub fn build(self) -> LogConfig {
        LogConfig {
            format: self.format.unwrap_or(OutputFormat::Text),
            output: self.output.unwrap_or(OutputConfig::Stdout),
            filter: self.filter.unwrap_or_default(),
            source: self.source.unwrap_or(InputSource::Stdin),
        }
    }
}

/// Syslog facility (RFC 5424).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SyslogFacility {
    Kern,
    User,
    Mail,
    Daemon,
    Auth,
    Syslog,
    Lpr,
    News,
    Uucp,
    Cron,
    #[default]
    Local0,
    Local1,
    Local2,
    Local3,
    Local4,
    Local5,
    Local6,
    Local7,
}

impl SyslogFacility {
    /// Get the numeric facility code.
    pub fn code(&self) -> u8 {
        match self {
            Self::Kern => 0,
            Self::User => 1,
            Self::Mail => 2,
            Self::Daemon => 3,
            Self::Auth => 4,
            Self::Syslog => 5,
            Self::Lpr => 6,
            Self::News => 7,
            Self::Uucp => 8,
            Self::Cron => 9,
            Self::Local0 => 16,
            Self::Local1 => 17,
            Self::Local2 => 18,
            Self::Local3 => 19,
            Self::Local4 => 20,
            Self::Local5 => 21,
            Self::Local6 => 22,
            Self::Local7 => 23,
        }
    }
}
