// SPDX-License-Identifier: GPL-3.0-or-later

//! Assimilation Logger CLI
//!
//! Aggregate and reformat the structured JSON log lines emitted by
//! Assimilation Project nanoprobes and the CMA.
//!
//! # Usage
//!
//! ```bash
//! # Aggregate stdin (e.g. piped from a nanoprobe's own log output)
//! nanoprobe 2>&1 | assimilation-logger
//!
//! # Listen for log datagrams on a UDP socket, write JSON with rotation
//! assimilation-logger --source udp --bind 0.0.0.0:5014 \
//!     --output logs/assimilation.log --format json --rotate 10M
//!
//! # Filter by level and component
//! assimilation-logger --level warn --component heartbeat
//!
//! # Output to syslog
//! assimilation-logger --syslog --facility local0
//! ```

use anyhow::{Context, Result};
use assimilation_logger::{
    FileRotation, InputSource, LogCollector, LogConfig, LogFilter, LogLevel, OutputConfig,
    OutputFormat, StopHandle, SyslogFacility,
};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "assimilation-logger")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Aggregates and reformats logs from Assimilation Project nanoprobes")]
#[command(long_about = None)]
struct Cli {
    /// Where to read JSON log lines from.
    #[arg(short, long, value_enum, default_value = "stdin")]
    source: SourceArg,

    /// Bind address for `--source udp`.
    #[arg(long, default_value = "0.0.0.0:5014")]
    bind: String,

    /// Output file path.
    #[arg(short, long)]
    output: Option<std::path::PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value = "text")]
    format: FormatArg,

    /// Minimum log level.
    #[arg(short, long, value_enum, default_value = "info")]
    level: LevelArg,

    /// Enable file rotation with max size (e.g., 10M, 100K, 1G).
    #[arg(long)]
    rotate: Option<String>,

    /// Maximum number of rotated files to keep.
    #[arg(long, default_value = "5")]
    rotate_keep: u32,

    /// Output to syslog instead of file/stdout.
    #[arg(long)]
    syslog: bool,

    /// Syslog facility (when --syslog is used).
    #[arg(long, value_enum, default_value = "local0")]
    facility: FacilityArg,

    /// Filter by node id glob pattern.
    #[arg(long)]
    node: Option<String>,

    /// Filter by component glob pattern.
    #[arg(long)]
    component: Option<String>,

    /// Use colors in text output.
    #[arg(long, default_value = "true")]
    colors: bool,

    /// Verbose mode (show internal logs).
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SourceArg {
    Stdin,
    Udp,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Text,
    Json,
    JsonLines,
    Syslog,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
            FormatArg::JsonLines => OutputFormat::JsonLines,
            FormatArg::Syslog => OutputFormat::Syslog,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LevelArg {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl From<LevelArg> for LogLevel {
    fn from(arg: LevelArg) -> Self {
        match arg {
            LevelArg::Debug => LogLevel::Debug,
            LevelArg::Info => LogLevel::Info,
            LevelArg::Warn => LogLevel::Warn,
            LevelArg::Error => LogLevel::Error,
            LevelArg::Fatal => LogLevel::Fatal,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FacilityArg {
    Kern,
    User,
    Daemon,
    Auth,
    Syslog,
    Local0,
    Local1,
    Local2,
    Local3,
    Local4,
    Local5,
    Local6,
    Local7,
}

impl From<FacilityArg> for SyslogFacility {
    fn from(arg: FacilityArg) -> Self {
        match arg {
            FacilityArg::Kern => SyslogFacility::Kern,
            FacilityArg::User => SyslogFacility::User,
            FacilityArg::Daemon => SyslogFacility::Daemon,
            FacilityArg::Auth => SyslogFacility::Auth,
            FacilityArg::Syslog => SyslogFacility::Syslog,
            FacilityArg::Local0 => SyslogFacility::Local0,
            FacilityArg::Local1 => SyslogFacility::Local1,
            FacilityArg::Local2 => SyslogFacility::Local2,
            FacilityArg::Local3 => SyslogFacility::Local3,
            FacilityArg::Local4 => SyslogFacility::Local4,
            FacilityArg::Local5 => SyslogFacility::Local5,
            FacilityArg::Local6 => SyslogFacility::Local6,
            FacilityArg::Local7 => SyslogFacility::Local7,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("assimilation_logger=debug")
    } else {
        EnvFilter::new("assimilation_logger=info")
    };
    fmt().with_env_filter(filter).with_target(false).init();

    let config = build_config(&cli)?;

    tracing::info!(
        source = ?cli.source,
        format = ?cli.format,
        level = ?cli.level,
        "starting assimilation-logger"
    );

    let mut collector = LogCollector::new(config).context("failed to create log collector")?;

    let stop_handle = collector.stop_handle();
    ctrlc_handler(stop_handle);

    collector.run().context("log collector error")?;

    let stats = collector.stats();
    tracing::info!(
        logs_received = stats.logs_received,
        logs_written = stats.logs_written,
        logs_filtered = stats.logs_filtered,
        parse_errors = stats.parse_errors,
        "logger shutdown complete"
    );

    Ok(())
}

fn build_config(cli: &Cli) -> Result<LogConfig> {
    let output = if cli.syslog {
        OutputConfig::Syslog {
            facility: cli.facility.into(),
        }
    } else if let Some(ref path) = cli.output {
        let rotation = cli.rotate.as_ref().map(|size_str| FileRotation {
            max_size: parse_size(size_str).unwrap_or(10 * 1024 * 1024),
            max_files: cli.rotate_keep,
            compress: false,
        });
        OutputConfig::File {
            path: path.clone(),
            rotation,
        }
    } else {
        OutputConfig::Stdout
    };

    let mut filter = LogFilter::min_level(cli.level.into());
    filter.node_pattern = cli.node.clone();
    filter.component_pattern = cli.component.clone();

    let source = match cli.source {
        SourceArg::Stdin => InputSource::Stdin,
        SourceArg::Udp => InputSource::Udp {
            bind_addr: cli.bind.clone(),
        },
    };

    Ok(LogConfig {
        format: cli.format.into(),
        output,
        filter,
        source,
    })
}

/// Parse size string like "10M", "100K", "1G".
fn parse_size(s: &str) -> Option<u64> {
    let s = s.trim().to_uppercase();

    if let Some(num) = s.strip_suffix('K') {
        num.parse::<u64>().ok().map(|n| n * 1024)
    } else if let Some(num) = s.strip_suffix('M') {
        num.parse::<u64>().ok().map(|n| n * 1024 * 1024)
    } else if let Some(num) = s.strip_suffix('G') {
        num.parse::<u64>().ok().map(|n| n * 1024 * 1024 * 1024)
    } else {
        s.parse::<u64>().ok()
    }
}

/// Setup Ctrl+C handler.
fn ctrlc_handler(stop_handle: StopHandle) {
    let _ = ctrlc::set_handler(move || {
        tracing::info!("received Ctrl+C, shutting down");
        stop_handle.stop();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_size_handles_suffixes() {
        assert_eq!(parse_size("100"), Some(100));
        assert_eq!(parse_size("10K"), Some(10 * 1024));
        assert_eq!(parse_size("10M"), Some(10 * 1024 * 1024));
        assert_eq!(parse_size("1G"), Some(1024 * 1024 * 1024));
        assert_eq!(parse_size("10m"), Some(10 * 1024 * 1024));
        assert_eq!(parse_size("invalid"), None);
    }
}
