// SPDX-License-Identifier: GPL-3.0-or-later

//! Log collector - reads JSON log lines emitted by nanoprobes and the CMA
//! and reformats/dispatches them to the configured output.

use crate::{
    filter::LogFilter,
    formatter::{create_formatter, LogFormatter},
    output::{create_output, LogOutput},
    LogConfig, LogLevel,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead};
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Where a log entry was collected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LogSource {
    /// Read from stdin, one JSON object per line.
    #[default]
    Stdin,
    /// Received as a UDP datagram, one JSON object per packet.
    Udp,
    /// Constructed locally (tests, `LogCollector::process` callers).
    Local,
}

/// Where the collector reads incoming JSON log lines from.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub enum InputSource {
    /// Line-delimited JSON on stdin (the default: `nanoprobe | assimilation-logger`).
    #[default]
    Stdin,
    /// One JSON object per UDP datagram, for nanoprobes that ship logs directly.
    Udp { bind_addr: String },
}

/// A collected log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp when the log was generated.
    pub timestamp: DateTime<Utc>,
    /// Log severity level.
    pub level: LogLevel,
    /// Log message.
    pub message: String,
    /// Identity of the nanoprobe or CMA that emitted the entry.
    pub node_id: String,
    /// Subsystem name (`"heartbeat"`, `"discovery"`, `"orchestrator"`, ...).
    pub component: Option<String>,
    /// Peer address involved, if any (`NetAddr` rendered as text).
    pub peer: Option<String>,
    /// Source file name.
    pub file: Option<String>,
    /// Source line number.
    pub line: Option<u32>,
    /// Source function name.
    pub function: Option<String>,
}

impl Default for LogEntry {
    fn default() -> Self {
        Self {
            timestamp: Utc::now(),
            level: LogLevel::Info,
            message: String::new(),
            node_id: String::new(),
            component: None,
            peer: None,
            file: None,
            line: None,
            function: None,
        }
    }
}

impl LogEntry {
    /// Create a new log entry with message.
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            ..Default::default()
        }
    }

    /// Set the node id.
    pub fn with_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = node_id.into();
        self
    }

    /// Set the component name.
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Set the peer address.
    pub fn with_peer(mut self, peer: impl Into<String>) -> Self {
        self.peer = Some(peer.into());
        self
    }

    /// Set source location.
    pub fn with_location(mut self, file: impl Into<String>, line: u32, function: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self.function = Some(function.into());
        self
    }
}

/// Collector statistics.
#[derive(Debug, Default)]
pub struct CollectorStats {
    /// Total logs received.
    pub logs_received: u64,
    /// Logs written (after filtering).
    pub logs_written: u64,
    /// Logs filtered out.
    pub logs_filtered: u64,
    /// Entries that failed to parse as JSON.
    pub parse_errors: u64,
    /// Write errors.
    pub write_errors: u64,
}

/// Aggregates JSON log lines and reformats them to the configured output.
pub struct LogCollector {
    config: LogConfig,
    formatter: Box<dyn LogFormatter + Send + Sync>,
    output: Box<dyn LogOutput>,
    filter: LogFilter,
    running: Arc<AtomicBool>,
    stats: CollectorStats,
}

impl LogCollector {
    /// Create a new log collector.
    pub fn new(config: LogConfig) -> io::Result<Self> {
        let formatter = create_formatter(config.format);
        let output = create_output(&config.output)?;
        let filter = config.filter.clone();

        Ok(Self {
            config,
            formatter,
            output,
            filter,
            running: Arc::new(AtomicBool::new(false)),
            stats: CollectorStats::default(),
        })
    }

    /// Get collector statistics.
    pub fn stats(&self) -> &CollectorStats {
        &self.stats
    }

    /// Process a single log entry.
    pub fn process(&mut self, entry: LogEntry) -> io::Result<()> {
        self.stats.logs_received += 1;

        if !self.filter.matches(&entry) {
            self.stats.logs_filtered += 1;
            return Ok(());
        }

        let line = self.formatter.format(&entry);
        match self.output.write(&line) {
            Ok(()) => {
                self.stats.logs_written += 1;
                Ok(())
            }
            Err(e) => {
                self.stats.write_errors += 1;
                Err(e)
            }
        }
    }

    /// Flush output.
    pub fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }

    /// Check if the collector is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the collector.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Get a handle to stop the collector from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            running: self.running.clone(),
        }
    }

    /// Run the collector (blocking) until stopped.
    pub fn run(&mut self) -> io::Result<()> {
        self.running.store(true, Ordering::SeqCst);

        tracing::info!(source = ?self.config.source, "starting log collector");

        let result = match self.config.source.clone() {
            InputSource::Stdin => self.run_stdin(),
            InputSource::Udp { bind_addr } => self.run_udp(&bind_addr),
        };

        tracing::info!(
            logs_received = self.stats.logs_received,
            logs_written = self.stats.logs_written,
            parse_errors = self.stats.parse_errors,
            "log collector stopped"
        );

        result
    }

    fn run_stdin(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            self.ingest_line(&line);
        }
        self.flush()
    }

    fn run_udp(&mut self, bind_addr: &str) -> io::Result<()> {
        let socket = UdpSocket::bind(bind_addr)?;
        socket.set_read_timeout(Some(Duration::from_millis(200)))?;
        let mut buf = [0u8; 65536];

        while self.running.load(Ordering::SeqCst) {
            match socket.recv(&mut buf) {
                Ok(n) => {
                    let line = String::from_utf8_lossy(&buf[..n]);
                    self.ingest_line(&line);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => {
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
        self.flush()
    }

    fn ingest_line(&mut self, line: &str) {
        match serde_json::from_str::<LogEntry>(line) {
            Ok(entry) => {
                if let Err(err) = self.process(entry) {
                    tracing::warn!(error = %err, "log output failed");
                }
            }
            Err(err) => {
                self.stats.parse_errors += 1;
                tracing::debug!(error = %err, line, "discarding malformed log line");
            }
        }
    }
}

/// Handle to stop a running collector from another thread.
#[derive(Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
}

impl StopHandle {
    /// Stop the collector.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OutputConfig, OutputFormat};

    #[test]
    fn log_entry_builder() {
        let entry = LogEntry::new(LogLevel::Error, "peer timed out")
            .with_node("nanoprobe-01")
            .with_component("heartbeat")
            .with_peer("10.0.0.5:1984")
            .with_location("heartbeat.rs", 42, "tick");

        assert_eq!(entry.level, LogLevel::Error);
        assert_eq!(entry.message, "peer timed out");
        assert_eq!(entry.component, Some("heartbeat".to_string()));
        assert_eq!(entry.peer, Some("10.0.0.5:1984".to_string()));
        assert_eq!(entry.line, Some(42));
    }

    #[test]
    fn collector_process_applies_filter() {
        let config = LogConfig {
            format: OutputFormat::Text,
            output: OutputConfig::Stdout,
            filter: LogFilter::min_level(LogLevel::Warn),
            ..Default::default()
        };

        let mut collector = LogCollector::new(config).unwrap();

        let info_entry = LogEntry::new(LogLevel::Info, "discovery dispatched").with_node("node-a");
        collector.process(info_entry).unwrap();
        assert_eq!(collector.stats.logs_filtered, 1);
        assert_eq!(collector.stats.logs_written, 0);

        let error_entry = LogEntry::new(LogLevel::Error, "ack timed out").with_node("node-a");
        collector.process(error_entry).unwrap();
        assert_eq!(collector.stats.logs_written, 1);
    }

    #[test]
    fn ingest_line_counts_parse_errors() {
        let config = LogConfig::default();
        let mut collector = LogCollector::new(config).unwrap();
        collector.ingest_line("not json");
        assert_eq!(collector.stats.parse_errors, 1);
        assert_eq!(collector.stats.logs_received, 0);
    }

    #[test]
    fn ingest_line_parses_well_formed_entry() {
        let config = LogConfig::default();
        let mut collector = LogCollector::new(config).unwrap();
        let entry = LogEntry::new(LogLevel::Warn, "retransmitting frameset").with_node("node-b");
        let line = serde_json::to_string(&entry).unwrap();
        collector.ingest_line(&line);
        assert_eq!(collector.stats.logs_received, 1);
        assert_eq!(collector.stats.logs_written, 1);
    }

    #[test]
    fn stop_handle_stops_collector() {
        let config = LogConfig::default();
        let collector = LogCollector::new(config).unwrap();
        let handle = collector.stop_handle();

        assert!(!collector.is_running());
        handle.stop();
        assert!(!collector.is_running());
    }
}
