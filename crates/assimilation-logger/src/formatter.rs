// SPDX-License-Identifier: GPL-3.0-or-later

//! Log formatters: text, JSON, syslog (RFC 5424).

use crate::{LogEntry, LogLevel, SyslogFacility};
use serde::{Deserialize, Serialize};

/// Output format for log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputFormat {
    /// Plain text format (human-readable).
    #[default]
    Text,
    /// JSON format (ELK/structured logging ready).
    Json,
    /// Syslog RFC 5424 format.
    Syslog,
    /// JSON Lines format (one JSON object per line).
    JsonLines,
}

/// Log formatter trait.
pub trait LogFormatter {
    /// Format a log entry to string.
    fn format(&self, entry: &LogEntry) -> String;
}

/// Text formatter for human-readable output.
#[derive(Debug, Clone)]
pub struct TextFormatter {
    /// Include timestamp.
    pub show_timestamp: bool,
    /// Include the nanoprobe/CMA node id.
    pub show_node: bool,
    /// Include the component name.
    pub show_component: bool,
    /// Use colors (ANSI escape codes).
    pub use_colors: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            show_timestamp: true,
            show_node: true,
            show_component: true,
            use_colors: true,
        }
    }
}

impl TextFormatter {
    /// Create formatter without colors.
    #[cfg(test)]
    fn no_colors() -> Self {
        Self {
            use_colors: false,
            ..Default::default()
        }
    }

    fn level_color(&self, level: LogLevel) -> &'static str {
        if !self.use_colors {
            return "";
        }
        match level {
            LogLevel::Unset => "\x1b[37m",
            LogLevel::Debug => "\x1b[36m",
            LogLevel::Info => "\x1b[32m",
            LogLevel::Warn => "\x1b[33m",
            LogLevel::Error => "\x1b[31m",
            LogLevel::Fatal => "\x1b[35;1m",
        }
    }

    fn reset(&self) -> &'static str {
        if self.use_colors {
            "\x1b[0m"
        } else {
            ""
        }
    }
}

impl LogFormatter for TextFormatter {
    fn format(&self, entry: &LogEntry) -> String {
        let mut parts = Vec::new();

        if self.show_timestamp {
            parts.push(entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string());
        }

        let level_str = format!(
            "{}[{:5}]{}",
            self.level_color(entry.level),
            entry.level.as_str(),
            self.reset()
        );
        parts.push(level_str);

        if self.show_node {
            parts.push(format!("[{}]", &entry.node_id[..8.min(entry.node_id.len())]));
        }

        if self.show_component {
            if let Some(ref component) = entry.component {
                parts.push(format!("[{}]", component));
            }
        }

        if let Some(ref peer) = entry.peer {
            parts.push(format!("[{}]", peer));
        }

        parts.push(entry.message.clone());

        parts.join(" ")
    }
}

/// JSON formatter for structured logging.
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    /// Pretty print JSON.
    pub pretty: bool,
}

impl JsonFormatter {
    /// Create compact JSON formatter.
    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

/// JSON log entry structure (ELK-compatible).
#[derive(Debug, Serialize)]
struct JsonLogEntry<'a> {
    #[serde(rename = "@timestamp")]
    timestamp: String,
    level: &'static str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    component: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    peer: Option<&'a str>,
    node_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function: Option<&'a str>,
    source: &'static str,
}

impl LogFormatter for JsonFormatter {
    fn format(&self, entry: &LogEntry) -> String {
        let json_entry = JsonLogEntry {
            timestamp: entry.timestamp.to_rfc3339(),
            level: entry.level.as_str(),
            message: &entry.message,
            component: entry.component.as_deref(),
            peer: entry.peer.as_deref(),
            node_id: &entry.node_id,
            file: entry.file.as_deref(),
            line: entry.line,
            function: entry.function.as_deref(),
            source: "assimilation-logger",
        };

        if self.pretty {
            serde_json::to_string_pretty(&json_entry).unwrap_or_else(|_| entry.message.clone())
        } else {
            serde_json::to_string(&json_entry).unwrap_or_else(|_| entry.message.clone())
        }
    }
}

/// Syslog RFC 5424 formatter.
#[derive(Debug, Clone)]
pub struct SyslogFormatter {
    /// Syslog facility.
    pub facility: SyslogFacility,
    /// Application name.
    pub app_name: String,
    /// Hostname (or "-" for nil).
    pub hostname: String,
}

impl Default for SyslogFormatter {
    fn default() -> Self {
        Self {
            facility: SyslogFacility::Local0,
            app_name: "assimilation-logger".to_string(),
            hostname: gethostname(),
        }
    }
}

impl SyslogFormatter {
    /// Create with custom facility.
    #[cfg(test)]
    fn with_facility(facility: SyslogFacility) -> Self {
        Self {
            facility,
            ..Default::default()
        }
    }

    fn pri(&self, level: LogLevel) -> u8 {
        self.facility.code() * 8 + level.syslog_severity()
    }
}

impl LogFormatter for SyslogFormatter {
    fn format(&self, entry: &LogEntry) -> String {
        // RFC 5424: <PRI>VERSION TIMESTAMP HOSTNAME APP-NAME PROCID MSGID SD MSG
        let pri = self.pri(entry.level);
        let timestamp = entry.timestamp.format("%Y-%m-%dT%H:%M:%S%.6fZ");
        let procid = std::process::id();
        let msgid = entry.component.as_deref().unwrap_or("-");

        let sd = if let Some(ref peer) = entry.peer {
            format!("[assimilation node=\"{}\" peer=\"{}\"]", entry.node_id, peer)
        } else {
            format!("[assimilation node=\"{}\"]", entry.node_id)
        };

        format!(
            "<{}>1 {} {} {} {} {} {} {}",
            pri, timestamp, self.hostname, self.app_name, procid, msgid, sd, entry.message
        )
    }
}

fn gethostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("HOST"))
        .unwrap_or_else(|_| "localhost".to_string())
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn LogFormatter + Send + Sync> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::default()),
        OutputFormat::Json | OutputFormat::JsonLines => Box::new(JsonFormatter::compact()),
        OutputFormat::Syslog => Box::new(SyslogFormatter::default()),
    }
}
