// SPDX-License-Identifier: GPL-3.0-or-later

//! Log level and entry filtering.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Log severity level, ordered `Unset < Debug < Info < Warn < Error < Fatal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
#[derive(Default)]
pub enum LogLevel {
    Unset = 0,
    Debug = 10,
    #[default]
    Info = 20,
    Warn = 30,
    Error = 40,
    Fatal = 50,
}

impl LogLevel {
    /// Short uppercase name, as used in text output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unset => "UNSET",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }

    /// Parse from a case-insensitive level name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "unset" => Some(Self::Unset),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            "fatal" | "critical" => Some(Self::Fatal),
            _ => None,
        }
    }

    /// RFC 5424 severity (0 = Emergency ... 7 = Debug); levels below Debug
    /// have no RFC 5424 counterpart and map to Debug's severity.
    pub fn syslog_severity(&self) -> u8 {
        match self {
            Self::Unset => 7,
            Self::Debug => 7,
            Self::Info => 6,
            Self::Warn => 4,
            Self::Error => 3,
            Self::Fatal => 2,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Filters entries by minimum level and optional glob patterns on
/// `node_id`/`component`/`peer`/`message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogFilter {
    /// Minimum level that passes the filter.
    pub min_level: LogLevel,
    /// Glob pattern against `LogEntry::node_id`.
    pub node_pattern: Option<String>,
    /// Glob pattern against `LogEntry::component`.
    pub component_pattern: Option<String>,
    /// Glob pattern against `LogEntry::peer`.
    pub peer_pattern: Option<String>,
    /// Glob pattern against `LogEntry::message`.
    pub message_pattern: Option<String>,
}

impl Default for LogFilter {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            node_pattern: None,
            component_pattern: None,
            peer_pattern: None,
            message_pattern: None,
        }
    }
}

impl LogFilter {
    /// Filter that only checks the minimum level.
    pub fn min_level(level: LogLevel) -> Self {
        Self {
            min_level: level,
            ..Default::default()
        }
    }

    /// Whether `entry` passes this filter.
    pub fn matches(&self, entry: &super::LogEntry) -> bool {
        if entry.level < self.min_level {
            return false;
        }

        if let Some(ref pattern) = self.node_pattern {
            if !glob_match(pattern, &entry.node_id) {
                return false;
            }
        }

        if let Some(ref pattern) = self.component_pattern {
            match &entry.component {
                Some(component) if glob_match(pattern, component) => {}
                _ => return false,
            }
        }

        if let Some(ref pattern) = self.peer_pattern {
            match &entry.peer {
                Some(peer) if glob_match(pattern, peer) => {}
                _ => return false,
            }
        }

        if let Some(ref pattern) = self.message_pattern {
            if !glob_match(pattern, &entry.message) {
                return false;
            }
        }

        true
    }
}

/// Shell-style glob match supporting `*` and `?`.
fn glob_match(pattern: &str, text: &str) -> bool {
    if pattern == text {
        return true;
    }
    if !pattern.contains('*') && !pattern.contains('?') {
        return false;
    }
    let pattern_chars: Vec<char> = pattern.chars().collect();
    let text_chars: Vec<char> = text.chars().collect();
    glob_match_recursive(&pattern_chars, &text_chars, 0, 0)
}

fn glob_match_recursive(pattern: &[char], text: &[char], pi: usize, ti: usize) -> bool {
    if pi == pattern.len() {
        return ti == text.len();
    }

    match pattern[pi] {
        '*' => {
            for i in ti..=text.len() {
                if glob_match_recursive(pattern, text, pi + 1, i) {
                    return true;
                }
            }
            false
        }
        '?' => ti < text.len() && glob_match_recursive(pattern, text, pi + 1, ti + 1),
        c => ti < text.len() && text[ti] == c && glob_match_recursive(pattern, text, pi + 1, ti + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogEntry;

    #[test]
    fn level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Fatal);
    }

    #[test]
    fn level_parse_roundtrip() {
        for level in [
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
            LogLevel::Fatal,
        ] {
            assert_eq!(LogLevel::parse(level.as_str()), Some(level));
        }
        assert_eq!(LogLevel::parse("bogus"), None);
    }

    #[test]
    fn syslog_severity_matches_rfc5424() {
        assert_eq!(LogLevel::Info.syslog_severity(), 6);
        assert_eq!(LogLevel::Error.syslog_severity(), 3);
        assert_eq!(LogLevel::Fatal.syslog_severity(), 2);
    }

    #[test]
    fn filter_rejects_below_min_level() {
        let filter = LogFilter::min_level(LogLevel::Warn);
        let entry = LogEntry::new(LogLevel::Info, "heartbeat due");
        assert!(!filter.matches(&entry));
        let entry = LogEntry::new(LogLevel::Error, "peer timed out");
        assert!(filter.matches(&entry));
    }

    #[test]
    fn filter_matches_component_glob() {
        let mut filter = LogFilter::min_level(LogLevel::Debug);
        filter.component_pattern = Some("heartbeat*".to_string());
        let mut entry = LogEntry::new(LogLevel::Info, "due");
        entry.component = Some("heartbeat_sender".to_string());
        assert!(filter.matches(&entry));
        entry.component = Some("discovery".to_string());
        assert!(!filter.matches(&entry));
    }

    #[test]
    fn filter_with_no_component_rejects_pattern() {
        let mut filter = LogFilter::min_level(LogLevel::Debug);
        filter.component_pattern = Some("*".to_string());
        let entry = LogEntry::new(LogLevel::Info, "no component set");
        assert!(!filter.matches(&entry));
    }

    #[test]
    fn glob_match_handles_question_mark() {
        assert!(glob_match("node-?", "node-1"));
        assert!(!glob_match("node-?", "node-12"));
    }
}
