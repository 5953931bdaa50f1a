// SPDX-License-Identifier: GPL-3.0-or-later

//! Assimilation wire-protocol configuration — single source of truth.
//!
//! Mirrors the teacher's `config.rs` split: Level 1 static constants (wire
//! format, well-known ports) and Level 2 dynamic runtime configuration for
//! the knobs the reliable-transport and heartbeat layers actually need to
//! vary at runtime.

use std::time::Duration;

/// Default CMA rendezvous multicast port (Section 6: "project's assigned
/// multicast group on UDP port 1984").
pub const CMA_RENDEZVOUS_PORT: u16 = 1984;

/// Default CMA rendezvous multicast group.
pub const CMA_RENDEZVOUS_GROUP: &str = "239.195.1.1";

/// Maximum UDP datagram payload this transport will ever construct.
///
/// Chosen conservatively below the common Ethernet-path MTU minus IP/UDP
/// headers, matching the C implementation's default packet size bound.
pub const MAX_PACKET_SIZE: usize = 4096;

/// Legal alphabet for key ids: `[A-Za-z0-9_-]`.
pub fn is_legal_key_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Maximum length of a key id string.
pub const MAX_KEY_ID_LEN: usize = 255;

/// Distinguished CMA identity prefix (Section 6: `#CMA#*`).
pub const CMA_IDENTITY_PREFIX: &str = "#CMA#";

/// Interval between `STARTUP` retries during nanoprobe bootstrap (Section 4.10).
pub const STARTUP_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Default sliding-window size for `FsProtocol`.
pub const DEFAULT_WINDOW_SIZE: usize = 8;

/// Default retransmission interval for unacked framesets.
pub const DEFAULT_REXMIT_INTERVAL: Duration = Duration::from_millis(500);

/// Default bound on queued-but-undelivered framesets per `FsQueue`.
pub const DEFAULT_QUEUE_MAX_LEN: usize = 1024;

/// Heartbeat tick granularity (Section 4.9: "a periodic one-second tick").
pub const HEARTBEAT_TICK: Duration = Duration::from_secs(1);

/// Runtime-adjustable reliable-transport configuration.
///
/// Constructed once per `FsProtocol` / `NetIO` pair; all fields may be
/// overridden by the CMA via `SETCONFIG` (Section 4.10).
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub window_size: usize,
    pub rexmit_interval: Duration,
    pub queue_max_len: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            rexmit_interval: DEFAULT_REXMIT_INTERVAL,
            queue_max_len: DEFAULT_QUEUE_MAX_LEN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_id_alphabet_rejects_punctuation() {
        assert!(is_legal_key_id_char('a'));
        assert!(is_legal_key_id_char('Z'));
        assert!(is_legal_key_id_char('9'));
        assert!(is_legal_key_id_char('_'));
        assert!(is_legal_key_id_char('-'));
        assert!(!is_legal_key_id_char('.'));
        assert!(!is_legal_key_id_char('/'));
        assert!(!is_legal_key_id_char(' '));
    }

    #[test]
    fn runtime_config_defaults_match_constants() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.window_size, DEFAULT_WINDOW_SIZE);
        assert_eq!(cfg.rexmit_interval, DEFAULT_REXMIT_INTERVAL);
        assert_eq!(cfg.queue_max_len, DEFAULT_QUEUE_MAX_LEN);
    }
}
