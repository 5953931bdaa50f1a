// SPDX-License-Identifier: GPL-3.0-or-later

//! Discovery dispatcher (Section 2, component C11): caches the prior JSON
//! discovery blob per `(host, discovery-name)` and only emits a reliable
//! frameset when the content actually changed.

use std::collections::HashMap;

use crate::frame::{types, Frame};
use crate::frameset::FrameSet;
use crate::netaddr::NetAddr;
use crate::error::TransportError;
use crate::reliability::{FsProtocol, Transmit};

/// Frameset type carrying a discovery result.
pub const DISCOVERY_FRAMESET_TYPE: u16 = 0x4449;
pub const DISCOVERY_HOST_FRAME: u16 = types::APPLICATION_BASE;
pub const DISCOVERY_NAME_FRAME: u16 = types::APPLICATION_BASE + 1;
pub const DISCOVERY_JSON_FRAME: u16 = types::APPLICATION_BASE + 2;

/// Caches the last-sent JSON per `(host, discovery-name)` and sends over a
/// `FsProtocol` connection only on change.
pub struct DiscoveryDispatcher {
    queue_id: u16,
    cache: HashMap<(String, String), String>,
}

impl DiscoveryDispatcher {
    pub fn new(queue_id: u16) -> Self {
        Self {
            queue_id,
            cache: HashMap::new(),
        }
    }

    /// Submit a discovery result. Returns `true` if it differed from the
    /// cached value and was queued for reliable delivery to `dest`.
    pub fn dispatch(
        &mut self,
        proto: &mut FsProtocol,
        transmitter: &dyn Transmit,
        dest: &NetAddr,
        host: &str,
        discovery_name: &str,
        json: &str,
    ) -> Result<bool, TransportError> {
        let key = (host.to_string(), discovery_name.to_string());
        if self.cache.get(&key).map(String::as_str) == Some(json) {
            return Ok(false);
        }
        self.cache.insert(key, json.to_string());
        let fs = discovery_frameset(host, discovery_name, json);
        proto.send(transmitter, dest, self.queue_id, vec![fs])?;
        Ok(true)
    }

    /// Forget the cached value for `(host, discovery_name)`, forcing the
    /// next `dispatch` to send unconditionally.
    pub fn forget(&mut self, host: &str, discovery_name: &str) {
        self.cache.remove(&(host.to_string(), discovery_name.to_string()));
    }
}

fn discovery_frameset(host: &str, discovery_name: &str, json: &str) -> FrameSet {
    FrameSet::new(
        DISCOVERY_FRAMESET_TYPE,
        0,
        vec![
            Frame::CString {
                type_code: DISCOVERY_HOST_FRAME,
                value: host.to_string(),
            },
            Frame::CString {
                type_code: DISCOVERY_NAME_FRAME,
                value: discovery_name.to_string(),
            },
            Frame::CString {
                type_code: DISCOVERY_JSON_FRAME,
                value: json.to_string(),
            },
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingTransmitter {
        sent: RefCell<Vec<(NetAddr, u16, u16, Vec<Frame>)>>,
    }

    impl Transmit for RecordingTransmitter {
        fn transmit(
            &self,
            dest: &NetAddr,
            fs_type: u16,
            flags: u16,
            frames: &[Frame],
        ) -> Result<(), TransportError> {
            self.sent
                .borrow_mut()
                .push((dest.clone(), fs_type, flags, frames.to_vec()));
            Ok(())
        }
    }

    fn cma() -> NetAddr {
        NetAddr::V4 {
            octets: [10, 0, 0, 1],
            port: Some(1984),
        }
    }

    #[test]
    fn first_dispatch_always_sends() {
        let mut proto = FsProtocol::new(1, RuntimeConfig::default());
        let tx = RecordingTransmitter::default();
        let mut dispatcher = DiscoveryDispatcher::new(0);
        let sent = dispatcher
            .dispatch(&mut proto, &tx, &cma(), "host1", "netconfig", "{\"a\":1}")
            .unwrap();
        assert!(sent);
        assert_eq!(tx.sent.borrow().len(), 1);
    }

    #[test]
    fn unchanged_content_is_suppressed() {
        let mut proto = FsProtocol::new(1, RuntimeConfig::default());
        let tx = RecordingTransmitter::default();
        let mut dispatcher = DiscoveryDispatcher::new(0);
        dispatcher
            .dispatch(&mut proto, &tx, &cma(), "host1", "netconfig", "{\"a\":1}")
            .unwrap();
        let sent_again = dispatcher
            .dispatch(&mut proto, &tx, &cma(), "host1", "netconfig", "{\"a\":1}")
            .unwrap();
        assert!(!sent_again);
        assert_eq!(tx.sent.borrow().len(), 1);
    }

    #[test]
    fn changed_content_is_resent() {
        let mut proto = FsProtocol::new(1, RuntimeConfig::default());
        let tx = RecordingTransmitter::default();
        let mut dispatcher = DiscoveryDispatcher::new(0);
        dispatcher
            .dispatch(&mut proto, &tx, &cma(), "host1", "netconfig", "{\"a\":1}")
            .unwrap();
        let sent_again = dispatcher
            .dispatch(&mut proto, &tx, &cma(), "host1", "netconfig", "{\"a\":2}")
            .unwrap();
        assert!(sent_again);
        assert_eq!(tx.sent.borrow().len(), 2);
    }

    #[test]
    fn distinct_discovery_names_are_independent() {
        let mut proto = FsProtocol::new(1, RuntimeConfig::default());
        let tx = RecordingTransmitter::default();
        let mut dispatcher = DiscoveryDispatcher::new(0);
        dispatcher
            .dispatch(&mut proto, &tx, &cma(), "host1", "netconfig", "{}")
            .unwrap();
        let sent = dispatcher
            .dispatch(&mut proto, &tx, &cma(), "host1", "arpcache", "{}")
            .unwrap();
        assert!(sent);
    }

    #[test]
    fn forget_forces_resend() {
        let mut proto = FsProtocol::new(1, RuntimeConfig::default());
        let tx = RecordingTransmitter::default();
        let mut dispatcher = DiscoveryDispatcher::new(0);
        dispatcher
            .dispatch(&mut proto, &tx, &cma(), "host1", "netconfig", "{}")
            .unwrap();
        dispatcher.forget("host1", "netconfig");
        let sent = dispatcher
            .dispatch(&mut proto, &tx, &cma(), "host1", "netconfig", "{}")
            .unwrap();
        assert!(sent);
    }
}
