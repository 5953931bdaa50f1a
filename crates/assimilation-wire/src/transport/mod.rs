// SPDX-License-Identifier: GPL-3.0-or-later

//! NetIO: UDP transport for the frameset wire protocol (Section 4.6,
//! component C6).
//!
//! Grounded on the teacher's `transport::udp` module: a single owned
//! `UdpSocket`, `socket2` for pre-bind options, pervasive `log::debug!`
//! around bind/send/recv, and a dedicated submodule for multicast-group
//! bookkeeping.

#[cfg(feature = "loss-injection")]
mod lossinject;
mod multicast;
mod udp;

#[cfg(feature = "loss-injection")]
pub use lossinject::LossInjector;
pub use udp::NetIo;

use crate::error::TransportError;
use crate::netaddr::NetAddr;

/// Result of a `bind()` call that distinguishes "already in use" from other
/// I/O failures (Section 4.6).
#[derive(Debug)]
pub enum BindError {
    AddrInUse,
    Other(TransportError),
}

impl From<std::io::Error> for BindError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::AddrInUse {
            Self::AddrInUse
        } else {
            Self::Other(TransportError::from(err))
        }
    }
}

/// Rewrites incoming source addresses matching `from` to `to`, used to
/// merge ephemeral/bound-port discrepancies before delivering upstream
/// (Section 4.6: `add_alias`).
#[derive(Debug, Default, Clone)]
pub struct AliasTable {
    aliases: Vec<(NetAddr, NetAddr)>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_alias(&mut self, from: NetAddr, to: NetAddr) {
        self.aliases.push((from, to));
    }

    pub fn resolve(&self, addr: &NetAddr) -> NetAddr {
        for (from, to) in &self.aliases {
            if from == addr {
                return to.clone();
            }
        }
        addr.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_rewrites_matching_source() {
        let mut table = AliasTable::new();
        let ephemeral = NetAddr::V4 {
            octets: [127, 0, 0, 1],
            port: Some(54321),
        };
        let canonical = NetAddr::V4 {
            octets: [127, 0, 0, 1],
            port: Some(1984),
        };
        table.add_alias(ephemeral.clone(), canonical.clone());
        assert_eq!(table.resolve(&ephemeral), canonical);
    }

    #[test]
    fn unmatched_address_passes_through() {
        let table = AliasTable::new();
        let addr = NetAddr::V4 {
            octets: [10, 0, 0, 1],
            port: Some(1),
        };
        assert_eq!(table.resolve(&addr), addr);
    }
}
