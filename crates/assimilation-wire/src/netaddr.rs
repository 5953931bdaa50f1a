// SPDX-License-Identifier: GPL-3.0-or-later

//! Polymorphic network address (Section 3: NetAddr, Section 4.5 C5).
//!
//! Grounded on `examples/original_source/clientlib/netaddr.c`: `_netaddr_equal`
//! treats IPv4 and IPv4-mapped-IPv6 as the same address (same port), and
//! additionally treats the two canonical loopback spellings as equal.
//! `_netaddr_hash` mixes in a process-wide random seed "to avoid denial of
//! service through hash collisions" (same comment, same rationale, carried
//! over verbatim as the `hash_seed()` doc below).

use std::hash::{Hash, Hasher};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::OnceLock;

fn hash_seed() -> u64 {
    static SEED: OnceLock<u64> = OnceLock::new();
    *SEED.get_or_init(rand::random)
}

const LOOPBACK_V4: [u8; 4] = [127, 0, 0, 1];
const LOOPBACK_V6: [u8; 16] = Ipv6Addr::LOCALHOST.octets();

/// Address family tag, matching the IANA assignments referenced by RFC 3232
/// (Section 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    Ipv4 = 1,
    Ipv6 = 2,
    Mac48 = 0xFFFE,
    Mac64 = 0xFFFD,
}

/// A polymorphic network address: IPv4, IPv6, MAC-48, or MAC-64.
///
/// `Eq`/`Hash` are hand-written (see module docs) rather than derived: IPv4
/// and its IPv4-mapped-IPv6 form must compare and hash identically.
#[derive(Debug, Clone)]
pub enum NetAddr {
    V4 { octets: [u8; 4], port: Option<u16> },
    V6 { octets: [u8; 16], port: Option<u16> },
    Mac48([u8; 6]),
    Mac64([u8; 8]),
}

impl NetAddr {
    pub fn family(&self) -> AddressFamily {
        match self {
            Self::V4 { .. } => AddressFamily::Ipv4,
            Self::V6 { .. } => AddressFamily::Ipv6,
            Self::Mac48(_) => AddressFamily::Mac48,
            Self::Mac64(_) => AddressFamily::Mac64,
        }
    }

    pub fn port(&self) -> Option<u16> {
        match self {
            Self::V4 { port, .. } | Self::V6 { port, .. } => *port,
            Self::Mac48(_) | Self::Mac64(_) => None,
        }
    }

    pub fn from_socket_addr(addr: SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(a) => Self::V4 {
                octets: a.ip().octets(),
                port: Some(a.port()),
            },
            SocketAddr::V6(a) => Self::V6 {
                octets: a.ip().octets(),
                port: Some(a.port()),
            },
        }
    }

    pub fn to_socket_addr(&self) -> Option<SocketAddr> {
        match self {
            Self::V4 { octets, port } => Some(SocketAddr::new(
                Ipv4Addr::from(*octets).into(),
                port.unwrap_or(0),
            )),
            Self::V6 { octets, port } => Some(SocketAddr::new(
                Ipv6Addr::from(*octets).into(),
                port.unwrap_or(0),
            )),
            Self::Mac48(_) | Self::Mac64(_) => None,
        }
    }

    /// True if this address is a multicast address (IPv4/IPv6 only).
    pub fn is_multicast(&self) -> bool {
        match self {
            Self::V4 { octets, .. } => Ipv4Addr::from(*octets).is_multicast(),
            Self::V6 { octets, .. } => Ipv6Addr::from(*octets).is_multicast(),
            Self::Mac48(_) | Self::Mac64(_) => false,
        }
    }

    /// Canonical 16-byte form used for equality/hash: IPv4 is mapped into the
    /// `::ffff:a.b.c.d` range; the two loopback spellings collapse to the
    /// same representative. Returns `None` for non-IP addresses.
    fn canonical_v6(&self) -> Option<[u8; 16]> {
        let raw = match self {
            Self::V4 { octets, .. } => Ipv4Addr::from(*octets).to_ipv6_mapped().octets(),
            Self::V6 { octets, .. } => *octets,
            Self::Mac48(_) | Self::Mac64(_) => return None,
        };
        if raw == LOOPBACK_V6 || raw == Ipv4Addr::from(LOOPBACK_V4).to_ipv6_mapped().octets() {
            return Some(LOOPBACK_V6);
        }
        Some(raw)
    }
}

impl PartialEq for NetAddr {
    fn eq(&self, other: &Self) -> bool {
        match (self.canonical_v6(), other.canonical_v6()) {
            (Some(a), Some(b)) => a == b && self.port() == other.port(),
            (None, None) => match (self, other) {
                (Self::Mac48(a), Self::Mac48(b)) => a == b,
                (Self::Mac64(a), Self::Mac64(b)) => a == b,
                _ => false,
            },
            _ => false,
        }
    }
}

impl Eq for NetAddr {}

impl Hash for NetAddr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_seed().hash(state);
        match self.canonical_v6() {
            Some(v6) => {
                v6.hash(state);
                self.port().hash(state);
            }
            None => match self {
                Self::Mac48(m) => m.hash(state),
                Self::Mac64(m) => m.hash(state),
                Self::V4 { .. } | Self::V6 { .. } => unreachable!(),
            },
        }
    }
}

impl std::fmt::Display for NetAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V4 { octets, port } => match port {
                Some(p) => write!(f, "{}:{p}", Ipv4Addr::from(*octets)),
                None => write!(f, "{}", Ipv4Addr::from(*octets)),
            },
            Self::V6 { octets, port } => match port {
                Some(p) => write!(f, "[{}]:{p}", Ipv6Addr::from(*octets)),
                None => write!(f, "{}", Ipv6Addr::from(*octets)),
            },
            Self::Mac48(m) => write!(
                f,
                "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
                m[0], m[1], m[2], m[3], m[4], m[5]
            ),
            Self::Mac64(m) => write!(
                f,
                "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
                m[0], m[1], m[2], m[3], m[4], m[5], m[6], m[7]
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(a: &NetAddr) -> u64 {
        let mut h = DefaultHasher::new();
        a.hash(&mut h);
        h.finish()
    }

    #[test]
    fn v4_equals_v4_mapped_v6_same_port() {
        let v4 = NetAddr::V4 {
            octets: [10, 0, 0, 1],
            port: Some(7400),
        };
        let v6 = NetAddr::V6 {
            octets: Ipv4Addr::new(10, 0, 0, 1).to_ipv6_mapped().octets(),
            port: Some(7400),
        };
        assert_eq!(v4, v6);
        assert_eq!(hash_of(&v4), hash_of(&v6));
    }

    #[test]
    fn different_ports_are_not_equal() {
        let a = NetAddr::V4 {
            octets: [10, 0, 0, 1],
            port: Some(1),
        };
        let b = NetAddr::V4 {
            octets: [10, 0, 0, 1],
            port: Some(2),
        };
        assert_ne!(a, b);
    }

    #[test]
    fn loopback_v4_equals_loopback_v6() {
        let v4 = NetAddr::V4 {
            octets: LOOPBACK_V4,
            port: Some(1984),
        };
        let v6 = NetAddr::V6 {
            octets: LOOPBACK_V6,
            port: Some(1984),
        };
        assert_eq!(v4, v6);
        assert_eq!(hash_of(&v4), hash_of(&v6));
    }

    #[test]
    fn equality_is_reflexive_symmetric_transitive() {
        let a = NetAddr::V4 {
            octets: [1, 2, 3, 4],
            port: Some(9),
        };
        let b = NetAddr::V6 {
            octets: Ipv4Addr::new(1, 2, 3, 4).to_ipv6_mapped().octets(),
            port: Some(9),
        };
        let c = a.clone();
        assert_eq!(a, a);
        assert_eq!(a, b);
        assert_eq!(b, a);
        assert_eq!(a, c);
        assert_eq!(b, c);
    }

    #[test]
    fn mac_addresses_are_not_ip_addresses() {
        let mac = NetAddr::Mac48([0, 1, 2, 3, 4, 5]);
        let ip = NetAddr::V4 {
            octets: [0, 1, 2, 3],
            port: None,
        };
        assert_ne!(mac, ip);
    }

    #[test]
    fn mac48_equality_and_hash() {
        let a = NetAddr::Mac48([1, 2, 3, 4, 5, 6]);
        let b = NetAddr::Mac48([1, 2, 3, 4, 5, 6]);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn multicast_detection() {
        let mcast = NetAddr::V4 {
            octets: [239, 195, 1, 1],
            port: Some(1984),
        };
        assert!(mcast.is_multicast());
        let unicast = NetAddr::V4 {
            octets: [10, 0, 0, 1],
            port: Some(1984),
        };
        assert!(!unicast.is_multicast());
    }
}
