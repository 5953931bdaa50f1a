// SPDX-License-Identifier: GPL-3.0-or-later

//! Multicast group membership helpers, split out of `udp.rs` the way the
//! teacher keeps `transport::multicast` separate from `transport::udp`.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use crate::error::TransportError;
use crate::netaddr::NetAddr;

/// Join `group` on `socket`, using `local_addr` to pick the interface when
/// it names one, falling back to `INADDR_ANY`/the unspecified address.
/// Fails with a family mismatch if `group` and `local_addr` differ in
/// address family (Section 4.6: `EAddrFamily`).
pub fn join_multicast_group(
    socket: &UdpSocket,
    group: &NetAddr,
    local_addr: Option<&NetAddr>,
) -> Result<(), TransportError> {
    match group {
        NetAddr::V4 { octets, .. } => {
            let group_ip = Ipv4Addr::from(*octets);
            let iface = match local_addr {
                Some(NetAddr::V4 { octets, .. }) => Ipv4Addr::from(*octets),
                Some(_) => {
                    return Err(TransportError::Io(
                        "multicast group and local address families differ".to_string(),
                    ))
                }
                None => Ipv4Addr::UNSPECIFIED,
            };
            socket.join_multicast_v4(&group_ip, &iface)?;
            Ok(())
        }
        NetAddr::V6 { octets, .. } => {
            let group_ip = Ipv6Addr::from(*octets);
            match local_addr {
                Some(NetAddr::V6 { .. }) | None => {}
                Some(_) => {
                    return Err(TransportError::Io(
                        "multicast group and local address families differ".to_string(),
                    ))
                }
            }
            socket.join_multicast_v6(&group_ip, 0)?;
            Ok(())
        }
        NetAddr::Mac48(_) | NetAddr::Mac64(_) => Err(TransportError::Io(
            "multicast join requires an IP address".to_string(),
        )),
    }
}

/// Pick an arbitrary non-loopback local IPv4 address, used as the default
/// interface for multicast joins when the caller did not specify one.
pub fn primary_interface_addr() -> io::Result<Option<Ipv4Addr>> {
    let probe = UdpSocket::bind("0.0.0.0:0")?;
    probe.connect("8.8.8.8:80").ok();
    match probe.local_addr() {
        Ok(SocketAddr::V4(a)) if !a.ip().is_loopback() => Ok(Some(*a.ip())),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_families_are_rejected() {
        let socket = UdpSocket::bind("0.0.0.0:0").unwrap();
        let group = NetAddr::V4 {
            octets: [239, 195, 1, 1],
            port: None,
        };
        let local = NetAddr::Mac48([0, 1, 2, 3, 4, 5]);
        assert!(join_multicast_group(&socket, &group, Some(&local)).is_err());
    }

    #[test]
    fn mac_group_is_rejected() {
        let socket = UdpSocket::bind("0.0.0.0:0").unwrap();
        let group = NetAddr::Mac48([0, 1, 2, 3, 4, 5]);
        assert!(join_multicast_group(&socket, &group, None).is_err());
    }
}
