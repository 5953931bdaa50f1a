// SPDX-License-Identifier: GPL-3.0-or-later

//! Address frames (`FRAMETYPE_IPADDR`): a `family:u16 || port:u16 || bytes`
//! encoding of [`NetAddr`], wide enough to carry IPv4, IPv6, MAC-48 and
//! MAC-64 forms (Section 3's NetAddr data model).

use super::Frame;
use crate::error::DecodeError;
use crate::netaddr::{AddressFamily, NetAddr};
use crate::tlv;

const FAMILY_PORT_HDR: usize = 4;

pub fn encode_address_value(addr: &NetAddr) -> Vec<u8> {
    let mut out = Vec::with_capacity(FAMILY_PORT_HDR + 16);
    out.extend_from_slice(&(addr.family() as u16).to_be_bytes());
    out.extend_from_slice(&addr.port().unwrap_or(0).to_be_bytes());
    match addr {
        NetAddr::V4 { octets, .. } => out.extend_from_slice(octets),
        NetAddr::V6 { octets, .. } => out.extend_from_slice(octets),
        NetAddr::Mac48(bytes) => out.extend_from_slice(bytes),
        NetAddr::Mac64(bytes) => out.extend_from_slice(bytes),
    }
    out
}

pub fn decode_address(type_code: u16, value: &[u8]) -> Result<Frame, DecodeError> {
    let family_code = tlv::get_u16(value, 0)?;
    let port_raw = tlv::get_u16(value, 2)?;
    let port = if port_raw == 0 { None } else { Some(port_raw) };
    let body = value
        .get(FAMILY_PORT_HDR..)
        .ok_or(DecodeError::Truncated)?;

    let addr = match family_code {
        x if x == AddressFamily::Ipv4 as u16 => {
            let octets: [u8; 4] = body
                .try_into()
                .map_err(|_| DecodeError::Malformed("ipv4 address has wrong length"))?;
            NetAddr::V4 { octets, port }
        }
        x if x == AddressFamily::Ipv6 as u16 => {
            let octets: [u8; 16] = body
                .try_into()
                .map_err(|_| DecodeError::Malformed("ipv6 address has wrong length"))?;
            NetAddr::V6 { octets, port }
        }
        x if x == AddressFamily::Mac48 as u16 => {
            let bytes: [u8; 6] = body
                .try_into()
                .map_err(|_| DecodeError::Malformed("mac48 address has wrong length"))?;
            NetAddr::Mac48(bytes)
        }
        x if x == AddressFamily::Mac64 as u16 => {
            let bytes: [u8; 8] = body
                .try_into()
                .map_err(|_| DecodeError::Malformed("mac64 address has wrong length"))?;
            NetAddr::Mac64(bytes)
        }
        other => return Err(DecodeError::UnregisteredType(other)),
    };
    Ok(Frame::Address { type_code, addr })
}
