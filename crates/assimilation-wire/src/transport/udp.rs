// SPDX-License-Identifier: GPL-3.0-or-later

//! `NetIo`: the UDP socket wrapper framesets travel over (Section 4.6).

use std::net::UdpSocket;

use crate::config::MAX_PACKET_SIZE;
use crate::error::{CryptoError, TransportError};
use crate::frame::Frame;
use crate::frameset::{self, CompressionConfig, EncryptionConfig, FrameSet, KeyLookup};
use crate::netaddr::NetAddr;
use crate::tlv;

use super::multicast::join_multicast_group;
use super::{AliasTable, BindError};

pub struct NetIo {
    socket: UdpSocket,
    aliases: AliasTable,
    #[cfg(feature = "loss-injection")]
    loss: Option<super::LossInjector>,
}

impl NetIo {
    /// Bind a UDP socket at `addr` (Section 4.6: `bind`).
    pub fn bind(addr: &NetAddr, silent_on_error: bool) -> Result<Self, BindError> {
        let socket_addr = addr
            .to_socket_addr()
            .ok_or_else(|| BindError::Other(TransportError::Io("not an IP address".to_string())))?;
        let socket = match UdpSocket::bind(socket_addr) {
            Ok(s) => s,
            Err(e) => {
                if !silent_on_error {
                    log::warn!("NetIo::bind failed for {socket_addr}: {e}");
                }
                return Err(BindError::from(e));
            }
        };
        log::debug!("NetIo bound to {socket_addr}");
        Ok(Self {
            socket,
            aliases: AliasTable::new(),
            #[cfg(feature = "loss-injection")]
            loss: None,
        })
    }

    #[cfg(feature = "loss-injection")]
    pub fn set_loss_injector(&mut self, injector: super::LossInjector) {
        self.loss = Some(injector);
    }

    /// Join a multicast group (Section 4.6: `mcast_join`).
    pub fn mcast_join(&self, group: &NetAddr, local: Option<&NetAddr>) -> Result<(), TransportError> {
        join_multicast_group(&self.socket, group, local)
    }

    /// Rewrite future `recv_many` source addresses matching `from` to `to`
    /// (Section 4.6: `add_alias`).
    pub fn add_alias(&mut self, from: NetAddr, to: NetAddr) {
        self.aliases.add_alias(from, to);
    }

    pub fn local_addr(&self) -> std::io::Result<NetAddr> {
        self.socket.local_addr().map(NetAddr::from_socket_addr)
    }

    /// Marshal `frames` into one frameset and transmit it to `dest` as a
    /// single UDP datagram (Section 4.6: `send_one`).
    #[allow(clippy::too_many_arguments)]
    pub fn send_one(
        &self,
        dest: &NetAddr,
        fs_type: u16,
        flags: u16,
        frames: &[Frame],
        compression: Option<CompressionConfig>,
        encryption: Option<EncryptionConfig<'_>>,
    ) -> Result<(), TransportError> {
        let bytes = frameset::marshal(fs_type, flags, frames, compression, encryption)
            .map_err(|_: CryptoError| TransportError::Io("failed to seal frameset".to_string()))?;
        if bytes.len() > MAX_PACKET_SIZE {
            return Err(TransportError::Io(format!(
                "marshalled frameset ({} bytes) exceeds max packet size ({MAX_PACKET_SIZE})",
                bytes.len()
            )));
        }
        #[cfg(feature = "loss-injection")]
        if self.loss.as_ref().is_some_and(super::LossInjector::should_drop_xmit) {
            log::debug!("NetIo: loss injector dropped outbound datagram to {dest}");
            return Ok(());
        }
        let dest_addr = dest
            .to_socket_addr()
            .ok_or_else(|| TransportError::Io("destination is not an IP address".to_string()))?;
        self.socket.send_to(&bytes, dest_addr)?;
        log::debug!("NetIo: sent {} bytes to {dest}", bytes.len());
        Ok(())
    }

    /// Receive one datagram and decode every frameset in it (Section 4.6:
    /// `recv_many`). Returns an empty vec (rather than erroring) for
    /// datagrams the loss injector drops or that fail to decode entirely.
    pub fn recv_many(&self, keys: &dyn KeyLookup) -> Result<(NetAddr, Vec<FrameSet>), TransportError> {
        let mut probe = vec![0u8; MAX_PACKET_SIZE];
        let (len, src) = self.socket.peek_from(&mut probe)?;
        let mut buf = vec![0u8; len];
        let (_, _) = self.socket.recv_from(&mut buf)?;

        #[cfg(feature = "loss-injection")]
        if self.loss.as_ref().is_some_and(super::LossInjector::should_drop_recv) {
            log::debug!("NetIo: loss injector dropped inbound datagram from {src}");
            return Ok((NetAddr::from_socket_addr(src), Vec::new()));
        }

        let mut source = NetAddr::from_socket_addr(src);
        source = normalize_source(source);
        source = self.aliases.resolve(&source);

        let mut framesets = Vec::new();
        let mut cursor = 0usize;
        while cursor < buf.len() {
            match frameset::unmarshal(&buf[cursor..], keys) {
                Ok((fs, consumed)) => {
                    cursor += consumed;
                    framesets.push(fs);
                }
                Err(e) => {
                    log::warn!("NetIo: dropping malformed frameset from {source}: {e}");
                    match tlv::get_u24(&buf[cursor..], 2) {
                        Ok(declared_len) => {
                            cursor += tlv::FRAMESET_HDR_SIZE + declared_len as usize;
                        }
                        Err(_) => break,
                    }
                }
            }
        }
        Ok((source, framesets))
    }
}

impl crate::reliability::Transmit for NetIo {
    fn transmit(
        &self,
        dest: &NetAddr,
        fs_type: u16,
        flags: u16,
        frames: &[Frame],
    ) -> Result<(), TransportError> {
        self.send_one(dest, fs_type, flags, frames, None, None)
    }
}

/// `::ffff:127.0.0.1` and `::1` both collapse to a plain IPv4 loopback
/// address for display/matching purposes (Section 4.6).
fn normalize_source(addr: NetAddr) -> NetAddr {
    let loopback = NetAddr::V4 {
        octets: [127, 0, 0, 1],
        port: addr.port(),
    };
    if matches!(addr, NetAddr::V6 { .. }) && addr == loopback {
        loopback
    } else {
        addr
    }
}
