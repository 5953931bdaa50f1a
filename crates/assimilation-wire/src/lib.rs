// SPDX-License-Identifier: GPL-3.0-or-later

//! # assimilation-wire
//!
//! Wire protocol, reliable transport, and bootstrap machinery for
//! Assimilation Project nanoprobes and their CMA.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use assimilation_wire::config::RuntimeConfig;
//! use assimilation_wire::netaddr::NetAddr;
//! use assimilation_wire::reliability::FsProtocol;
//! use assimilation_wire::transport::NetIo;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bind_addr = NetAddr::V4 { octets: [0, 0, 0, 0], port: Some(0) };
//!     let io = NetIo::bind(&bind_addr, false)?;
//!     let mut proto = FsProtocol::new(1, RuntimeConfig::default());
//!     let _ = (&io, &mut proto);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +-------------------------------------------------------------------+
//! |               orchestrator (bootstrap, CMA command intake)        |
//! +-------------------------------------------------------------------+
//! |  heartbeat (HbSender/HbListener)   |   discovery (cache + dispatch)|
//! +-------------------------------------------------------------------+
//! |            reliability (FsQueue, FsProtocol sliding window)        |
//! +-------------------------------------------------------------------+
//! |  frameset (marshal/unmarshal)      |   crypto (X25519 + AES-GCM)  |
//! +-------------------------------------------------------------------+
//! |  frame (TLV family)  |  netaddr  |  tlv (primitive codec)          |
//! +-------------------------------------------------------------------+
//! |                    transport (NetIO: UDP socket wrapper)           |
//! +-------------------------------------------------------------------+
//! ```
//!
//! ## Modules Overview
//!
//! - [`config`] - compile-time constants and runtime-adjustable knobs
//! - [`error`] - crate-wide error types
//! - [`tlv`] - primitive big-endian TLV field codec
//! - [`netaddr`] - polymorphic network address (IPv4/IPv6/MAC)
//! - [`frame`] - typed TLV frame family
//! - [`frameset`] - frameset marshalling/unmarshalling (signature, compression, encryption)
//! - [`crypto`] - X25519 key agreement, HKDF session keys, on-disk key store
//! - [`transport`] - `NetIO` UDP socket wrapper, multicast, loss injection
//! - [`reliability`] - `FsQueue`/`FsProtocol` reliable-UDP delivery
//! - [`heartbeat`] - `HbSender`/`HbListener` liveness tracking
//! - [`discovery`] - change-triggered discovery-result dispatch
//! - [`orchestrator`] - nanoprobe bootstrap and CMA command intake

pub mod config;
pub mod crypto;
pub mod discovery;
pub mod error;
pub mod frame;
pub mod frameset;
pub mod heartbeat;
pub mod netaddr;
pub mod orchestrator;
pub mod reliability;
pub mod tlv;
pub mod transport;

pub use error::{CryptoError, DecodeError, TransportError};
pub use frameset::FrameSet;
pub use netaddr::NetAddr;
