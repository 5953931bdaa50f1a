// SPDX-License-Identifier: GPL-3.0-or-later

//! Reliable-UDP delivery: `FsQueue` (ordered per-connection queues) and
//! `FsProtocol` (the engine that drives them), Sections 4.7-4.8.
//!
//! ```text
//! FsProtocol
//!   |-- per (dest, queue_id) --> FsQueue (outbound)  seqno assignment, window, rexmit
//!   |-- per (src, queue_id)  --> FsQueue (inbound)    sorted delivery, session adoption
//! ```

mod fsprotocol;
mod fsqueue;

pub use fsprotocol::{ConnState, FsProtocol, Transmit};
pub use fsqueue::{FsQueue, InboundOutcome};
