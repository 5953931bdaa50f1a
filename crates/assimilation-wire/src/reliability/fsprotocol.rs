// SPDX-License-Identifier: GPL-3.0-or-later

//! `FsProtocol`: the reliable-UDP engine built on top of `FsQueue` (Section
//! 4.8, component C9).
//!
//! ```text
//! application                 FsProtocol                      NetIO
//!     |--- send(framesets) -------->|                            |
//!     |                             |--- enq + try_xmit -------->|--- UDP datagram -->
//!     |                             |                            |
//!     |<-- read() <- inbound queue -|<--- receive(src, fs) <------|<-- UDP datagram ---
//!     |--- ack_message(src, fs) --->|                            |
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use crate::config::RuntimeConfig;
use crate::error::TransportError;
use crate::frame::{Frame, SequenceNumber};
use crate::frameset::FrameSet;
use crate::netaddr::NetAddr;

use super::fsqueue::{FsQueue, InboundOutcome};

/// Connection lifecycle (Section 4.8: "simplified state machine").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Idle,
    Active,
    Closing,
    Closed,
}

/// Transmits a marshalled frameset to `dest`. Implemented by
/// `crate::transport::NetIo`; kept as a trait here so `reliability` does
/// not need to depend on socket machinery to be unit-testable.
pub trait Transmit {
    fn transmit(
        &self,
        dest: &NetAddr,
        fs_type: u16,
        flags: u16,
        frames: &[Frame],
    ) -> Result<(), TransportError>;
}

struct Connection {
    state: ConnState,
    outbound: FsQueue,
    inbound: FsQueue,
    last_sent_seqno: u64,
    last_ack_sent: u64,
    head_sent_at: Option<Instant>,
}

impl Connection {
    fn new(queue_id: u16, max_len: usize) -> Self {
        Self {
            state: ConnState::Idle,
            outbound: FsQueue::new(queue_id, max_len),
            inbound: FsQueue::new(queue_id, max_len),
            last_sent_seqno: 0,
            last_ack_sent: 0,
            head_sent_at: None,
        }
    }
}

type ConnKey = (NetAddr, u16);

/// The reliable-transport engine: owns every `FsQueue` pair, keyed by
/// destination address and queue id.
pub struct FsProtocol {
    session_id: u32,
    config: RuntimeConfig,
    connections: HashMap<ConnKey, Connection>,
    unacked: HashSet<ConnKey>,
    ready: VecDeque<ConnKey>,
}

impl FsProtocol {
    pub fn new(session_id: u32, config: RuntimeConfig) -> Self {
        Self {
            session_id,
            config,
            connections: HashMap::new(),
            unacked: HashSet::new(),
            ready: VecDeque::new(),
        }
    }

    fn connection_mut(&mut self, dest: &NetAddr, queue_id: u16) -> &mut Connection {
        self.connections
            .entry((dest.clone(), queue_id))
            .or_insert_with(|| Connection::new(queue_id, self.config.queue_max_len))
    }

    /// Section 4.8 send path: all-or-nothing enqueue of `framesets`, then
    /// kicks the transmit scheduler.
    pub fn send(
        &mut self,
        transmitter: &dyn Transmit,
        dest: &NetAddr,
        queue_id: u16,
        framesets: Vec<FrameSet>,
    ) -> Result<Vec<SequenceNumber>, TransportError> {
        {
            let conn = self.connection_mut(dest, queue_id);
            if matches!(conn.state, ConnState::Closing | ConnState::Closed) {
                return Err(TransportError::LinkShuttingDown);
            }
            if conn.outbound.len() + framesets.len() > self.config.queue_max_len {
                return Err(TransportError::QueueFull);
            }
        }

        let session_id = self.session_id;
        let mut assigned = Vec::with_capacity(framesets.len());
        {
            let conn = self.connection_mut(dest, queue_id);
            for fs in framesets {
                assigned.push(conn.outbound.enq(session_id, fs)?);
            }
            if conn.state == ConnState::Idle {
                conn.state = ConnState::Active;
            }
        }
        self.unacked.insert((dest.clone(), queue_id));
        self.try_xmit(transmitter, dest, queue_id)?;
        Ok(assigned)
    }

    /// Section 4.8 transmit scheduler: tops up the number of in-flight
    /// framesets to `window_size` total (sent-but-unacked plus newly sent),
    /// rather than allowing `window_size` additional sends on every call;
    /// retransmits a stale head.
    pub fn try_xmit(
        &mut self,
        transmitter: &dyn Transmit,
        dest: &NetAddr,
        queue_id: u16,
    ) -> Result<(), TransportError> {
        let window_size = self.config.window_size;
        let rexmit_interval = self.config.rexmit_interval;
        let now = Instant::now();

        let conn = match self.connections.get_mut(&(dest.clone(), queue_id)) {
            Some(c) => c,
            None => return Ok(()),
        };

        let outstanding = conn.outbound.outstanding_count(conn.last_sent_seqno);
        let budget = window_size.saturating_sub(outstanding);
        let to_send: Vec<(u16, u16, Vec<Frame>)> = conn
            .outbound
            .unsent_window(conn.last_sent_seqno, budget)
            .map(|(_, fs)| (fs.fs_type, fs.flags, fs.frames.clone()))
            .collect();
        let mut new_last_sent = conn.last_sent_seqno;
        for (fs_type, flags, frames) in &to_send {
            transmitter.transmit(dest, *fs_type, *flags, frames)?;
            if let Some(seq) = frames.iter().find_map(|f| match f {
                Frame::SeqNum { seq, .. } => Some(*seq),
                _ => None,
            }) {
                new_last_sent = new_last_sent.max(seq.request_id);
            }
        }
        if new_last_sent != conn.last_sent_seqno {
            conn.last_sent_seqno = new_last_sent;
            conn.head_sent_at = Some(now);
        }

        if let Some((_, head_fs)) = conn.outbound.peek_head() {
            let stale = conn
                .head_sent_at
                .map(|t| now.duration_since(t) > rexmit_interval)
                .unwrap_or(false);
            if stale {
                transmitter.transmit(dest, head_fs.fs_type, head_fs.flags, &head_fs.frames)?;
                conn.head_sent_at = Some(now);
            }
        } else {
            self.unacked.remove(&(dest.clone(), queue_id));
            if conn.state == ConnState::Closing {
                conn.state = ConnState::Closed;
            }
        }
        Ok(())
    }

    /// Section 4.8 receive path: routes an ACK frameset to `ack_through`,
    /// or a data frameset into the inbound queue (with duplicate-ACK
    /// recovery).
    pub fn receive(
        &mut self,
        transmitter: &dyn Transmit,
        src: &NetAddr,
        queue_id: u16,
        fs: FrameSet,
        is_ack: bool,
    ) -> Result<(), TransportError> {
        let seq = fs.seqnum();

        if is_ack {
            if let Some(seq) = seq {
                let conn = self.connection_mut(src, queue_id);
                conn.outbound.ack_through(&seq)?;
                if conn.outbound.is_empty() {
                    self.unacked.remove(&(src.clone(), queue_id));
                    if conn.state == ConnState::Closing {
                        conn.state = ConnState::Closed;
                    }
                }
            }
            return Ok(());
        }

        let outcome = {
            let conn = self.connection_mut(src, queue_id);
            if conn.state == ConnState::Idle {
                conn.state = ConnState::Active;
            }
            conn.inbound.inq_sorted(seq, fs)
        };

        match outcome {
            InboundOutcome::Queued | InboundOutcome::Unsequenced => {
                if !self.ready.contains(&(src.clone(), queue_id)) {
                    self.ready.push_back((src.clone(), queue_id));
                }
            }
            InboundOutcome::AlreadyDelivered => {
                let conn = self.connection_mut(src, queue_id);
                if conn.last_ack_sent > 0 {
                    let replay = SequenceNumber::new(self.session_id, queue_id, conn.last_ack_sent);
                    let ack_fs = ack_frameset(replay);
                    transmitter.transmit(src, ack_fs.fs_type, ack_fs.flags, &ack_fs.frames)?;
                }
            }
            InboundOutcome::Duplicate => {}
        }
        Ok(())
    }

    /// Section 4.8 read path: dequeue the head of the next ready connection
    /// if it is next in sequence.
    pub fn read(&mut self) -> Option<(NetAddr, u16, FrameSet)> {
        for _ in 0..self.ready.len() {
            let key = self.ready.pop_front()?;
            let conn = self.connections.get_mut(&key)?;
            if let Some(fs) = conn.inbound.read_next() {
                if !conn.inbound.is_empty() {
                    self.ready.push_back(key.clone());
                }
                return Some((key.0, key.1, fs));
            }
        }
        None
    }

    /// Application-driven ACK after processing `original_fs` (Section 4.8:
    /// `ack_message`).
    pub fn ack_message(
        &mut self,
        transmitter: &dyn Transmit,
        src: &NetAddr,
        queue_id: u16,
        original_fs: &FrameSet,
    ) -> Result<(), TransportError> {
        let Some(seq) = original_fs.seqnum() else {
            return Ok(());
        };
        let conn = self.connection_mut(src, queue_id);
        conn.last_ack_sent = conn.last_ack_sent.max(seq.request_id);
        let ack_fs = ack_frameset(seq);
        transmitter.transmit(src, ack_fs.fs_type, ack_fs.flags, &ack_fs.frames)
    }

    /// Begin graceful shutdown of a connection (Section 4.8: `close_conn`).
    pub fn close_conn(&mut self, dest: &NetAddr, queue_id: u16) {
        let conn = self.connection_mut(dest, queue_id);
        if conn.state == ConnState::Active {
            conn.state = ConnState::Closing;
        }
        if conn.outbound.is_empty() {
            conn.state = ConnState::Closed;
        }
    }

    pub fn state(&self, dest: &NetAddr, queue_id: u16) -> Option<ConnState> {
        self.connections.get(&(dest.clone(), queue_id)).map(|c| c.state)
    }

    /// Walk every connection with outstanding unacked output and retransmit
    /// as needed (Section 4.8: retransmission timer tick).
    pub fn tick(&mut self, transmitter: &dyn Transmit) -> Result<(), TransportError> {
        let keys: Vec<ConnKey> = self.unacked.iter().cloned().collect();
        for (dest, queue_id) in keys {
            self.try_xmit(transmitter, &dest, queue_id)?;
        }
        Ok(())
    }
}

const ACK_FRAMESET_TYPE: u16 = 0xFFFF;

fn ack_frameset(seq: SequenceNumber) -> FrameSet {
    FrameSet::new(
        ACK_FRAMESET_TYPE,
        0,
        vec![Frame::SeqNum {
            type_code: crate::frame::types::REQID,
            seq,
        }],
    )
}
