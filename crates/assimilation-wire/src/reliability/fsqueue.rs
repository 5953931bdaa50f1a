// SPDX-License-Identifier: GPL-3.0-or-later

//! `FsQueue`: a bounded, session-aware ordered queue of framesets for one
//! peer/queue-id pair (Section 4.7, component C8).
//!
//! Grounded on the teacher's `reliability::gap_tracker`/`reliability::seq`
//! pair: a small piece of per-connection state tracking what has been sent,
//! what has been acked, and what has arrived out of order, colocated with
//! rich doc comments describing the exact adoption/reset/reject rules.

use std::collections::VecDeque;

use crate::error::TransportError;
use crate::frame::SequenceNumber;
use crate::frameset::FrameSet;

/// Outcome of [`FsQueue::inq_sorted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundOutcome {
    /// Inserted (possibly out of order); caller should not ACK yet unless
    /// it is now at the head in sequence.
    Queued,
    /// Already delivered (`request_id < next_seqno`); caller should re-ACK.
    AlreadyDelivered,
    /// Exact duplicate of a frameset still queued; silently dropped.
    Duplicate,
    /// Unsequenced frameset, pushed to the head unconditionally.
    Unsequenced,
}

/// Bounded ordered queue of framesets for one (peer, queue-id) pair.
///
/// The same type serves both directions: outbound queues track
/// `next_seqno` to assign to newly enqueued framesets; inbound queues track
/// the session id and `next_seqno` expected from the peer.
pub struct FsQueue {
    queue_id: u16,
    max_len: usize,
    session_id: Option<u32>,
    next_seqno: u64,
    items: VecDeque<(Option<SequenceNumber>, FrameSet)>,
}

impl FsQueue {
    pub fn new(queue_id: u16, max_len: usize) -> Self {
        Self {
            queue_id,
            max_len,
            session_id: None,
            next_seqno: 1,
            items: VecDeque::new(),
        }
    }

    pub fn queue_id(&self) -> u16 {
        self.queue_id
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn session_id(&self) -> Option<u32> {
        self.session_id
    }

    pub fn next_seqno(&self) -> u64 {
        self.next_seqno
    }

    /// Outbound enqueue: assigns `next_seqno`, prepends a sequence-number
    /// frame to `fs`, and pushes to the tail.
    pub fn enq(&mut self, session_id: u32, mut fs: FrameSet) -> Result<SequenceNumber, TransportError> {
        if self.items.len() >= self.max_len {
            return Err(TransportError::QueueFull);
        }
        self.session_id.get_or_insert(session_id);
        let seq = SequenceNumber::new(session_id, self.queue_id, self.next_seqno);
        fs.frames.insert(
            0,
            crate::frame::Frame::SeqNum {
                type_code: crate::frame::types::REQID,
                seq,
            },
        );
        self.next_seqno += 1;
        self.items.push_back((Some(seq), fs));
        Ok(seq)
    }

    /// Peek the head of the queue without removing it.
    pub fn peek_head(&self) -> Option<&(Option<SequenceNumber>, FrameSet)> {
        self.items.front()
    }

    pub fn pop_head(&mut self) -> Option<(Option<SequenceNumber>, FrameSet)> {
        self.items.pop_front()
    }

    /// Every queued frameset whose sequence number is greater than
    /// `last_sent`, in order, up to `budget` entries. `budget` is the number
    /// of *additional* framesets the caller may place in flight; it is the
    /// caller's responsibility to size it as `window_size` minus whatever
    /// [`Self::outstanding_count`] already reports, so that sent-but-unacked
    /// framesets and newly-sent framesets together never exceed the window.
    pub fn unsent_window<'a>(
        &'a self,
        last_sent: u64,
        budget: usize,
    ) -> impl Iterator<Item = &'a (Option<SequenceNumber>, FrameSet)> + 'a {
        self.items
            .iter()
            .filter(move |(seq, _)| seq.map(|s| s.request_id > last_sent).unwrap_or(true))
            .take(budget)
    }

    /// Number of queued framesets already sent (`request_id <= last_sent`)
    /// but not yet acked — i.e. still present because [`Self::ack_through`]
    /// hasn't dropped them. Used alongside [`Self::unsent_window`] to keep
    /// the total number of in-flight framesets bounded by the window size,
    /// matching `_fsprotocol_xmitifwecan`'s queue-length gate.
    pub fn outstanding_count(&self, last_sent: u64) -> usize {
        self.items
            .iter()
            .filter(|(seq, _)| seq.map(|s| s.request_id <= last_sent).unwrap_or(false))
            .count()
    }

    /// Drop every queued frameset with `request_id <= seqno.request_id`
    /// (Section 4.7: `ack_through`).
    pub fn ack_through(&mut self, seqno: &SequenceNumber) -> Result<(), TransportError> {
        if self.session_id.is_some_and(|s| s != seqno.session_id) {
            return Err(TransportError::WrongSession);
        }
        self.items
            .retain(|(seq, _)| seq.map(|s| s.request_id > seqno.request_id).unwrap_or(true));
        Ok(())
    }

    /// Inbound sorted enqueue (Section 4.7: `inq_sorted`).
    pub fn inq_sorted(&mut self, incoming_seq: Option<SequenceNumber>, fs: FrameSet) -> InboundOutcome {
        let Some(seq) = incoming_seq else {
            self.items.push_front((None, fs));
            return InboundOutcome::Unsequenced;
        };

        match self.session_id {
            None => {
                self.session_id = Some(seq.session_id);
                if seq.request_id > 2 {
                    log::info!(
                        "FsQueue({}): resuming peer session {} at request_id {}",
                        self.queue_id,
                        seq.session_id,
                        seq.request_id
                    );
                    self.next_seqno = seq.request_id;
                } else {
                    self.next_seqno = 1;
                }
            }
            Some(current) if seq.session_id < current => return InboundOutcome::AlreadyDelivered,
            Some(current) if seq.session_id > current => {
                log::info!(
                    "FsQueue({}): peer session reset {} -> {}",
                    self.queue_id,
                    current,
                    seq.session_id
                );
                self.session_id = Some(seq.session_id);
                self.next_seqno = 1;
                self.items.clear();
            }
            Some(_) => {}
        }

        if seq.request_id < self.next_seqno {
            return InboundOutcome::AlreadyDelivered;
        }
        if self
            .items
            .iter()
            .any(|(existing, _)| existing.as_ref().map(|e| e.request_id) == Some(seq.request_id))
        {
            return InboundOutcome::Duplicate;
        }

        let insert_at = self
            .items
            .iter()
            .position(|(existing, _)| {
                existing
                    .as_ref()
                    .map(|e| e.request_id > seq.request_id)
                    .unwrap_or(false)
            })
            .unwrap_or(self.items.len());
        self.items.insert(insert_at, (Some(seq), fs));
        InboundOutcome::Queued
    }

    /// Dequeue the head if and only if it is next in sequence (or
    /// unsequenced), advancing `next_seqno` (Section 4.8: `read`).
    pub fn read_next(&mut self) -> Option<FrameSet> {
        let ready = match self.items.front() {
            Some((None, _)) => true,
            Some((Some(seq), _)) => seq.request_id == self.next_seqno,
            None => false,
        };
        if !ready {
            return None;
        }
        let (seq, fs) = self.items.pop_front()?;
        if let Some(seq) = seq {
            self.next_seqno = seq.request_id + 1;
        }
        Some(fs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frameset::FrameSet;

    fn empty_fs(fs_type: u16) -> FrameSet {
        FrameSet::new(fs_type, 0, Vec::new())
    }

    #[test]
    fn enq_assigns_increasing_sequence_numbers() {
        let mut q = FsQueue::new(0, 10);
        let s1 = q.enq(1, empty_fs(1)).unwrap();
        let s2 = q.enq(1, empty_fs(2)).unwrap();
        assert_eq!(s1.request_id, 1);
        assert_eq!(s2.request_id, 2);
    }

    #[test]
    fn queue_full_rejects_enq() {
        let mut q = FsQueue::new(0, 1);
        q.enq(1, empty_fs(1)).unwrap();
        assert_eq!(q.enq(1, empty_fs(2)), Err(TransportError::QueueFull));
    }

    #[test]
    fn first_message_adopts_session_and_reports_resume() {
        let mut q = FsQueue::new(0, 10);
        let seq = SequenceNumber::new(5, 0, 9);
        let outcome = q.inq_sorted(Some(seq), empty_fs(1));
        assert_eq!(outcome, InboundOutcome::Queued);
        assert_eq!(q.session_id(), Some(5));
        assert_eq!(q.next_seqno(), 9);
    }

    #[test]
    fn older_session_is_rejected() {
        let mut q = FsQueue::new(0, 10);
        q.inq_sorted(Some(SequenceNumber::new(5, 0, 1)), empty_fs(1));
        let outcome = q.inq_sorted(Some(SequenceNumber::new(4, 0, 1)), empty_fs(2));
        assert_eq!(outcome, InboundOutcome::AlreadyDelivered);
    }

    #[test]
    fn newer_session_resets_queue() {
        let mut q = FsQueue::new(0, 10);
        q.inq_sorted(Some(SequenceNumber::new(5, 0, 1)), empty_fs(1));
        q.read_next();
        let outcome = q.inq_sorted(Some(SequenceNumber::new(6, 0, 1)), empty_fs(2));
        assert_eq!(outcome, InboundOutcome::Queued);
        assert_eq!(q.session_id(), Some(6));
        assert_eq!(q.next_seqno(), 1);
    }

    #[test]
    fn already_delivered_is_reported_for_replay() {
        let mut q = FsQueue::new(0, 10);
        q.inq_sorted(Some(SequenceNumber::new(1, 0, 1)), empty_fs(1));
        q.read_next();
        let outcome = q.inq_sorted(Some(SequenceNumber::new(1, 0, 1)), empty_fs(1));
        assert_eq!(outcome, InboundOutcome::AlreadyDelivered);
    }

    #[test]
    fn out_of_order_delivery_is_buffered_then_released_in_order() {
        let mut q = FsQueue::new(0, 10);
        q.inq_sorted(Some(SequenceNumber::new(1, 0, 2)), empty_fs(2));
        assert!(q.read_next().is_none());
        q.inq_sorted(Some(SequenceNumber::new(1, 0, 1)), empty_fs(1));
        assert_eq!(q.read_next().unwrap().fs_type, 1);
        assert_eq!(q.read_next().unwrap().fs_type, 2);
    }

    #[test]
    fn exact_duplicate_is_dropped_silently() {
        let mut q = FsQueue::new(0, 10);
        q.inq_sorted(Some(SequenceNumber::new(1, 0, 2)), empty_fs(2));
        let outcome = q.inq_sorted(Some(SequenceNumber::new(1, 0, 2)), empty_fs(2));
        assert_eq!(outcome, InboundOutcome::Duplicate);
    }

    #[test]
    fn unsequenced_framesets_go_to_head() {
        let mut q = FsQueue::new(0, 10);
        q.inq_sorted(Some(SequenceNumber::new(1, 0, 1)), empty_fs(1));
        let outcome = q.inq_sorted(None, empty_fs(99));
        assert_eq!(outcome, InboundOutcome::Unsequenced);
        assert_eq!(q.read_next().unwrap().fs_type, 99);
    }

    #[test]
    fn ack_through_drops_acked_prefix() {
        let mut q = FsQueue::new(0, 10);
        let s1 = q.enq(1, empty_fs(1)).unwrap();
        q.enq(1, empty_fs(2)).unwrap();
        q.ack_through(&s1).unwrap();
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn outstanding_count_reports_sent_but_unacked_items() {
        let mut q = FsQueue::new(0, 10);
        q.enq(1, empty_fs(1)).unwrap();
        q.enq(1, empty_fs(2)).unwrap();
        q.enq(1, empty_fs(3)).unwrap();
        assert_eq!(q.outstanding_count(0), 0);
        assert_eq!(q.outstanding_count(2), 2);
        assert_eq!(q.outstanding_count(3), 3);
    }

    #[test]
    fn ack_through_wrong_session_is_rejected() {
        let mut q = FsQueue::new(0, 10);
        q.enq(1, empty_fs(1)).unwrap();
        let wrong = SequenceNumber::new(2, 0, 1);
        assert_eq!(q.ack_through(&wrong), Err(TransportError::WrongSession));
    }
}
