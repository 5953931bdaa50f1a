// SPDX-License-Identifier: GPL-3.0-or-later

//! Sequence-number frames (`FRAMETYPE_REQID`), grounded on
//! `examples/original_source/clientlib/seqnoframe.c`'s wire layout:
//! `session_id:u32 || request_id:u64 || queue_id:u16`, all network byte
//! order, 14 bytes total.

use std::cmp::Ordering;

use super::Frame;
use crate::error::DecodeError;
use crate::tlv;

/// A `FsProtocol` sequence number: identifies one message within one
/// session on one logical queue.
///
/// `Ord` compares `(session_id, request_id)` lexicographically; `queue_id`
/// does not participate in ordering, since two sequence numbers on
/// different queues of the same session are not ordered relative to each
/// other. Per Design Note (Open Question 2), `request_id` is compared as a
/// plain `u64` with no wraparound handling — wrapping a `u64` counter in a
/// single process lifetime is not a practical concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SequenceNumber {
    pub session_id: u32,
    pub queue_id: u16,
    pub request_id: u64,
}

impl PartialOrd for SequenceNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SequenceNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.session_id, self.request_id).cmp(&(other.session_id, other.request_id))
    }
}

impl SequenceNumber {
    pub fn new(session_id: u32, queue_id: u16, request_id: u64) -> Self {
        Self {
            session_id,
            queue_id,
            request_id,
        }
    }

    /// The next sequence number on the same session and queue.
    pub fn next(&self) -> Self {
        Self {
            request_id: self.request_id + 1,
            ..*self
        }
    }

    /// True if `self` immediately follows `prev` (same session/queue, `request_id` off by one).
    pub fn follows(&self, prev: &Self) -> bool {
        self.session_id == prev.session_id
            && self.queue_id == prev.queue_id
            && self.request_id == prev.request_id + 1
    }
}

pub fn encode_seqnum(seq: &SequenceNumber) -> Vec<u8> {
    let mut out = vec![0u8; 14];
    tlv::put_u32(&mut out, 0, seq.session_id).expect("fixed-size buffer");
    tlv::put_u64(&mut out, 4, seq.request_id).expect("fixed-size buffer");
    tlv::put_u16(&mut out, 12, seq.queue_id).expect("fixed-size buffer");
    out
}

pub fn decode_seqnum(type_code: u16, value: &[u8]) -> Result<Frame, DecodeError> {
    if value.len() != 14 {
        return Err(DecodeError::Malformed("sequence number frame must be 14 bytes"));
    }
    let session_id = tlv::get_u32(value, 0)?;
    let request_id = tlv::get_u64(value, 4)?;
    let queue_id = tlv::get_u16(value, 12)?;
    Ok(Frame::SeqNum {
        type_code,
        seq: SequenceNumber::new(session_id, queue_id, request_id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips() {
        let seq = SequenceNumber::new(7, 3, 42);
        let bytes = encode_seqnum(&seq);
        assert_eq!(bytes.len(), 14);
        let frame = decode_seqnum(crate::frame::types::REQID, &bytes).unwrap();
        assert_eq!(
            frame,
            Frame::SeqNum {
                type_code: crate::frame::types::REQID,
                seq,
            }
        );
    }

    #[test]
    fn next_increments_request_id_only() {
        let seq = SequenceNumber::new(1, 1, 10);
        let next = seq.next();
        assert_eq!(next.request_id, 11);
        assert_eq!(next.session_id, seq.session_id);
        assert_eq!(next.queue_id, seq.queue_id);
        assert!(next.follows(&seq));
    }

    #[test]
    fn ordering_compares_request_id_within_same_session_and_queue() {
        let a = SequenceNumber::new(1, 1, 5);
        let b = SequenceNumber::new(1, 1, 6);
        assert!(a < b);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let bytes = [0u8; 13];
        assert!(decode_seqnum(crate::frame::types::REQID, &bytes).is_err());
    }
}
