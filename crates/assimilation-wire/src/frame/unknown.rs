// SPDX-License-Identifier: GPL-3.0-or-later

//! Catch-all frame kind for unregistered type codes. Kept as its own module
//! (rather than inlined in `from_tlv`) so the dispatch table in `mod.rs`
//! reads as one kind per line, matching the teacher's `protocol::rtps`
//! convention of one file per submessage kind.

use super::Frame;

pub fn decode(type_code: u16, value: &[u8]) -> Frame {
    Frame::Unknown {
        type_code,
        bytes: value.to_vec(),
    }
}
