// SPDX-License-Identifier: GPL-3.0-or-later

//! C-string frames (`FRAMETYPE_CSTRINGVAL`): UTF-8 text, NUL-terminated on
//! the wire for parity with `original_source`'s `cstringframe.c`, which reads
//! the value as a NUL-terminated C string.

use super::Frame;
use crate::error::DecodeError;

pub fn encode_cstring(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len() + 1);
    out.extend_from_slice(value.as_bytes());
    out.push(0);
    out
}

pub fn decode_cstring(type_code: u16, value: &[u8]) -> Result<Frame, DecodeError> {
    let body = match value.last() {
        Some(0) => &value[..value.len() - 1],
        _ => value,
    };
    let text = std::str::from_utf8(body)
        .map_err(|_| DecodeError::Malformed("string frame is not valid utf-8"))?;
    Ok(Frame::CString {
        type_code,
        value: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_with_nul_terminator() {
        let bytes = encode_cstring("hello");
        assert_eq!(bytes, b"hello\0");
        let frame = decode_cstring(crate::frame::types::CSTRING, &bytes).unwrap();
        assert_eq!(
            frame,
            Frame::CString {
                type_code: crate::frame::types::CSTRING,
                value: "hello".to_string(),
            }
        );
    }

    #[test]
    fn empty_string_roundtrips() {
        let bytes = encode_cstring("");
        let frame = decode_cstring(crate::frame::types::CSTRING, &bytes).unwrap();
        assert_eq!(
            frame,
            Frame::CString {
                type_code: crate::frame::types::CSTRING,
                value: String::new(),
            }
        );
    }

    #[test]
    fn missing_nul_is_tolerated() {
        let frame = decode_cstring(crate::frame::types::CSTRING, b"abc").unwrap();
        assert_eq!(
            frame,
            Frame::CString {
                type_code: crate::frame::types::CSTRING,
                value: "abc".to_string(),
            }
        );
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let bytes = [0xFFu8, 0xFE, 0];
        assert!(decode_cstring(crate::frame::types::CSTRING, &bytes).is_err());
    }
}
