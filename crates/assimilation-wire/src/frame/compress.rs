// SPDX-License-Identifier: GPL-3.0-or-later

//! Compression frames (`FRAMETYPE_COMPRESS`). The frame itself only carries
//! metadata (method, uncompressed length); the compressed bytes are the
//! remainder of the frameset and are handled by [`crate::frameset`], which
//! calls [`compress_payload`]/[`decompress_payload`] directly.

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use super::Frame;
use crate::error::DecodeError;
use crate::tlv;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Zlib,
}

impl CompressionMethod {
    fn to_wire(self) -> u8 {
        match self {
            Self::Zlib => 0,
        }
    }

    fn from_wire(b: u8) -> Result<Self, DecodeError> {
        match b {
            0 => Ok(Self::Zlib),
            _ => Err(DecodeError::Malformed("unrecognised compression method")),
        }
    }
}

pub fn encode_compression(method: CompressionMethod, uncompressed_len: u32) -> Vec<u8> {
    let mut out = vec![0u8; 5];
    out[0] = method.to_wire();
    tlv::put_u32(&mut out, 1, uncompressed_len).expect("fixed-size buffer");
    out
}

pub fn decode_compression(type_code: u16, value: &[u8]) -> Result<Frame, DecodeError> {
    if value.len() != 5 {
        return Err(DecodeError::Malformed("compression frame must be 5 bytes"));
    }
    let method = CompressionMethod::from_wire(value[0])?;
    let uncompressed_len = tlv::get_u32(value, 1)?;
    Ok(Frame::Compression {
        type_code,
        method,
        uncompressed_len,
    })
}

/// Compress `payload` under `method`, for prepending a compression frame.
pub fn compress_payload(method: CompressionMethod, payload: &[u8]) -> std::io::Result<Vec<u8>> {
    match method {
        CompressionMethod::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(payload)?;
            encoder.finish()
        }
    }
}

/// Inverse of [`compress_payload`]. `expected_len` is a sanity bound taken
/// from the compression frame's `uncompressed_len` field, guarding against
/// decompression bombs: the reader is capped at `expected_len + 1` bytes so a
/// stream that inflates past the declared length is rejected without being
/// fully inflated.
pub fn decompress_payload(
    method: CompressionMethod,
    compressed: &[u8],
    expected_len: u32,
) -> Result<Vec<u8>, DecodeError> {
    match method {
        CompressionMethod::Zlib => {
            let decoder = ZlibDecoder::new(compressed);
            let cap = u64::from(expected_len);
            let mut out = Vec::with_capacity(expected_len as usize);
            let read = decoder
                .take(cap + 1)
                .read_to_end(&mut out)
                .map_err(|_| DecodeError::Malformed("compressed payload failed to inflate"))?;
            if read as u64 > cap || out.len() as u64 != cap {
                return Err(DecodeError::Malformed(
                    "inflated length does not match compression frame",
                ));
            }
            Ok(out)
        }
    }
}
