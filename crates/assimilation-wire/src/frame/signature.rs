// SPDX-License-Identifier: GPL-3.0-or-later

//! Signature frames (`FRAMETYPE_SIG`). Per Design Note (Open Question 1)
//! only the hash-only class is implemented; the authenticated-key class is
//! represented in the wire enum for forward compatibility but rejected at
//! the crypto layer with [`crate::error::CryptoError::Unsupported`].
//!
//! Wire layout: `class:u8 || minor:u8 || digest:bytes`. `generic_tlv_min.c`
//! requires the first frame of a valid frameset to be a signature frame;
//! `signframe.c` compares digests with a constant-width `memcmp`, which
//! [`crate::frameset::unmarshal`] preserves by comparing the computed and
//! received digests with `ring::constant_time::verify_slices_are_equal`
//! (timing-safe comparison) rather than `==`.

use super::Frame;
use crate::error::DecodeError;

/// Digest length for the only implemented signature class (SHA-256).
pub const SIGNATURE_DIGEST_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureClass {
    /// Plain digest, no key material: integrity only, no authentication.
    HashOnly,
    /// Digest over a key-derived MAC. Declared by the wire protocol but not
    /// implemented by this crate (see module docs).
    Authenticated,
}

impl SignatureClass {
    fn to_wire(self) -> u8 {
        match self {
            Self::HashOnly => 0,
            Self::Authenticated => 1,
        }
    }

    fn from_wire(b: u8) -> Result<Self, DecodeError> {
        match b {
            0 => Ok(Self::HashOnly),
            1 => Ok(Self::Authenticated),
            _ => Err(DecodeError::Malformed("unrecognised signature class")),
        }
    }
}

pub fn encode_signature(class: SignatureClass, minor: u8, digest: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + digest.len());
    out.push(class.to_wire());
    out.push(minor);
    out.extend_from_slice(digest);
    out
}

pub fn decode_signature(type_code: u16, value: &[u8]) -> Result<Frame, DecodeError> {
    if value.len() < 2 {
        return Err(DecodeError::Truncated);
    }
    let class = SignatureClass::from_wire(value[0])?;
    let minor = value[1];
    let digest = value[2..].to_vec();
    Ok(Frame::Signature {
        type_code,
        class,
        minor,
        digest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_hash_only() {
        let digest = vec![0xAAu8; SIGNATURE_DIGEST_LEN];
        let bytes = encode_signature(SignatureClass::HashOnly, 0, &digest);
        let frame = decode_signature(crate::frame::types::SIG, &bytes).unwrap();
        assert_eq!(
            frame,
            Frame::Signature {
                type_code: crate::frame::types::SIG,
                class: SignatureClass::HashOnly,
                minor: 0,
                digest,
            }
        );
    }

    #[test]
    fn authenticated_class_decodes_but_is_unsupported_downstream() {
        let bytes = encode_signature(SignatureClass::Authenticated, 1, &[0u8; 32]);
        let frame = decode_signature(crate::frame::types::SIG, &bytes).unwrap();
        assert!(matches!(
            frame,
            Frame::Signature {
                class: SignatureClass::Authenticated,
                ..
            }
        ));
    }

    #[test]
    fn truncated_header_is_rejected() {
        assert!(decode_signature(crate::frame::types::SIG, &[0u8]).is_err());
    }
}
