// SPDX-License-Identifier: GPL-3.0-or-later

//! Encryption frames (`FRAMETYPE_CRYPTCURVE25519`). Like compression, the
//! frame's own TLV value carries only metadata (sender/receiver key id,
//! nonce, AEAD tag); the ciphertext is the remainder of the frameset and is
//! sealed/opened in place by [`crate::frameset`] via [`seal`]/[`open`].
//! Key agreement itself (X25519 + HKDF) lives in `crate::crypto`, grounded
//! on the teacher's `security::crypto` module's `ring::agreement` usage.

use ring::aead::{self, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};

use super::Frame;
use crate::config::{is_legal_key_id_char, MAX_KEY_ID_LEN};
use crate::error::{CryptoError, DecodeError};

pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionMeta {
    pub sender_key_id: String,
    pub receiver_key_id: String,
    pub nonce: [u8; NONCE_LEN],
    pub tag: [u8; TAG_LEN],
}

pub fn encode_encryption_meta(meta: &EncryptionMeta) -> Vec<u8> {
    let mut out = Vec::with_capacity(
        2 + meta.sender_key_id.len() + meta.receiver_key_id.len() + NONCE_LEN + TAG_LEN,
    );
    out.push(meta.sender_key_id.len() as u8);
    out.extend_from_slice(meta.sender_key_id.as_bytes());
    out.push(meta.receiver_key_id.len() as u8);
    out.extend_from_slice(meta.receiver_key_id.as_bytes());
    out.extend_from_slice(&meta.nonce);
    out.extend_from_slice(&meta.tag);
    out
}

pub fn decode_encryption(type_code: u16, value: &[u8]) -> Result<Frame, DecodeError> {
    let mut cursor = 0usize;
    let sender_key_id = read_key_id(value, &mut cursor)?;
    let receiver_key_id = read_key_id(value, &mut cursor)?;
    let nonce: [u8; NONCE_LEN] = value
        .get(cursor..cursor + NONCE_LEN)
        .ok_or(DecodeError::Truncated)?
        .try_into()
        .expect("slice length checked above");
    cursor += NONCE_LEN;
    let tag: [u8; TAG_LEN] = value
        .get(cursor..cursor + TAG_LEN)
        .ok_or(DecodeError::Truncated)?
        .try_into()
        .expect("slice length checked above");
    Ok(Frame::Encryption {
        type_code,
        meta: EncryptionMeta {
            sender_key_id,
            receiver_key_id,
            nonce,
            tag,
        },
    })
}

fn read_key_id(value: &[u8], cursor: &mut usize) -> Result<String, DecodeError> {
    let len = *value.get(*cursor).ok_or(DecodeError::Truncated)? as usize;
    if len > MAX_KEY_ID_LEN {
        return Err(CryptoError::BadKey.into());
    }
    *cursor += 1;
    let bytes = value
        .get(*cursor..*cursor + len)
        .ok_or(DecodeError::Truncated)?;
    *cursor += len;
    let key_id = std::str::from_utf8(bytes).map_err(|_| CryptoError::BadKey)?;
    if key_id.is_empty() || !key_id.chars().all(is_legal_key_id_char) {
        return Err(CryptoError::BadKey.into());
    }
    Ok(key_id.to_string())
}

/// Seal `plaintext` in place with a 256-bit key, returning `(ciphertext, nonce, tag)`.
pub fn seal(key_bytes: &[u8; 32], nonce: [u8; NONCE_LEN], plaintext: &[u8]) -> Result<(Vec<u8>, [u8; TAG_LEN]), CryptoError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key_bytes).map_err(|_| CryptoError::BadKey)?;
    let key = LessSafeKey::new(unbound);
    let mut in_out = plaintext.to_vec();
    let tag = key
        .seal_in_place_separate_tag(Nonce::assume_unique_for_key(nonce), aead::Aad::empty(), &mut in_out)
        .map_err(|_| CryptoError::BadKey)?;
    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(tag.as_ref());
    Ok((in_out, tag_bytes))
}

/// Inverse of [`seal`]: verifies `tag` and decrypts `ciphertext` in place.
pub fn open(
    key_bytes: &[u8; 32],
    nonce: [u8; NONCE_LEN],
    tag: &[u8; TAG_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key_bytes).map_err(|_| CryptoError::BadKey)?;
    let key = LessSafeKey::new(unbound);
    let mut in_out = ciphertext.to_vec();
    in_out.extend_from_slice(tag);
    let plaintext = key
        .open_in_place(Nonce::assume_unique_for_key(nonce), aead::Aad::empty(), &mut in_out)
        .map_err(|_| CryptoError::BadAuthentication)?;
    Ok(plaintext.to_vec())
}
