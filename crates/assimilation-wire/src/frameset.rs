// SPDX-License-Identifier: GPL-3.0-or-later

//! FrameSet: an ordered list of frames that marshals to one datagram
//! (Section 3, component C3).
//!
//! Marshalling order (Section 4.3): strip any pre-existing envelope frames,
//! optionally prepend compression, optionally prepend encryption, prepend
//! the signature, append an end-marker. This implementation builds the
//! final byte buffer with an ordinary growable `Vec` rather than the
//! C ancestor's single pre-sized buffer filled back-to-front — the
//! observable wire bytes are identical, and a `Vec` is the idiomatic
//! equivalent once the unsafe in-place buffer-reuse trick is off the table.

use ring::digest::{digest, SHA256};

use crate::error::{CryptoError, DecodeError};
use crate::frame::{
    self, types, CompressionMethod, EncryptionMeta, Frame, SignatureClass, SIGNATURE_DIGEST_LEN,
};
use crate::tlv;

/// A decoded or to-be-marshalled frameset.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSet {
    pub fs_type: u16,
    pub flags: u16,
    pub frames: Vec<Frame>,
}

impl FrameSet {
    pub fn new(fs_type: u16, flags: u16, frames: Vec<Frame>) -> Self {
        Self {
            fs_type,
            flags,
            frames,
        }
    }

    /// The first sequence-number frame in this frameset, if any (Section
    /// 3: "A sequenced frameset ... contains a sequence-number frame
    /// immediately after the signature").
    pub fn seqnum(&self) -> Option<crate::frame::SequenceNumber> {
        self.frames.iter().find_map(|f| match f {
            Frame::SeqNum { seq, .. } => Some(*seq),
            _ => None,
        })
    }

    /// Application frames: everything except signature/compression/
    /// encryption/end-marker envelope frames.
    pub fn payload_frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter().filter(|f| {
            !matches!(
                f,
                Frame::Signature { .. }
                    | Frame::Compression { .. }
                    | Frame::Encryption { .. }
                    | Frame::End { .. }
            )
        })
    }
}

/// Compression parameters applied during marshalling if the payload exceeds `threshold`.
#[derive(Debug, Clone, Copy)]
pub struct CompressionConfig {
    pub method: CompressionMethod,
    pub threshold: usize,
}

/// Encryption parameters applied during marshalling. The symmetric key has
/// already been derived (by `crate::crypto`'s X25519 key agreement) before
/// reaching this layer; `frameset` only performs the AEAD seal/open.
#[derive(Debug, Clone, Copy)]
pub struct EncryptionConfig<'a> {
    pub sender_key_id: &'a str,
    pub receiver_key_id: &'a str,
    pub key: &'a [u8; 32],
    pub nonce: [u8; 12],
}

/// Marshal `payload_frames` (application frames only, no envelope frames)
/// into one datagram, applying compression/encryption/signature per
/// Section 4.3.
pub fn marshal(
    fs_type: u16,
    flags: u16,
    payload_frames: &[Frame],
    compression: Option<CompressionConfig>,
    encryption: Option<EncryptionConfig<'_>>,
) -> Result<Vec<u8>, CryptoError> {
    let mut plaintext = Vec::new();
    for f in payload_frames {
        f.write_tlv(&mut plaintext);
    }
    Frame::End {
        type_code: types::END,
    }
    .write_tlv(&mut plaintext);

    let mut body = plaintext.clone();
    let mut comp_tlv = Vec::new();
    if let Some(cfg) = compression {
        if plaintext.len() > cfg.threshold {
            let compressed = frame::compress_payload(cfg.method, &plaintext)
                .map_err(|_| CryptoError::BadKey)?;
            Frame::Compression {
                type_code: types::COMPRESS,
                method: cfg.method,
                uncompressed_len: plaintext.len() as u32,
            }
            .write_tlv(&mut comp_tlv);
            body = compressed;
        }
    }

    let mut enc_tlv = Vec::new();
    if let Some(cfg) = encryption {
        let mut before_encryption = comp_tlv.clone();
        before_encryption.extend_from_slice(&body);
        let (ciphertext, tag) = frame::seal(cfg.key, cfg.nonce, &before_encryption)?;
        Frame::Encryption {
            type_code: types::CRYPTCURVE25519,
            meta: EncryptionMeta {
                sender_key_id: cfg.sender_key_id.to_string(),
                receiver_key_id: cfg.receiver_key_id.to_string(),
                nonce: cfg.nonce,
                tag,
            },
        }
        .write_tlv(&mut enc_tlv);
        body = ciphertext;
        comp_tlv.clear();
    }

    let mut after_signature = enc_tlv;
    after_signature.extend_from_slice(&comp_tlv);
    after_signature.extend_from_slice(&body);

    let digest_bytes = digest(&SHA256, &after_signature);
    let sig = Frame::Signature {
        type_code: types::SIG,
        class: SignatureClass::HashOnly,
        minor: 0,
        digest: digest_bytes.as_ref().to_vec(),
    };
    let mut frames_bytes = Vec::new();
    sig.write_tlv(&mut frames_bytes);
    frames_bytes.extend_from_slice(&after_signature);

    let mut out = vec![0u8; tlv::FRAMESET_HDR_SIZE];
    tlv::put_u16(&mut out, 0, fs_type).expect("fixed-size header");
    tlv::put_u24(&mut out, 2, frames_bytes.len() as u32).expect("fixed-size header");
    tlv::put_u16(&mut out, 5, flags).expect("fixed-size header");
    out.extend_from_slice(&frames_bytes);
    Ok(out)
}

/// Looks up the shared symmetric key for an (sender, receiver) key-id pair,
/// as derived by `crate::crypto`'s key agreement.
pub trait KeyLookup {
    fn symmetric_key(&self, sender_key_id: &str, receiver_key_id: &str) -> Option<[u8; 32]>;
}

/// Unmarshal one frameset starting at `buf[0]`. Returns the frameset and the
/// number of bytes consumed (header + declared length), so callers can
/// advance to the next frameset in the same datagram.
pub fn unmarshal(buf: &[u8], keys: &dyn KeyLookup) -> Result<(FrameSet, usize), DecodeError> {
    let fs_type = tlv::get_u16(buf, 0)?;
    let fs_length = tlv::get_u24(buf, 2)? as usize;
    let flags = tlv::get_u16(buf, 5)?;
    let frames_start = tlv::FRAMESET_HDR_SIZE;
    let frames_end = frames_start
        .checked_add(fs_length)
        .ok_or(DecodeError::LengthOverrun)?;
    if frames_end > buf.len() {
        return Err(DecodeError::LengthOverrun);
    }

    let mut cursor = frames_start;
    let (sig_type, sig_len) = read_tlv_header(buf, cursor)?;
    if sig_type != types::SIG {
        return Err(DecodeError::MissingSignature);
    }
    let sig_value_start = cursor + tlv::TLV_HDR_SIZE;
    let sig_value_end = sig_value_start
        .checked_add(sig_len)
        .ok_or(DecodeError::LengthOverrun)?;
    if sig_value_end > frames_end {
        return Err(DecodeError::LengthOverrun);
    }
    let sig_frame = Frame::from_tlv(sig_type, &buf[sig_value_start..sig_value_end])?;
    let (sig_class, sig_digest) = match &sig_frame {
        Frame::Signature { class, digest, .. } => (*class, digest.clone()),
        _ => unreachable!("type code dispatched to signature constructor"),
    };
    if sig_class != SignatureClass::HashOnly {
        return Err(DecodeError::Malformed(
            "only hash-only signatures are supported",
        ));
    }
    if sig_digest.len() != SIGNATURE_DIGEST_LEN {
        return Err(DecodeError::Malformed("signature digest has wrong length"));
    }
    let after_signature = &buf[sig_value_end..frames_end];
    let computed = digest(&SHA256, after_signature);
    if ring::constant_time::verify_slices_are_equal(computed.as_ref(), sig_digest.as_slice())
        .is_err()
    {
        return Err(DecodeError::Malformed("signature digest mismatch"));
    }

    let mut frames = vec![sig_frame];
    cursor = sig_value_end;

    // The remainder may start with an encryption frame, then a compression
    // frame, then plaintext application frames (Section 4.3 step order).
    let mut remainder: Vec<u8> = buf[cursor..frames_end].to_vec();
    let mut pos = 0usize;

    if let Some((type_code, len)) = peek_tlv_header(&remainder, pos) {
        if type_code == types::CRYPTCURVE25519 {
            let value_start = pos + tlv::TLV_HDR_SIZE;
            let value_end = value_start
                .checked_add(len)
                .ok_or(DecodeError::LengthOverrun)?;
            if value_end > remainder.len() {
                return Err(DecodeError::LengthOverrun);
            }
            let enc_frame = Frame::from_tlv(type_code, &remainder[value_start..value_end])?;
            let meta = match &enc_frame {
                Frame::Encryption { meta, .. } => meta.clone(),
                _ => unreachable!("type code dispatched to encryption constructor"),
            };
            let key = keys
                .symmetric_key(&meta.sender_key_id, &meta.receiver_key_id)
                .ok_or(CryptoError::UnknownKey)?;
            let ciphertext = &remainder[value_end..];
            let plaintext = frame::open(&key, meta.nonce, &meta.tag, ciphertext)?;
            frames.push(enc_frame);
            remainder = plaintext;
            pos = 0;
        }
    }

    if let Some((type_code, len)) = peek_tlv_header(&remainder, pos) {
        if type_code == types::COMPRESS {
            let value_start = pos + tlv::TLV_HDR_SIZE;
            let value_end = value_start
                .checked_add(len)
                .ok_or(DecodeError::LengthOverrun)?;
            if value_end > remainder.len() {
                return Err(DecodeError::LengthOverrun);
            }
            let comp_frame = Frame::from_tlv(type_code, &remainder[value_start..value_end])?;
            let (method, uncompressed_len) = match &comp_frame {
                Frame::Compression {
                    method,
                    uncompressed_len,
                    ..
                } => (*method, *uncompressed_len),
                _ => unreachable!("type code dispatched to compression constructor"),
            };
            let compressed = &remainder[value_end..];
            let plaintext = frame::decompress_payload(method, compressed, uncompressed_len)?;
            frames.push(comp_frame);
            remainder = plaintext;
            pos = 0;
        }
    }

    let mut saw_end = false;
    while pos < remainder.len() {
        let (type_code, len) = read_tlv_header(&remainder, pos)?;
        let value_start = pos + tlv::TLV_HDR_SIZE;
        let value_end = value_start
            .checked_add(len)
            .ok_or(DecodeError::LengthOverrun)?;
        if value_end > remainder.len() {
            return Err(DecodeError::LengthOverrun);
        }
        let f = Frame::from_tlv(type_code, &remainder[value_start..value_end])?;
        let is_end = matches!(f, Frame::End { .. });
        frames.push(f);
        pos = value_end;
        if is_end {
            saw_end = true;
            break;
        }
    }
    if !saw_end {
        return Err(DecodeError::Malformed("frameset missing end-marker frame"));
    }

    Ok((
        FrameSet {
            fs_type,
            flags,
            frames,
        },
        frames_end,
    ))
}

fn read_tlv_header(buf: &[u8], offset: usize) -> Result<(u16, usize), DecodeError> {
    let type_code = tlv::get_u16(buf, offset)?;
    let len = tlv::get_u24(buf, offset + 2)? as usize;
    Ok((type_code, len))
}

fn peek_tlv_header(buf: &[u8], offset: usize) -> Option<(u16, usize)> {
    read_tlv_header(buf, offset).ok()
}
