// SPDX-License-Identifier: GPL-3.0-or-later

//! X25519 key agreement + HKDF session-key derivation (Section 4.4,
//! component C7).
//!
//! Grounded on the teacher's `security::crypto::key_exchange` module: ECDH
//! shared secret, then HKDF, never the raw agreement output, used as an
//! AEAD key. The teacher uses P-256 ephemeral keys (`ring::agreement`); this
//! wire protocol needs long-lived per-identity keys loaded from disk
//! (`FRAMETYPE_CRYPTCURVE25519`), which `ring`'s agreement API cannot load
//! (ephemeral-only by design), so static X25519 agreement here uses
//! `x25519-dalek`, matching the pattern other pack repos use for persisted
//! Curve25519 keys. HKDF derivation still goes through `ring::hkdf` as the
//! teacher does.

pub mod keystore;

pub use keystore::{KeyStore, KeyStoreError};

use ring::hkdf;
use x25519_dalek::{PublicKey, StaticSecret};

const SESSION_KEY_INFO: &[u8] = b"assimilation-wire frameset session key";

struct Sha256HkdfLen(usize);

impl hkdf::KeyType for Sha256HkdfLen {
    fn len(&self) -> usize {
        self.0
    }
}

/// Derive the 32-byte AES-256-GCM key shared between `our_secret` and
/// `peer_public`. Order of the two public keys in the HKDF salt is fixed by
/// lexicographic comparison so both peers derive the same key, mirroring
/// `complete_key_exchange`'s "smaller public key first" salt convention.
pub fn derive_session_key(our_secret: &StaticSecret, peer_public: &PublicKey) -> [u8; 32] {
    let shared = our_secret.diffie_hellman(peer_public);
    let our_public = PublicKey::from(our_secret).to_bytes();
    let peer_bytes = peer_public.to_bytes();

    let mut salt_input = Vec::with_capacity(64);
    if our_public < peer_bytes {
        salt_input.extend_from_slice(&our_public);
        salt_input.extend_from_slice(&peer_bytes);
    } else {
        salt_input.extend_from_slice(&peer_bytes);
        salt_input.extend_from_slice(&our_public);
    }

    let salt = hkdf::Salt::new(hkdf::HKDF_SHA256, &salt_input);
    let prk = salt.extract(shared.as_bytes());
    let okm = prk
        .expand(&[SESSION_KEY_INFO], Sha256HkdfLen(32))
        .expect("32 bytes is a valid HKDF output length");
    let mut key = [0u8; 32];
    okm.fill(&mut key).expect("output buffer is exactly 32 bytes");
    key
}
