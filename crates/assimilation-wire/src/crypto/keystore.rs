// SPDX-License-Identifier: GPL-3.0-or-later

//! On-disk key material for the Curve25519 encryption envelope (Section 3:
//! "Key material ... key-id to public/secret key maps, key-id to identity
//! name, destination-address to key-id").
//!
//! Key files live at `<keydir>/<key_id>.pub` and `<keydir>/<key_id>.secret`,
//! each holding the raw 32-byte key. Key ids are restricted to
//! `[A-Za-z0-9_-]` (`config::is_legal_key_id_char`) and `#CMA#*` is the
//! distinguished CMA identity prefix.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::config::{is_legal_key_id_char, CMA_IDENTITY_PREFIX, MAX_KEY_ID_LEN};
use crate::crypto::derive_session_key;
use crate::frameset::KeyLookup;
use crate::netaddr::NetAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStoreError {
    IllegalKeyId(String),
    NotFound(String),
    Io(String),
    BadKeyLength(String),
}

impl fmt::Display for KeyStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IllegalKeyId(id) => write!(f, "key id `{id}` is not legal"),
            Self::NotFound(id) => write!(f, "no key file found for key id `{id}`"),
            Self::Io(msg) => write!(f, "key store I/O error: {msg}"),
            Self::BadKeyLength(id) => write!(f, "key file for `{id}` is not 32 bytes"),
        }
    }
}

impl std::error::Error for KeyStoreError {}

fn validate_key_id(key_id: &str) -> Result<(), KeyStoreError> {
    if key_id.is_empty()
        || key_id.len() > MAX_KEY_ID_LEN
        || !key_id.chars().all(is_legal_key_id_char)
    {
        return Err(KeyStoreError::IllegalKeyId(key_id.to_string()));
    }
    Ok(())
}

/// Loaded public/secret key material plus address routing, for one process.
pub struct KeyStore {
    dir: PathBuf,
    public_keys: HashMap<String, PublicKey>,
    secret_keys: HashMap<String, StaticSecret>,
    identities: HashMap<String, String>,
    address_to_key_id: HashMap<NetAddr, String>,
    default_signing_key_id: Option<String>,
}

impl KeyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            public_keys: HashMap::new(),
            secret_keys: HashMap::new(),
            identities: HashMap::new(),
            address_to_key_id: HashMap::new(),
            default_signing_key_id: None,
        }
    }

    /// Load the public key for `key_id` from `<dir>/<key_id>.pub`, caching it.
    pub fn load_public(&mut self, key_id: &str) -> Result<(), KeyStoreError> {
        validate_key_id(key_id)?;
        let bytes = self.read_key_file(key_id, "pub")?;
        self.public_keys
            .insert(key_id.to_string(), PublicKey::from(bytes));
        Ok(())
    }

    /// Load the secret key for `key_id` from `<dir>/<key_id>.secret`, caching it.
    pub fn load_secret(&mut self, key_id: &str) -> Result<(), KeyStoreError> {
        validate_key_id(key_id)?;
        let bytes = self.read_key_file(key_id, "secret")?;
        self.secret_keys
            .insert(key_id.to_string(), StaticSecret::from(bytes));
        Ok(())
    }

    fn read_key_file(&self, key_id: &str, ext: &str) -> Result<[u8; 32], KeyStoreError> {
        let path = self.key_path(key_id, ext);
        let mut raw = fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                KeyStoreError::NotFound(key_id.to_string())
            } else {
                KeyStoreError::Io(e.to_string())
            }
        })?;
        let bytes: [u8; 32] = raw
            .as_slice()
            .try_into()
            .map_err(|_| KeyStoreError::BadKeyLength(key_id.to_string()))?;
        raw.zeroize();
        Ok(bytes)
    }

    fn key_path(&self, key_id: &str, ext: &str) -> PathBuf {
        self.dir.join(format!("{key_id}.{ext}"))
    }

    pub fn set_identity(&mut self, key_id: &str, identity_name: &str) {
        self.identities
            .insert(key_id.to_string(), identity_name.to_string());
    }

    pub fn identity_of(&self, key_id: &str) -> Option<&str> {
        self.identities.get(key_id).map(String::as_str)
    }

    pub fn is_cma_identity(&self, key_id: &str) -> bool {
        self.identity_of(key_id)
            .map(|name| name.starts_with(CMA_IDENTITY_PREFIX))
            .unwrap_or(false)
    }

    pub fn route_address(&mut self, addr: NetAddr, key_id: &str) {
        self.address_to_key_id.insert(addr, key_id.to_string());
    }

    pub fn key_id_for_address(&self, addr: &NetAddr) -> Option<&str> {
        self.address_to_key_id.get(addr).map(String::as_str)
    }

    pub fn set_default_signing_key(&mut self, key_id: &str) {
        self.default_signing_key_id = Some(key_id.to_string());
    }

    pub fn default_signing_key(&self) -> Option<&str> {
        self.default_signing_key_id.as_deref()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl KeyLookup for KeyStore {
    fn symmetric_key(&self, sender_key_id: &str, receiver_key_id: &str) -> Option<[u8; 32]> {
        let peer_public = self.public_keys.get(sender_key_id)?;
        let our_secret = self.secret_keys.get(receiver_key_id)?;
        Some(derive_session_key(our_secret, peer_public))
    }
}
