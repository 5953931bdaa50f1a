// SPDX-License-Identifier: GPL-3.0-or-later

//! Crate-wide error types.
//!
//! Follows the teacher's house style (`security/error.rs` in `hdds`): a plain
//! enum implementing `Display` + `Error` by hand, no `thiserror` in the core
//! library crate.

use std::fmt;

/// Errors that can occur while decoding a TLV-framed packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A fixed-width integer read would run past `pktend`.
    Truncated,
    /// A frame declared a length that extends past the packet end.
    LengthOverrun,
    /// The first frame of a frameset was not a signature frame.
    MissingSignature,
    /// No constructor is registered for this frame type; preserved as `Unknown`.
    UnregisteredType(u16),
    /// A frameset type this module does not recognise (e.g. an unknown CMA command).
    UnrecognisedFrameSetType(u16),
    /// The frameset or frame header failed a basic sanity check.
    Malformed(&'static str),
    /// The cryptographic envelope rejected the packet; see [`CryptoError`].
    Crypto(CryptoError),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "packet truncated before expected field end"),
            Self::LengthOverrun => write!(f, "TLV length extends past packet end"),
            Self::MissingSignature => write!(f, "frameset did not begin with a signature frame"),
            Self::UnregisteredType(t) => write!(f, "no constructor registered for frame type {t}"),
            Self::UnrecognisedFrameSetType(t) => write!(f, "unrecognised frameset type {t}"),
            Self::Malformed(msg) => write!(f, "malformed packet: {msg}"),
            Self::Crypto(err) => write!(f, "crypto envelope rejected packet: {err}"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<CryptoError> for DecodeError {
    fn from(err: CryptoError) -> Self {
        Self::Crypto(err)
    }
}

/// Errors from the cryptographic envelope (signature + encryption).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key id contains characters outside `[A-Za-z0-9_-]` or exceeds the bound.
    BadKey,
    /// A key id was syntactically valid but not present in the key store.
    UnknownKey,
    /// Authenticated decryption rejected the ciphertext (tag mismatch).
    BadAuthentication,
    /// Signature digest did not match the computed digest.
    BadSignature,
    /// Signature major/minor class is recognised but not wired up.
    Unsupported,
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadKey => write!(f, "key id is malformed"),
            Self::UnknownKey => write!(f, "key id not present in key store"),
            Self::BadAuthentication => write!(f, "authenticated decryption failed"),
            Self::BadSignature => write!(f, "signature verification failed"),
            Self::Unsupported => write!(f, "signature/encryption scheme not implemented"),
        }
    }
}

impl std::error::Error for CryptoError {}

/// Errors surfaced by `FsQueue`/`FsProtocol` to the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The destination queue has reached `max_len`.
    QueueFull,
    /// A sequence frame's session id is older than the one we have on file.
    WrongSession,
    /// `send`/`close_conn` was called on a connection in `Closing`/`Closed`.
    LinkShuttingDown,
    /// Underlying I/O failure (bind, send, recv).
    Io(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull => write!(f, "queue is full"),
            Self::WrongSession => write!(f, "session id mismatch"),
            Self::LinkShuttingDown => write!(f, "link is shutting down"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
