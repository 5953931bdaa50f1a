// SPDX-License-Identifier: GPL-3.0-or-later

//! Cross-module end-to-end scenarios, one per concrete scenario enumerated
//! for the reliable-transport, crypto, and heartbeat subsystems.

use std::cell::RefCell;
use std::time::{Duration, Instant};

use assimilation_wire::config::RuntimeConfig;
use assimilation_wire::crypto::KeyStore;
use assimilation_wire::error::TransportError;
use assimilation_wire::frame::{types, Frame, IntWidth};
use assimilation_wire::frameset::{self, EncryptionConfig, FrameSet};
use assimilation_wire::heartbeat::{HbEvent, HbListener};
use assimilation_wire::netaddr::NetAddr;
use assimilation_wire::reliability::{ConnState, FsProtocol, Transmit};

/// A two-party in-memory network: `transmit` on one side enqueues directly
/// into the other side's inbox, so the test drives delivery deterministically
/// without real sockets.
#[derive(Default)]
struct LoopbackLink {
    inbox: RefCell<Vec<(u16, u16, Vec<Frame>)>>,
}

impl Transmit for LoopbackLink {
    fn transmit(
        &self,
        _dest: &NetAddr,
        fs_type: u16,
        flags: u16,
        frames: &[Frame],
    ) -> Result<(), TransportError> {
        self.inbox.borrow_mut().push((fs_type, flags, frames.to_vec()));
        Ok(())
    }
}

impl LoopbackLink {
    fn drain(&self) -> Vec<(u16, u16, Vec<Frame>)> {
        self.inbox.borrow_mut().drain(..).collect()
    }
}

fn node_addr(port: u16) -> NetAddr {
    NetAddr::V4 {
        octets: [10, 0, 0, 1],
        port: Some(port),
    }
}

fn payload_fs(fs_type: u16, value: u64) -> FrameSet {
    FrameSet::new(
        fs_type,
        0,
        vec![Frame::UInt {
            type_code: types::UINT,
            width: IntWidth::W32,
            value,
        }],
    )
}

const QUEUE_ID: u16 = 7;

#[test]
fn simple_sequenced_round_trip_drains_the_outbound_queue() {
    let a_to_b = LoopbackLink::default();
    let b_to_a = LoopbackLink::default();
    let mut a = FsProtocol::new(1001, RuntimeConfig::default());
    let mut b = FsProtocol::new(2002, RuntimeConfig::default());

    let seqs = a
        .send(&a_to_b, &node_addr(1), QUEUE_ID, vec![payload_fs(42, 1)])
        .unwrap();
    assert_eq!(seqs.len(), 1);

    for (fs_type, flags, frames) in a_to_b.drain() {
        let fs = FrameSet::new(fs_type, flags, frames);
        let seq = fs.seqnum().unwrap();
        assert_eq!((seq.session_id, seq.request_id, seq.queue_id), (1001, 1, QUEUE_ID));
        b.receive(&b_to_a, &node_addr(0), QUEUE_ID, fs.clone(), false).unwrap();
        let (_, _, delivered) = b.read().unwrap();
        b.ack_message(&b_to_a, &node_addr(0), QUEUE_ID, &delivered).unwrap();
    }

    for (fs_type, flags, frames) in b_to_a.drain() {
        a.receive(&a_to_b, &node_addr(1), QUEUE_ID, FrameSet::new(fs_type, flags, frames), true)
            .unwrap();
    }
    assert_eq!(a.state(&node_addr(1), QUEUE_ID), Some(ConnState::Active));
}

#[test]
fn out_of_order_delivery_is_reassembled_and_single_ack_covers_all() {
    let a_to_b = LoopbackLink::default();
    let b_to_a = LoopbackLink::default();
    let mut a = FsProtocol::new(1, RuntimeConfig::default());
    let mut b = FsProtocol::new(2, RuntimeConfig::default());

    a.send(
        &a_to_b,
        &node_addr(1),
        QUEUE_ID,
        vec![payload_fs(1, 10), payload_fs(2, 20), payload_fs(3, 30)],
    )
    .unwrap();

    let sent: Vec<FrameSet> = a_to_b
        .drain()
        .into_iter()
        .map(|(t, f, frames)| FrameSet::new(t, f, frames))
        .collect();
    assert_eq!(sent.len(), 3);

    // Deliver FS2, FS3, FS1 — out of order.
    b.receive(&b_to_a, &node_addr(0), QUEUE_ID, sent[1].clone(), false).unwrap();
    b.receive(&b_to_a, &node_addr(0), QUEUE_ID, sent[2].clone(), false).unwrap();
    b.receive(&b_to_a, &node_addr(0), QUEUE_ID, sent[0].clone(), false).unwrap();

    let mut delivered_order = Vec::new();
    while let Some((_, _, fs)) = b.read() {
        delivered_order.push(fs.fs_type);
    }
    assert_eq!(delivered_order, vec![1, 2, 3]);
}

#[test]
fn dropped_packet_is_retransmitted_after_rexmit_interval() {
    let link = LoopbackLink::default();
    let mut config = RuntimeConfig::default();
    config.rexmit_interval = Duration::from_millis(1);
    let mut a = FsProtocol::new(1, config);

    a.send(&link, &node_addr(1), QUEUE_ID, vec![payload_fs(1, 1)]).unwrap();
    // Simulate the datagram being dropped: clear what was "on the wire".
    link.drain();

    std::thread::sleep(Duration::from_millis(5));
    a.try_xmit(&link, &node_addr(1), QUEUE_ID).unwrap();
    let retransmitted = link.drain();
    assert_eq!(retransmitted.len(), 1);
    assert_eq!(retransmitted[0].0, 1);
}

#[test]
fn session_reset_with_higher_session_id_is_accepted_and_resets_next_expected() {
    let a_to_b = LoopbackLink::default();
    let b_to_a = LoopbackLink::default();
    let mut a = FsProtocol::new(5, RuntimeConfig::default());
    let mut b = FsProtocol::new(2, RuntimeConfig::default());

    a.send(&a_to_b, &node_addr(1), QUEUE_ID, vec![payload_fs(1, 1)]).unwrap();
    for (t, f, frames) in a_to_b.drain() {
        b.receive(&b_to_a, &node_addr(0), QUEUE_ID, FrameSet::new(t, f, frames), false)
            .unwrap();
    }
    let (_, _, fs) = b.read().unwrap();
    assert_eq!(fs.seqnum().unwrap().session_id, 5);

    // A restarts with a larger session id.
    let mut a_restarted = FsProtocol::new(9, RuntimeConfig::default());
    a_restarted
        .send(&a_to_b, &node_addr(1), QUEUE_ID, vec![payload_fs(1, 1)])
        .unwrap();
    for (t, f, frames) in a_to_b.drain() {
        b.receive(&b_to_a, &node_addr(0), QUEUE_ID, FrameSet::new(t, f, frames), false)
            .unwrap();
    }
    let (_, _, fs) = b.read().unwrap();
    assert_eq!(fs.seqnum().unwrap().session_id, 9);
    assert_eq!(fs.seqnum().unwrap().request_id, 1);
}

#[test]
fn encrypted_frameset_round_trips_and_rejects_tampering() {
    use assimilation_wire::crypto::derive_session_key;
    use rand::rngs::OsRng;
    use x25519_dalek::{PublicKey, StaticSecret};

    let dir = tempfile::tempdir().unwrap();
    let a_secret = StaticSecret::random_from_rng(OsRng);
    let b_secret = StaticSecret::random_from_rng(OsRng);
    let a_public = PublicKey::from(&a_secret);
    let b_public = PublicKey::from(&b_secret);
    std::fs::write(dir.path().join("node_a.pub"), a_public.to_bytes()).unwrap();
    std::fs::write(dir.path().join("node_b.secret"), b_secret.to_bytes()).unwrap();

    let mut store = KeyStore::new(dir.path());
    store.load_public("node_a").unwrap();
    store.load_secret("node_b").unwrap();

    let session_key = derive_session_key(&a_secret, &b_public);

    let frames = vec![payload_fs(77, 999).frames.remove(0)];
    let bytes = frameset::marshal(
        77,
        0,
        &frames,
        None,
        Some(EncryptionConfig {
            sender_key_id: "node_a",
            receiver_key_id: "node_b",
            key: &session_key,
            nonce: [7u8; 12],
        }),
    )
    .unwrap();

    let (decoded, consumed) = frameset::unmarshal(&bytes, &store).unwrap();
    assert_eq!(consumed, bytes.len());
    assert_eq!(decoded.payload_frames().count(), 1);

    let mut tampered = bytes.clone();
    *tampered.last_mut().unwrap() ^= 0xFF;
    let result = frameset::unmarshal(&tampered, &store);
    assert!(result.is_err());
}

#[test]
fn heartbeat_timeout_fires_once_then_comes_alive_on_resumed_heartbeats() {
    let t0 = Instant::now();
    let mut listener = HbListener::new(
        node_addr(1),
        Duration::from_secs(3),
        Duration::from_secs(1),
        t0,
    );

    assert_eq!(listener.tick(t0 + Duration::from_millis(2999)), None);
    let fired = listener.tick(t0 + Duration::from_secs(4));
    assert_eq!(fired, Some(HbEvent::DeadTime));
    // A second tick while still timed out must not re-fire.
    assert_eq!(listener.tick(t0 + Duration::from_secs(5)), None);

    let resume_events = listener.on_heartbeat(t0 + Duration::from_secs(4));
    assert!(resume_events
        .iter()
        .any(|e| matches!(e, HbEvent::ComeAlive { .. })));
}
