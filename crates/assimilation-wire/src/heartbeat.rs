// SPDX-License-Identifier: GPL-3.0-or-later

//! Heartbeat subsystem: `HbSender` and `HbListener` (Section 4.9,
//! component C10).
//!
//! Rather than registering callback closures (the C ancestor's function
//! pointers), `HbListener::tick`/`on_heartbeat` return the events that
//! occurred; the caller (typically the orchestrator event loop) matches on
//! them and reacts, the same shape the teacher's `reliability::reader`
//! module uses for its gap/ack events.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::netaddr::NetAddr;

/// Schedules a periodic unsequenced heartbeat frameset to `dest` (Section
/// 4.9: `HbSender(dest, interval)`).
#[derive(Debug, Clone)]
pub struct HbSender {
    pub dest: NetAddr,
    interval: Duration,
    last_sent: Option<Instant>,
}

impl HbSender {
    pub fn new(dest: NetAddr, interval: Duration) -> Self {
        Self {
            dest,
            interval,
            last_sent: None,
        }
    }

    /// True if a heartbeat is due at `now`.
    pub fn due(&self, now: Instant) -> bool {
        match self.last_sent {
            None => true,
            Some(t) => now.duration_since(t) >= self.interval,
        }
    }

    pub fn mark_sent(&mut self, now: Instant) {
        self.last_sent = Some(now);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HbStatus {
    Receiving,
    TimedOut,
}

/// Events produced by [`HbListener::tick`]/[`HbListener::on_heartbeat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HbEvent {
    DeadTime,
    ComeAlive { lateness: Duration },
    Warning { lateness: Duration },
    Heartbeat,
}

/// Tracks liveness of one peer (Section 4.9: `HbListener(peer, deadtime, warntime)`).
#[derive(Debug, Clone)]
pub struct HbListener {
    peer: NetAddr,
    deadtime: Duration,
    warntime: Duration,
    next_expected: Instant,
    warn_time: Instant,
    status: HbStatus,
}

impl HbListener {
    pub fn new(peer: NetAddr, deadtime: Duration, warntime: Duration, now: Instant) -> Self {
        Self {
            peer,
            deadtime,
            warntime,
            next_expected: now + deadtime,
            warn_time: now + warntime,
            status: HbStatus::Receiving,
        }
    }

    pub fn peer(&self) -> &NetAddr {
        &self.peer
    }

    pub fn status(&self) -> HbStatus {
        self.status
    }

    /// Per-second tick (Section 4.9). Fires `DeadTime` the instant the
    /// listener transitions from `Receiving` to `TimedOut`.
    pub fn tick(&mut self, now: Instant) -> Option<HbEvent> {
        if self.status == HbStatus::Receiving && now > self.next_expected {
            self.status = HbStatus::TimedOut;
            return Some(HbEvent::DeadTime);
        }
        None
    }

    /// Process a received heartbeat from this peer.
    pub fn on_heartbeat(&mut self, now: Instant) -> Vec<HbEvent> {
        let mut events = Vec::with_capacity(2);
        if self.status == HbStatus::TimedOut {
            self.status = HbStatus::Receiving;
            let lateness = now.saturating_duration_since(self.next_expected);
            events.push(HbEvent::ComeAlive { lateness });
        } else if now > self.warn_time {
            let lateness = now.saturating_duration_since(self.warn_time);
            events.push(HbEvent::Warning { lateness });
        }
        events.push(HbEvent::Heartbeat);
        self.next_expected = now + self.deadtime;
        self.warn_time = now + self.warntime;
        events
    }
}

/// Owns every `HbListener` for a process, dispatching heartbeats from
/// unknown peers as `martian` (Section 4.9).
#[derive(Default)]
pub struct HbManager {
    listeners: HashMap<NetAddr, HbListener>,
}

impl HbManager {
    pub fn new() -> Self {
        Self {
            listeners: HashMap::new(),
        }
    }

    pub fn add_listener(&mut self, peer: NetAddr, deadtime: Duration, warntime: Duration, now: Instant) {
        self.listeners
            .insert(peer.clone(), HbListener::new(peer, deadtime, warntime, now));
    }

    pub fn remove_listener(&mut self, peer: &NetAddr) {
        self.listeners.remove(peer);
    }

    /// Deliver a heartbeat received from `source`. Returns `None` if
    /// `source` has no listener (martian heartbeat).
    pub fn on_heartbeat(&mut self, source: &NetAddr, now: Instant) -> Option<Vec<HbEvent>> {
        self.listeners.get_mut(source).map(|l| l.on_heartbeat(now))
    }

    /// Per-second tick over every listener.
    pub fn tick(&mut self, now: Instant) -> Vec<(NetAddr, HbEvent)> {
        self.listeners
            .values_mut()
            .filter_map(|l| l.tick(now).map(|ev| (l.peer().clone(), ev)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> NetAddr {
        NetAddr::V4 {
            octets: [10, 0, 0, 5],
            port: Some(1984),
        }
    }

    #[test]
    fn sender_is_due_immediately_then_waits_for_interval() {
        let mut sender = HbSender::new(peer(), Duration::from_secs(1));
        let t0 = Instant::now();
        assert!(sender.due(t0));
        sender.mark_sent(t0);
        assert!(!sender.due(t0));
        assert!(sender.due(t0 + Duration::from_secs(2)));
    }

    #[test]
    fn listener_times_out_after_deadtime() {
        let t0 = Instant::now();
        let mut listener = HbListener::new(peer(), Duration::from_secs(10), Duration::from_secs(5), t0);
        assert_eq!(listener.tick(t0 + Duration::from_secs(5)), None);
        assert_eq!(
            listener.tick(t0 + Duration::from_secs(11)),
            Some(HbEvent::DeadTime)
        );
        assert_eq!(listener.status(), HbStatus::TimedOut);
    }

    #[test]
    fn heartbeat_after_timeout_fires_come_alive() {
        let t0 = Instant::now();
        let mut listener = HbListener::new(peer(), Duration::from_secs(10), Duration::from_secs(5), t0);
        listener.tick(t0 + Duration::from_secs(11));
        let events = listener.on_heartbeat(t0 + Duration::from_secs(12));
        assert!(events.contains(&HbEvent::Heartbeat));
        assert!(events
            .iter()
            .any(|e| matches!(e, HbEvent::ComeAlive { .. })));
    }

    #[test]
    fn late_heartbeat_before_deadtime_fires_warning() {
        let t0 = Instant::now();
        let mut listener = HbListener::new(peer(), Duration::from_secs(10), Duration::from_secs(5), t0);
        let events = listener.on_heartbeat(t0 + Duration::from_secs(6));
        assert!(events.iter().any(|e| matches!(e, HbEvent::Warning { .. })));
    }

    #[test]
    fn manager_reports_martian_for_unknown_peer() {
        let mut manager = HbManager::new();
        let now = Instant::now();
        assert!(manager.on_heartbeat(&peer(), now).is_none());
    }

    #[test]
    fn manager_dispatches_tick_to_every_listener() {
        let mut manager = HbManager::new();
        let t0 = Instant::now();
        manager.add_listener(peer(), Duration::from_secs(1), Duration::from_millis(500), t0);
        let events = manager.tick(t0 + Duration::from_secs(2));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].1, HbEvent::DeadTime);
    }
}
