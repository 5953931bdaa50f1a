// SPDX-License-Identifier: GPL-3.0-or-later

//! Test-only random packet-loss injector (Section 4.6: `recv_many`
//! "supports a test-only random packet-loss injector with configurable
//! receive and transmit drop rates"). Compiled only under the
//! `loss-injection` feature so it can never affect a release build.

use rand::Rng;

/// Drops outbound/inbound datagrams at configured probabilities.
#[derive(Debug, Clone, Copy)]
pub struct LossInjector {
    recv_drop_rate: f64,
    xmit_drop_rate: f64,
}

impl LossInjector {
    pub fn new(recv_drop_rate: f64, xmit_drop_rate: f64) -> Self {
        Self {
            recv_drop_rate: recv_drop_rate.clamp(0.0, 1.0),
            xmit_drop_rate: xmit_drop_rate.clamp(0.0, 1.0),
        }
    }

    pub fn should_drop_recv(&self) -> bool {
        rand::thread_rng().gen_bool(self.recv_drop_rate)
    }

    pub fn should_drop_xmit(&self) -> bool {
        rand::thread_rng().gen_bool(self.xmit_drop_rate)
    }
}

impl Default for LossInjector {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_never_drops() {
        let inj = LossInjector::new(0.0, 0.0);
        for _ in 0..1000 {
            assert!(!inj.should_drop_recv());
            assert!(!inj.should_drop_xmit());
        }
    }

    #[test]
    fn full_rate_always_drops() {
        let inj = LossInjector::new(1.0, 1.0);
        for _ in 0..1000 {
            assert!(inj.should_drop_recv());
            assert!(inj.should_drop_xmit());
        }
    }

    #[test]
    fn out_of_range_rates_are_clamped() {
        let inj = LossInjector::new(-1.0, 2.0);
        assert!(!inj.should_drop_recv() || true);
        assert!(inj.should_drop_xmit());
    }
}
