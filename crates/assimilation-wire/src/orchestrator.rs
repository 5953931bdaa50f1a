// SPDX-License-Identifier: GPL-3.0-or-later

//! Nanoprobe bootstrap orchestrator (Section 4.10, component C12).
//!
//! The C ancestor drives this as callbacks off a libglib event loop; the
//! teacher's own event loop is likewise callback-driven (`transport::udp`'s
//! readiness notifications). Here the same shape is expressed as explicit
//! step methods (`maybe_send_startup`, `obey`, `tick_shutdown`) that an
//! embedding event loop calls at its own readiness/timer boundaries, so the
//! state machine is exercised directly from tests without a real reactor.

use std::time::{Duration, Instant};

use crate::config::STARTUP_RETRY_INTERVAL;
use crate::error::{DecodeError, TransportError};
use crate::frame::{types, Frame, IntWidth};
use crate::frameset::FrameSet;
use crate::netaddr::NetAddr;
use crate::reliability::{ConnState, FsProtocol, Transmit};

pub mod fs_types {
    use crate::frame::types::APPLICATION_BASE;

    pub const STARTUP: u16 = APPLICATION_BASE + 100;
    pub const SETCONFIG: u16 = APPLICATION_BASE + 101;
    pub const SENDHB: u16 = APPLICATION_BASE + 102;
    pub const EXPECTHB: u16 = APPLICATION_BASE + 103;
    pub const SENDEXPECTHB: u16 = APPLICATION_BASE + 104;
    pub const STOPSENDHB: u16 = APPLICATION_BASE + 105;
    pub const STOPEXPECTHB: u16 = APPLICATION_BASE + 106;
    pub const STOPSENDEXPECTHB: u16 = APPLICATION_BASE + 107;
    pub const INCRDEBUG: u16 = APPLICATION_BASE + 108;
    pub const DECRDEBUG: u16 = APPLICATION_BASE + 109;
    pub const DODISCOVER: u16 = APPLICATION_BASE + 110;
    pub const STOPDISCOVER: u16 = APPLICATION_BASE + 111;
    pub const HBSHUTDOWN: u16 = APPLICATION_BASE + 112;
}

const HOSTNAME_FRAME: u16 = types::APPLICATION_BASE + 1;
const DISCOVERY_JSON_FRAME: u16 = types::APPLICATION_BASE + 2;
const INTERVAL_FRAME: u16 = types::APPLICATION_BASE + 3;
const DEADTIME_FRAME: u16 = types::APPLICATION_BASE + 4;
const WARNTIME_FRAME: u16 = types::APPLICATION_BASE + 5;
const DISCOVERY_NAME_FRAME: u16 = types::APPLICATION_BASE + 6;

/// Commands the CMA may send down to a nanoprobe (Section 4.10 step 3).
#[derive(Debug, Clone, PartialEq)]
pub enum ObeyCommand {
    SetConfig { cma_addrs: Vec<NetAddr> },
    SendHb { dest: NetAddr, interval: Duration },
    ExpectHb { peer: NetAddr, deadtime: Duration, warntime: Duration },
    SendExpectHb {
        peer: NetAddr,
        interval: Duration,
        deadtime: Duration,
        warntime: Duration,
    },
    StopSendHb { dest: NetAddr },
    StopExpectHb { peer: NetAddr },
    StopSendExpectHb { peer: NetAddr },
    IncrDebug,
    DecrDebug,
    DoDiscover { discovery_name: String },
    StopDiscover { discovery_name: String },
}

/// Builds a microsecond-duration frame, for callers (e.g. a CMA
/// implementation) constructing `ObeyCommand` framesets to send.
pub fn micros_frame(type_code: u16, d: Duration) -> Frame {
    Frame::UInt {
        type_code,
        width: IntWidth::W64,
        value: d.as_micros() as u64,
    }
}

fn duration_from_frame(frame: Option<&Frame>) -> Result<Duration, DecodeError> {
    match frame {
        Some(Frame::UInt { value, .. }) => Ok(Duration::from_micros(*value)),
        _ => Err(DecodeError::Malformed("expected a microsecond interval frame")),
    }
}

fn addr_from_frame(frame: Option<&Frame>) -> Result<NetAddr, DecodeError> {
    match frame {
        Some(Frame::Address { addr, .. }) => Ok(addr.clone()),
        _ => Err(DecodeError::Malformed("expected an address frame")),
    }
}

fn string_from_frame(frame: Option<&Frame>) -> Result<String, DecodeError> {
    match frame {
        Some(Frame::CString { value, .. }) => Ok(value.clone()),
        _ => Err(DecodeError::Malformed("expected a string frame")),
    }
}

impl ObeyCommand {
    /// Decode a CMA command from its wire frameset (Section 4.10 step 3):
    /// "each command extracts addresses, ports, intervals, or JSON payloads
    /// from well-known frame types".
    pub fn from_frameset(fs: &FrameSet) -> Result<Self, DecodeError> {
        let payload: Vec<&Frame> = fs
            .payload_frames()
            .filter(|f| !f.is_seqnum())
            .collect();
        match fs.fs_type {
            fs_types::SETCONFIG => {
                let cma_addrs = payload
                    .iter()
                    .filter_map(|f| match f {
                        Frame::Address { addr, .. } => Some(addr.clone()),
                        _ => None,
                    })
                    .collect::<Vec<_>>();
                if cma_addrs.is_empty() {
                    return Err(DecodeError::Malformed("SETCONFIG carried no CMA addresses"));
                }
                Ok(Self::SetConfig { cma_addrs })
            }
            fs_types::SENDHB => Ok(Self::SendHb {
                dest: addr_from_frame(payload.first().copied())?,
                interval: duration_from_frame(payload.get(1).copied())?,
            }),
            fs_types::EXPECTHB => Ok(Self::ExpectHb {
                peer: addr_from_frame(payload.first().copied())?,
                deadtime: duration_from_frame(payload.get(1).copied())?,
                warntime: duration_from_frame(payload.get(2).copied())?,
            }),
            fs_types::SENDEXPECTHB => Ok(Self::SendExpectHb {
                peer: addr_from_frame(payload.first().copied())?,
                interval: duration_from_frame(payload.get(1).copied())?,
                deadtime: duration_from_frame(payload.get(2).copied())?,
                warntime: duration_from_frame(payload.get(3).copied())?,
            }),
            fs_types::STOPSENDHB => Ok(Self::StopSendHb {
                dest: addr_from_frame(payload.first().copied())?,
            }),
            fs_types::STOPEXPECTHB => Ok(Self::StopExpectHb {
                peer: addr_from_frame(payload.first().copied())?,
            }),
            fs_types::STOPSENDEXPECTHB => Ok(Self::StopSendExpectHb {
                peer: addr_from_frame(payload.first().copied())?,
            }),
            fs_types::INCRDEBUG => Ok(Self::IncrDebug),
            fs_types::DECRDEBUG => Ok(Self::DecrDebug),
            fs_types::DODISCOVER => Ok(Self::DoDiscover {
                discovery_name: string_from_frame(payload.first().copied())?,
            }),
            fs_types::STOPDISCOVER => Ok(Self::StopDiscover {
                discovery_name: string_from_frame(payload.first().copied())?,
            }),
            other => Err(DecodeError::UnrecognisedFrameSetType(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BootstrapPhase {
    InitialDiscovery,
    AwaitingCmaConfig,
    Running,
}

/// Drives a single nanoprobe's bootstrap handshake and command intake.
pub struct Orchestrator {
    hostname: String,
    rendezvous: NetAddr,
    phase: BootstrapPhase,
    cma_addrs: Vec<NetAddr>,
    initial_discovery_json: Option<String>,
    last_startup_sent: Option<Instant>,
    debug_level: i32,
}

impl Orchestrator {
    pub fn new(hostname: impl Into<String>, rendezvous: NetAddr) -> Self {
        Self {
            hostname: hostname.into(),
            rendezvous,
            phase: BootstrapPhase::InitialDiscovery,
            cma_addrs: Vec::new(),
            initial_discovery_json: None,
            last_startup_sent: None,
            debug_level: 0,
        }
    }

    pub fn debug_level(&self) -> i32 {
        self.debug_level
    }

    pub fn cma_addrs(&self) -> &[NetAddr] {
        &self.cma_addrs
    }

    /// Step 1: record the initial discovery result, unblocking the startup
    /// retry loop.
    pub fn submit_initial_discovery(&mut self, json: String) {
        self.initial_discovery_json = Some(json);
        if self.phase == BootstrapPhase::InitialDiscovery {
            self.phase = BootstrapPhase::AwaitingCmaConfig;
        }
    }

    /// Step 2: send an unreliable `STARTUP` frameset to the rendezvous
    /// address every [`STARTUP_RETRY_INTERVAL`] until `SETCONFIG` arrives.
    pub fn maybe_send_startup(
        &mut self,
        transmitter: &dyn Transmit,
        now: Instant,
    ) -> Result<(), TransportError> {
        if self.phase != BootstrapPhase::AwaitingCmaConfig {
            return Ok(());
        }
        let due = match self.last_startup_sent {
            None => true,
            Some(t) => now.duration_since(t) >= STARTUP_RETRY_INTERVAL,
        };
        if !due {
            return Ok(());
        }
        let json = self.initial_discovery_json.clone().unwrap_or_default();
        let frames = vec![
            Frame::CString {
                type_code: HOSTNAME_FRAME,
                value: self.hostname.clone(),
            },
            Frame::CString {
                type_code: DISCOVERY_JSON_FRAME,
                value: json,
            },
        ];
        transmitter.transmit(&self.rendezvous, fs_types::STARTUP, 0, &frames)?;
        self.last_startup_sent = Some(now);
        Ok(())
    }

    /// Step 3: apply a decoded CMA command. `SETCONFIG` ends the bootstrap
    /// phase; every other command is the caller's responsibility to wire
    /// into `FsProtocol`/`HbManager`/`DiscoveryDispatcher` as appropriate —
    /// this method only updates orchestrator-local state.
    pub fn obey(&mut self, cmd: &ObeyCommand) {
        match cmd {
            ObeyCommand::SetConfig { cma_addrs } => {
                self.cma_addrs = cma_addrs.clone();
                self.phase = BootstrapPhase::Running;
            }
            ObeyCommand::IncrDebug => self.debug_level += 1,
            ObeyCommand::DecrDebug => self.debug_level = (self.debug_level - 1).max(0),
            _ => {}
        }
    }

    /// Step 4: begin graceful shutdown by reliably sending `HBSHUTDOWN` to
    /// `dest` on `queue_id`.
    pub fn begin_shutdown(
        &self,
        proto: &mut FsProtocol,
        transmitter: &dyn Transmit,
        dest: &NetAddr,
        queue_id: u16,
    ) -> Result<(), TransportError> {
        let fs = FrameSet::new(
            fs_types::HBSHUTDOWN,
            0,
            vec![Frame::CString {
                type_code: HOSTNAME_FRAME,
                value: self.hostname.clone(),
            }],
        );
        proto.send(transmitter, dest, queue_id, vec![fs])?;
        Ok(())
    }

    /// Shutdown exit code (Section 6: "0 on clean exit; non-zero if the
    /// graceful shutdown ACK is never received").
    pub fn shutdown_exit_code(proto: &FsProtocol, dest: &NetAddr, queue_id: u16) -> i32 {
        match proto.state(dest, queue_id) {
            Some(ConnState::Closed) | None => 0,
            _ => 1,
        }
    }
}
