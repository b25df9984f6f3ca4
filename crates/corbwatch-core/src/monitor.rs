//! Per-session state machine and trigger policy.

use crate::corb::CorbShadow;
use crate::event::WriteEvent;
use crate::regs::RegisterId;
use crate::sink::{DumpKind, DumpRequest};

/// Verb count the session must exceed before the teardown probe may fire the
/// final dump.
pub const DEFAULT_EXIT_THRESHOLD: u32 = 20;

/// Verbs attributed to one write-pointer update. The observed driver queues
/// commands in bursts of four before ringing the doorbell.
const VERBS_PER_WP_WRITE: u32 = 4;

/// Default final-trigger predicate: the teardown/reset signature the observed
/// guest driver writes to INTCTL. Matches when any nibble covered by the
/// access width holds `0x4`.
pub fn teardown_signature(data: u32, width: u8) -> bool {
    let nibbles = 2 * u32::from(width.clamp(1, 4));
    (0..nibbles).any(|i| (data >> (i * 4)) & 0xF == 0x4)
}

/// Outcome of feeding one [`WriteEvent`] to the monitor.
#[derive(Debug, Copy, Clone)]
pub struct Observation {
    /// What the write was classified as.
    pub register: RegisterId,
    /// At most one dump request per event.
    pub dump: Option<DumpRequest>,
}

/// Applies classified writes to the CORB shadow and derives dump decisions.
///
/// One monitor per monitoring session; it owns all mutable state (the shadow
/// registers, the verb counter, the periodic frame sequence and the
/// final-dump latch) and is driven synchronously, one event at a time.
#[derive(Debug)]
pub struct CorbMonitor {
    corb: CorbShadow,
    verbs: u32,
    frames: u32,
    final_fired: bool,
    exit_threshold: u32,
    exit_predicate: fn(u32, u8) -> bool,
}

impl Default for CorbMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl CorbMonitor {
    pub fn new() -> Self {
        Self {
            corb: CorbShadow::new(),
            verbs: 0,
            frames: 0,
            final_fired: false,
            exit_threshold: DEFAULT_EXIT_THRESHOLD,
            exit_predicate: teardown_signature,
        }
    }

    /// Override the verb-count gate for the final dump.
    pub fn with_exit_threshold(mut self, verbs: u32) -> Self {
        self.exit_threshold = verbs;
        self
    }

    /// Override the teardown-signature predicate. The default is
    /// [`teardown_signature`]; the condition is driver-build specific, so
    /// callers targeting other guests can swap it without touching the ring
    /// logic.
    pub fn with_exit_predicate(mut self, predicate: fn(u32, u8) -> bool) -> Self {
        self.exit_predicate = predicate;
        self
    }

    pub fn corb(&self) -> &CorbShadow {
        &self.corb
    }

    /// Verbs observed so far (monotonic, starts at 0).
    pub fn verbs(&self) -> u32 {
        self.verbs
    }

    /// Periodic dumps requested so far.
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Classify one write, apply its transition and evaluate the triggers.
    ///
    /// Never fails: unrecognized writes and non-qualifying probe values are
    /// no-ops that still report their classification so the caller can log
    /// them.
    pub fn observe(&mut self, event: &WriteEvent) -> Observation {
        let register = RegisterId::classify(event.region, event.offset, event.width);
        let dump = match register {
            RegisterId::CorbBaseLow => {
                self.corb.write_base(event.offset, event.data, event.width);
                None
            }
            RegisterId::CorbWritePointer => {
                self.corb.write_wp(event.data);
                self.verbs = self.verbs.wrapping_add(VERBS_PER_WP_WRITE);
                self.periodic_if_drained()
            }
            RegisterId::CorbReadPointer => {
                self.corb.write_rp(event.data);
                None
            }
            RegisterId::CorbControl => {
                if self.corb.write_ctl(event.data) {
                    self.periodic_if_drained()
                } else {
                    None
                }
            }
            RegisterId::CorbSize => {
                self.corb.write_size(event.data);
                None
            }
            RegisterId::ExitTriggerProbe => self.final_if_signaled(event),
            RegisterId::GenericVerbRegion | RegisterId::Unclassified => None,
        };
        Observation { register, dump }
    }

    fn periodic_if_drained(&mut self) -> Option<DumpRequest> {
        if !self.corb.drain_pending() {
            return None;
        }
        let sequence = self.frames;
        self.frames += 1;
        Some(DumpRequest {
            kind: DumpKind::Periodic,
            address: self.corb.base(),
            sequence,
        })
    }

    fn final_if_signaled(&mut self, event: &WriteEvent) -> Option<DumpRequest> {
        if self.final_fired || self.verbs <= self.exit_threshold {
            return None;
        }
        if !(self.exit_predicate)(event.data, event.width) {
            return None;
        }
        self.final_fired = true;
        Some(DumpRequest {
            kind: DumpKind::Final,
            address: self.corb.base(),
            sequence: self.frames,
        })
    }
}
