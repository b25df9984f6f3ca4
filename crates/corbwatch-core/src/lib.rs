//! Decides, from a stream of observed PCI bus writes alone, when a guest OS
//! has populated and started the HDA controller's command ring (CORB), and
//! requests guest-memory snapshots at those moments.
//!
//! The crate is the pure core of the `corbwatch` tool: classification of an
//! arbitrary-width register write, a shadow copy of the CORB control state
//! reconstructed from those writes, and the two trigger heuristics (periodic
//! ring-drain dumps and a one-shot final dump on the driver's teardown
//! signature). Trace decoding and snapshot delivery live in the sibling
//! `corbwatch-trace` and `corbwatch-cli` crates.

#![forbid(unsafe_code)]

mod corb;
mod event;
mod monitor;
pub mod regs;
mod sink;

pub use corb::{CorbShadow, RingSize};
pub use event::WriteEvent;
pub use monitor::{teardown_signature, CorbMonitor, Observation, DEFAULT_EXIT_THRESHOLD};
pub use regs::RegisterId;
pub use sink::{DumpKind, DumpRequest, SinkError, SnapshotSink};
