//! Dump requests and the delivery seam.
//!
//! The core only decides *when* to capture guest memory; how the capture
//! command reaches the hypervisor (monitor pty, control socket, RPC) is the
//! sink implementation's business.

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DumpKind {
    /// Ring-drain snapshot; one per observed drain while the DMA engine runs.
    Periodic,
    /// Teardown snapshot; at most one per session.
    Final,
}

/// A request to capture guest memory at the shadowed CORB base address.
///
/// Produced by [`CorbMonitor::observe`](crate::CorbMonitor::observe), handed
/// to a [`SnapshotSink`] immediately, never stored.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct DumpRequest {
    pub kind: DumpKind,
    /// Guest-physical address of the CORB buffer (last-written CORBLBASE;
    /// 0 if the guest has not programmed it yet).
    pub address: u32,
    /// Periodic frame index; for a final dump, the number of periodic dumps
    /// requested before it.
    pub sequence: u32,
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("delivering dump command: {0}")]
    Io(#[from] io::Error),

    #[error("encoding dump request: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Consumes dump requests and performs (or forwards) the actual capture.
pub trait SnapshotSink {
    fn deliver(&mut self, request: &DumpRequest) -> Result<(), SinkError>;
}
