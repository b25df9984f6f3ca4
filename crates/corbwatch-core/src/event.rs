use serde::{Deserialize, Serialize};

/// A single bus write observed on one of the controller's PCI BAR regions.
///
/// Constructed by the trace decoder, consumed exactly once by
/// [`CorbMonitor::observe`](crate::CorbMonitor::observe), then discarded.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct WriteEvent {
    /// PCI BAR region index; region 0 is the HDA register block.
    pub region: u32,
    /// Byte offset within the region.
    pub offset: u64,
    /// Value written, right-justified; only the low `width` bytes are
    /// meaningful.
    pub data: u32,
    /// Access width in bytes (1, 2 or 4).
    pub width: u8,
}
