//! Shadow copy of the controller's CORB control state, reconstructed from
//! observed guest writes.
//!
//! This is not a device model: nothing is DMA'd and no register is readable
//! by a guest. The shadow only needs to be faithful enough for the trigger
//! heuristics layered on top of it.

use crate::regs::{CORBCTL_RUN, CORBRP_RST, CORBWP_DRAIN_SENTINEL, HDA_CORBLBASE};

/// CORBSIZE ring-size selection (bits 1:0).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum RingSize {
    Entries2,
    Entries16,
    Entries256,
    /// Selector not yet observed, or the reserved encoding 3. Disables index
    /// arithmetic; never blocks dump triggers.
    #[default]
    Unknown,
}

impl RingSize {
    pub fn from_bits(bits: u32) -> Self {
        match bits & 0x3 {
            0 => RingSize::Entries2,
            1 => RingSize::Entries16,
            2 => RingSize::Entries256,
            _ => RingSize::Unknown,
        }
    }

    /// Entry count, when the selector holds a non-reserved encoding.
    pub fn entries(self) -> Option<u16> {
        match self {
            RingSize::Entries2 => Some(2),
            RingSize::Entries16 => Some(16),
            RingSize::Entries256 => Some(256),
            RingSize::Unknown => None,
        }
    }

    fn index_mask(self) -> Option<u16> {
        self.entries().map(|entries| entries - 1)
    }
}

/// Shadowed CORB registers. Mutated only by [`CorbMonitor`] transitions.
///
/// [`CorbMonitor`]: crate::CorbMonitor
#[derive(Debug, Default)]
pub struct CorbShadow {
    base: u32,
    wp: u8,
    rp: u16,
    size: RingSize,
    running: bool,
}

impl CorbShadow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last-written CORBLBASE value.
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Raw low byte of the last CORBWP write.
    pub fn wp(&self) -> u8 {
        self.wp
    }

    /// Shadowed CORBRP; bit 15 is the reset-request flag.
    pub fn rp(&self) -> u16 {
        self.rp
    }

    pub fn size(&self) -> RingSize {
        self.size
    }

    pub fn running(&self) -> bool {
        self.running
    }

    /// Write pointer as a ring index, when the ring size is known.
    pub fn wp_index(&self) -> Option<u16> {
        self.size.index_mask().map(|mask| u16::from(self.wp) & mask)
    }

    /// Read pointer (sans reset flag) as a ring index, when the ring size is
    /// known.
    pub fn rp_index(&self) -> Option<u16> {
        self.size.index_mask().map(|mask| (self.rp & !CORBRP_RST) & mask)
    }

    /// The guest has parked the write pointer on the drain sentinel while the
    /// DMA engine runs.
    pub fn drain_pending(&self) -> bool {
        self.running && self.wp == CORBWP_DRAIN_SENTINEL
    }

    /// CORBLBASE write. Sub-word accesses update only the byte lanes they
    /// cover; a full-word write replaces the whole value. Only the low four
    /// source bytes exist in a 32-bit event, so wider accesses are clipped.
    pub fn write_base(&mut self, offset: u64, data: u32, width: u8) {
        for i in 0..u64::from(width.max(1)).min(4) {
            let Some(touched) = offset.checked_add(i) else {
                break;
            };
            let Some(lane) = touched.checked_sub(HDA_CORBLBASE) else {
                continue;
            };
            if lane >= 4 {
                break;
            }
            let shift = (lane as u32) * 8;
            let byte = (data >> (i as u32 * 8)) & 0xFF;
            self.base = (self.base & !(0xFF << shift)) | (byte << shift);
        }
    }

    /// CORBWP write: the low byte is the new write pointer. The sentinel
    /// value is kept as-is rather than masked to a ring index.
    pub fn write_wp(&mut self, data: u32) {
        self.wp = (data & 0xFF) as u8;
    }

    /// CORBRP write (the access carries the high byte). Clearing a previously
    /// set reset flag completes the reset and zeroes the pointer; otherwise
    /// only bit 15 is writable and the low bits are preserved.
    pub fn write_rp(&mut self, data: u32) {
        let value = data as u16;
        if self.rp & CORBRP_RST != 0 && value & CORBRP_RST == 0 {
            self.rp = 0;
        } else {
            self.rp = (self.rp & !CORBRP_RST) | (value & CORBRP_RST);
        }
    }

    /// CORBCTL write. Returns true when this write starts the DMA engine
    /// (run bit rising edge), which is the moment a pending drain must be
    /// re-evaluated.
    pub fn write_ctl(&mut self, data: u32) -> bool {
        let was_running = self.running;
        self.running = data & CORBCTL_RUN != 0;
        self.running && !was_running
    }

    /// CORBSIZE write; bits 1:0 select the ring size.
    pub fn write_size(&mut self, data: u32) {
        self.size = RingSize::from_bits(data);
    }
}
