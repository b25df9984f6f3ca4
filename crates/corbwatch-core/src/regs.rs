//! CORB register block layout and write classification.
//!
//! Offsets follow the Intel HDA memory-mapped register layout; only the
//! registers on the CORB write path are modeled. Everything else in region 0
//! is either codec verb traffic (immediate-command and stream-descriptor
//! ranges) or uninteresting.

pub const HDA_INTCTL: u64 = 0x20;

pub const HDA_CORBLBASE: u64 = 0x40;
pub const HDA_CORBWP: u64 = 0x48;
pub const HDA_CORBRP: u64 = 0x4A;
pub const HDA_CORBCTL: u64 = 0x4C;
pub const HDA_CORBSIZE: u64 = 0x4E;

/// First stream-descriptor register; accesses at or above are verb/stream
/// traffic, not ring control.
pub const HDA_SD_BASE: u64 = 0x80;

pub const CORBCTL_RUN: u32 = 1 << 1;
pub const CORBRP_RST: u16 = 1 << 15;

/// Out-of-range CORBWP value the observed guest driver writes to signal
/// "ring consumed, flush now". Checked against the raw low byte, never
/// against a ring index.
pub const CORBWP_DRAIN_SENTINEL: u8 = 0xFF;

/// Target of a classified bus write.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RegisterId {
    CorbBaseLow,
    CorbWritePointer,
    CorbReadPointer,
    CorbControl,
    CorbSize,
    ExitTriggerProbe,
    /// Region 0 verb/stream traffic, or any write outside region 0.
    GenericVerbRegion,
    Unclassified,
}

/// `(register, base, size)` byte ranges, ascending by base. The ranges do not
/// overlap each other.
const RANGES: &[(RegisterId, u64, u64)] = &[
    (RegisterId::ExitTriggerProbe, HDA_INTCTL, 4),
    (RegisterId::CorbBaseLow, HDA_CORBLBASE, 4),
    (RegisterId::CorbWritePointer, HDA_CORBWP, 1),
    (RegisterId::CorbReadPointer, HDA_CORBRP, 2),
    (RegisterId::CorbControl, HDA_CORBCTL, 1),
    (RegisterId::CorbSize, HDA_CORBSIZE, 1),
];

impl RegisterId {
    /// Classify a bus write by the byte range it touches.
    ///
    /// Total: every `(region, offset, width)` yields exactly one id. A write
    /// is attributed to the register containing its first byte; when the
    /// first byte is in no register, to the lowest-based register its byte
    /// range overlaps. An access narrower than the register still counts as a
    /// touch.
    ///
    /// A CORBRP access narrower than two bytes cannot carry the bit-15 reset
    /// flag and is reported as `Unclassified` so a stray byte write never
    /// corrupts the shadowed reset state.
    pub fn classify(region: u32, offset: u64, width: u8) -> Self {
        if region != 0 {
            return RegisterId::GenericVerbRegion;
        }

        let len = u64::from(width.max(1));
        let end = offset.saturating_add(len);

        let mut overlap = None;
        for &(id, base, size) in RANGES {
            if offset >= base && offset < base + size {
                return Self::narrow_rp_filter(id, width);
            }
            if overlap.is_none() && offset < base + size && end > base {
                overlap = Some(id);
            }
        }
        if let Some(id) = overlap {
            return Self::narrow_rp_filter(id, width);
        }

        if offset < HDA_INTCTL || offset >= HDA_SD_BASE {
            RegisterId::GenericVerbRegion
        } else {
            RegisterId::Unclassified
        }
    }

    fn narrow_rp_filter(id: RegisterId, width: u8) -> RegisterId {
        if id == RegisterId::CorbReadPointer && width < 2 {
            RegisterId::Unclassified
        } else {
            id
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_register_offsets_classify() {
        assert_eq!(
            RegisterId::classify(0, HDA_CORBLBASE, 4),
            RegisterId::CorbBaseLow
        );
        assert_eq!(
            RegisterId::classify(0, HDA_CORBWP, 1),
            RegisterId::CorbWritePointer
        );
        assert_eq!(
            RegisterId::classify(0, HDA_CORBRP, 2),
            RegisterId::CorbReadPointer
        );
        assert_eq!(
            RegisterId::classify(0, HDA_CORBCTL, 1),
            RegisterId::CorbControl
        );
        assert_eq!(RegisterId::classify(0, HDA_CORBSIZE, 1), RegisterId::CorbSize);
        assert_eq!(
            RegisterId::classify(0, HDA_INTCTL, 4),
            RegisterId::ExitTriggerProbe
        );
    }

    #[test]
    fn narrow_access_inside_register_still_touches_it() {
        // Single-byte writes into the middle of CORBLBASE.
        for offset in HDA_CORBLBASE..HDA_CORBLBASE + 4 {
            assert_eq!(RegisterId::classify(0, offset, 1), RegisterId::CorbBaseLow);
        }
        // Second byte of INTCTL.
        assert_eq!(
            RegisterId::classify(0, HDA_INTCTL + 1, 1),
            RegisterId::ExitTriggerProbe
        );
    }

    #[test]
    fn access_starting_below_a_register_can_still_touch_it() {
        // [0x49, 0x4B) overlaps CORBRP even though 0x49 is reserved.
        assert_eq!(
            RegisterId::classify(0, HDA_CORBWP + 1, 2),
            RegisterId::CorbReadPointer
        );
    }

    #[test]
    fn wide_access_goes_to_the_register_holding_its_first_byte() {
        // A dword at 0x48 covers CORBWP, the reserved byte and CORBRP; the
        // write-pointer lane is the one the transition consumes.
        assert_eq!(
            RegisterId::classify(0, HDA_CORBWP, 4),
            RegisterId::CorbWritePointer
        );
    }

    #[test]
    fn narrow_corbrp_access_is_unclassified() {
        assert_eq!(RegisterId::classify(0, HDA_CORBRP, 1), RegisterId::Unclassified);
        assert_eq!(
            RegisterId::classify(0, HDA_CORBRP + 1, 1),
            RegisterId::Unclassified
        );
    }

    #[test]
    fn verb_and_stream_ranges_are_generic() {
        assert_eq!(RegisterId::classify(0, 0x00, 4), RegisterId::GenericVerbRegion);
        assert_eq!(RegisterId::classify(0, 0x1F, 1), RegisterId::GenericVerbRegion);
        assert_eq!(
            RegisterId::classify(0, HDA_SD_BASE, 4),
            RegisterId::GenericVerbRegion
        );
        assert_eq!(
            RegisterId::classify(0, 0x188, 4),
            RegisterId::GenericVerbRegion
        );
    }

    #[test]
    fn non_zero_regions_are_generic() {
        assert_eq!(RegisterId::classify(2, HDA_CORBWP, 1), RegisterId::GenericVerbRegion);
        assert_eq!(RegisterId::classify(4, 0x0, 4), RegisterId::GenericVerbRegion);
    }

    #[test]
    fn untabled_region_zero_offsets_are_unclassified() {
        // Gaps between the modeled registers.
        assert_eq!(RegisterId::classify(0, 0x30, 4), RegisterId::Unclassified);
        assert_eq!(RegisterId::classify(0, 0x44, 4), RegisterId::Unclassified); // CORBUBASE
        assert_eq!(RegisterId::classify(0, 0x4D, 1), RegisterId::Unclassified); // CORBSTS
        assert_eq!(RegisterId::classify(0, 0x4F, 1), RegisterId::Unclassified);
        assert_eq!(RegisterId::classify(0, 0x50, 4), RegisterId::Unclassified); // RIRB block
    }

    #[test]
    fn classification_handles_extreme_offsets() {
        assert_eq!(
            RegisterId::classify(0, u64::MAX, 4),
            RegisterId::GenericVerbRegion
        );
        assert_eq!(RegisterId::classify(0, 0x7F, 4), RegisterId::Unclassified);
    }
}
