//! Requested Privilege Level (RPL).
//!
//! RPL lives in the **low 2 bits of a segment selector** supplied by the requester
//! (the code performing the load). Don’t confuse it with:
//! - **CPL** (Current Privilege Level): taken from the running `CS`.
//! - **DPL** (Descriptor Privilege Level): stored in the target descriptor.
//!
//! For *data* segment loads, the CPU checks: `max(CPL, RPL) ≤ DPL`.

/// RPL mask in a 16-bit selector.
const RPL_MASK: u16 = 0b11;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u8)]
pub enum Rpl {
    Ring0 = 0,
    Ring1 = 1,
    Ring2 = 2,
    Ring3 = 3,
}

impl Rpl {
    /// Encode as the low two bits of a selector.
    #[inline]
    #[must_use]
    pub const fn into_bits(self) -> u16 {
        self as u16
    }

    /// Decode from the low two bits.
    #[inline]
    #[must_use]
    pub const fn from_bits(value_low2: u16) -> Self {
        match value_low2 & RPL_MASK {
            0 => Self::Ring0,
            1 => Self::Ring1,
            2 => Self::Ring2,
            _ => Self::Ring3,
        }
    }
}

pub const KERNEL_RPL: Rpl = Rpl::Ring0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpl_bits_roundtrip() {
        for b in 0u16..=3 {
            assert_eq!(Rpl::from_bits(b).into_bits(), b);
        }
    }

    #[test]
    fn only_low_bits_count() {
        assert_eq!(Rpl::from_bits(0b110), Rpl::Ring2);
        assert_eq!(Rpl::from_bits(0x1b), Rpl::Ring3);
    }
}
