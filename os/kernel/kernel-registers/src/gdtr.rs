//! GDTR, the 6-byte pseudo-descriptor operand of `lgdt` and `sgdt`.

use core::fmt;

/// Limit and 32-bit linear base of the active global descriptor table.
///
/// The CPU reads exactly `limit + 1` bytes starting at `base`.
#[repr(C, packed)]
#[derive(Copy, Clone, Default)]
pub struct Gdtr {
    limit: u16,
    base: u32,
}

impl Gdtr {
    #[inline]
    #[must_use]
    pub const fn new(base: u32, limit: u16) -> Self {
        Self { limit, base }
    }

    #[inline]
    #[must_use]
    pub const fn base(&self) -> u32 {
        self.base
    }

    /// Table size in bytes, minus one.
    #[inline]
    #[must_use]
    pub const fn limit(&self) -> u16 {
        self.limit
    }
}

impl PartialEq for Gdtr {
    fn eq(&self, other: &Self) -> bool {
        self.base() == other.base() && self.limit() == other.limit()
    }
}

impl Eq for Gdtr {}

impl fmt::Debug for Gdtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gdtr")
            .field("base", &format_args!("{:#010x}", self.base()))
            .field("limit", &format_args!("{:#x}", self.limit()))
            .finish()
    }
}

#[cfg(all(feature = "asm", target_arch = "x86"))]
impl crate::LoadRegister for Gdtr {
    fn load() -> Self {
        let mut gdtr = Self::default();
        unsafe {
            core::arch::asm!(
                "sgdt [{}]",
                in(reg) &raw mut gdtr,
                options(nostack, preserves_flags)
            );
        }
        gdtr
    }
}

#[cfg(all(feature = "asm", target_arch = "x86"))]
impl crate::StoreRegisterUnsafe for Gdtr {
    unsafe fn store_unsafe(self) {
        unsafe {
            core::arch::asm!(
                "lgdt [{}]",
                in(reg) &raw const self,
                options(readonly, nostack, preserves_flags)
            );
        }
    }
}

const _: () = {
    assert!(size_of::<Gdtr>() == 6);
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pseudo_descriptor_layout() {
        let gdtr = Gdtr::new(0x0010_0000, 31);
        assert_eq!(gdtr.base(), 0x0010_0000);
        assert_eq!(gdtr.limit(), 31);
        assert_eq!(gdtr, Gdtr::new(0x0010_0000, 31));
        assert_ne!(gdtr, Gdtr::new(0x0010_0000, 23));
    }
}
