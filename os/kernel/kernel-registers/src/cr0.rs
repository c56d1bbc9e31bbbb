use bitfield_struct::bitfield;

/// CR0 as seen by 32-bit protected-mode code.
///
/// Reserved bits are private and default to 0.
#[bitfield(u32)]
#[derive(Eq, PartialEq)]
pub struct Cr0 {
    /// Bit 0: Protection Enable. Segmentation is active once set.
    pub pe_protection_enable: bool,

    /// Bit 1: Monitor Coprocessor.
    pub mp_monitor_coprocessor: bool,

    /// Bit 2: Emulation. x87 instructions fault when set.
    pub em_emulation: bool,

    /// Bit 3: Task Switched.
    pub ts_task_switched: bool,

    /// Bit 4: Extension Type. Hardwired to 1 on anything newer than a 386.
    pub et_extension_type: bool,

    /// Bit 5: Numeric Error. Report x87 errors as #MF instead of IRQ 13.
    pub ne_numeric_error: bool,

    #[bits(10, default = 0)]
    _reserved_6_15: u16,

    /// Bit 16: Write Protect for supervisor writes to read-only pages.
    pub wp_write_protect: bool,

    #[bits(default = 0)]
    _reserved_17: bool,

    /// Bit 18: Alignment Mask.
    pub am_alignment_mask: bool,

    #[bits(10, default = 0)]
    _reserved_19_28: u16,

    /// Bit 29: Not-Write-Through.
    pub nw_not_write_through: bool,

    /// Bit 30: Cache Disable.
    pub cd_cache_disable: bool,

    /// Bit 31: Paging. Requires PE.
    pub pg_paging: bool,
}

#[cfg(all(feature = "asm", any(target_arch = "x86", target_arch = "x86_64")))]
impl crate::LoadRegisterUnsafe for Cr0 {
    #[allow(clippy::cast_possible_truncation)]
    unsafe fn load_unsafe() -> Self {
        let cr0: usize;
        unsafe {
            core::arch::asm!("mov {}, cr0", out(reg) cr0, options(nomem, nostack, preserves_flags));
        }
        Self::from_bits(cr0 as u32)
    }
}
