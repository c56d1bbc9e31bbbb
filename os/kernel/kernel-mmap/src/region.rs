//! # Physical Memory Regions

use core::fmt;
use kernel_info::boot::MmapEntry;
use kernel_info::memory::KERNEL_RAM_MIN_LEN;

/// What the firmware says a region of physical memory may be used for.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RegionKind {
    /// Available RAM (type 1).
    Usable,
    /// Reserved by firmware or hardware (type 2).
    Reserved,
    /// ACPI tables; reusable once they have been parsed (type 3).
    AcpiReclaimable,
    /// ACPI non-volatile storage, must be preserved across sleep (type 4).
    AcpiNvs,
    /// Defective RAM (type 5).
    BadRam,
    /// Any other type code.
    Unknown(u32),
}

impl From<u32> for RegionKind {
    fn from(code: u32) -> Self {
        match code {
            1 => Self::Usable,
            2 => Self::Reserved,
            3 => Self::AcpiReclaimable,
            4 => Self::AcpiNvs,
            5 => Self::BadRam,
            other => Self::Unknown(other),
        }
    }
}

impl From<RegionKind> for u32 {
    fn from(kind: RegionKind) -> Self {
        match kind {
            RegionKind::Usable => 1,
            RegionKind::Reserved => 2,
            RegionKind::AcpiReclaimable => 3,
            RegionKind::AcpiNvs => 4,
            RegionKind::BadRam => 5,
            RegionKind::Unknown(code) => code,
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usable => f.write_str("usable"),
            Self::Reserved => f.write_str("reserved"),
            Self::AcpiReclaimable => f.write_str("ACPI reclaimable"),
            Self::AcpiNvs => f.write_str("ACPI NVS"),
            Self::BadRam => f.write_str("bad RAM"),
            Self::Unknown(code) => write!(f, "unknown ({code})"),
        }
    }
}

/// A contiguous range of physical memory as reported by the boot loader.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MemoryRegion {
    /// Physical address of the first byte.
    pub base_address: u64,
    /// Length in bytes.
    pub length: u64,
    /// Firmware classification.
    pub kind: RegionKind,
}

impl MemoryRegion {
    /// Exclusive end address, saturating at the top of the 64-bit space.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.base_address.saturating_add(self.length)
    }
}

impl From<MmapEntry> for MemoryRegion {
    fn from(entry: MmapEntry) -> Self {
        Self {
            base_address: entry.base_addr,
            length: entry.length,
            kind: RegionKind::from(entry.typ),
        }
    }
}

impl fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:#012x}..{:#012x}) len={:#x} {}",
            self.base_address,
            self.end(),
            self.length,
            self.kind
        )
    }
}

/// The usable region picked to host kernel structures (the GDT first of all).
///
/// Can only be obtained through [`KernelRamRegion::new`], which guarantees the
/// region is [`RegionKind::Usable`] and at least [`KERNEL_RAM_MIN_LEN`] bytes long.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct KernelRamRegion(MemoryRegion);

impl KernelRamRegion {
    /// Accept `region` if it can back kernel structures.
    #[must_use]
    pub const fn new(region: MemoryRegion) -> Option<Self> {
        if Self::is_suitable(&region) {
            Some(Self(region))
        } else {
            None
        }
    }

    /// Usable and at least 1 MiB long.
    #[inline]
    #[must_use]
    pub const fn is_suitable(region: &MemoryRegion) -> bool {
        matches!(region.kind, RegionKind::Usable) && region.length >= KERNEL_RAM_MIN_LEN
    }

    #[inline]
    #[must_use]
    pub const fn base_address(&self) -> u64 {
        self.0.base_address
    }

    #[inline]
    #[must_use]
    pub const fn length(&self) -> u64 {
        self.0.length
    }

    #[inline]
    #[must_use]
    pub const fn region(&self) -> &MemoryRegion {
        &self.0
    }
}

impl fmt::Display for KernelRamRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
