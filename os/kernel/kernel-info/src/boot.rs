//! # Kernel Boot Information (Multiboot)

use bitfield_struct::bitfield;

/// Value a multiboot-compliant loader places in `EAX` before jumping to the kernel.
pub const MULTIBOOT_BOOTLOADER_MAGIC: u32 = 0x2BAD_B002;

/// Kernel entry point as called by the assembly boot stub.
///
/// The stub passes the loader's `EAX` (magic) and `EBX` (information record).
pub type KernelEntryFn = extern "C" fn(magic: u32, info: *const MultibootInfo) -> !;

/// Capability bits of [`MultibootInfo::flags`].
///
/// Each bit states that the corresponding group of fields in the information
/// record is valid. Fields whose bit is clear must not be read.
#[bitfield(u32)]
#[derive(Eq, PartialEq)]
pub struct MultibootFlags {
    /// Bit 0: `mem_lower`/`mem_upper` are valid.
    pub memory_info: bool,
    /// Bit 1: `boot_device` is valid.
    pub boot_device: bool,
    /// Bit 2: `cmdline` is valid.
    pub cmdline: bool,
    /// Bit 3: `mods_count`/`mods_addr` are valid.
    pub modules: bool,
    /// Bit 4: `syms` holds an a.out symbol table.
    pub aout_symbols: bool,
    /// Bit 5: `syms` holds an ELF section header table.
    pub elf_sections: bool,
    /// Bit 6: `mmap_length`/`mmap_addr` locate a full memory map.
    pub memory_map: bool,
    /// Bit 7: `drives_length`/`drives_addr` are valid.
    pub drives: bool,
    /// Bit 8: `config_table` is valid.
    pub config_table: bool,
    /// Bit 9: `boot_loader_name` is valid.
    pub boot_loader_name: bool,
    /// Bit 10: `apm_table` is valid.
    pub apm_table: bool,
    /// Bit 11: VBE fields are valid.
    pub vbe_info: bool,
    /// Bit 12: framebuffer fields are valid.
    pub framebuffer_info: bool,
    /// Bits 13–31: Reserved.
    #[bits(19, default = 0)]
    _reserved_13_31: u32,
}

/// Multiboot information record, read in place at the address found in `EBX`.
///
/// Only the prefix up to `apm_table` is modeled; the VBE and framebuffer
/// fields that follow it are never consulted during early bring-up.
#[repr(C)]
#[derive(Clone, Debug, Default)]
pub struct MultibootInfo {
    /// Raw capability bits; see [`MultibootFlags`].
    pub flags: u32,
    /// Amount of lower memory in KiB (flag bit 0).
    pub mem_lower: u32,
    /// Amount of upper memory in KiB, starting at 1 MiB (flag bit 0).
    pub mem_upper: u32,
    /// BIOS boot device (flag bit 1).
    pub boot_device: u32,
    /// Physical address of the kernel command line (flag bit 2).
    pub cmdline: u32,
    /// Number of boot modules (flag bit 3).
    pub mods_count: u32,
    /// Physical address of the module list (flag bit 3).
    pub mods_addr: u32,
    /// a.out or ELF symbol information (flag bits 4/5).
    pub syms: [u32; 4],
    /// Length of the memory map buffer in **bytes** (flag bit 6).
    pub mmap_length: u32,
    /// Physical address of the first memory map record (flag bit 6).
    pub mmap_addr: u32,
    /// Length of the drive structures in bytes (flag bit 7).
    pub drives_length: u32,
    /// Physical address of the first drive structure (flag bit 7).
    pub drives_addr: u32,
    /// Physical address of the ROM configuration table (flag bit 8).
    pub config_table: u32,
    /// Physical address of the loader's NUL-terminated name (flag bit 9).
    pub boot_loader_name: u32,
    /// Physical address of the APM table (flag bit 10).
    pub apm_table: u32,
}

impl MultibootInfo {
    /// Typed view of the capability bits.
    #[inline]
    #[must_use]
    pub const fn flags(&self) -> MultibootFlags {
        MultibootFlags::from_bits(self.flags)
    }

    /// Whether the loader handed over a memory map (flag bit 6).
    #[inline]
    #[must_use]
    pub const fn has_memory_map(&self) -> bool {
        self.flags().memory_map()
    }
}

/// One record of the multiboot memory map.
///
/// Wire layout (little-endian, no padding):
///
/// ```text
/// offset  size  field
///  -4      4    size       bytes following this field (normally 20)
///   0      8    base_addr
///   8      8    length
///  16      4    type       1 = available RAM
/// ```
///
/// `mmap_addr` points at the `size` field of the first record; the next record
/// starts `size + 4` bytes later.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MmapEntry {
    /// Number of bytes following the `size` field.
    pub size: u32,
    /// Physical base address of the region.
    pub base_addr: u64,
    /// Length of the region in bytes.
    pub length: u64,
    /// Region type code.
    pub typ: u32,
}

impl MmapEntry {
    /// Width of the leading `size` field.
    pub const SIZE_FIELD_LEN: usize = 4;

    /// Minimum value of `size` for a record to carry all fields.
    pub const MIN_SIZE: u32 = 20;

    /// Total length of a standard record, including the `size` field.
    pub const STANDARD_LEN: usize = Self::SIZE_FIELD_LEN + Self::MIN_SIZE as usize;

    /// Type code of available RAM.
    pub const TYPE_AVAILABLE: u32 = 1;

    /// A standard-sized record.
    #[must_use]
    pub const fn new(base_addr: u64, length: u64, typ: u32) -> Self {
        Self {
            size: Self::MIN_SIZE,
            base_addr,
            length,
            typ,
        }
    }

    /// Number of bytes this record occupies in the buffer, `size` field included.
    ///
    /// `None` if that count does not fit in `usize`.
    #[inline]
    #[must_use]
    pub fn record_len(&self) -> Option<usize> {
        usize::try_from(self.size)
            .ok()
            .and_then(|size| size.checked_add(Self::SIZE_FIELD_LEN))
    }

    /// Decode the record starting at the beginning of `bytes`.
    ///
    /// Returns `None` when `bytes` is too short to hold the fixed fields or when
    /// the record's `size` is too small to contain them.
    #[must_use]
    pub fn from_le_bytes(bytes: &[u8]) -> Option<Self> {
        let size = read_u32(bytes, 0)?;
        if size < Self::MIN_SIZE {
            return None;
        }

        Some(Self {
            size,
            base_addr: read_u64(bytes, 4)?,
            length: read_u64(bytes, 12)?,
            typ: read_u32(bytes, 20)?,
        })
    }

    /// Encode as a standard 24-byte record.
    ///
    /// The `size` field is written verbatim; bytes beyond the standard layout
    /// (if `size > 20`) are not produced.
    #[must_use]
    pub fn to_le_bytes(&self) -> [u8; Self::STANDARD_LEN] {
        let mut out = [0u8; Self::STANDARD_LEN];
        out[0..4].copy_from_slice(&self.size.to_le_bytes());
        out[4..12].copy_from_slice(&self.base_addr.to_le_bytes());
        out[12..20].copy_from_slice(&self.length.to_le_bytes());
        out[20..24].copy_from_slice(&self.typ.to_le_bytes());
        out
    }
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let raw = bytes.get(at..at.checked_add(4)?)?;
    Some(u32::from_le_bytes(raw.try_into().ok()?))
}

fn read_u64(bytes: &[u8], at: usize) -> Option<u64> {
    let raw = bytes.get(at..at.checked_add(8)?)?;
    Some(u64::from_le_bytes(raw.try_into().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_map_is_flag_bit_6() {
        let info = MultibootInfo {
            flags: 1 << 6,
            ..MultibootInfo::default()
        };
        assert!(info.has_memory_map());

        let info = MultibootInfo {
            flags: !(1 << 6),
            ..MultibootInfo::default()
        };
        assert!(!info.has_memory_map());
        assert!(info.flags().memory_info());
    }

    #[test]
    fn record_decodes_from_wire_layout() {
        let bytes = [
            20, 0, 0, 0, // size
            0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, // base_addr
            0x00, 0x00, 0xEE, 0x07, 0x00, 0x00, 0x00, 0x00, // length
            1, 0, 0, 0, // type
        ];
        let entry = MmapEntry::from_le_bytes(&bytes).expect("complete record");
        assert_eq!(entry, MmapEntry::new(0x10_0000, 0x7EE_0000, 1));
        assert_eq!(entry.record_len(), Some(24));
        assert_eq!(entry.to_le_bytes(), bytes);
    }

    #[test]
    fn short_or_undersized_records_are_rejected() {
        let full = MmapEntry::new(0, 0x9FC00, 1).to_le_bytes();
        assert!(MmapEntry::from_le_bytes(&full[..23]).is_none());

        let mut undersized = full;
        undersized[0] = 12;
        assert!(MmapEntry::from_le_bytes(&undersized).is_none());
    }

    #[test]
    fn oversized_record_reports_its_stride() {
        let mut bytes = MmapEntry::new(0, 0x1000, 2).to_le_bytes();
        bytes[0] = 28;
        let entry = MmapEntry::from_le_bytes(&bytes).expect("fields present");
        assert_eq!(entry.record_len(), Some(32));
    }
}
