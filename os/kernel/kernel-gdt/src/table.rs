//! # Building and placing the table

use crate::activate::ActivationError;
use crate::descriptors::{DescriptorSpec, SegmentDescriptor};
use crate::{KERNEL_CODE_INDEX, KERNEL_DATA_INDEX};
use core::fmt;
use kernel_info::memory::{
    DESCRIPTOR_SIZE, GDT_ENTRIES, GDT_LIMIT, GDT_SIZE, GDTR_ADDRESS_LIMIT,
};
use kernel_mmap::{KernelRamRegion, PhysMapRw};
use log::debug;

/// Flat ring-0 execute/read code segment.
pub const KERNEL_CODE: SegmentDescriptor =
    match SegmentDescriptor::encode(&DescriptorSpec::flat_code(0)) {
        Ok(desc) => desc,
        Err(_) => panic!("kernel code descriptor does not encode"),
    };

/// Flat ring-0 read/write data segment.
pub const KERNEL_DATA: SegmentDescriptor =
    match SegmentDescriptor::encode(&DescriptorSpec::flat_data(0)) {
        Ok(desc) => desc,
        Err(_) => panic!("kernel data descriptor does not encode"),
    };

const _: () = {
    assert!(KERNEL_CODE.to_u64() == 0x00CF_9A00_0000_FFFF);
    assert!(KERNEL_DATA.to_u64() == 0x00CF_9200_0000_FFFF);
};

/// Operand of `lgdt`: where the table lives and its size minus one.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DescriptorTablePointer {
    /// Physical (= linear, before paging) address of entry 0.
    pub base: u64,
    pub limit: u16,
}

impl fmt::Display for DescriptorTablePointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GDTR base={:#010x} limit={:#x}", self.base, self.limit)
    }
}

/// The kernel's four-slot GDT and the address it is placed at.
///
/// | Slot | Selector | Content            |
/// |------|----------|--------------------|
/// | 0    | `0x00`   | null               |
/// | 1    | `0x08`   | [`KERNEL_CODE`]    |
/// | 2    | `0x10`   | [`KERNEL_DATA`]    |
/// | 3    | `0x18`   | null, reserved     |
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SegmentDescriptorTable {
    base: u64,
    entries: [SegmentDescriptor; GDT_ENTRIES],
}

impl SegmentDescriptorTable {
    /// Lay out the table at the start of `ram`.
    ///
    /// Nothing is written to memory yet; see [`install`](Self::install).
    #[must_use]
    pub const fn build(ram: &KernelRamRegion) -> Self {
        let mut entries = [SegmentDescriptor::NULL; GDT_ENTRIES];
        entries[KERNEL_CODE_INDEX as usize] = KERNEL_CODE;
        entries[KERNEL_DATA_INDEX as usize] = KERNEL_DATA;
        Self {
            base: ram.base_address(),
            entries,
        }
    }

    #[inline]
    #[must_use]
    pub const fn base(&self) -> u64 {
        self.base
    }

    #[inline]
    #[must_use]
    pub const fn entries(&self) -> &[SegmentDescriptor; GDT_ENTRIES] {
        &self.entries
    }

    #[inline]
    #[must_use]
    pub fn entry(&self, index: usize) -> Option<SegmentDescriptor> {
        self.entries.get(index).copied()
    }

    /// The table exactly as it is laid out in memory.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; GDT_SIZE] {
        let mut bytes = [0u8; GDT_SIZE];
        for (chunk, desc) in bytes.chunks_exact_mut(DESCRIPTOR_SIZE).zip(&self.entries) {
            chunk.copy_from_slice(&desc.to_bytes());
        }
        bytes
    }

    #[inline]
    #[must_use]
    pub const fn pointer(&self) -> DescriptorTablePointer {
        DescriptorTablePointer {
            base: self.base,
            limit: GDT_LIMIT,
        }
    }

    /// Whether all 32 bytes lie below [`GDTR_ADDRESS_LIMIT`].
    #[inline]
    #[must_use]
    pub const fn is_reachable(&self) -> bool {
        match self.base.checked_add(GDT_SIZE as u64) {
            Some(end) => end <= GDTR_ADDRESS_LIMIT,
            None => false,
        }
    }

    /// Copy the table to its base address.
    ///
    /// # Errors
    /// [`ActivationError::TableOutOfReach`] if GDTR cannot address the table
    /// or `mapper` cannot map it. Nothing is written in that case.
    ///
    /// # Safety
    /// `mapper` must map `GDT_SIZE` writable bytes at [`base`](Self::base),
    /// and nothing else may use that memory while the table is live.
    pub unsafe fn install<M: PhysMapRw>(
        &self,
        mapper: &M,
    ) -> Result<InstalledTable, ActivationError> {
        let out_of_reach = ActivationError::TableOutOfReach { base: self.base };
        if !self.is_reachable() {
            return Err(out_of_reach);
        }

        let dst = unsafe { mapper.map_rw(self.base, GDT_SIZE) };
        if dst.len() != GDT_SIZE {
            return Err(out_of_reach);
        }
        dst.copy_from_slice(&self.to_bytes());

        for (index, desc) in self.entries.iter().enumerate() {
            debug!("GDT[{index}] {desc}");
        }
        debug!("GDT written at {:#x}", self.base);

        Ok(InstalledTable { table: *self })
    }
}

/// A table whose bytes are in place at its base address.
///
/// Only [`SegmentDescriptorTable::install`] creates one, so activation cannot
/// point the CPU at memory that was never written.
#[derive(Debug, Eq, PartialEq)]
pub struct InstalledTable {
    table: SegmentDescriptorTable,
}

impl InstalledTable {
    #[inline]
    #[must_use]
    pub const fn table(&self) -> &SegmentDescriptorTable {
        &self.table
    }

    #[inline]
    #[must_use]
    pub const fn pointer(&self) -> DescriptorTablePointer {
        self.table.pointer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;
    use kernel_mmap::{MemoryRegion, RegionKind};

    fn ram_at(base_address: u64) -> KernelRamRegion {
        KernelRamRegion::new(MemoryRegion {
            base_address,
            length: 0x7EE_0000,
            kind: RegionKind::Usable,
        })
        .unwrap()
    }

    /// Records every write window.
    struct Scratch {
        base: u64,
        bytes: RefCell<Vec<u8>>,
    }

    impl PhysMapRw for Scratch {
        unsafe fn map_rw<'a>(&self, paddr: u64, len: usize) -> &'a mut [u8] {
            let start = usize::try_from(paddr - self.base).unwrap();
            let mut bytes = self.bytes.borrow_mut();
            let slice = &mut bytes[start..start + len];
            unsafe { core::slice::from_raw_parts_mut(slice.as_mut_ptr(), slice.len()) }
        }
    }

    #[test]
    fn layout_is_null_code_data_null() {
        let table = SegmentDescriptorTable::build(&ram_at(0x10_0000));
        assert_eq!(table.base(), 0x10_0000);
        assert_eq!(
            table.entries().map(SegmentDescriptor::to_u64),
            [0, 0x00CF_9A00_0000_FFFF, 0x00CF_9200_0000_FFFF, 0]
        );
        assert_eq!(table.entry(4), None);
    }

    #[test]
    fn pointer_covers_four_entries() {
        let table = SegmentDescriptorTable::build(&ram_at(0x20_0000));
        assert_eq!(
            table.pointer(),
            DescriptorTablePointer {
                base: 0x20_0000,
                limit: 31,
            }
        );
    }

    #[test]
    fn byte_image() {
        let bytes = SegmentDescriptorTable::build(&ram_at(0x10_0000)).to_bytes();
        assert_eq!(bytes[0..8], [0; 8]);
        assert_eq!(bytes[8..16], [0xFF, 0xFF, 0, 0, 0, 0x9A, 0xCF, 0]);
        assert_eq!(bytes[16..24], [0xFF, 0xFF, 0, 0, 0, 0x92, 0xCF, 0]);
        assert_eq!(bytes[24..32], [0; 8]);
    }

    #[test]
    fn install_writes_exactly_the_table() {
        let mem = Scratch {
            base: 0x10_0000,
            bytes: RefCell::new(vec![0xEE; 64]),
        };
        let table = SegmentDescriptorTable::build(&ram_at(0x10_0000));
        let installed = unsafe { table.install(&mem) }.unwrap();

        let bytes = mem.bytes.borrow();
        assert_eq!(bytes[..GDT_SIZE], table.to_bytes());
        assert!(bytes[GDT_SIZE..].iter().all(|&b| b == 0xEE));
        assert_eq!(installed.pointer(), table.pointer());
        assert_eq!(installed.table(), &table);
    }

    /// Fails the test on any write.
    struct ReadOnly;

    impl PhysMapRw for ReadOnly {
        unsafe fn map_rw<'a>(&self, paddr: u64, _len: usize) -> &'a mut [u8] {
            panic!("nothing may be written at {paddr:#x}");
        }
    }

    #[test]
    fn ram_above_4_gib_is_rejected_before_writing() {
        let table = SegmentDescriptorTable::build(&ram_at(0x1_0000_0000));
        assert!(!table.is_reachable());
        assert_eq!(
            unsafe { table.install(&ReadOnly) },
            Err(ActivationError::TableOutOfReach {
                base: 0x1_0000_0000
            })
        );
    }

    #[test]
    fn table_must_end_below_4_gib() {
        assert!(SegmentDescriptorTable::build(&ram_at(0xFFFF_FFE0)).is_reachable());
        assert!(!SegmentDescriptorTable::build(&ram_at(0xFFFF_FFE1)).is_reachable());
        assert!(!SegmentDescriptorTable::build(&ram_at(u64::MAX - 8)).is_reachable());
    }

    #[test]
    fn unmappable_table_is_rejected() {
        struct Nothing;

        impl PhysMapRw for Nothing {
            unsafe fn map_rw<'a>(&self, _paddr: u64, _len: usize) -> &'a mut [u8] {
                &mut []
            }
        }

        let table = SegmentDescriptorTable::build(&ram_at(0x10_0000));
        assert_eq!(
            unsafe { table.install(&Nothing) },
            Err(ActivationError::TableOutOfReach { base: 0x10_0000 })
        );
    }
}
