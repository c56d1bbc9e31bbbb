//! # Memory Map Buffer

use crate::region::{MemoryRegion, RegionKind};
use kernel_info::boot::MmapEntry;
use log::warn;

/// The boot loader's memory map buffer, exactly `mmap_length` bytes long.
#[derive(Copy, Clone, Debug)]
pub struct MemoryMap<'a> {
    bytes: &'a [u8],
}

impl<'a> MemoryMap<'a> {
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Size of the buffer in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decode the records in buffer order.
    #[must_use]
    pub const fn regions(&self) -> Regions<'a> {
        Regions {
            rest: self.bytes,
            offset: 0,
        }
    }

    /// Total number of bytes in [`RegionKind::Usable`] regions.
    #[must_use]
    pub fn usable_bytes(&self) -> u64 {
        self.regions()
            .filter(|r| r.kind == RegionKind::Usable)
            .fold(0, |acc, r| acc.saturating_add(r.length))
    }
}

/// Iterator over the records of a [`MemoryMap`].
///
/// Never reads past the end of the buffer. A record that is cut off by the end
/// of the buffer, or whose `size` field is too small to hold the fixed fields,
/// ends the iteration.
#[derive(Clone, Debug)]
pub struct Regions<'a> {
    rest: &'a [u8],
    offset: usize,
}

impl Regions<'_> {
    fn stop(&mut self) -> Option<MemoryRegion> {
        warn!(
            "Memory map truncated at offset {:#x}: ignoring {} trailing byte(s)",
            self.offset,
            self.rest.len()
        );
        self.rest = &[];
        None
    }
}

impl Iterator for Regions<'_> {
    type Item = MemoryRegion;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }

        let Some(entry) = MmapEntry::from_le_bytes(self.rest) else {
            return self.stop();
        };

        let Some(len) = entry.record_len().filter(|&len| len <= self.rest.len()) else {
            return self.stop();
        };

        self.rest = &self.rest[len..];
        self.offset += len;
        Some(MemoryRegion::from(entry))
    }
}
