//! # Boot Memory Map
//!
//! Finds the physical RAM the kernel may use for its own early structures by
//! scanning the memory map a multiboot loader hands over.
//!
//! ## Overview
//!
//! ```text
//! MultibootInfo ──flags bit 6──► mmap_addr / mmap_length
//!                                     │
//!                                     ▼  (PhysMapRo)
//!                               MemoryMap (bytes)
//!                                     │  regions()
//!                                     ▼
//!                     first Usable region ≥ 1 MiB ──► KernelRamRegion
//! ```
//!
//! ## Selection Policy
//! Records are delivered in ascending address order, so taking the **first**
//! qualifying record yields the lowest-addressed usable region of at least
//! [`KERNEL_RAM_MIN_LEN`](kernel_info::memory::KERNEL_RAM_MIN_LEN) bytes. The
//! scan stops at that record.
//!
//! ## Physical Memory Access
//! The buffer lives in physical memory. Access goes through [`PhysMapRo`], so
//! the same parser runs on the identity-mapped boot CPU ([`IdentityMap`]) and
//! against plain byte buffers in tests.
//!
//! ## Usage
//! ```rust,no_run
//! use kernel_info::boot::MultibootInfo;
//! use kernel_mmap::{IdentityMap, parse};
//!
//! fn find_ram(info: &MultibootInfo) {
//!     match unsafe { parse(info, &IdentityMap) } {
//!         Ok(ram) => log::info!("kernel RAM: {ram}"),
//!         Err(e) => log::error!("{e}"),
//!     }
//! }
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod map;
mod phys;
mod region;

pub use map::{MemoryMap, Regions};
pub use phys::{IdentityMap, PhysMapRo, PhysMapRw};
pub use region::{KernelRamRegion, MemoryRegion, RegionKind};

use kernel_info::boot::MultibootInfo;
use log::{debug, info, warn};

/// Failure to find RAM for the kernel. Both variants are fatal for the boot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryMapError {
    #[error("boot loader provided no memory map (flag bit 6 clear)")]
    MemoryMapUnavailable,
    #[error("no usable memory region of at least 1 MiB")]
    NoSuitableRegion,
}

/// Pick the first region that can back kernel structures.
///
/// Consumes `regions` only up to (and including) the winning region.
pub fn select_kernel_ram<I>(regions: I) -> Option<KernelRamRegion>
where
    I: IntoIterator<Item = MemoryRegion>,
{
    regions.into_iter().find_map(KernelRamRegion::new)
}

/// Locate the kernel RAM region from the boot loader's information record.
///
/// Fails with [`MemoryMapError::MemoryMapUnavailable`] before touching any
/// memory when the loader did not set the memory map flag, and with
/// [`MemoryMapError::NoSuitableRegion`] when no record qualifies.
///
/// # Safety
/// When the memory map flag is set, `mmap_addr`/`mmap_length` must describe a
/// buffer that `mapper` can map for reading.
pub unsafe fn parse<M: PhysMapRo>(
    info: &MultibootInfo,
    mapper: &M,
) -> Result<KernelRamRegion, MemoryMapError> {
    debug!("MBI flags {:#034b}", info.flags);
    if !info.has_memory_map() {
        warn!("Memory map flag (bit 6) missing");
        return Err(MemoryMapError::MemoryMapUnavailable);
    }

    if info.mmap_addr == 0 {
        warn!("Memory map flag set, but the buffer address is null");
        return Err(MemoryMapError::MemoryMapUnavailable);
    }

    debug!(
        "mmap_addr={:#x}, mmap_length={:#x}",
        info.mmap_addr, info.mmap_length
    );

    let bytes = unsafe { mapper.map_ro(u64::from(info.mmap_addr), info.mmap_length as usize) };
    let map = MemoryMap::new(bytes);
    let ram = select_kernel_ram(map.regions());
    log_memory_map(&map, ram.as_ref());

    let ram = ram.ok_or(MemoryMapError::NoSuitableRegion)?;
    info!("Using {ram} as kernel RAM");
    Ok(ram)
}

/// Dump every record of the map at `debug` level, marking `chosen`.
pub fn log_memory_map(map: &MemoryMap<'_>, chosen: Option<&KernelRamRegion>) {
    for (index, region) in map.regions().enumerate() {
        if chosen.is_some_and(|ram| ram.region() == &region) {
            debug!("mmap[{index}] {region} (using as RAM)");
        } else {
            debug!("mmap[{index}] {region}");
        }
    }
    debug!("Usable RAM: {:#x} bytes", map.usable_bytes());
}
