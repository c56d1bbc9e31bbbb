//! # Protected-Mode Bring-Up
//!
//! Takes the CPU from "the boot loader just jumped to us" to "running on the
//! kernel's own flat segments":
//!
//! 1. Check the boot-loader handoff (magic value, `CR0.PE`).
//! 2. Pick kernel RAM from the multiboot memory map ([`kernel_mmap::parse`]).
//! 3. Build the GDT at the start of that RAM and write it there.
//! 4. Load GDTR and reload every segment register ([`kernel_gdt::activate`]).
//!
//! Every step that touches hardware is behind a trait ([`PhysMapRo`],
//! [`PhysMapRw`], [`SegmentRegisters`]), so the whole sequence also runs
//! against fakes on the host. The bare-metal entry point lives in `main.rs`.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

use kernel_gdt::{ActivationError, InstalledTable, SegmentDescriptorTable, SegmentRegisters};
use kernel_info::boot::{MULTIBOOT_BOOTLOADER_MAGIC, MultibootInfo};
use kernel_mmap::{MemoryMapError, PhysMapRo, PhysMapRw};
use kernel_registers::cr0::Cr0;
use log::info;

/// Any reason the boot cannot continue.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BootError {
    #[error("not loaded by a multiboot loader (magic {found:#010x})")]
    BadMagic { found: u32 },
    #[error("boot information pointer is null")]
    MissingBootInfo,
    #[error("CPU is not in protected mode (CR0.PE clear)")]
    NotProtectedMode,
    #[error(transparent)]
    MemoryMap(#[from] MemoryMapError),
    #[error(transparent)]
    Activation(#[from] ActivationError),
}

/// Confirm the value the loader left in `EAX`.
///
/// # Errors
/// [`BootError::BadMagic`] for anything but `0x2BADB002`.
pub const fn check_boot_magic(magic: u32) -> Result<(), BootError> {
    if magic == MULTIBOOT_BOOTLOADER_MAGIC {
        Ok(())
    } else {
        Err(BootError::BadMagic { found: magic })
    }
}

/// Segment descriptors are only consulted with `CR0.PE` set.
///
/// # Errors
/// [`BootError::NotProtectedMode`] when `PE` is clear.
pub const fn check_protected_mode(cr0: Cr0) -> Result<(), BootError> {
    if cr0.pe_protection_enable() {
        Ok(())
    } else {
        Err(BootError::NotProtectedMode)
    }
}

/// Run memory-map parsing, table construction and activation in order.
///
/// Returns the installed table on success. Nothing is written to memory or
/// loaded into the CPU unless kernel RAM was found below 4 GiB; the CPU sees
/// the table only after all of its bytes are in place.
///
/// # Errors
/// The first failing step, wrapped in [`BootError`].
///
/// # Safety
/// `mapper` must give read access to the memory map named by `info` and
/// write access to the chosen RAM region. `cpu` must be the only agent
/// changing segment state.
pub unsafe fn bring_up<M, C>(
    info: &MultibootInfo,
    mapper: &M,
    cpu: &mut C,
) -> Result<InstalledTable, BootError>
where
    M: PhysMapRo + PhysMapRw,
    C: SegmentRegisters,
{
    let ram = unsafe { kernel_mmap::parse(info, mapper)? };

    let table = SegmentDescriptorTable::build(&ram);
    let installed = unsafe { table.install(mapper)? };

    kernel_gdt::activate(&installed, cpu)?;
    info!("Protected-mode segmentation active, GDT at {:#x}", installed.table().base());
    Ok(installed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic() {
        assert_eq!(check_boot_magic(0x2BAD_B002), Ok(()));
        assert_eq!(
            check_boot_magic(0x36D7_6289),
            Err(BootError::BadMagic { found: 0x36D7_6289 })
        );
        assert_eq!(
            BootError::BadMagic { found: 0 }.to_string(),
            "not loaded by a multiboot loader (magic 0x00000000)"
        );
    }

    #[test]
    fn protected_mode_flag() {
        assert_eq!(check_protected_mode(Cr0::from_bits(0x11)), Ok(()));
        assert_eq!(
            check_protected_mode(Cr0::from_bits(0x10)),
            Err(BootError::NotProtectedMode)
        );
    }

    #[test]
    fn wrapped_errors_keep_their_message() {
        let err = BootError::from(MemoryMapError::NoSuitableRegion);
        assert_eq!(err.to_string(), MemoryMapError::NoSuitableRegion.to_string());
    }
}
