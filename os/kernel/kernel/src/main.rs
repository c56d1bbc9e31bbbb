//! # Kernel Entry Point
//!
//! A multiboot entry stub sets up a stack, clears `IF` and calls
//! [`kernel_main`] with the loader's `EAX` and `EBX`.

#![no_std]
#![no_main]
#![allow(unsafe_code)]

use core::arch::asm;
use kernel::{BootError, bring_up, check_boot_magic, check_protected_mode};
use kernel_gdt::{Cpu, SegmentRegisters};
use kernel_info::boot::{KernelEntryFn, MultibootInfo};
use kernel_mmap::IdentityMap;
use kernel_qemu::QemuLogger;
use kernel_registers::LoadRegisterUnsafe;
use kernel_registers::cr0::Cr0;
use log::{LevelFilter, error, info};

const LOG_LEVEL: LevelFilter = if cfg!(debug_assertions) {
    LevelFilter::Debug
} else {
    LevelFilter::Info
};

static LOGGER: QemuLogger = QemuLogger::new(LOG_LEVEL);

const _: KernelEntryFn = kernel_main;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    error!("{info}");
    halt()
}

/// Stop this CPU for good.
fn halt() -> ! {
    loop {
        unsafe { asm!("cli", "hlt", options(nomem, nostack)) };
    }
}

/// Kernel entry.
///
/// `magic` and `info` are the multiboot handoff registers `EAX` and `EBX`.
#[unsafe(no_mangle)]
extern "C" fn kernel_main(magic: u32, info: *const MultibootInfo) -> ! {
    // Only fails if a logger is already installed, which cannot happen here.
    let _ = LOGGER.init();
    info!("Kernel entered, magic={magic:#010x}, info={info:p}");

    match boot(magic, info) {
        Ok(()) => info!("Bring-up complete, halting"),
        Err(e) => error!("Boot failed: {e}"),
    }
    halt()
}

fn boot(magic: u32, info: *const MultibootInfo) -> Result<(), BootError> {
    check_boot_magic(magic)?;
    check_protected_mode(unsafe { Cr0::load_unsafe() })?;

    // SAFETY: the loader passes a pointer to an identity-mapped record or null.
    let info = unsafe { info.as_ref() }.ok_or(BootError::MissingBootInfo)?;

    // SAFETY: ring 0, interrupts off, single CPU.
    let mut cpu = unsafe { Cpu::new() };
    info!("Boot-time {}", cpu.current_table());
    let installed = unsafe { bring_up(info, &IdentityMap, &mut cpu)? };

    let active = cpu.current_table();
    info!("Active {active}, {} slots", installed.table().entries().len());
    Ok(())
}
