//! # QEMU Debug Console Output
//!
//! Writes kernel diagnostics to QEMU's debug console, I/O port `0x402`.
//! Start the emulator with `-debugcon stdio` (or `-debugcon file:boot.log`)
//! to see them on the host.
//!
//! ```text
//! log::info!() ──► QemuLogger ──► qemu_trace! ──► QemuSink ──► outb 0x402
//! ```
//!
//! Nothing here allocates, so the sink works before any memory management
//! exists. With the `enabled` feature off, or on a non-x86 target, every
//! write is discarded.
//!
//! ## Usage
//! ```rust,no_run
//! use kernel_qemu::QemuLogger;
//! use log::{LevelFilter, info};
//!
//! static LOGGER: QemuLogger = QemuLogger::new(LevelFilter::Debug);
//!
//! LOGGER.init().ok();
//! info!("Kernel entered");
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod logger;

pub use logger::QemuLogger;

#[cfg(all(feature = "enabled", any(target_arch = "x86", target_arch = "x86_64")))]
#[doc(hidden)]
pub mod qemu_fmt {
    use core::fmt::{self, Write};

    const QEMU_DEBUG_PORT: u16 = 0x402;

    #[allow(clippy::inline_always)]
    #[inline(always)]
    pub fn dbg_putc(c: u8) {
        unsafe { outb(QEMU_DEBUG_PORT, c) }
    }

    #[allow(clippy::inline_always)]
    #[inline(always)]
    unsafe fn outb(port: u16, val: u8) {
        unsafe {
            core::arch::asm!(
                "out dx, al",
                in("dx") port,
                in("al") val,
                options(nomem, nostack, preserves_flags)
            );
        }
    }

    pub struct QemuSink;

    impl Write for QemuSink {
        #[inline]
        fn write_str(&mut self, s: &str) -> fmt::Result {
            for b in s.bytes() {
                dbg_putc(b);
            }
            Ok(())
        }
    }

    #[doc(hidden)]
    #[inline]
    pub fn qemu_write(args: fmt::Arguments) {
        // Best effort; a debug port cannot fail.
        let _ = fmt::write(&mut QemuSink, args);
    }
}

#[cfg(not(all(feature = "enabled", any(target_arch = "x86", target_arch = "x86_64"))))]
#[doc(hidden)]
pub mod qemu_fmt {
    use core::fmt;

    #[doc(hidden)]
    #[inline(always)]
    #[allow(clippy::inline_always)]
    pub fn qemu_write(_: fmt::Arguments) {}
}

/// `print!`-style output straight to the debug console, bypassing `log`.
#[macro_export]
macro_rules! qemu_trace {
    ($($arg:tt)*) => {{
        $crate::qemu_fmt::qemu_write(core::format_args!($($arg)*));
    }};
}
