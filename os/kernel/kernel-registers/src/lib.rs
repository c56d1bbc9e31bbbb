//! # Typed x86 Control and System-Table Registers
//!
//! Each register is a plain value type. Reading and writing the hardware
//! register goes through the `Load*`/`Store*` traits, which are only
//! implemented with the `asm` feature on a matching target. Without it the
//! types still encode and decode, which is what host-side tests use.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

#[cfg(feature = "cr0")]
pub mod cr0;

#[cfg(feature = "gdtr")]
pub mod gdtr;

pub trait LoadRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// For example, the register access might be privileged and require kernel mode (Ring 0).
    unsafe fn load_unsafe() -> Self;
}

pub trait StoreRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// For example, the register access might be privileged and require kernel mode (Ring 0).
    unsafe fn store_unsafe(self);
}

pub trait LoadRegister {
    /// Reading this register is allowed at any privilege level.
    fn load() -> Self;
}
