//! # Global Descriptor Table for 32-bit protected mode
//!
//! Builds the kernel's flat-model GDT in the RAM region picked from the boot
//! memory map, writes it there, and switches the CPU over to it.
//!
//! ## Layout
//! Index | Selector | Meaning
//! ------|----------|--------
//! 0     | 0x00     | Null
//! 1     | 0x08     | Kernel code: base 0, 4 GiB, execute/read, 32-bit, DPL 0 ([`KERNEL_CS_SEL`])
//! 2     | 0x10     | Kernel data: base 0, 4 GiB, read/write, 32-bit, DPL 0 ([`KERNEL_DS_SEL`])
//! 3     | 0x18     | Null, reserved for later use
//!
//! ## Sequence
//! ```text
//! KernelRamRegion ──build──► SegmentDescriptorTable ──install(PhysMapRw)──► InstalledTable
//!                                                                               │
//!                                                 activate(SegmentRegisters) ◄──┘
//!                                                   lgdt → CS → SS DS ES FS GS
//! ```
//!
//! The `asm` feature adds [`Cpu`], which drives the real registers on
//! `target_arch = "x86"`. Everything else runs on the host.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod activate;
#[cfg(all(feature = "asm", target_arch = "x86"))]
pub mod cpu;
pub mod descriptors;
pub mod privilege;
pub mod selectors;
pub mod table;

pub use activate::{ActivationError, ActivationStage, DataSegment, SegmentRegisters, activate};
#[cfg(all(feature = "asm", target_arch = "x86"))]
pub use cpu::Cpu;
pub use descriptors::{
    DescriptorError, DescriptorSpec, DescriptorType, Granularity, SegmentDescriptor, SizeFlag,
    decode, encode,
};
pub use table::{DescriptorTablePointer, InstalledTable, SegmentDescriptorTable};

use crate::privilege::KERNEL_RPL;
use crate::selectors::{CodeSel, DataSel, SegmentSelector};

pub const NULL_INDEX: u16 = 0;
pub const KERNEL_CODE_INDEX: u16 = 1;
pub const KERNEL_DATA_INDEX: u16 = 2;
pub const RESERVED_INDEX: u16 = 3;

pub const KERNEL_CS_SEL: SegmentSelector<CodeSel> =
    SegmentSelector::<CodeSel>::new(KERNEL_CODE_INDEX, KERNEL_RPL);
pub const KERNEL_DS_SEL: SegmentSelector<DataSel> =
    SegmentSelector::<DataSel>::new(KERNEL_DATA_INDEX, KERNEL_RPL);

// Encoded selector values as the CPU loads them.
pub const KERNEL_CS: u16 = KERNEL_CS_SEL.encode(); // 0x08
pub const KERNEL_DS: u16 = KERNEL_DS_SEL.encode(); // 0x10

#[allow(clippy::items_after_statements)]
const _: () = {
    assert!(KERNEL_CS == 0x08);
    assert!(KERNEL_DS == 0x10);

    // (index << 3) | TI=0 | RPL
    const fn enc(index: u16, rpl: u16) -> u16 {
        (index << 3) | rpl
    }

    assert!(KERNEL_CS == enc(KERNEL_CODE_INDEX, 0));
    assert!(KERNEL_DS == enc(KERNEL_DATA_INDEX, 0));

    // Slot 0 is architecturally unusable for CS and SS.
    assert!(KERNEL_CODE_INDEX != NULL_INDEX);
    assert!(KERNEL_DATA_INDEX != NULL_INDEX);
    assert!((RESERVED_INDEX as usize) < kernel_info::memory::GDT_ENTRIES);
};
