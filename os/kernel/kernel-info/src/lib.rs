//! # Kernel Configuration and Boot Interface
//!
//! This crate defines the boot-loader-to-kernel contract and the layout
//! constants the early kernel relies on. It is the single source of truth for
//! anything that has to agree between the boot loader's handoff and the kernel's
//! bring-up code.
//!
//! ## Architecture
//!
//! ### Boot Information ([`boot`])
//! The multiboot (0.6.96) handoff:
//! * **Boot Magic**: the value the loader leaves in `EAX` at entry
//! * **Information Record**: [`MultibootInfo`](boot::MultibootInfo), whose
//!   `flags` word tells which of the remaining fields are valid
//! * **Memory Map Records**: [`MmapEntry`](boot::MmapEntry), the variable-size
//!   records pointed to by `mmap_addr`/`mmap_length`
//!
//! ### Memory Layout ([`memory`])
//! Compile-time constants for the descriptor table and the minimum size of the
//! RAM region that may host kernel structures.
//!
//! ## Physical Memory at Handoff
//!
//! ```text
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │     Low Memory (< 1 MiB)        │
//!             │  (BIOS, VGA, real-mode IVT)     │
//! 0x0010_0000 ├─────────────────────────────────┤
//!             │   First usable region ≥ 1 MiB   │ ← GDT lives at its base
//!             │                                 │
//!             ├─────────────────────────────────┤
//!             │   Reserved / ACPI / MMIO        │
//! 0xFFFF_FFFF └─────────────────────────────────┘
//! ```
//!
//! Paging is off during this stage, so physical and linear addresses coincide.
//!
//! ## ABI Compatibility
//! * **`#[repr(C)]`**: the information record is read in place from the address
//!   the loader passes in `EBX`.
//! * **Memory map records** are decoded from little-endian bytes rather than
//!   read through a packed struct, so decoding is bounds-checked and portable.
//! * **No Unsafe Code**: marked `#![deny(unsafe_code)]`.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod boot;
pub mod memory;
