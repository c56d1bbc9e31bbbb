//! # Memory Layout

/// Smallest usable region accepted as backing store for kernel structures.
///
/// Anything below 1 MiB is left to the firmware and legacy devices.
pub const KERNEL_RAM_MIN_LEN: u64 = 0x10_0000; // 1 MiB

/// Size of one segment descriptor in bytes.
pub const DESCRIPTOR_SIZE: usize = 8;

/// Number of slots in the Global Descriptor Table: null, kernel code, kernel data, reserved.
pub const GDT_ENTRIES: usize = 4;

/// Size of the Global Descriptor Table in bytes.
pub const GDT_SIZE: usize = GDT_ENTRIES * DESCRIPTOR_SIZE;

/// GDTR limit: size of the table **minus one**.
#[allow(clippy::cast_possible_truncation)]
pub const GDT_LIMIT: u16 = (GDT_SIZE - 1) as u16;

/// Exclusive upper bound for table addresses: GDTR holds a 32-bit base in
/// protected mode.
pub const GDTR_ADDRESS_LIMIT: u64 = 1 << 32;

/// Unit of a page-granular segment limit.
pub const SEGMENT_PAGE_SIZE: u64 = 4096;

const _: () = {
    assert!(GDT_SIZE == 32);
    assert!(GDT_LIMIT == 31);
    assert!(KERNEL_RAM_MIN_LEN >= GDT_SIZE as u64);
    assert!(SEGMENT_PAGE_SIZE.is_power_of_two());
    assert!(GDTR_ADDRESS_LIMIT > KERNEL_RAM_MIN_LEN);
};
