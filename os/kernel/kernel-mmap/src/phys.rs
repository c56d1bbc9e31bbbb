//! # Physical Memory Access

/// Map a physical region and return a *read-only* byte slice for its contents.
/// You provide the implementation (identity map, fixed offset, test buffer, ...).
pub trait PhysMapRo {
    /// # Safety
    /// The implementor must ensure the returned slice is valid for `len` bytes
    /// for as long as the caller uses it.
    unsafe fn map_ro<'a>(&self, paddr: u64, len: usize) -> &'a [u8];
}

/// Map a physical region and return a *writable* byte slice for its contents.
pub trait PhysMapRw {
    /// # Safety
    /// The implementor must ensure the returned slice is valid for `len` bytes,
    /// and the caller must hold exclusive ownership of the range while the slice
    /// is alive.
    unsafe fn map_rw<'a>(&self, paddr: u64, len: usize) -> &'a mut [u8];
}

/// Physical memory accessed at the identical linear address.
///
/// Valid while paging is disabled (or the range is identity-mapped), which is
/// the case for the whole protected-mode bring-up.
#[derive(Debug, Copy, Clone, Default)]
pub struct IdentityMap;

impl PhysMapRo for IdentityMap {
    /// # Safety
    /// `paddr` must be non-zero and `len` bytes from it must be readable memory.
    unsafe fn map_ro<'a>(&self, paddr: u64, len: usize) -> &'a [u8] {
        let Some(addr) = linear(paddr, len) else {
            return &[];
        };
        unsafe { core::slice::from_raw_parts(addr as *const u8, len) }
    }
}

impl PhysMapRw for IdentityMap {
    /// # Safety
    /// `paddr` must be non-zero and `len` bytes from it must be writable RAM
    /// that nothing else references.
    unsafe fn map_rw<'a>(&self, paddr: u64, len: usize) -> &'a mut [u8] {
        let Some(addr) = linear(paddr, len) else {
            return &mut [];
        };
        unsafe { core::slice::from_raw_parts_mut(addr as *mut u8, len) }
    }
}

/// Linear address of `paddr` if all of `paddr..paddr + len` is addressable.
///
/// Ranges the CPU cannot reach map to an empty slice instead of a truncated
/// pointer.
fn linear(paddr: u64, len: usize) -> Option<usize> {
    let addr = usize::try_from(paddr).ok()?;
    addr.checked_add(len)?;
    Some(addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_ranges_map_to_nothing() {
        let top = u64::try_from(usize::MAX).unwrap();
        assert_eq!(linear(top, 2), None);
        assert_eq!(linear(0x10_0000, 32), Some(0x10_0000));

        let ro = unsafe { IdentityMap.map_ro(top, 2) };
        assert!(ro.is_empty());
        let rw = unsafe { IdentityMap.map_rw(top, 2) };
        assert!(rw.is_empty());
    }
}
