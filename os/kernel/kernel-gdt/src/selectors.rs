//! # Typed segment selectors
//!
//! A selector is the 16-bit value loaded into `CS`, `SS`, `DS`, `ES`, `FS`
//! and `GS`. The CPU uses its index to look up a descriptor:
//!
//! ```text
//!  15            3 2  1  0
//! +----------------+--+----+
//! |   Index[12:0]  |TI| RPL|
//! +----------------+--+----+  (TI=0 → GDT, TI=1 → LDT; RPL=0..3)
//! ```
//!
//! The marker types keep a data selector out of `CS` and vice versa. Use
//! [`SegmentSelector::encode`] when a plain `u16` is needed for inline asm.

use crate::privilege::Rpl;
use bitfield_struct::bitfield;
use core::fmt;
use core::marker::PhantomData;

/// Which descriptor table a selector addresses.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u8)]
pub enum Table {
    Gdt = 0,
    /// Never produced by this crate.
    Ldt = 1,
}

impl Table {
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        if bits == 0 { Self::Gdt } else { Self::Ldt }
    }

    #[inline]
    #[must_use]
    pub const fn into_bits(self) -> u8 {
        self as u8
    }
}

/// Raw 16-bit selector encoding.
#[bitfield(u16)]
#[derive(Eq, PartialEq)]
pub struct SegmentSelectorRaw {
    #[bits(2)]
    pub rpl: Rpl,
    #[bits(1)]
    pub ti: Table,
    #[bits(13)]
    pub index: u16,
}

impl SegmentSelectorRaw {
    #[inline]
    #[must_use]
    pub const fn new_with(index: u16, table: Table, rpl: Rpl) -> Self {
        Self::new().with_index(index).with_ti(table).with_rpl(rpl)
    }
}

/// Marker trait for typed selectors.
pub trait SelectorKind: Copy {
    /// Short register-class name used in log output.
    const NAME: &'static str;
}

/// Selector for `CS`.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum CodeSel {}

/// Selector for `SS`, `DS`, `ES`, `FS` and `GS`.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum DataSel {}

impl SelectorKind for CodeSel {
    const NAME: &'static str = "code";
}

impl SelectorKind for DataSel {
    const NAME: &'static str = "data";
}

/// Strongly-typed GDT selector.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct SegmentSelector<K: SelectorKind>(SegmentSelectorRaw, PhantomData<K>);

impl<K: SelectorKind> SegmentSelector<K> {
    /// Selector for GDT slot `index` requested at `rpl`.
    #[inline]
    #[must_use]
    pub const fn new(index: u16, rpl: Rpl) -> Self {
        Self(
            SegmentSelectorRaw::new_with(index, Table::Gdt, rpl),
            PhantomData,
        )
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> SegmentSelectorRaw {
        self.0
    }

    /// Encode as `u16` (`index << 3 | TI | RPL`).
    #[inline]
    #[must_use]
    pub const fn encode(self) -> u16 {
        self.0.into_bits()
    }

    #[inline]
    #[must_use]
    pub const fn index(self) -> u16 {
        self.0.index()
    }

    #[inline]
    #[must_use]
    pub const fn rpl(self) -> Rpl {
        self.0.rpl()
    }
}

impl<K: SelectorKind> fmt::Debug for SegmentSelector<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:#06x})", K::NAME, self.encode())
    }
}

impl<K: SelectorKind> fmt::Display for SegmentSelector<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_is_index_ti_rpl() {
        let sel = SegmentSelector::<DataSel>::new(2, Rpl::Ring0);
        assert_eq!(sel.encode(), 0x10);
        assert_eq!(sel.index(), 2);
        assert_eq!(sel.rpl(), Rpl::Ring0);
        assert_eq!(sel.raw().ti(), Table::Gdt);

        let user = SegmentSelector::<CodeSel>::new(3, Rpl::Ring3);
        assert_eq!(user.encode(), 0x1b);
    }

    #[test]
    fn formatting() {
        let sel = SegmentSelector::<CodeSel>::new(1, Rpl::Ring0);
        assert_eq!(format!("{sel}"), "0x08");
        assert_eq!(format!("{sel:?}"), "code(0x0008)");
    }
}
