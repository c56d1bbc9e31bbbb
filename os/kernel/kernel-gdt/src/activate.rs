//! # Switching the CPU to the new table
//!
//! Order matters: the table register first, then `CS` (which needs a far
//! control transfer), then every data segment register. Each register is
//! loaded once, and only with a selector for a non-null slot.

use crate::selectors::{CodeSel, DataSel, SegmentSelector};
use crate::table::{DescriptorTablePointer, InstalledTable};
use crate::{KERNEL_CS_SEL, KERNEL_DS_SEL};
use core::fmt;
use log::{debug, info};

/// Data segment registers, in load order.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DataSegment {
    Ss,
    Ds,
    Es,
    Fs,
    Gs,
}

impl DataSegment {
    pub const ALL: [Self; 5] = [Self::Ss, Self::Ds, Self::Es, Self::Fs, Self::Gs];
}

impl fmt::Display for DataSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ss => "SS",
            Self::Ds => "DS",
            Self::Es => "ES",
            Self::Fs => "FS",
            Self::Gs => "GS",
        })
    }
}

/// Step of the activation sequence.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ActivationStage {
    LoadTable,
    LoadCode,
    LoadData(DataSegment),
}

impl fmt::Display for ActivationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadTable => f.write_str("GDTR load"),
            Self::LoadCode => f.write_str("CS reload"),
            Self::LoadData(reg) => write!(f, "{reg} load"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActivationError {
    /// The table does not fit below the 4 GiB GDTR reach, or cannot be mapped.
    #[error("GDT base {base:#x} is not addressable by GDTR")]
    TableOutOfReach { base: u64 },
    /// GDTR reads back something other than what was loaded.
    #[error("GDTR reads back {found}, expected {expected}")]
    TableRegisterMismatch {
        expected: DescriptorTablePointer,
        found: DescriptorTablePointer,
    },
    /// The CPU refused a register load.
    #[error("CPU fault during {stage}")]
    Fault { stage: ActivationStage },
}

/// Privileged register operations needed to switch tables.
///
/// Implemented by the real CPU with the `asm` feature and by recording fakes
/// in tests.
pub trait SegmentRegisters {
    /// Point GDTR at a table.
    ///
    /// # Safety
    /// The pointer must describe a valid, installed table that stays in place.
    unsafe fn load_table(&mut self, pointer: DescriptorTablePointer)
    -> Result<(), ActivationError>;

    /// Read GDTR back.
    fn current_table(&self) -> DescriptorTablePointer;

    /// Reload `CS` through a far control transfer.
    ///
    /// # Safety
    /// The selector must name an executable descriptor in the active table.
    unsafe fn load_code_selector(
        &mut self,
        selector: SegmentSelector<CodeSel>,
    ) -> Result<(), ActivationError>;

    /// Load one data segment register.
    ///
    /// # Safety
    /// The selector must name a writable data descriptor in the active table.
    unsafe fn load_data_selector(
        &mut self,
        register: DataSegment,
        selector: SegmentSelector<DataSel>,
    ) -> Result<(), ActivationError>;
}

/// Make `table` the active GDT and reload every segment register from it.
///
/// `CS` gets the kernel code selector (`0x08`); `SS`, `DS`, `ES`, `FS` and
/// `GS` get the kernel data selector (`0x10`). Stops at the first failing
/// step; a GDTR read-back mismatch aborts before any selector is loaded.
pub fn activate<C: SegmentRegisters>(
    table: &InstalledTable,
    cpu: &mut C,
) -> Result<(), ActivationError> {
    let pointer = table.pointer();

    // SAFETY: `InstalledTable` is proof the bytes are in place.
    unsafe { cpu.load_table(pointer)? };

    let found = cpu.current_table();
    if found != pointer {
        return Err(ActivationError::TableRegisterMismatch {
            expected: pointer,
            found,
        });
    }
    info!("Loaded {pointer}");

    // SAFETY: slots 1 and 2 of an installed table hold the flat kernel segments.
    unsafe { cpu.load_code_selector(KERNEL_CS_SEL)? };
    debug!("CS = {KERNEL_CS_SEL}");

    for register in DataSegment::ALL {
        unsafe { cpu.load_data_selector(register, KERNEL_DS_SEL)? };
        debug!("{register} = {KERNEL_DS_SEL}");
    }

    info!("Segment registers reloaded: CS={KERNEL_CS_SEL}, data={KERNEL_DS_SEL}");
    Ok(())
}
