//! The running processor as a [`SegmentRegisters`] implementation.

use crate::activate::{ActivationError, DataSegment, SegmentRegisters};
use crate::selectors::{CodeSel, DataSel, SegmentSelector};
use crate::table::DescriptorTablePointer;
use core::arch::asm;
use kernel_registers::gdtr::Gdtr;
use kernel_registers::{LoadRegister, StoreRegisterUnsafe};

/// The boot CPU in 32-bit protected mode.
///
/// Register loads that the CPU rejects raise `#GP`/`#SS`/`#NP` instead of
/// returning, so the `Fault` error is never produced here.
pub struct Cpu {
    _private: (),
}

impl Cpu {
    /// # Safety
    /// Ring 0 only, with interrupts disabled, and only one handle at a time.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl SegmentRegisters for Cpu {
    unsafe fn load_table(
        &mut self,
        pointer: DescriptorTablePointer,
    ) -> Result<(), ActivationError> {
        let base = u32::try_from(pointer.base)
            .map_err(|_| ActivationError::TableOutOfReach { base: pointer.base })?;
        unsafe { Gdtr::new(base, pointer.limit).store_unsafe() };
        Ok(())
    }

    fn current_table(&self) -> DescriptorTablePointer {
        let gdtr = Gdtr::load();
        DescriptorTablePointer {
            base: u64::from(gdtr.base()),
            limit: gdtr.limit(),
        }
    }

    unsafe fn load_code_selector(
        &mut self,
        selector: SegmentSelector<CodeSel>,
    ) -> Result<(), ActivationError> {
        // Far return pops EIP then CS.
        unsafe {
            asm!(
                "push {sel:e}",
                "lea {tmp:e}, [2f]",
                "push {tmp:e}",
                "retf",
                "2:",
                sel = in(reg) u32::from(selector.encode()),
                tmp = out(reg) _,
                options(preserves_flags)
            );
        }
        Ok(())
    }

    unsafe fn load_data_selector(
        &mut self,
        register: DataSegment,
        selector: SegmentSelector<DataSel>,
    ) -> Result<(), ActivationError> {
        let sel = selector.encode();
        unsafe {
            match register {
                DataSegment::Ss => asm!("mov ss, {0:x}", in(reg) sel, options(nostack, preserves_flags)),
                DataSegment::Ds => asm!("mov ds, {0:x}", in(reg) sel, options(nostack, preserves_flags)),
                DataSegment::Es => asm!("mov es, {0:x}", in(reg) sel, options(nostack, preserves_flags)),
                DataSegment::Fs => asm!("mov fs, {0:x}", in(reg) sel, options(nostack, preserves_flags)),
                DataSegment::Gs => asm!("mov gs, {0:x}", in(reg) sel, options(nostack, preserves_flags)),
            }
        }
        Ok(())
    }
}
