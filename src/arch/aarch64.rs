use cortex_a::registers::DAIF;
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};

use super::IrqState;

/// Masks IRQs and returns the previous DAIF value.
#[inline]
pub fn irq_save() -> IrqState {
    let flags = DAIF.get();
    DAIF.modify(DAIF::I::Masked);
    IrqState(flags)
}

/// Writes back the DAIF value saved by [`irq_save`].
#[inline]
pub fn irq_restore(state: IrqState) {
    DAIF.set(state.0);
}

#[inline]
pub fn irqs_enabled() -> bool {
    !DAIF.is_set(DAIF::I)
}
