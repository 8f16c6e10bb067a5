//! Interrupt mask control for the CPU the kernel runs on.

cfg_if::cfg_if! {
    if #[cfg(all(target_arch = "aarch64", target_os = "none"))] {
        #[path = "aarch64.rs"]
        mod imp;
    } else {
        #[path = "host.rs"]
        mod imp;
    }
}

pub use imp::{irq_restore, irq_save, irqs_enabled};

/// Interrupt mask state captured by [`irq_save`].
///
/// Only meaningful when handed back to [`irq_restore`] on the same CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrqState(pub(crate) u64);
