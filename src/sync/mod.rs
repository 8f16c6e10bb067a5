mod critical;
mod spin;

pub use critical::{enter_critical_section, leave_critical_section, CriticalSection};
pub use self::spin::{SpinNoIrqGuard, SpinNoIrqLock};
