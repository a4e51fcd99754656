//! Reset-cause reporting.

use crate::clocks::regs::SysCtlRegs;
use crate::clocks::SysCtl;

/// Causes of the most recent reset, read from the reset-cause register.
///
/// Several bits can be set at once (e.g. a power-on reset also asserts the
/// brown-out bit on some revisions), so this is a bitmask rather than an
/// enum.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetCause(u32);

impl ResetCause {
    const EXTERNAL: u32 = 1 << 0;
    const POWER_ON: u32 = 1 << 1;
    const BROWN_OUT: u32 = 1 << 2;
    const WATCHDOG0: u32 = 1 << 3;
    const SOFTWARE: u32 = 1 << 4;
    const WATCHDOG1: u32 = 1 << 5;
    const MOSC_FAILURE: u32 = 1 << 16;

    /// Raw register bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Reset pin asserted.
    pub const fn external(self) -> bool {
        self.0 & Self::EXTERNAL != 0
    }

    /// Power-on reset.
    pub const fn power_on(self) -> bool {
        self.0 & Self::POWER_ON != 0
    }

    /// Brown-out detector reset.
    pub const fn brown_out(self) -> bool {
        self.0 & Self::BROWN_OUT != 0
    }

    /// Watchdog timer 0 reset.
    pub const fn watchdog0(self) -> bool {
        self.0 & Self::WATCHDOG0 != 0
    }

    /// Software-requested reset.
    pub const fn software(self) -> bool {
        self.0 & Self::SOFTWARE != 0
    }

    /// Watchdog timer 1 reset.
    pub const fn watchdog1(self) -> bool {
        self.0 & Self::WATCHDOG1 != 0
    }

    /// Main oscillator failure reset.
    pub const fn main_osc_failure(self) -> bool {
        self.0 & Self::MOSC_FAILURE != 0
    }
}

impl<R: SysCtlRegs> SysCtl<R> {
    /// Reports the cause of the most recent reset and clears it, so the
    /// next read reflects only resets that happen after this call.
    pub fn reset_cause(&mut self) -> ResetCause {
        let cause = self.regs.resc();
        // Writing 0 to a cause bit clears it.
        self.regs.set_resc(0);
        ResetCause(cause)
    }
}
