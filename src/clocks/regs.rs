//! Raw access to the system-control register block.
//!
//! The driver never caches register contents: the lock-status and reset-cause
//! bits are hardware-set and can change between reads, so every accessor goes
//! to the live register. [`SysCtlRegs`] is the seam that lets the clock
//! sequencing logic run against an in-memory register file in unit tests.

/// System-control register block base address.
const SYSCTL_BASE: u32 = 0x400F_E000;
/// Run-mode clock-gating register block base address.
const RCGC_BASE: u32 = 0x400F_E600;

const RIS: u32 = SYSCTL_BASE + 0x050;
const RESC: u32 = SYSCTL_BASE + 0x05C;
const RCC: u32 = SYSCTL_BASE + 0x060;
const RCC2: u32 = SYSCTL_BASE + 0x070;
const PLLSTAT: u32 = SYSCTL_BASE + 0x168;

/// Field and bit layout of the RCC register.
pub(crate) mod rcc {
    /// Main oscillator disable. Set out of reset; clear to run the MOSC.
    pub const MOSCDIS: u32 = 1 << 0;
    /// Attached-crystal selector field.
    pub const XTAL_MASK: u32 = 0x0000_07C0;
    pub const XTAL_SHIFT: u32 = 6;
}

/// Field and bit layout of the RCC2 register. RCC2 overrides RCC while
/// `USERCC2` is set and carries the wider source-select and divisor fields.
pub(crate) mod rcc2 {
    /// When set, RCC2 fields override their RCC counterparts.
    pub const USERCC2: u32 = 1 << 31;
    /// PLL pre-divider (÷2 stage) enable.
    pub const PREDIV2: u32 = 1 << 30;
    /// System clock divisor field.
    pub const SYSDIV2_MASK: u32 = 0x1FC0_0000;
    pub const SYSDIV2_SHIFT: u32 = 22;
    /// Largest divisor value the SYSDIV2 field can hold.
    pub const SYSDIV2_MAX: u32 = SYSDIV2_MASK >> SYSDIV2_SHIFT;
    /// PLL power-down.
    pub const PWRDN2: u32 = 1 << 13;
    /// PLL bypass: system clock comes from the raw oscillator.
    pub const BYPASS2: u32 = 1 << 11;
    /// Oscillator source select field.
    pub const OSCSRC2_MASK: u32 = 0x0000_0070;
    pub const OSCSRC2_SHIFT: u32 = 4;
}

/// Bit layout of the raw interrupt status register.
pub(crate) mod ris {
    /// PLL lock raw interrupt status, hardware-set once the PLL locks.
    pub const PLLLRIS: u32 = 1 << 6;
}

/// Register-level access contract for the system-control block.
///
/// [`Mmio`] implements this against the memory-mapped peripheral; tests
/// substitute an in-memory register file that records access order.
pub trait SysCtlRegs {
    /// Read RCC.
    fn rcc(&self) -> u32;
    /// Write RCC.
    fn set_rcc(&mut self, value: u32);
    /// Read RCC2.
    fn rcc2(&self) -> u32;
    /// Write RCC2.
    fn set_rcc2(&mut self, value: u32);
    /// Read the raw interrupt status register.
    fn ris(&self) -> u32;
    /// Read the PLL status register.
    fn pllstat(&self) -> u32;
    /// Read the reset-cause register.
    fn resc(&self) -> u32;
    /// Write the reset-cause register.
    fn set_resc(&mut self, value: u32);
    /// Read the clock-gating register at `offset` from the RCGC base.
    fn rcgc(&self, offset: u32) -> u32;
    /// Write the clock-gating register at `offset` from the RCGC base.
    fn set_rcgc(&mut self, offset: u32, value: u32);
}

/// Memory-mapped implementation of [`SysCtlRegs`].
///
/// Only constructed by [`SysCtl::take`](super::SysCtl::take), which hands it
/// out at most once per boot.
pub struct Mmio {
    pub(crate) _private: (),
}

impl Mmio {
    fn read(addr: u32) -> u32 {
        // SAFETY: `addr` is a valid system-control register address and the
        // register is readable with no read side effects the driver relies on.
        unsafe { core::ptr::read_volatile(addr as usize as *const u32) }
    }

    fn write(addr: u32, value: u32) {
        // SAFETY: `addr` is a valid system-control register address, and the
        // single `Mmio` instance guarantees exclusive access.
        unsafe { core::ptr::write_volatile(addr as usize as *mut u32, value) }
    }
}

impl SysCtlRegs for Mmio {
    fn rcc(&self) -> u32 {
        Self::read(RCC)
    }

    fn set_rcc(&mut self, value: u32) {
        Self::write(RCC, value);
    }

    fn rcc2(&self) -> u32 {
        Self::read(RCC2)
    }

    fn set_rcc2(&mut self, value: u32) {
        Self::write(RCC2, value);
    }

    fn ris(&self) -> u32 {
        Self::read(RIS)
    }

    fn pllstat(&self) -> u32 {
        Self::read(PLLSTAT)
    }

    fn resc(&self) -> u32 {
        Self::read(RESC)
    }

    fn set_resc(&mut self, value: u32) {
        Self::write(RESC, value);
    }

    fn rcgc(&self, offset: u32) -> u32 {
        Self::read(RCGC_BASE + offset)
    }

    fn set_rcgc(&mut self, offset: u32, value: u32) {
        Self::write(RCGC_BASE + offset, value);
    }
}
