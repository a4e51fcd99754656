//! Run-mode clock gating for peripherals.
//!
//! Each gated peripheral block has one clock-gating register holding an
//! enable bit per instance (e.g. bit 0 of the UART register gates UART0).
//! Gating is a plain indexed read-modify-write with no sequencing, handled
//! here so the clock driver owns the whole system-control block.

use super::regs::SysCtlRegs;
use super::SysCtl;

/// Peripheral blocks with run-mode clock gating.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peripheral {
    /// Watchdog timers.
    Watchdog,
    /// General-purpose timers.
    Timer,
    /// GPIO ports.
    Gpio,
    /// Micro-DMA controller.
    Dma,
    /// Hibernation module.
    Hibernation,
    /// UARTs.
    Uart,
    /// Synchronous serial interfaces.
    Ssi,
    /// I2C controllers.
    I2c,
    /// USB controller.
    Usb,
    /// CAN controllers.
    Can,
    /// ADC blocks.
    Adc,
    /// Analog comparators.
    AnalogComparator,
    /// PWM generators.
    Pwm,
    /// Quadrature encoder interfaces.
    Qei,
    /// EEPROM block.
    Eeprom,
    /// Wide (64-bit) timers.
    WideTimer,
}

impl Peripheral {
    /// Offset of this block's gating register from the RCGC base.
    pub(crate) const fn rcgc_offset(self) -> u32 {
        match self {
            Peripheral::Watchdog => 0x00,
            Peripheral::Timer => 0x04,
            Peripheral::Gpio => 0x08,
            Peripheral::Dma => 0x0C,
            Peripheral::Hibernation => 0x14,
            Peripheral::Uart => 0x18,
            Peripheral::Ssi => 0x1C,
            Peripheral::I2c => 0x20,
            Peripheral::Usb => 0x28,
            Peripheral::Can => 0x34,
            Peripheral::Adc => 0x38,
            Peripheral::AnalogComparator => 0x3C,
            Peripheral::Pwm => 0x40,
            Peripheral::Qei => 0x44,
            Peripheral::Eeprom => 0x58,
            Peripheral::WideTimer => 0x5C,
        }
    }
}

impl<R: SysCtlRegs> SysCtl<R> {
    /// Enables the run-mode clock for one instance of a peripheral block
    /// (e.g. `instance` 0 of [`Peripheral::Uart`] is UART0).
    pub fn enable_peripheral(&mut self, peripheral: Peripheral, instance: u8) {
        debug_assert!(instance < 32);
        let offset = peripheral.rcgc_offset();
        let value = self.regs.rcgc(offset);
        self.regs.set_rcgc(offset, value | (1 << instance));
        trace!("clock gate opened: rcgc offset {:#x}, instance {}", offset, instance);
    }

    /// Disables the run-mode clock for one instance of a peripheral block.
    pub fn disable_peripheral(&mut self, peripheral: Peripheral, instance: u8) {
        debug_assert!(instance < 32);
        let offset = peripheral.rcgc_offset();
        let value = self.regs.rcgc(offset);
        self.regs.set_rcgc(offset, value & !(1 << instance));
        trace!("clock gate closed: rcgc offset {:#x}, instance {}", offset, instance);
    }
}
