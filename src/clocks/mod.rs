//! System clock configuration.
//!
//! [`SysCtl`] is the entry point for the clock tree of the system-control
//! peripheral: it selects the oscillator source, optionally runs the PLL
//! bring-up sequence and programs the bus-clock divisor. It is meant to be
//! used once at system bring-up, before interrupts or a scheduler are
//! active; the sequence is not reentrant and the PLL lock wait blocks the
//! calling context.

use core::cell::Cell;

use critical_section::Mutex;
use fugit::HertzU32;

use config::{bus_divisor, resolve_oscillator_clock, ClockConfig, ClockSource, PllRange, PllUsage};
use regs::{rcc, rcc2, ris, Mmio, SysCtlRegs};

pub mod config;
pub mod periph;
pub mod regs;

/// Upper bound on PLL lock-status polls before giving up.
///
/// The PLL is specified to lock within a bounded number of oscillator
/// cycles, so exhausting this budget means the oscillator configuration is
/// wrong (e.g. a crystal selection that does not match the board).
const PLL_LOCK_RETRIES: u32 = 32_768;

static SYSCTL_TAKEN: Mutex<Cell<bool>> = Mutex::new(Cell::new(false));

/// Clock configuration related error.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockError {
    /// The requested configuration cannot be programmed into the hardware.
    InvalidConfig {
        /// Explanation of the error.
        reason: &'static str,
    },
    /// The PLL did not report lock within the poll budget. The system is
    /// left running from the raw oscillator with the PLL bypassed.
    PllLockTimeout,
}

impl ClockError {
    pub(crate) const fn invalid_config(reason: &'static str) -> Self {
        ClockError::InvalidConfig { reason }
    }
}

/// Coarse PLL status, read from the PLL status register.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PllStatus {
    /// The PLL is unpowered or has not yet locked.
    Unlocked,
    /// The PLL is powered and locked.
    Locked,
}

/// Frequencies of the clock tree after a successful
/// [`SysCtl::apply_clock_config`].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clocks {
    /// Raw frequency of the selected oscillator.
    pub osc_clk: HertzU32,
    /// Nominal PLL output, if the PLL is in the active clock path.
    pub pll_clk: Option<HertzU32>,
    /// Achieved bus clock after integer division. May be below the
    /// requested frequency when the request does not divide evenly.
    pub sys_clk: HertzU32,
}

/// System-control clock driver.
///
/// Generic over [`SysCtlRegs`] so the sequencing logic can be exercised
/// against a mock register file; firmware obtains the memory-mapped
/// instance through [`SysCtl::take`].
pub struct SysCtl<R: SysCtlRegs = Mmio> {
    pub(crate) regs: R,
    last_config: Option<ClockConfig>,
}

impl SysCtl<Mmio> {
    /// Hands out the memory-mapped driver, at most once per boot.
    ///
    /// Returns `None` on every call after the first: the bring-up sequence
    /// mutates the register block with no mutual exclusion, so a single
    /// owner is required.
    pub fn take() -> Option<Self> {
        critical_section::with(|cs| {
            let taken = SYSCTL_TAKEN.borrow(cs);
            if taken.get() {
                None
            } else {
                taken.set(true);
                Some(SysCtl::new(Mmio { _private: () }))
            }
        })
    }
}

impl<R: SysCtlRegs> SysCtl<R> {
    /// Creates a driver over an arbitrary register-access implementation.
    ///
    /// Mostly useful for testing against a mock register file; firmware
    /// should go through [`SysCtl::take`].
    pub const fn new(regs: R) -> Self {
        Self {
            regs,
            last_config: None,
        }
    }

    /// Consumes the driver and returns the underlying register access.
    pub fn release(self) -> R {
        self.regs
    }

    /// The last configuration handed to [`SysCtl::apply_clock_config`].
    pub fn last_config(&self) -> Option<ClockConfig> {
        self.last_config
    }

    /// Applies a full clock-tree configuration.
    ///
    /// Selects the oscillator source, then either runs the PLL bring-up
    /// sequence ([`SysCtl::init_pll`]) or divides the raw oscillator down
    /// to the requested bus clock. Returns the resulting tree frequencies.
    ///
    /// A failed apply can leave the hardware partially programmed; the
    /// system keeps running from the previously active (or bypassed)
    /// clock, and the caller decides whether to retry with different
    /// parameters or abort boot.
    pub fn apply_clock_config(&mut self, config: ClockConfig) -> Result<Clocks, ClockError> {
        self.last_config = Some(config);

        // Writing RCC2 fields overrides their RCC counterparts.
        let rcc2_val = self.regs.rcc2();
        self.regs.set_rcc2(rcc2_val | rcc2::USERCC2);

        let rcc2_val = self.regs.rcc2();
        self.regs.set_rcc2(
            (rcc2_val & !rcc2::OSCSRC2_MASK) | (config.source.oscsrc2_code() << rcc2::OSCSRC2_SHIFT),
        );

        let osc_clk = resolve_oscillator_clock(config.source, config.crystal);

        match config.pll_usage {
            PllUsage::Enabled => {
                let sys_clk = self.init_pll(config.pll_range, config.desired_bus_clock)?;
                let pll_clk = config.pll_range.output_frequency();
                debug!(
                    "clock tree: osc {} Hz, pll {} Hz, bus {} Hz",
                    osc_clk.to_Hz(),
                    pll_clk.to_Hz(),
                    sys_clk.to_Hz()
                );
                Ok(Clocks {
                    osc_clk,
                    pll_clk: Some(pll_clk),
                    sys_clk,
                })
            }
            PllUsage::Disabled => {
                if config.source == ClockSource::MainOscillator {
                    // Program the attached crystal, then enable the main
                    // oscillator (it powers up disabled out of reset).
                    let rcc_val = self.regs.rcc();
                    self.regs.set_rcc(
                        (rcc_val & !rcc::XTAL_MASK) | (config.crystal.xtal_code() << rcc::XTAL_SHIFT),
                    );
                    let rcc_val = self.regs.rcc();
                    self.regs.set_rcc(rcc_val & !rcc::MOSCDIS);
                }

                let divisor = bus_divisor(osc_clk, config.desired_bus_clock)?;
                let rcc2_val = self.regs.rcc2();
                self.regs
                    .set_rcc2((rcc2_val & !rcc2::SYSDIV2_MASK) | (divisor << rcc2::SYSDIV2_SHIFT));

                let sys_clk = osc_clk / (divisor + 1);
                debug!(
                    "clock tree: osc {} Hz, no pll, bus {} Hz (divisor {})",
                    osc_clk.to_Hz(),
                    sys_clk.to_Hz(),
                    divisor
                );
                Ok(Clocks {
                    osc_clk,
                    pll_clk: None,
                    sys_clk,
                })
            }
        }
    }

    /// Runs the PLL bring-up sequence and returns the achieved bus clock.
    ///
    /// The step order is a hardware requirement: the PLL output is
    /// undefined until lock, so the system is kept on the raw oscillator
    /// (bypass) for the whole sequence and only switched over after the
    /// lock-status bit asserts.
    ///
    /// Blocks in a tight poll on the lock-status bit, bounded by an
    /// internal retry budget; on [`ClockError::PllLockTimeout`] the bypass
    /// is left asserted and the system stays on the raw oscillator.
    pub fn init_pll(&mut self, range: PllRange, desired_bus_clock: HertzU32) -> Result<HertzU32, ClockError> {
        // Source the system clock from the raw oscillator while the PLL
        // output is undefined.
        let rcc2_val = self.regs.rcc2();
        self.regs.set_rcc2(rcc2_val | rcc2::BYPASS2);

        // Power the PLL up.
        let rcc2_val = self.regs.rcc2();
        self.regs.set_rcc2(rcc2_val & !rcc2::PWRDN2);

        // Select the output range via the ÷2 pre-divider stage.
        let pll_clk = range.output_frequency();
        let rcc2_val = self.regs.rcc2();
        match range {
            PllRange::Mhz200 => self.regs.set_rcc2(rcc2_val | rcc2::PREDIV2),
            PllRange::Mhz400 => self.regs.set_rcc2(rcc2_val & !rcc2::PREDIV2),
        }

        let divisor = bus_divisor(pll_clk, desired_bus_clock)?;
        let rcc2_val = self.regs.rcc2();
        self.regs
            .set_rcc2((rcc2_val & !rcc2::SYSDIV2_MASK) | (divisor << rcc2::SYSDIV2_SHIFT));

        // Wait for lock.
        let mut polls = 0u32;
        loop {
            if self.regs.ris() & ris::PLLLRIS != 0 {
                break;
            }
            polls += 1;
            if polls >= PLL_LOCK_RETRIES {
                warn!("pll failed to lock after {} polls, staying on bypass", polls);
                return Err(ClockError::PllLockTimeout);
            }
        }
        trace!("pll locked after {} polls", polls);

        // Switch the system clock over to the locked PLL output.
        let rcc2_val = self.regs.rcc2();
        self.regs.set_rcc2(rcc2_val & !rcc2::BYPASS2);

        Ok(pll_clk / (divisor + 1))
    }

    /// Coarse PLL status from the PLL status register.
    pub fn pll_status(&self) -> PllStatus {
        if self.regs.pllstat() == 0 {
            PllStatus::Unlocked
        } else {
            PllStatus::Locked
        }
    }
}

#[cfg(test)]
mod tests {
    use super::config::{ClockConfig, ClockSource, Crystal, PllRange, PllUsage};
    use super::regs::mock::{Access, MockRegs};
    use super::regs::{rcc, rcc2, ris};
    use super::{ClockError, PllStatus, SysCtl};
    use fugit::HertzU32;

    fn sysdiv2(value: u32) -> u32 {
        (value & rcc2::SYSDIV2_MASK) >> rcc2::SYSDIV2_SHIFT
    }

    #[test]
    fn pll_sequence_is_ordered() {
        let regs = MockRegs::new();
        regs.lock_after.set(3);
        // Unrelated RCC2 bits that every write must preserve.
        regs.rcc2.set(0x0000_1003);

        let mut sysctl = SysCtl::new(regs);
        let achieved = sysctl.init_pll(PllRange::Mhz400, HertzU32::MHz(80)).unwrap();
        assert_eq!(achieved, HertzU32::MHz(80));

        let regs = sysctl.release();
        let journal = regs.journal.borrow();

        // Bypass asserted first, before the PLL is powered up.
        assert_eq!(journal[0], Access::WriteRcc2(0x0000_1003 | rcc2::BYPASS2));
        let Access::WriteRcc2(powerup) = journal[1] else {
            panic!("expected rcc2 write, got {:?}", journal[1]);
        };
        assert_eq!(powerup & rcc2::PWRDN2, 0);
        assert_ne!(powerup & rcc2::BYPASS2, 0);

        // Pre-divider cleared for the 400 MHz range, divisor programmed
        // while still bypassed.
        let Access::WriteRcc2(divisor_write) = journal[3] else {
            panic!("expected rcc2 write, got {:?}", journal[3]);
        };
        assert_eq!(sysdiv2(divisor_write), 4);
        assert_eq!(divisor_write & rcc2::PREDIV2, 0);
        assert_ne!(divisor_write & rcc2::BYPASS2, 0);
        assert_eq!(divisor_write & 0x0000_1003, 0x0000_1003);

        // Lock observed before the bypass release, which is the last access.
        assert_eq!(journal[4..7], [Access::ReadRis(0); 3]);
        assert_eq!(journal[7], Access::ReadRis(ris::PLLLRIS));
        let Access::WriteRcc2(release) = journal[8] else {
            panic!("expected rcc2 write, got {:?}", journal[8]);
        };
        assert_eq!(release & rcc2::BYPASS2, 0);
        assert_eq!(journal.len(), 9);
    }

    #[test]
    fn pll_lock_timeout_keeps_bypass() {
        let regs = MockRegs::new();
        regs.lock_after.set(u32::MAX);

        let mut sysctl = SysCtl::new(regs);
        let result = sysctl.init_pll(PllRange::Mhz200, HertzU32::MHz(50));
        assert_eq!(result, Err(ClockError::PllLockTimeout));

        let regs = sysctl.release();
        assert_ne!(regs.rcc2.get() & rcc2::BYPASS2, 0);
        // No write follows the failed poll.
        assert_eq!(*regs.journal.borrow().last().unwrap(), Access::ReadRis(0));
    }

    #[test]
    fn direct_path_from_main_oscillator() {
        let regs = MockRegs::new();
        // MOSCDIS is set out of reset; bit 22 of RCC stands in for an
        // unrelated field that must survive the crystal write.
        regs.rcc.set(rcc::MOSCDIS | 0x0040_0000);

        let mut sysctl = SysCtl::new(regs);
        let clocks = sysctl
            .apply_clock_config(ClockConfig {
                source: ClockSource::MainOscillator,
                crystal: Crystal::Mhz16,
                pll_usage: PllUsage::Disabled,
                pll_range: PllRange::Mhz400,
                desired_bus_clock: HertzU32::MHz(8),
            })
            .unwrap();

        assert_eq!(clocks.osc_clk, HertzU32::MHz(16));
        assert_eq!(clocks.sys_clk, HertzU32::MHz(8));
        assert_eq!(clocks.pll_clk, None);

        let regs = sysctl.release();
        // Crystal code programmed, oscillator enabled, unrelated bit intact.
        assert_eq!(regs.rcc.get(), 0x0040_0000 | (0x15 << rcc::XTAL_SHIFT));
        let rcc2_val = regs.rcc2.get();
        assert_ne!(rcc2_val & rcc2::USERCC2, 0);
        assert_eq!(rcc2_val & rcc2::OSCSRC2_MASK, 0);
        assert_eq!(sysdiv2(rcc2_val), 1);
        // No PLL traffic on the direct path.
        assert!(regs
            .journal
            .borrow()
            .iter()
            .all(|a| !matches!(a, Access::ReadRis(_))));
    }

    #[test]
    fn pll_path_from_precision_internal() {
        let regs = MockRegs::new();
        regs.lock_after.set(1);

        let mut sysctl = SysCtl::new(regs);
        let config = ClockConfig {
            source: ClockSource::PrecisionInternal,
            crystal: Crystal::Mhz4,
            pll_usage: PllUsage::Enabled,
            pll_range: PllRange::Mhz200,
            desired_bus_clock: HertzU32::MHz(40),
        };
        let clocks = sysctl.apply_clock_config(config).unwrap();

        assert_eq!(clocks.osc_clk, HertzU32::MHz(16));
        assert_eq!(clocks.pll_clk, Some(HertzU32::MHz(200)));
        assert_eq!(clocks.sys_clk, HertzU32::MHz(40));
        assert_eq!(sysctl.last_config(), Some(config));

        let regs = sysctl.release();
        let rcc2_val = regs.rcc2.get();
        assert_ne!(rcc2_val & rcc2::USERCC2, 0);
        assert_eq!(rcc2_val & rcc2::OSCSRC2_MASK, 0x1 << rcc2::OSCSRC2_SHIFT);
        assert_ne!(rcc2_val & rcc2::PREDIV2, 0);
        assert_eq!(sysdiv2(rcc2_val), 4);
        assert_eq!(rcc2_val & rcc2::BYPASS2, 0);
        assert_eq!(rcc2_val & rcc2::PWRDN2, 0);

        // The bypass release is the final write and follows a lock read.
        let journal = regs.journal.borrow();
        let lock_read = journal
            .iter()
            .position(|a| *a == Access::ReadRis(ris::PLLLRIS))
            .expect("pll lock never observed");
        let last_write = journal
            .iter()
            .rposition(|a| matches!(a, Access::WriteRcc2(_)))
            .unwrap();
        assert!(lock_read < last_write);
    }

    #[test]
    fn source_select_preserves_unrelated_rcc2_bits() {
        let regs = MockRegs::new();
        regs.rcc2.set(0x0000_1003);

        let mut sysctl = SysCtl::new(regs);
        sysctl
            .apply_clock_config(ClockConfig {
                source: ClockSource::HibernationOscillator,
                crystal: Crystal::Mhz4,
                pll_usage: PllUsage::Disabled,
                pll_range: PllRange::Mhz400,
                desired_bus_clock: HertzU32::Hz(16_384),
            })
            .unwrap();

        let regs = sysctl.release();
        let rcc2_val = regs.rcc2.get();
        assert_eq!(rcc2_val & 0x0000_1003, 0x0000_1003);
        assert_eq!(rcc2_val & rcc2::OSCSRC2_MASK, 0x7 << rcc2::OSCSRC2_SHIFT);
        assert_eq!(sysdiv2(rcc2_val), 1);
    }

    #[test]
    fn infeasible_bus_clock_is_rejected() {
        let mut sysctl = SysCtl::new(MockRegs::new());
        let result = sysctl.apply_clock_config(ClockConfig {
            source: ClockSource::PrecisionInternal,
            crystal: Crystal::Mhz4,
            pll_usage: PllUsage::Disabled,
            pll_range: PllRange::Mhz400,
            desired_bus_clock: HertzU32::MHz(32),
        });
        assert!(matches!(result, Err(ClockError::InvalidConfig { .. })));
    }

    #[test]
    fn pll_status_reflects_pllstat() {
        let regs = MockRegs::new();
        let sysctl = SysCtl::new(regs);
        assert_eq!(sysctl.pll_status(), PllStatus::Unlocked);

        let regs = sysctl.release();
        regs.pllstat.set(1);
        let sysctl = SysCtl::new(regs);
        assert_eq!(sysctl.pll_status(), PllStatus::Locked);
    }

    #[test]
    fn take_hands_out_the_driver_once() {
        let first = SysCtl::take();
        let second = SysCtl::take();
        assert!(first.is_some());
        assert!(second.is_none());
    }
}
