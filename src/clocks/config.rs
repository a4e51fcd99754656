//! Clock configuration types and the pure frequency computations behind them.
//!
//! Everything here is hardware-free: resolving an oscillator selection to a
//! frequency and deriving the bus divisor are plain functions over the closed
//! selector enums, so they are unit-testable without a register block.

use fugit::HertzU32;

use super::ClockError;

/// Precision internal oscillator ("PIOSC") frequency.
pub const PIOSC_FREQ: HertzU32 = HertzU32::MHz(16);
/// Precision internal oscillator divided by four.
pub const PIOSC_DIV4_FREQ: HertzU32 = HertzU32::MHz(4);
/// Low-frequency internal oscillator ("LFIOSC") frequency.
pub const LFIOSC_FREQ: HertzU32 = HertzU32::Hz(30_000);
/// Hibernation module 32.768 kHz oscillator frequency.
pub const HIBERNATION_OSC_FREQ: HertzU32 = HertzU32::Hz(32_768);

/// Nominal PLL output with the pre-divider (÷2 stage) enabled.
pub const PLL_200MHZ_FREQ: HertzU32 = HertzU32::MHz(200);
/// Nominal PLL output with the pre-divider disabled.
pub const PLL_400MHZ_FREQ: HertzU32 = HertzU32::MHz(400);

/// Input source for the system oscillator.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSource {
    /// External main oscillator, fed by an attached crystal ([`Crystal`]).
    MainOscillator,
    /// 16 MHz precision internal oscillator.
    PrecisionInternal,
    /// Precision internal oscillator divided by 4 (4 MHz).
    PrecisionInternalDiv4,
    /// 30 kHz low-frequency internal oscillator.
    LowFrequencyInternal,
    /// 32.768 kHz hibernation module oscillator.
    HibernationOscillator,
}

impl ClockSource {
    /// OSCSRC2 field code for this source.
    pub(crate) fn oscsrc2_code(self) -> u32 {
        match self {
            ClockSource::MainOscillator => 0x0,
            ClockSource::PrecisionInternal => 0x1,
            ClockSource::PrecisionInternalDiv4 => 0x2,
            ClockSource::LowFrequencyInternal => 0x3,
            ClockSource::HibernationOscillator => 0x7,
        }
    }
}

/// Crystal attached to the main oscillator.
///
/// The main oscillator supports a fixed set of crystals from 4 to 25 MHz;
/// each variant maps to the documented nominal frequency and to its XTAL
/// field code in RCC.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crystal {
    /// 4 MHz
    Mhz4,
    /// 4.096 MHz
    Mhz4_09,
    /// 4.9152 MHz
    Mhz4_91,
    /// 5 MHz
    Mhz5,
    /// 5.12 MHz
    Mhz5_12,
    /// 6 MHz
    Mhz6,
    /// 6.144 MHz
    Mhz6_14,
    /// 7.3728 MHz
    Mhz7_37,
    /// 8 MHz
    Mhz8,
    /// 8.192 MHz
    Mhz8_19,
    /// 10 MHz
    Mhz10,
    /// 12 MHz
    Mhz12,
    /// 12.288 MHz
    Mhz12_2,
    /// 13.56 MHz
    Mhz13_5,
    /// 14.31818 MHz
    Mhz14_3,
    /// 16 MHz
    Mhz16,
    /// 16.384 MHz
    Mhz16_3,
    /// 18 MHz (USB)
    Mhz18,
    /// 20 MHz (USB)
    Mhz20,
    /// 24 MHz (USB)
    Mhz24,
    /// 25 MHz (USB)
    Mhz25,
}

impl Crystal {
    /// Nominal frequency of the attached crystal.
    pub const fn frequency(self) -> HertzU32 {
        match self {
            Crystal::Mhz4 => HertzU32::Hz(4_000_000),
            Crystal::Mhz4_09 => HertzU32::Hz(4_096_000),
            Crystal::Mhz4_91 => HertzU32::Hz(4_915_200),
            Crystal::Mhz5 => HertzU32::Hz(5_000_000),
            Crystal::Mhz5_12 => HertzU32::Hz(5_120_000),
            Crystal::Mhz6 => HertzU32::Hz(6_000_000),
            Crystal::Mhz6_14 => HertzU32::Hz(6_144_000),
            Crystal::Mhz7_37 => HertzU32::Hz(7_372_800),
            Crystal::Mhz8 => HertzU32::Hz(8_000_000),
            Crystal::Mhz8_19 => HertzU32::Hz(8_192_000),
            Crystal::Mhz10 => HertzU32::Hz(10_000_000),
            Crystal::Mhz12 => HertzU32::Hz(12_000_000),
            Crystal::Mhz12_2 => HertzU32::Hz(12_288_000),
            Crystal::Mhz13_5 => HertzU32::Hz(13_560_000),
            Crystal::Mhz14_3 => HertzU32::Hz(14_318_180),
            Crystal::Mhz16 => HertzU32::Hz(16_000_000),
            Crystal::Mhz16_3 => HertzU32::Hz(16_384_000),
            Crystal::Mhz18 => HertzU32::Hz(18_000_000),
            Crystal::Mhz20 => HertzU32::Hz(20_000_000),
            Crystal::Mhz24 => HertzU32::Hz(24_000_000),
            Crystal::Mhz25 => HertzU32::Hz(25_000_000),
        }
    }

    /// XTAL field code written to RCC for this crystal.
    pub(crate) const fn xtal_code(self) -> u32 {
        match self {
            Crystal::Mhz4 => 0x06,
            Crystal::Mhz4_09 => 0x07,
            Crystal::Mhz4_91 => 0x08,
            Crystal::Mhz5 => 0x09,
            Crystal::Mhz5_12 => 0x0A,
            Crystal::Mhz6 => 0x0B,
            Crystal::Mhz6_14 => 0x0C,
            Crystal::Mhz7_37 => 0x0D,
            Crystal::Mhz8 => 0x0E,
            Crystal::Mhz8_19 => 0x0F,
            Crystal::Mhz10 => 0x10,
            Crystal::Mhz12 => 0x11,
            Crystal::Mhz12_2 => 0x12,
            Crystal::Mhz13_5 => 0x13,
            Crystal::Mhz14_3 => 0x14,
            Crystal::Mhz16 => 0x15,
            Crystal::Mhz16_3 => 0x16,
            Crystal::Mhz18 => 0x17,
            Crystal::Mhz20 => 0x18,
            Crystal::Mhz24 => 0x19,
            Crystal::Mhz25 => 0x1A,
        }
    }
}

/// Whether the PLL is part of the active clock path.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PllUsage {
    /// System clock is divided down from the PLL output.
    Enabled,
    /// PLL stays powered down; system clock is divided from the raw
    /// oscillator.
    Disabled,
}

/// Nominal PLL output range, selected by the pre-divider (÷2) stage.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PllRange {
    /// Pre-divider enabled: 200 MHz nominal output.
    Mhz200,
    /// Pre-divider disabled: 400 MHz nominal output.
    Mhz400,
}

impl PllRange {
    /// Nominal PLL output frequency feeding the bus divisor.
    pub const fn output_frequency(self) -> HertzU32 {
        match self {
            PllRange::Mhz200 => PLL_200MHZ_FREQ,
            PllRange::Mhz400 => PLL_400MHZ_FREQ,
        }
    }
}

/// Full clock-tree configuration, applied once at bring-up by
/// [`SysCtl::apply_clock_config`](super::SysCtl::apply_clock_config).
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockConfig {
    /// Oscillator feeding the clock tree.
    pub source: ClockSource,
    /// Crystal attached to the main oscillator. Only consulted when
    /// `source` is [`ClockSource::MainOscillator`].
    pub crystal: Crystal,
    /// Whether to run the system clock through the PLL.
    pub pll_usage: PllUsage,
    /// PLL output range. Only consulted when `pll_usage` is
    /// [`PllUsage::Enabled`].
    pub pll_range: PllRange,
    /// Requested bus clock. The divisor is integer-only, so frequencies
    /// that do not evenly divide the source are truncated down, matching
    /// the hardware divisor field.
    pub desired_bus_clock: HertzU32,
}

/// Resolves a source selection to the raw oscillator frequency feeding the
/// divisor computation.
///
/// `crystal` is only consulted for [`ClockSource::MainOscillator`]; every
/// other source has a fixed frequency. Pure computation: programming the
/// crystal-selector bits and enabling the oscillator is the orchestrator's
/// job.
pub fn resolve_oscillator_clock(source: ClockSource, crystal: Crystal) -> HertzU32 {
    match source {
        ClockSource::MainOscillator => crystal.frequency(),
        ClockSource::PrecisionInternal => PIOSC_FREQ,
        ClockSource::PrecisionInternalDiv4 => PIOSC_DIV4_FREQ,
        ClockSource::LowFrequencyInternal => LFIOSC_FREQ,
        ClockSource::HibernationOscillator => HIBERNATION_OSC_FREQ,
    }
}

/// Computes the SYSDIV2 divisor value: `floor(source / desired) - 1`.
///
/// The hardware field is integer-only; a requested frequency that does not
/// evenly divide the source is truncated down. Requests the field cannot
/// express at all are rejected.
pub(crate) fn bus_divisor(source: HertzU32, desired: HertzU32) -> Result<u32, ClockError> {
    use super::regs::rcc2::SYSDIV2_MAX;

    if desired.to_Hz() == 0 {
        return Err(ClockError::invalid_config("desired bus clock is zero"));
    }
    let quotient = source.to_Hz() / desired.to_Hz();
    if quotient == 0 {
        return Err(ClockError::invalid_config("desired bus clock above source clock"));
    }
    let divisor = quotient - 1;
    if divisor > SYSDIV2_MAX {
        return Err(ClockError::invalid_config("desired bus clock below divisor range"));
    }
    Ok(divisor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crystal_frequencies_match_datasheet() {
        let expected = [
            (Crystal::Mhz4, 4_000_000),
            (Crystal::Mhz4_09, 4_096_000),
            (Crystal::Mhz4_91, 4_915_200),
            (Crystal::Mhz5, 5_000_000),
            (Crystal::Mhz5_12, 5_120_000),
            (Crystal::Mhz6, 6_000_000),
            (Crystal::Mhz6_14, 6_144_000),
            (Crystal::Mhz7_37, 7_372_800),
            (Crystal::Mhz8, 8_000_000),
            (Crystal::Mhz8_19, 8_192_000),
            (Crystal::Mhz10, 10_000_000),
            (Crystal::Mhz12, 12_000_000),
            (Crystal::Mhz12_2, 12_288_000),
            (Crystal::Mhz13_5, 13_560_000),
            (Crystal::Mhz14_3, 14_318_180),
            (Crystal::Mhz16, 16_000_000),
            (Crystal::Mhz16_3, 16_384_000),
            (Crystal::Mhz18, 18_000_000),
            (Crystal::Mhz20, 20_000_000),
            (Crystal::Mhz24, 24_000_000),
            (Crystal::Mhz25, 25_000_000),
        ];
        for (crystal, hz) in expected {
            assert_eq!(crystal.frequency().to_Hz(), hz, "{:?}", crystal);
        }
    }

    #[test]
    fn xtal_codes_span_documented_range() {
        assert_eq!(Crystal::Mhz4.xtal_code(), 0x06);
        assert_eq!(Crystal::Mhz14_3.xtal_code(), 0x14);
        assert_eq!(Crystal::Mhz16.xtal_code(), 0x15);
        assert_eq!(Crystal::Mhz25.xtal_code(), 0x1A);
    }

    #[test]
    fn internal_sources_ignore_crystal() {
        for crystal in [Crystal::Mhz4, Crystal::Mhz14_3, Crystal::Mhz25] {
            assert_eq!(
                resolve_oscillator_clock(ClockSource::PrecisionInternal, crystal),
                HertzU32::MHz(16)
            );
        }
        assert_eq!(
            resolve_oscillator_clock(ClockSource::PrecisionInternalDiv4, Crystal::Mhz25),
            HertzU32::MHz(4)
        );
        assert_eq!(
            resolve_oscillator_clock(ClockSource::LowFrequencyInternal, Crystal::Mhz25),
            HertzU32::Hz(30_000)
        );
        assert_eq!(
            resolve_oscillator_clock(ClockSource::HibernationOscillator, Crystal::Mhz25),
            HertzU32::Hz(32_768)
        );
    }

    #[test]
    fn main_oscillator_resolves_through_crystal() {
        assert_eq!(
            resolve_oscillator_clock(ClockSource::MainOscillator, Crystal::Mhz8_19),
            HertzU32::Hz(8_192_000)
        );
    }

    #[test]
    fn divisor_is_floor_quotient_minus_one() {
        assert_eq!(bus_divisor(HertzU32::MHz(400), HertzU32::MHz(80)).unwrap(), 4);
        assert_eq!(bus_divisor(HertzU32::MHz(200), HertzU32::MHz(50)).unwrap(), 3);
        assert_eq!(bus_divisor(HertzU32::MHz(16), HertzU32::MHz(8)).unwrap(), 1);
        // Fractional remainders truncate, as the hardware field does.
        assert_eq!(bus_divisor(HertzU32::MHz(400), HertzU32::MHz(150)).unwrap(), 1);
    }

    #[test]
    fn infeasible_divisors_are_rejected() {
        assert!(matches!(
            bus_divisor(HertzU32::MHz(16), HertzU32::MHz(32)),
            Err(ClockError::InvalidConfig { .. })
        ));
        assert!(matches!(
            bus_divisor(HertzU32::MHz(16), HertzU32::Hz(0)),
            Err(ClockError::InvalidConfig { .. })
        ));
        // 400 MHz / 2 MHz would need divisor 199, beyond the 7-bit field.
        assert!(matches!(
            bus_divisor(HertzU32::MHz(400), HertzU32::MHz(2)),
            Err(ClockError::InvalidConfig { .. })
        ));
    }
}
