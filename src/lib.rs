#![no_std]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

//! ## Feature flags
#![doc = document_features::document_features!(feature_label = r#"<span class="stab portability"><code>{feature}</code></span>"#)]

#[cfg(test)]
extern crate std;

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod clocks;
pub mod reset;

pub use clocks::config::{ClockConfig, ClockSource, Crystal, PllRange, PllUsage};
pub use clocks::periph::Peripheral;
pub use clocks::regs::{Mmio, SysCtlRegs};
pub use clocks::{ClockError, Clocks, PllStatus, SysCtl};
pub use reset::ResetCause;
