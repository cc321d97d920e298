//! Suspend/wake power control for GD32F4xx microcontrollers.
//!
//! Brings the system clock up from the external crystal through the PLL (with high-drive mode
//! and the 48Mhz USB clock), tracks whether the system is suspended, and restores the clocks
//! from the wake key's or the USB wakeup line's interrupt handler.
//!
//! Typical use: build a [`PowerCtx`] in a `static`, call [`PowerCtx::init`] at startup, call
//! [`PowerCtx::begin_suspend`] before entering low-power mode, and forward the EXTI handlers to
//! [`PowerCtx::on_key_irq`] and [`PowerCtx::on_usb_wakeup_irq`]. After the wake,
//! [`PowerCtx::wake_mode`] reports which path ended the suspend.
//!
//! Register access goes through the [`RegisterAccess`](regs::RegisterAccess) trait; [`Mmio`]
//! is the hardware implementation.

#![cfg_attr(not(test), no_std)]

// Must come first, so its macros are visible to the modules below.
mod fmt;

#[macro_use]
mod macros;

pub mod clocks;
pub mod error;
pub mod exti;
pub mod low_power;
pub mod regmap;
pub mod regs;
pub mod suspend;
pub mod wake;

#[cfg(test)]
mod testutil;

pub use clocks::{ClockConfig, ClockFault, ClockSequencer, ClockState, ConfigError, UsbCore};
pub use error::{Error, Result};
pub use regs::Mmio;
pub use suspend::{SuspendRecord, SuspendState, WakeMode};
pub use wake::{PowerCtx, WakeLines, WakeSource};
