//! This module contains code used to place the MCU in deep-sleep mode.
//!
//! Deep-sleep stops the PLL and the crystal; on wake the core runs from IRC16M. Bring the
//! clocks up again afterwards: `PowerCtx`'s wake handlers do this.

use crate::{regmap::pmu, regs::RegisterAccess};

/// LDO regulator mode while in deep-sleep. `PMU_CTL` `LDOLP`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LdoMode {
    Normal,
    #[default]
    LowPower,
}

/// Select deep-sleep (not standby) for the next time the core sleeps with SLEEPDEEP set, and
/// set the LDO mode.
pub fn prepare_deep_sleep<R: RegisterAccess>(regs: &R, ldo: LdoMode) {
    regs.clear(pmu::CTL_STBMOD);

    match ldo {
        LdoMode::Normal => regs.clear(pmu::CTL_LDOLP),
        LdoMode::LowPower => regs.set(pmu::CTL_LDOLP),
    }
}

/// Enter deep-sleep, and return once an interrupt has woken the core.
///
/// To exit: any EXTI line configured in interrupt mode, with its NVIC vector enabled.
#[cfg(cortex_m_target)]
pub fn deep_sleep<R: RegisterAccess>(regs: &R, ldo: LdoMode) {
    let mut scb = unsafe { cortex_m::Peripherals::steal().SCB };

    prepare_deep_sleep(regs, ldo);

    scb.set_sleepdeep();
    cortex_m::asm::wfi();
    scb.clear_sleepdeep();
}
