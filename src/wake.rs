//! Suspend/wake control. Owns the register access, the clock settings and the suspend record,
//! and provides the interrupt entry points that bring the clocks back after a wake event.
//!
//! The context is meant to live in a `static`, with the vector table handlers forwarding to it:
//! ```ignore
//! static POWER: PowerCtx<Mmio> = PowerCtx::new(
//!     unsafe { Mmio::steal() },
//!     ClockConfig::hxtal_8mhz(),
//!     WakeLines::DEFAULT,
//!     Spin,
//!     Halt,
//! );
//!
//! #[interrupt]
//! fn EXTI0() {
//!     POWER.on_key_irq();
//! }
//!
//! #[interrupt]
//! fn USBFS_WKUP() {
//!     POWER.on_usb_wakeup_irq();
//! }
//! ```

use core::cell::Cell;

use critical_section::Mutex;

use crate::{
    Error,
    clocks::{
        ClockConfig, ClockFault, ClockSequencer, ClockState, FaultPolicy, Halt, Spin, UsbCore,
        WaitPolicy,
    },
    exti::{self, Edge, ExtiLine},
    regs::RegisterAccess,
    suspend::{SuspendRecord, SuspendState, WakeMode},
};
#[cfg(cortex_m_target)]
use crate::low_power::{self, LdoMode};

/// The two interrupt paths that can end a suspend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeSource {
    /// The wake key, on a GPIO EXTI line.
    Key,
    /// USB remote wakeup.
    Usb,
}

impl WakeSource {
    pub const fn wake_mode(&self) -> WakeMode {
        match self {
            Self::Key => WakeMode::General,
            Self::Usb => WakeMode::Remote,
        }
    }
}

/// The EXTI lines the wake sources arrive on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WakeLines {
    pub key: ExtiLine,
    pub key_edge: Edge,
    pub usb: ExtiLine,
}

impl WakeLines {
    /// Wake key on PA0 (EXTI 0), rising edge; USBFS wakeup on EXTI 18.
    pub const DEFAULT: Self = Self::new(ExtiLine::new(0), Edge::Rising, UsbCore::Fs);

    pub const fn new(key: ExtiLine, key_edge: Edge, usb_core: UsbCore) -> Self {
        Self {
            key,
            key_edge,
            usb: ExtiLine::new(usb_core.wakeup_line()),
        }
    }

    pub const fn line(&self, source: WakeSource) -> ExtiLine {
        match source {
            WakeSource::Key => self.key,
            WakeSource::Usb => self.usb,
        }
    }
}

impl Default for WakeLines {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Everything the main loop and the wake handlers share.
pub struct PowerCtx<R, W = Spin, F = Halt> {
    regs: R,
    clocks: ClockConfig,
    lines: WakeLines,
    wait: W,
    fault: F,
    record: SuspendRecord,
    last_clock_state: Mutex<Cell<Option<ClockState>>>,
}

impl<R, W, F> PowerCtx<R, W, F> {
    pub const fn new(regs: R, clocks: ClockConfig, lines: WakeLines, wait: W, fault: F) -> Self {
        Self {
            regs,
            clocks,
            lines,
            wait,
            fault,
            record: SuspendRecord::new(),
            last_clock_state: Mutex::new(Cell::new(None)),
        }
    }

    pub fn regs(&self) -> &R {
        &self.regs
    }

    pub fn clocks(&self) -> &ClockConfig {
        &self.clocks
    }

    pub fn lines(&self) -> WakeLines {
        self.lines
    }

    pub fn is_suspended(&self) -> bool {
        self.record.is_suspended()
    }

    /// How the last suspend ended. `WakeMode::None` until a wake handler has run after the
    /// most recent `begin_suspend`.
    pub fn wake_mode(&self) -> WakeMode {
        self.record.wake_mode()
    }

    pub fn suspend_state(&self) -> SuspendState {
        self.record.snapshot()
    }

    /// The state the most recent clock bring-up ended in, or `None` if it hasn't run.
    pub fn last_clock_state(&self) -> Option<ClockState> {
        critical_section::with(|cs| self.last_clock_state.borrow(cs).get())
    }
}

impl<R: RegisterAccess, W: WaitPolicy, F: FaultPolicy> PowerCtx<R, W, F> {
    /// Validate the clock settings, bring the clocks up, and arm both wake lines.
    ///
    /// An invalid configuration is returned before any register is touched. A crystal that
    /// doesn't stabilize goes to the fault policy, as it does in the wake handlers.
    pub fn init(&self) -> crate::Result<()> {
        match self.try_init() {
            Err(Error::ClockFault(fault)) => self.fault.halt(fault),
            result => result,
        }
    }

    /// As `init`, but a crystal fault is returned instead of halting. The clocks are left
    /// half-configured in that case; the caller decides how to recover.
    pub fn try_init(&self) -> crate::Result<()> {
        self.clocks.validate()?;
        self.run_sequencer()?;

        exti::enable_interrupt(&self.regs, self.lines.key, self.lines.key_edge);
        exti::enable_interrupt(&self.regs, self.lines.usb, Edge::Rising);

        info!(
            "Clocks up; wake lines {} (key) and {} (USB) armed",
            self.lines.key.number(),
            self.lines.usb.number()
        );
        Ok(())
    }

    /// Mark the intent to suspend. Call from the main loop before entering low-power mode.
    ///
    /// Both wake lines are masked while the record is updated, so a wake can't land between
    /// the flag being set and the old wake mode being cleared. Each line is then restored to
    /// the enable state it had before.
    pub fn begin_suspend(&self) {
        let key_enabled = exti::mask(&self.regs, self.lines.key);
        let usb_enabled = exti::mask(&self.regs, self.lines.usb);

        critical_section::with(|cs| self.record.enter(cs));

        if key_enabled {
            exti::unmask(&self.regs, self.lines.key);
        }
        if usb_enabled {
            exti::unmask(&self.regs, self.lines.usb);
        }

        debug!("Suspend flagged");
    }

    /// Flag the suspend and enter deep-sleep. Returns after a wake handler has run, with the
    /// clocks back up.
    #[cfg(cortex_m_target)]
    pub fn suspend(&self, ldo: LdoMode) {
        self.begin_suspend();
        low_power::deep_sleep(&self.regs, ldo);
    }

    /// Handler for the wake key's EXTI line, eg `EXTI0`.
    pub fn on_key_irq(&self) {
        self.on_wake_irq(WakeSource::Key);
    }

    /// Handler for the USB wakeup line: `USBFS_WKUP` or `USBHS_WKUP`.
    pub fn on_usb_wakeup_irq(&self) {
        self.on_wake_irq(WakeSource::Usb);
    }

    /// If `source`'s line is pending and we're suspended: leave suspend, bring the clocks back
    /// up, and record the wake mode. The pending flag is cleared either way.
    ///
    /// The clock bring-up runs in the handler, blocking this priority level until it's done.
    /// A crystal fault here goes to the fault policy; there's no caller to return it to.
    pub fn on_wake_irq(&self, source: WakeSource) {
        let line = self.lines.line(source);

        if !exti::is_pending(&self.regs, line) {
            trace!("Wake IRQ {:?} without a pending line", source);
            return;
        }

        let resumed = critical_section::with(|cs| self.record.take_suspended(cs));

        if resumed {
            if let Err(fault) = self.run_sequencer() {
                self.fault.halt(fault);
            }

            critical_section::with(|cs| self.record.record_wake(cs, source.wake_mode()));
            info!("Resumed from suspend: {:?}", source.wake_mode());
        }

        exti::clear_pending(&self.regs, line);
    }

    fn run_sequencer(&self) -> Result<(), ClockFault> {
        let mut seq = ClockSequencer::new(&self.regs, &self.clocks, &self.wait);
        let result = seq.bring_up_clock();
        let state = seq.state();

        critical_section::with(|cs| self.last_clock_state.borrow(cs).set(Some(state)));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    use crate::{
        clocks::{ConfigError, SysClkSource, pll_is_enabled, system_clock_source},
        regmap::{exti as exti_regs, pmu, rcu},
        testutil::{PanicHalt, SimRegisters, StepWait},
    };

    type TestCtx = PowerCtx<SimRegisters, StepWait, PanicHalt>;

    fn ctx() -> TestCtx {
        PowerCtx::new(
            SimRegisters::new(),
            ClockConfig::default(),
            WakeLines::DEFAULT,
            StepWait::default(),
            PanicHalt,
        )
    }

    fn initialized() -> TestCtx {
        let ctx = ctx();
        ctx.init().unwrap();
        ctx
    }

    /// Flag the suspend, then drop the clocks the way deep-sleep does.
    fn suspend_and_sleep(ctx: &TestCtx) {
        ctx.begin_suspend();
        ctx.regs().lose_clocks();
        assert!(!pll_is_enabled(ctx.regs()));
        assert_eq!(system_clock_source(ctx.regs()), Some(SysClkSource::Irc16m));
    }

    fn assert_clocks_restored(ctx: &TestCtx) {
        let regs = ctx.regs();
        assert!(regs.is_set(rcu::CTL_HXTALEN));
        assert!(pll_is_enabled(regs));
        assert!(regs.is_set(pmu::CTL_HDEN));
        assert!(regs.is_set(pmu::CTL_HDS));
        assert_eq!(system_clock_source(regs), Some(SysClkSource::Pllp));
        assert_eq!(ctx.last_clock_state(), Some(ClockState::SourceSwitched));
    }

    #[test]
    fn init_brings_up_clocks_and_arms_lines() {
        let ctx = initialized();

        assert_eq!(ctx.last_clock_state(), Some(ClockState::SourceSwitched));
        assert!(pll_is_enabled(ctx.regs()));
        assert!(exti::is_enabled(ctx.regs(), ExtiLine::new(0)));
        assert!(exti::is_enabled(ctx.regs(), ExtiLine::new(18)));
        assert_eq!(ctx.suspend_state(), SuspendState::default());
    }

    #[test]
    fn init_rejects_bad_config() {
        let ctx = PowerCtx::new(
            SimRegisters::new(),
            ClockConfig {
                pll_n: 40,
                ..Default::default()
            },
            WakeLines::DEFAULT,
            StepWait::default(),
            PanicHalt,
        );

        assert_eq!(ctx.init(), Err(Error::ConfigError(ConfigError::PllFactor)));
        assert_eq!(ctx.last_clock_state(), None);
        assert_eq!(ctx.regs().rcu_writes(), 0);
    }

    #[test]
    #[should_panic(expected = "halted: OscillatorTimeout")]
    fn init_halts_on_crystal_fault() {
        let ctx = ctx();
        ctx.regs().kill_hxtal();

        let _ = ctx.init();
    }

    #[test]
    fn try_init_returns_crystal_fault() {
        let ctx = ctx();
        ctx.regs().kill_hxtal();

        assert_eq!(
            ctx.try_init(),
            Err(Error::ClockFault(ClockFault::OscillatorTimeout))
        );
        assert_eq!(ctx.last_clock_state(), Some(ClockState::HxtalTimeout));
        assert!(!exti::is_enabled(ctx.regs(), ExtiLine::new(0)));
    }

    #[test]
    fn begin_suspend_masks_then_restores_lines() {
        let ctx = initialized();
        let inten_writes = ctx.regs().writes_to(exti_regs::INTEN);

        ctx.begin_suspend();

        assert!(ctx.is_suspended());
        assert_eq!(ctx.wake_mode(), WakeMode::None);
        // Two masks, two unmasks.
        assert_eq!(ctx.regs().writes_to(exti_regs::INTEN), inten_writes + 4);
        assert!(exti::is_enabled(ctx.regs(), ExtiLine::new(0)));
        assert!(exti::is_enabled(ctx.regs(), ExtiLine::new(18)));
    }

    #[test]
    fn begin_suspend_flags_only_while_lines_are_masked() {
        // Leaked so the write hook can look at the suspend record.
        let ctx: &'static TestCtx = Box::leak(Box::new(initialized()));
        let seen = Rc::new(RefCell::new(Vec::new()));

        let log = seen.clone();
        ctx.regs().set_write_hook(move |addr, value| {
            if addr == exti_regs::INTEN {
                log.borrow_mut().push((value, ctx.is_suspended()));
            }
        });

        ctx.begin_suspend();

        let key = ExtiLine::new(0).mask();
        let usb = ExtiLine::new(18).mask();
        assert_eq!(
            *seen.borrow(),
            [
                // Key masked, then USB masked, both before the flag is set.
                (usb, false),
                (0, false),
                // Restored only after.
                (key, true),
                (key | usb, true),
            ]
        );
    }

    #[test]
    fn begin_suspend_leaves_unarmed_lines_masked() {
        let ctx = ctx();

        ctx.begin_suspend();

        assert!(ctx.is_suspended());
        assert!(!exti::is_enabled(ctx.regs(), ExtiLine::new(0)));
        assert!(!exti::is_enabled(ctx.regs(), ExtiLine::new(18)));
    }

    #[test]
    fn key_wake_while_suspended() {
        let ctx = initialized();
        suspend_and_sleep(&ctx);

        ctx.regs().raise_exti(0);
        ctx.on_key_irq();

        assert!(!ctx.is_suspended());
        assert_eq!(ctx.wake_mode(), WakeMode::General);
        assert_clocks_restored(&ctx);
        assert!(!exti::is_pending(ctx.regs(), ExtiLine::new(0)));
    }

    #[test]
    fn usb_wake_while_suspended() {
        let ctx = initialized();
        suspend_and_sleep(&ctx);

        ctx.regs().raise_exti(18);
        ctx.on_usb_wakeup_irq();

        assert!(!ctx.is_suspended());
        assert_eq!(ctx.wake_mode(), WakeMode::Remote);
        assert_clocks_restored(&ctx);
        assert!(!exti::is_pending(ctx.regs(), ExtiLine::new(18)));
    }

    #[test]
    fn wake_while_awake_skips_sequencer() {
        for source in [WakeSource::Key, WakeSource::Usb] {
            let ctx = initialized();
            let line = ctx.lines().line(source);
            let rcu_writes = ctx.regs().rcu_writes();

            ctx.regs().raise_exti(line.number());
            ctx.on_wake_irq(source);

            assert!(!ctx.is_suspended());
            assert_eq!(ctx.wake_mode(), WakeMode::None);
            assert_eq!(ctx.regs().rcu_writes(), rcu_writes);
            // Pending is cleared regardless.
            assert!(!exti::is_pending(ctx.regs(), line));
        }
    }

    #[test]
    fn wake_mode_survives_an_unrelated_irq() {
        let ctx = initialized();
        ctx.begin_suspend();
        ctx.regs().raise_exti(18);
        ctx.on_usb_wakeup_irq();

        ctx.regs().raise_exti(0);
        ctx.on_key_irq();

        assert_eq!(ctx.wake_mode(), WakeMode::Remote);
    }

    #[test]
    fn key_irq_twice_while_awake_is_a_no_op() {
        let ctx = initialized();
        let before = ctx.suspend_state();
        let rcu_writes = ctx.regs().rcu_writes();

        for _ in 0..2 {
            ctx.regs().raise_exti(0);
            ctx.on_key_irq();
            assert_eq!(ctx.suspend_state(), before);
            assert_eq!(ctx.regs().rcu_writes(), rcu_writes);
        }
    }

    #[test]
    fn spurious_irq_is_ignored() {
        let ctx = initialized();
        ctx.begin_suspend();
        let pd_writes = ctx.regs().writes_to(exti_regs::PD);

        // Nothing latched on the line.
        ctx.on_key_irq();

        assert!(ctx.is_suspended());
        assert_eq!(ctx.wake_mode(), WakeMode::None);
        assert_eq!(ctx.regs().writes_to(exti_regs::PD), pd_writes);
    }

    #[test]
    fn other_lines_stay_pending() {
        let ctx = initialized();
        ctx.begin_suspend();
        ctx.regs().raise_exti(0);
        ctx.regs().raise_exti(18);

        ctx.on_key_irq();

        assert!(exti::is_pending(ctx.regs(), ExtiLine::new(18)));
        ctx.on_usb_wakeup_irq();
        // Already resumed by the key; the USB path doesn't overwrite the mode.
        assert_eq!(ctx.wake_mode(), WakeMode::General);
        assert!(!exti::is_pending(ctx.regs(), ExtiLine::new(18)));
    }

    #[test]
    fn end_to_end_key_wake() {
        let ctx = initialized();
        assert!(!ctx.is_suspended());

        suspend_and_sleep(&ctx);
        assert!(ctx.is_suspended());
        assert!(exti::is_enabled(ctx.regs(), ExtiLine::new(0)));

        ctx.regs().raise_exti(0);
        ctx.on_key_irq();

        assert!(!ctx.is_suspended());
        assert_eq!(ctx.wake_mode(), WakeMode::General);
        assert_clocks_restored(&ctx);
    }

    #[test]
    fn end_to_end_usb_wake() {
        let ctx = initialized();

        suspend_and_sleep(&ctx);
        ctx.regs().raise_exti(18);
        ctx.on_usb_wakeup_irq();

        assert!(!ctx.is_suspended());
        assert_eq!(ctx.wake_mode(), WakeMode::Remote);
        assert_clocks_restored(&ctx);
    }

    #[test]
    fn usbhs_wakes_on_line_20() {
        let ctx = PowerCtx::new(
            SimRegisters::new(),
            ClockConfig {
                usb_core: UsbCore::Hs,
                ..Default::default()
            },
            WakeLines::new(ExtiLine::new(0), Edge::Rising, UsbCore::Hs),
            StepWait::default(),
            PanicHalt,
        );
        ctx.init().unwrap();
        ctx.begin_suspend();

        // Line 18 is not ours.
        ctx.regs().raise_exti(18);
        ctx.on_usb_wakeup_irq();
        assert!(ctx.is_suspended());

        ctx.regs().raise_exti(20);
        ctx.on_usb_wakeup_irq();
        assert_eq!(ctx.wake_mode(), WakeMode::Remote);
    }

    #[test]
    #[should_panic(expected = "halted: OscillatorTimeout")]
    fn crystal_fault_during_wake_halts() {
        let ctx = initialized();
        ctx.begin_suspend();
        ctx.regs().kill_hxtal();

        ctx.regs().raise_exti(0);
        ctx.on_key_irq();
    }
}
