use super::{Ck48mSrc, ClockConfig, ClockFault, ClockState, Pll48mSrc, SysClkSource, WaitPolicy};
use crate::{
    regmap::{pmu, rcu},
    regs::RegisterAccess,
};

/// Runs the clock bring-up sequence against a register file.
///
/// A sequencer is built for a single run: create it, call `bring_up_clock`, then read
/// `state()` to see how far it got.
pub struct ClockSequencer<'a, R, W> {
    regs: &'a R,
    cfg: &'a ClockConfig,
    wait: &'a W,
    state: ClockState,
}

impl<'a, R: RegisterAccess, W: WaitPolicy> ClockSequencer<'a, R, W> {
    pub fn new(regs: &'a R, cfg: &'a ClockConfig, wait: &'a W) -> Self {
        Self {
            regs,
            cfg,
            wait,
            state: ClockState::Reset,
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    /// Bring the system clock up from reset to the configured PLL output.
    ///
    /// Only the crystal wait is bounded. Once HXTAL is stable, PLL lock, the high-drive
    /// handshake and the source switch are treated as certain, and waited on indefinitely.
    pub fn bring_up_clock(&mut self) -> Result<(), ClockFault> {
        self.bring_up_clock_with(|_| ())
    }

    /// As `bring_up_clock`, calling `observe` with every state entered, starting with `Reset`.
    pub fn bring_up_clock_with(
        &mut self,
        mut observe: impl FnMut(ClockState),
    ) -> Result<(), ClockFault> {
        observe(self.state);

        self.enable_hxtal(&mut observe)?;
        self.configure_buses(&mut observe);
        self.enable_pll(&mut observe);
        self.enable_high_drive(&mut observe);
        self.switch_to_pll(&mut observe);
        self.configure_ck48m();

        debug!(
            "System clock on PLLP; PLL reg {:#x}",
            self.regs.read(rcu::PLL)
        );
        Ok(())
    }

    fn advance<O: FnMut(ClockState)>(&mut self, to: ClockState, observe: &mut O) {
        debug_assert!(
            self.state.can_advance_to(to),
            "illegal clock transition {:?} -> {:?}",
            self.state,
            to
        );
        trace!("Clock state: {:?}", to);
        self.state = to;
        observe(to);
    }

    fn enable_hxtal<O: FnMut(ClockState)>(&mut self, observe: &mut O) -> Result<(), ClockFault> {
        let regs = self.regs;

        self.advance(ClockState::HxtalEnabling, observe);
        regs.set(rcu::CTL_HXTALEN);

        let stable = self
            .wait
            .wait_bounded(self.cfg.hxtal_timeout, || regs.is_set(rcu::CTL_HXTALSTB));

        if !stable {
            self.advance(ClockState::HxtalTimeout, observe);
            error!(
                "HXTAL not stable after {} polls",
                self.cfg.hxtal_timeout
            );
            return Err(ClockFault::OscillatorTimeout);
        }

        self.advance(ClockState::HxtalStable, observe);
        Ok(())
    }

    /// Raise the LDO output voltage and set the bus prescalers. The voltage has to be up before
    /// the PLL is driven to its target, and the prescalers keep each bus in its rated range
    /// once it is.
    fn configure_buses<O: FnMut(ClockState)>(&mut self, observe: &mut O) {
        let regs = self.regs;
        let cfg = self.cfg;

        regs.set(rcu::APB1EN_PMUEN);
        regs.write_field(pmu::CTL_LDOVS, cfg.ldo_scale as u32);

        regs.write_field(rcu::CFG0_AHBPSC, cfg.ahb_prescaler as u32);
        regs.write_field(rcu::CFG0_APB2PSC, cfg.apb2_prescaler as u32);
        regs.write_field(rcu::CFG0_APB1PSC, cfg.apb1_prescaler as u32);

        self.advance(ClockState::BusConfigured, observe);
    }

    fn enable_pll<O: FnMut(ClockState)>(&mut self, observe: &mut O) {
        let regs = self.regs;

        self.advance(ClockState::PllEnabling, observe);

        // PSC, N, P, Q are only writable with the PLL off. A wake without a deep-sleep in
        // between finds it still running on the configuration from the last run.
        if pll_is_enabled(regs) {
            debug!("PLL already running; keeping its configuration");
        } else {
            regs.write(rcu::PLL, self.cfg.pll_reg_val());
            regs.set(rcu::CTL_PLLEN);
        }

        self.wait.wait_forever(|| regs.is_set(rcu::CTL_PLLSTB));

        self.advance(ClockState::PllStable, observe);
    }

    fn enable_high_drive<O: FnMut(ClockState)>(&mut self, observe: &mut O) {
        let regs = self.regs;

        self.advance(ClockState::HighDriveEnabling, observe);

        regs.set(pmu::CTL_HDEN);
        self.wait.wait_forever(|| regs.is_set(pmu::CS_HDRF));

        regs.set(pmu::CTL_HDS);
        self.wait.wait_forever(|| regs.is_set(pmu::CS_HDSRF));

        self.advance(ClockState::HighDriveReady, observe);
    }

    fn switch_to_pll<O: FnMut(ClockState)>(&mut self, observe: &mut O) {
        let regs = self.regs;

        self.advance(ClockState::SourceSwitching, observe);

        regs.clear_bits(rcu::CFG0, rcu::CFG0_SCS.mask());
        regs.set_bits(rcu::CFG0, rcu::CFG0_SCS.encode(SysClkSource::Pllp as u32));

        self.wait
            .wait_forever(|| system_clock_source(regs) == Some(SysClkSource::Pllp));

        self.advance(ClockState::SourceSwitched, observe);
    }

    /// Route the 48Mhz domain, and enable the USB core's bus clock.
    fn configure_ck48m(&self) {
        let regs = self.regs;
        let cfg = self.cfg;

        regs.clear(rcu::ADDCTL_PLL48MSEL);
        if cfg.pll48m_src == Pll48mSrc::PllSaiP {
            regs.set(rcu::ADDCTL_PLL48MSEL);
        }

        regs.clear(rcu::ADDCTL_CK48MSEL);
        if cfg.ck48m_src == Ck48mSrc::Irc48m {
            regs.set(rcu::ADDCTL_CK48MSEL);
        }

        regs.set(cfg.usb_core.clock_gate());
    }
}

/// The clock source currently driving the system. `None` for the reserved encoding.
pub fn system_clock_source<R: RegisterAccess>(regs: &R) -> Option<SysClkSource> {
    SysClkSource::from_bits(regs.read_field(rcu::CFG0_SCSS))
}

/// Check if the PLL is enabled. This is useful when deciding whether the clocks need to be
/// brought up again after a low-power period, eg:
/// ```ignore
/// if !pll_is_enabled(&regs) {
///     ClockSequencer::new(&regs, &cfg, &Spin).bring_up_clock()?;
/// }
/// ```
pub fn pll_is_enabled<R: RegisterAccess>(regs: &R) -> bool {
    regs.is_set(rcu::CTL_PLLEN)
}
