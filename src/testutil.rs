//! Host-side stand-ins for the hardware: a register file that models the status bits the
//! sequencer polls, a wait policy that refuses to spin forever, and a fault policy that
//! panics instead of locking up.

use core::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::{
    clocks::{ClockFault, FaultPolicy, WaitPolicy},
    regmap::{exti, pmu, rcu},
    regs::RegisterAccess,
};

/// Simulated register file. Reads of never-written addresses return 0, like registers out of
/// reset in the ranges we touch.
///
/// Writes are post-processed the way the hardware would react: enabling HXTAL or the PLL sets
/// its stable flag, the high-drive bits are reflected in `PMU_CS`, `SCSS` follows `SCS`, and
/// `EXTI_PD` is write-1-to-clear.
#[derive(Default)]
pub(crate) struct SimRegisters {
    mem: RefCell<HashMap<u32, u32>>,
    writes: RefCell<Vec<(u32, u32)>>,
    hxtal_dead: Cell<bool>,
    pll_dead: Cell<bool>,
    on_write: RefCell<Option<Box<dyn Fn(u32, u32)>>>,
}

impl SimRegisters {
    pub fn new() -> Self {
        Self::default()
    }

    /// The crystal never reports stable.
    pub fn kill_hxtal(&self) {
        self.hxtal_dead.set(true);
    }

    /// The PLL never reports lock.
    pub fn kill_pll(&self) {
        self.pll_dead.set(true);
    }

    /// What deep-sleep leaves behind: crystal, PLL and high-drive off, IRC16M driving the
    /// system. Prescalers, `RCU_PLL` and the EXTI registers are retained.
    pub fn lose_clocks(&self) {
        let ctl = self.peek(rcu::CTL)
            & !(rcu::CTL_HXTALEN.mask()
                | rcu::CTL_HXTALSTB.mask()
                | rcu::CTL_PLLEN.mask()
                | rcu::CTL_PLLSTB.mask());
        self.poke(rcu::CTL, ctl);

        let cfg0 = self.peek(rcu::CFG0) & !(rcu::CFG0_SCS.mask() | rcu::CFG0_SCSS.mask());
        self.poke(rcu::CFG0, cfg0);

        let pmu_ctl = self.peek(pmu::CTL) & !(pmu::CTL_HDEN.mask() | pmu::CTL_HDS.mask());
        self.poke(pmu::CTL, pmu_ctl);
        self.poke(pmu::CS, 0);
    }

    /// Call `f(addr, value)` after every write has taken effect.
    pub fn set_write_hook(&self, f: impl Fn(u32, u32) + 'static) {
        *self.on_write.borrow_mut() = Some(Box::new(f));
    }

    /// Latch an edge on an EXTI line, as the hardware would.
    pub fn raise_exti(&self, line: u8) {
        let pd = self.peek(exti::PD);
        self.poke(exti::PD, pd | (1 << line));
    }

    /// Number of writes to `addr` so far.
    pub fn writes_to(&self, addr: u32) -> usize {
        self.writes.borrow().iter().filter(|(a, _)| *a == addr).count()
    }

    /// Number of writes to any RCU register so far.
    pub fn rcu_writes(&self) -> usize {
        self.writes
            .borrow()
            .iter()
            .filter(|(a, _)| (rcu::BASE..rcu::BASE + 0x400).contains(a))
            .count()
    }

    fn peek(&self, addr: u32) -> u32 {
        self.mem.borrow().get(&addr).copied().unwrap_or(0)
    }

    fn poke(&self, addr: u32, value: u32) {
        self.mem.borrow_mut().insert(addr, value);
    }

    fn hardware_response(&self, addr: u32, value: u32) -> u32 {
        match addr {
            rcu::CTL => {
                let mut v = value & !(rcu::CTL_HXTALSTB.mask() | rcu::CTL_PLLSTB.mask());
                if value & rcu::CTL_HXTALEN.mask() != 0 && !self.hxtal_dead.get() {
                    v |= rcu::CTL_HXTALSTB.mask();
                }
                if value & rcu::CTL_PLLEN.mask() != 0 && !self.pll_dead.get() {
                    v |= rcu::CTL_PLLSTB.mask();
                }
                v
            }
            rcu::CFG0 => {
                let scs = rcu::CFG0_SCS.decode(value);
                (value & !rcu::CFG0_SCSS.mask()) | rcu::CFG0_SCSS.encode(scs)
            }
            pmu::CTL => {
                let mut cs = 0;
                if value & pmu::CTL_HDEN.mask() != 0 {
                    cs |= pmu::CS_HDRF.mask();
                }
                if value & pmu::CTL_HDS.mask() != 0 {
                    cs |= pmu::CS_HDSRF.mask();
                }
                self.poke(pmu::CS, cs);
                value
            }
            exti::PD => self.peek(exti::PD) & !value,
            _ => value,
        }
    }
}

impl RegisterAccess for SimRegisters {
    fn read(&self, addr: u32) -> u32 {
        self.peek(addr)
    }

    fn write(&self, addr: u32, value: u32) {
        self.writes.borrow_mut().push((addr, value));
        let stored = self.hardware_response(addr, value);
        self.poke(addr, stored);

        if let Some(f) = self.on_write.borrow().as_ref() {
            f(addr, value);
        }
    }
}

/// Polls like `Spin`, but gives up on unbounded waits after `limit` polls, by panicking.
pub(crate) struct StepWait {
    pub limit: u32,
}

impl Default for StepWait {
    fn default() -> Self {
        Self { limit: 1_000 }
    }
}

impl WaitPolicy for StepWait {
    fn wait_bounded(&self, bound: u32, mut ready: impl FnMut() -> bool) -> bool {
        let mut count = 0;
        while !ready() && count != bound {
            count += 1;
        }
        ready()
    }

    fn wait_forever(&self, mut ready: impl FnMut() -> bool) {
        for _ in 0..self.limit {
            if ready() {
                return;
            }
        }
        panic!("wait would block forever");
    }
}

/// Stands in for the halting spin, so tests can observe that a halt was reached.
#[derive(Default)]
pub(crate) struct PanicHalt;

impl FaultPolicy for PanicHalt {
    fn halt(&self, fault: ClockFault) -> ! {
        panic!("halted: {:?}", fault);
    }
}
