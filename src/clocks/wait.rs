use cfg_if::cfg_if;

use super::ClockFault;

/// How the sequencer waits on a hardware status flag. The default is [`Spin`]; tests swap in a
/// policy that resolves or gives up immediately.
pub trait WaitPolicy {
    /// Poll `ready` until it returns true, at most `bound` extra times. Returns whether it
    /// became ready.
    fn wait_bounded(&self, bound: u32, ready: impl FnMut() -> bool) -> bool;

    /// Poll `ready` until it returns true, however long that takes.
    fn wait_forever(&self, ready: impl FnMut() -> bool);
}

/// Busy-wait using a software iteration counter. No wall-clock timer is involved.
#[derive(Clone, Copy, Debug, Default)]
pub struct Spin;

impl WaitPolicy for Spin {
    fn wait_bounded(&self, bound: u32, mut ready: impl FnMut() -> bool) -> bool {
        let mut count = 0;
        while !ready() && count != bound {
            count += 1;
        }
        // The last poll may have raced the flag; check once more.
        ready()
    }

    fn wait_forever(&self, mut ready: impl FnMut() -> bool) {
        while !ready() {}
    }
}

/// What to do with a clock fault that can't be returned to a caller, ie inside an interrupt
/// handler.
pub trait FaultPolicy {
    fn halt(&self, fault: ClockFault) -> !;
}

/// Log the fault and lock up, leaving recovery to a watchdog or external reset.
#[derive(Clone, Copy, Debug, Default)]
pub struct Halt;

impl FaultPolicy for Halt {
    fn halt(&self, fault: ClockFault) -> ! {
        error!("Clock fault: {:?}. Halting.", fault);
        loop {
            cfg_if! {
                if #[cfg(cortex_m_target)] {
                    cortex_m::asm::nop();
                } else {
                    core::hint::spin_loop();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;

    #[test]
    fn bounded_gives_up_after_bound() {
        let polls = Cell::new(0u32);
        let ok = Spin.wait_bounded(10, || {
            polls.set(polls.get() + 1);
            false
        });
        assert!(!ok);
        // The initial poll, 10 retries, and the final check.
        assert_eq!(polls.get(), 12);
    }

    #[test]
    fn bounded_succeeds_when_flag_sets() {
        let polls = Cell::new(0u32);
        let ok = Spin.wait_bounded(0xFFFF, || {
            polls.set(polls.get() + 1);
            polls.get() >= 5
        });
        assert!(ok);
    }

    #[test]
    fn forever_returns_once_ready() {
        let polls = Cell::new(0u32);
        Spin.wait_forever(|| {
            polls.set(polls.get() + 1);
            polls.get() == 3
        });
        assert_eq!(polls.get(), 3);
    }
}
