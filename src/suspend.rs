//! The record shared between the main loop and the wake interrupt handlers.

use core::cell::Cell;

use critical_section::{CriticalSection, Mutex};

/// Which path last woke the system from suspend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeMode {
    /// No wake has happened since the last suspend began.
    #[default]
    None,
    /// Local wake, from the wake key's EXTI line.
    General,
    /// USB remote wakeup.
    Remote,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SuspendState {
    pub suspended: bool,
    /// Only meaningful right after a suspend -> wake transition.
    pub wake_mode: WakeMode,
}

/// Suspend flag and wake reason. The main loop sets the flag (through
/// `PowerCtx::begin_suspend`) and later reads the wake mode; the wake handlers clear the flag
/// and set the mode.
pub struct SuspendRecord {
    state: Mutex<Cell<SuspendState>>,
}

impl SuspendRecord {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(Cell::new(SuspendState {
                suspended: false,
                wake_mode: WakeMode::None,
            })),
        }
    }

    pub fn snapshot(&self) -> SuspendState {
        critical_section::with(|cs| self.state.borrow(cs).get())
    }

    pub fn is_suspended(&self) -> bool {
        self.snapshot().suspended
    }

    pub fn wake_mode(&self) -> WakeMode {
        self.snapshot().wake_mode
    }

    /// Flag a suspend, discarding the previous wake reason.
    pub(crate) fn enter(&self, cs: CriticalSection) {
        self.state.borrow(cs).set(SuspendState {
            suspended: true,
            wake_mode: WakeMode::None,
        });
    }

    /// Clear the suspend flag. Returns whether it was set.
    pub(crate) fn take_suspended(&self, cs: CriticalSection) -> bool {
        let cell = self.state.borrow(cs);
        let state = cell.get();
        if state.suspended {
            cell.set(SuspendState {
                suspended: false,
                ..state
            });
        }
        state.suspended
    }

    pub(crate) fn record_wake(&self, cs: CriticalSection, mode: WakeMode) {
        let cell = self.state.borrow(cs);
        cell.set(SuspendState {
            wake_mode: mode,
            ..cell.get()
        });
    }
}

impl Default for SuspendRecord {
    fn default() -> Self {
        Self::new()
    }
}
