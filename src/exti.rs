//! EXTI line control: arming a line for interrupts, masking it around critical updates, and
//! handling its pending flag.

use crate::{
    regmap::exti,
    regs::{RegisterAccess, RegisterView},
};

/// One of the 23 EXTI lines. Lines 0 - 15 follow the GPIO pin number; the rest are wired to
/// internal events such as USB wakeup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExtiLine(u8);

impl ExtiLine {
    pub const COUNT: u8 = 23;

    pub const fn new(line: u8) -> Self {
        assert!(line < Self::COUNT, "EXTI line out of range");
        Self(line)
    }

    pub const fn number(&self) -> u8 {
        self.0
    }

    pub const fn mask(&self) -> u32 {
        1 << self.0
    }

    fn view(&self, name: &'static str, reg: u32) -> RegisterView {
        RegisterView::new(name, reg, self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// The edge(s) that latch a line's pending flag.
pub enum Edge {
    Rising,
    Falling,
    Both,
}

/// Select the trigger edge for `line`, and enable its interrupt.
pub fn enable_interrupt<R: RegisterAccess>(regs: &R, line: ExtiLine, edge: Edge) {
    let rising = line.view("EXTI_RTEN", exti::RTEN);
    let falling = line.view("EXTI_FTEN", exti::FTEN);

    match edge {
        Edge::Rising => {
            regs.set(rising);
            regs.clear(falling);
        }
        Edge::Falling => {
            regs.clear(rising);
            regs.set(falling);
        }
        Edge::Both => {
            regs.set(rising);
            regs.set(falling);
        }
    }

    // Don't fire immediately on an edge latched before we were listening.
    clear_pending(regs, line);
    unmask(regs, line);
}

/// Disable `line`'s interrupt. Returns whether it was enabled, so the caller can restore it.
pub fn mask<R: RegisterAccess>(regs: &R, line: ExtiLine) -> bool {
    let view = line.view("EXTI_INTEN", exti::INTEN);
    let was_enabled = regs.is_set(view);
    regs.clear(view);
    was_enabled
}

pub fn unmask<R: RegisterAccess>(regs: &R, line: ExtiLine) {
    regs.set(line.view("EXTI_INTEN", exti::INTEN));
}

pub fn is_enabled<R: RegisterAccess>(regs: &R, line: ExtiLine) -> bool {
    regs.is_set(line.view("EXTI_INTEN", exti::INTEN))
}

pub fn is_pending<R: RegisterAccess>(regs: &R, line: ExtiLine) -> bool {
    regs.is_set(line.view("EXTI_PD", exti::PD))
}

/// Clear `line`'s pending flag. `EXTI_PD` is write-1-to-clear, so this is a plain write, not a
/// read-modify-write; the latter would clear every other pending line too.
pub fn clear_pending<R: RegisterAccess>(regs: &R, line: ExtiLine) {
    regs.write(exti::PD, line.mask());
}
