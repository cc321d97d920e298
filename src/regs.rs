//! Typed access to memory-mapped control and status registers.
//!
//! Everything above this layer talks to hardware through [`RegisterAccess`], so the clock
//! sequencer and wake controller can run against a simulated register file in tests.
//! Addresses are compile-time constants from [`crate::regmap`]; nothing here validates them.

use core::ptr;

/// A single bit, ie `BIT(n)`.
pub const fn bit(n: u8) -> u32 {
    1 << n
}

/// Mask covering bits `start..=end`, ie `BITS(start, end)`.
pub const fn bits(start: u8, end: u8) -> u32 {
    (0xFFFF_FFFF << start) & (0xFFFF_FFFF >> (31 - end))
}

/// Shift `value` into bits `start..=end`, discarding anything that doesn't fit.
pub const fn field(start: u8, end: u8, value: u32) -> u32 {
    bits(start, end) & (value << start)
}

/// A named control or status bit: its register address, and position within it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterView {
    pub name: &'static str,
    pub addr: u32,
    pub pos: u8,
}

impl RegisterView {
    pub const fn new(name: &'static str, addr: u32, pos: u8) -> Self {
        Self { name, addr, pos }
    }

    pub const fn mask(&self) -> u32 {
        bit(self.pos)
    }
}

/// A multi-bit field, spanning bits `start..=end` of the register at `addr`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Field {
    pub addr: u32,
    pub start: u8,
    pub end: u8,
}

impl Field {
    pub const fn new(addr: u32, start: u8, end: u8) -> Self {
        Self { addr, start, end }
    }

    pub const fn mask(&self) -> u32 {
        bits(self.start, self.end)
    }

    /// The register value with `value` placed in this field, and all other bits zero.
    pub const fn encode(&self, value: u32) -> u32 {
        field(self.start, self.end, value)
    }

    /// Extract this field from a full register value.
    pub const fn decode(&self, reg_val: u32) -> u32 {
        (reg_val & self.mask()) >> self.start
    }
}

/// Read and write 32-bit registers by address.
///
/// Only `read` and `write` are required. Callers are responsible for ordering when adjacent
/// writes have a hardware dependency; `modify` is a plain read followed by a write.
pub trait RegisterAccess {
    fn read(&self, addr: u32) -> u32;

    fn write(&self, addr: u32, value: u32);

    fn modify(&self, addr: u32, f: impl FnOnce(u32) -> u32) {
        let val = self.read(addr);
        self.write(addr, f(val));
    }

    fn set_bits(&self, addr: u32, mask: u32) {
        self.modify(addr, |v| v | mask);
    }

    fn clear_bits(&self, addr: u32, mask: u32) {
        self.modify(addr, |v| v & !mask);
    }

    fn set(&self, view: RegisterView) {
        self.set_bits(view.addr, view.mask());
    }

    fn clear(&self, view: RegisterView) {
        self.clear_bits(view.addr, view.mask());
    }

    fn is_set(&self, view: RegisterView) -> bool {
        self.read(view.addr) & view.mask() != 0
    }

    fn read_field(&self, f: Field) -> u32 {
        f.decode(self.read(f.addr))
    }

    /// Clear the field, then write `value` into it, leaving other bits untouched.
    fn write_field(&self, f: Field, value: u32) {
        self.modify(f.addr, |v| (v & !f.mask()) | f.encode(value));
    }
}

impl<R: RegisterAccess> RegisterAccess for &R {
    fn read(&self, addr: u32) -> u32 {
        (**self).read(addr)
    }

    fn write(&self, addr: u32, value: u32) {
        (**self).write(addr, value)
    }
}

/// Volatile access to the real peripheral registers.
#[derive(Clone, Copy, Debug)]
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// # Safety
    ///
    /// Every address passed to the resulting accessor is dereferenced as a `u32` register.
    /// Only use it with the constants in [`crate::regmap`], on a GD32F4xx part.
    pub const unsafe fn steal() -> Self {
        Self { _private: () }
    }
}

impl RegisterAccess for Mmio {
    fn read(&self, addr: u32) -> u32 {
        unsafe { ptr::read_volatile(addr as usize as *const u32) }
    }

    fn write(&self, addr: u32, value: u32) {
        unsafe { ptr::write_volatile(addr as usize as *mut u32, value) }
    }
}
