//! This module contains utility macros used to describe the register map.

/// Defines the registers of one peripheral: its base address, each register's absolute
/// address, and the named bits and multi-bit fields inside each register.
///
/// Example:
/// ```ignore
/// reg_block! {
///     RCU @ 0x4002_3800;
///     CTL @ 0x00 => {
///         bit HXTALEN = 16;
///         bit HXTALSTB = 17;
///     }
///     CFG0 @ 0x08 => {
///         field SCS = 0, 1;
///     }
/// }
/// ```
/// This produces `BASE`, `CTL`, `CTL_HXTALEN: RegisterView`, `CFG0_SCS: Field` etc.
macro_rules! reg_block {
    (
        $periph:ident @ $base:expr;
        $(
            $reg:ident @ $offset:expr => {
                $( bit $bit:ident = $pos:expr; )*
                $( field $fld:ident = $start:expr, $end:expr; )*
            }
        )*
    ) => {
        paste::paste! {
            #[allow(dead_code)]
            pub const BASE: u32 = $base;

            $(
                pub const $reg: u32 = $base + $offset;

                $(
                    pub const [<$reg _ $bit>]: $crate::regs::RegisterView = $crate::regs::RegisterView::new(
                        concat!(stringify!($periph), "_", stringify!($reg), "_", stringify!($bit)),
                        $base + $offset,
                        $pos,
                    );
                )*

                $(
                    pub const [<$reg _ $fld>]: $crate::regs::Field =
                        $crate::regs::Field::new($base + $offset, $start, $end);
                )*
            )*
        }
    };
}
