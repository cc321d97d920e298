//! GD32F4xx register map, for the peripherals this crate drives: RCU, PMU and EXTI.
//! Offsets and bit positions are from the GD32F4xx user manual.

const AHB1_BUS_BASE: u32 = 0x4002_0000;
const APB1_BUS_BASE: u32 = 0x4000_0000;
const APB2_BUS_BASE: u32 = 0x4001_0000;

/// Reset and clock unit.
pub mod rcu {
    reg_block! {
        RCU @ super::AHB1_BUS_BASE + 0x3800;
        CTL @ 0x00 => {
            bit HXTALEN = 16;
            bit HXTALSTB = 17;
            bit PLLEN = 24;
            bit PLLSTB = 25;
        }
        PLL @ 0x04 => {
            bit PLLSEL = 22;
            field PLLPSC = 0, 5;
            field PLLN = 6, 14;
            field PLLP = 16, 17;
            field PLLQ = 24, 27;
        }
        CFG0 @ 0x08 => {
            field SCS = 0, 1;
            field SCSS = 2, 3;
            field AHBPSC = 4, 7;
            field APB1PSC = 10, 12;
            field APB2PSC = 13, 15;
        }
        AHB1EN @ 0x30 => {
            bit USBHSEN = 29;
        }
        AHB2EN @ 0x34 => {
            bit USBFSEN = 7;
        }
        APB1EN @ 0x40 => {
            bit PMUEN = 28;
        }
        ADDCTL @ 0xC0 => {
            bit CK48MSEL = 0;
            bit PLL48MSEL = 1;
        }
    }
}

/// Power management unit.
pub mod pmu {
    reg_block! {
        PMU @ super::APB1_BUS_BASE + 0x7000;
        CTL @ 0x00 => {
            bit LDOLP = 0;
            bit STBMOD = 1;
            bit HDEN = 16;
            bit HDS = 17;
            field LDOVS = 14, 15;
        }
        CS @ 0x04 => {
            bit HDRF = 16;
            bit HDSRF = 17;
        }
    }
}

/// Interrupt/event controller.
pub mod exti {
    reg_block! {
        EXTI @ super::APB2_BUS_BASE + 0x3C00;
        INTEN @ 0x00 => {}
        EVEN @ 0x04 => {}
        RTEN @ 0x08 => {}
        FTEN @ 0x0C => {}
        SWIEV @ 0x10 => {}
        PD @ 0x14 => {}
    }
}
