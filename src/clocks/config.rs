use super::ClockCfg;
use crate::regmap::rcu;
use crate::regs::RegisterView;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
/// Main PLL output divider, for the system clock. RCU_PLL, PLLP field.
pub enum Pllp {
    Div2 = 0b00,
    Div4 = 0b01,
    Div6 = 0b10,
    Div8 = 0b11,
}

impl Pllp {
    pub const fn value(&self) -> u8 {
        match self {
            Self::Div2 => 2,
            Self::Div4 => 4,
            Self::Div6 => 6,
            Self::Div8 => 8,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
/// Secondary PLL output divider; feeds the 48Mhz domain (USB, SDIO). RCU_PLL, PLLQ field.
pub enum Pllq {
    Div2 = 0b0010,
    Div3 = 0b0011,
    Div4 = 0b0100,
    Div5 = 0b0101,
    Div6 = 0b0110,
    Div7 = 0b0111,
    Div8 = 0b1000,
    Div9 = 0b1001,
    Div10 = 0b1010,
    Div11 = 0b1011,
    Div12 = 0b1100,
    Div13 = 0b1101,
    Div14 = 0b1110,
    Div15 = 0b1111,
}

impl Pllq {
    pub const fn value(&self) -> u8 {
        // The field holds the divider directly.
        *self as u8
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
/// Division factor for the AHB clock. Also known as AHB Prescaler.
pub enum AhbPrescaler {
    Div1 = 0b0000,
    Div2 = 0b1000,
    Div4 = 0b1001,
    Div8 = 0b1010,
    Div16 = 0b1011,
    Div64 = 0b1100,
    Div128 = 0b1101,
    Div256 = 0b1110,
    Div512 = 0b1111,
}

impl AhbPrescaler {
    pub const fn value(&self) -> u16 {
        match self {
            Self::Div1 => 1,
            Self::Div2 => 2,
            Self::Div4 => 4,
            Self::Div8 => 8,
            Self::Div16 => 16,
            Self::Div64 => 64,
            Self::Div128 => 128,
            Self::Div256 => 256,
            Self::Div512 => 512,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
/// For use with `RCU_CFG0` `APB1PSC` and `APB2PSC`. Ie, low-speed and high-speed prescalers respectively.
pub enum ApbPrescaler {
    Div1 = 0b000,
    Div2 = 0b100,
    Div4 = 0b101,
    Div8 = 0b110,
    Div16 = 0b111,
}

impl ApbPrescaler {
    pub const fn value(&self) -> u8 {
        match self {
            Self::Div1 => 1,
            Self::Div2 => 2,
            Self::Div4 => 4,
            Self::Div8 => 8,
            Self::Div16 => 16,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
/// LDO output voltage scaling, `PMU_CTL` `LDOVS`. Must be `High` to reach the upper PLL range.
pub enum LdoScale {
    Low = 0b01,
    Mid = 0b10,
    High = 0b11,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Source of the PLL48M clock. `RCU_ADDCTL` `PLL48MSEL`.
pub enum Pll48mSrc {
    PllQ,
    PllSaiP,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Source of the CK48M clock used by USB. `RCU_ADDCTL` `CK48MSEL`.
pub enum Ck48mSrc {
    Pll48m,
    Irc48m,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Which USB controller the board uses. Selects the bus clock gate enabled at the end of
/// bring-up, and the EXTI line its wakeup event arrives on.
pub enum UsbCore {
    /// USBFS, on AHB2. Wakeup on EXTI 18.
    Fs,
    /// USBHS, on AHB1. Wakeup on EXTI 20.
    Hs,
}

impl UsbCore {
    pub const fn clock_gate(&self) -> RegisterView {
        match self {
            Self::Fs => rcu::AHB2EN_USBFSEN,
            Self::Hs => rcu::AHB1EN_USBHSEN,
        }
    }

    pub const fn wakeup_line(&self) -> u8 {
        match self {
            Self::Fs => 18,
            Self::Hs => 20,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
/// The clock currently driving the system, as reported by `RCU_CFG0` `SCSS`.
pub enum SysClkSource {
    Irc16m = 0b00,
    Hxtal = 0b01,
    Pllp = 0b10,
}

impl SysClkSource {
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0b00 => Some(Self::Irc16m),
            0b01 => Some(Self::Hxtal),
            0b10 => Some(Self::Pllp),
            _ => None,
        }
    }
}

/// Reasons a `ClockConfig` is rejected by `validate`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// HXTAL must be 4 - 32Mhz.
    HxtalRange,
    /// PSC or N outside the range the PLL accepts.
    PllFactor,
    /// HXTAL / PSC must land in 1 - 2Mhz.
    PllInput,
    /// VCO output must land in 100 - 500Mhz.
    Vco,
    /// System clock or AHB above 200Mhz.
    Sysclk,
    /// APB1 above 50Mhz.
    Apb1,
    /// APB2 above 100Mhz.
    Apb2,
    /// The 48Mhz domain isn't 48Mhz.
    Usb48,
}

const MAX_SYSCLK: u32 = 200_000_000;
const MAX_APB1: u32 = 50_000_000;
const MAX_APB2: u32 = 100_000_000;
const USB_FREQ: u32 = 48_000_000;
const IRC48M_FREQ: u32 = 48_000_000;

/// Settings used by the clock sequencer. The constants are derived once from the crystal
/// frequency, and aren't recomputed at runtime. Start from `ClockConfig::default()` (8Mhz
/// crystal, 168Mhz system clock) and modify as required for the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockConfig {
    /// External crystal frequency, in Hz.
    pub hxtal_freq: u32,
    /// How many times to poll `HXTALSTB` before giving up.
    pub hxtal_timeout: u32,
    /// PLL input predivider. 2 - 63.
    pub pll_psc: u8,
    /// PLL multiplier. 64 - 500.
    pub pll_n: u16,
    pub pll_p: Pllp,
    pub pll_q: Pllq,
    /// The value to divide SYSCLK by, to get systick and peripheral clocks. Also known as AHB divider
    pub ahb_prescaler: AhbPrescaler,
    /// The divider of HCLK to get the APB1 peripheral clock
    pub apb1_prescaler: ApbPrescaler,
    /// The divider of HCLK to get the APB2 peripheral clock
    pub apb2_prescaler: ApbPrescaler,
    pub ldo_scale: LdoScale,
    pub pll48m_src: Pll48mSrc,
    pub ck48m_src: Ck48mSrc,
    pub usb_core: UsbCore,
}

impl ClockConfig {
    /// 8Mhz HXTAL; PSC = 8, N = 336, P = 2, Q = 7. Gives a 168Mhz system clock, AHB at 168Mhz,
    /// APB2 at 84Mhz, APB1 at 42Mhz, and a 48Mhz USB clock.
    pub const fn hxtal_8mhz() -> Self {
        Self {
            hxtal_freq: 8_000_000,
            hxtal_timeout: 0xFFFF,
            pll_psc: 8,
            pll_n: 336,
            pll_p: Pllp::Div2,
            pll_q: Pllq::Div7,
            ahb_prescaler: AhbPrescaler::Div1,
            apb1_prescaler: ApbPrescaler::Div4,
            apb2_prescaler: ApbPrescaler::Div2,
            ldo_scale: LdoScale::High,
            pll48m_src: Pll48mSrc::PllQ,
            ck48m_src: Ck48mSrc::Pll48m,
            usb_core: UsbCore::Fs,
        }
    }

    /// PLL input frequency, after the predivider. 0 if the predivider is 0.
    pub fn pll_input(&self) -> u32 {
        self.hxtal_freq.checked_div(self.pll_psc as u32).unwrap_or(0)
    }

    /// VCO output frequency. Saturates on settings far outside the PLL's range; `validate`
    /// rejects those.
    pub fn vco(&self) -> u32 {
        self.pll_input().saturating_mul(self.pll_n as u32)
    }

    /// Frequency of the 48Mhz domain, if it's derived from something we configure.
    pub fn usb48(&self) -> Option<u32> {
        match self.ck48m_src {
            Ck48mSrc::Irc48m => Some(IRC48M_FREQ),
            Ck48mSrc::Pll48m => match self.pll48m_src {
                Pll48mSrc::PllQ => Some(self.vco() / self.pll_q.value() as u32),
                // PLLSAI isn't set up here.
                Pll48mSrc::PllSaiP => None,
            },
        }
    }

    /// The full `RCU_PLL` value: dividers, multiplier, and HXTAL as the PLL reference.
    pub fn pll_reg_val(&self) -> u32 {
        rcu::PLL_PLLPSC.encode(self.pll_psc as u32)
            | rcu::PLL_PLLN.encode(self.pll_n as u32)
            | rcu::PLL_PLLP.encode(self.pll_p as u32)
            | rcu::PLL_PLLSEL.mask()
            | rcu::PLL_PLLQ.encode(self.pll_q as u32)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(4_000_000..=32_000_000).contains(&self.hxtal_freq) {
            return Err(ConfigError::HxtalRange);
        }

        if !(2..=63).contains(&self.pll_psc) || !(64..=500).contains(&self.pll_n) {
            return Err(ConfigError::PllFactor);
        }

        if !(1_000_000..=2_000_000).contains(&self.pll_input()) {
            return Err(ConfigError::PllInput);
        }

        if !(100_000_000..=500_000_000).contains(&self.vco()) {
            return Err(ConfigError::Vco);
        }

        if self.sysclk() > MAX_SYSCLK || self.hclk() > MAX_SYSCLK {
            return Err(ConfigError::Sysclk);
        }

        if self.apb1() > MAX_APB1 {
            return Err(ConfigError::Apb1);
        }

        if self.apb2() > MAX_APB2 {
            return Err(ConfigError::Apb2);
        }

        if let Some(freq) = self.usb48() {
            if freq != USB_FREQ {
                return Err(ConfigError::Usb48);
            }
        }

        Ok(())
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self::hxtal_8mhz()
    }
}

impl ClockCfg for ClockConfig {
    fn sysclk(&self) -> u32 {
        self.vco() / self.pll_p.value() as u32
    }

    fn hclk(&self) -> u32 {
        self.sysclk() / self.ahb_prescaler.value() as u32
    }

    fn systick(&self) -> u32 {
        self.hclk()
    }

    fn apb1(&self) -> u32 {
        self.hclk() / self.apb1_prescaler.value() as u32
    }

    fn apb1_timer(&self) -> u32 {
        if let ApbPrescaler::Div1 = self.apb1_prescaler {
            self.apb1()
        } else {
            self.apb1() * 2
        }
    }

    fn apb2(&self) -> u32 {
        self.hclk() / self.apb2_prescaler.value() as u32
    }

    fn apb2_timer(&self) -> u32 {
        if let ApbPrescaler::Div1 = self.apb2_prescaler {
            self.apb2()
        } else {
            self.apb2() * 2
        }
    }
}
