//! Clock bring-up: the oscillator/PLL state machine that takes the core clock from reset to
//! the configured PLL-derived system clock.

mod config;
mod sequencer;
mod wait;

pub use config::*;
pub use sequencer::*;
pub use wait::*;

/// Bus and core frequencies a clock configuration produces, for setting up peripheral
/// timing (baud rates, timer prescalers and so on).
pub trait ClockCfg {
    /// System clock speed, in Hz.
    fn sysclk(&self) -> u32;

    /// HCLK speed, in Hz. Ie AHB bus, core, memory, and DMA.
    fn hclk(&self) -> u32;

    /// Cortex System timer speed, in Hz.
    fn systick(&self) -> u32;

    /// APB1 peripheral clocks speed, in Hz.
    fn apb1(&self) -> u32;

    /// APB1 timer clocks speed, in Hz.
    fn apb1_timer(&self) -> u32;

    /// APB2 peripheral clocks speed, in Hz.
    fn apb2(&self) -> u32;

    /// APB2 timer clocks speed, in Hz.
    fn apb2_timer(&self) -> u32;
}

/// Progress of one clock bring-up run. A run starts at `Reset` and walks forward one state at
/// a time; `HxtalTimeout` and `SourceSwitched` are the two ways it ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockState {
    Reset,
    HxtalEnabling,
    HxtalStable,
    /// The crystal never reported stable within the configured bound. Terminal.
    HxtalTimeout,
    BusConfigured,
    PllEnabling,
    PllStable,
    HighDriveEnabling,
    HighDriveReady,
    SourceSwitching,
    SourceSwitched,
}

impl ClockState {
    /// The states of a successful run, in order.
    pub const SUCCESS_PATH: [ClockState; 10] = [
        Self::Reset,
        Self::HxtalEnabling,
        Self::HxtalStable,
        Self::BusConfigured,
        Self::PllEnabling,
        Self::PllStable,
        Self::HighDriveEnabling,
        Self::HighDriveReady,
        Self::SourceSwitching,
        Self::SourceSwitched,
    ];

    /// The state that follows this one on the success path.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Reset => Some(Self::HxtalEnabling),
            Self::HxtalEnabling => Some(Self::HxtalStable),
            Self::HxtalStable => Some(Self::BusConfigured),
            Self::BusConfigured => Some(Self::PllEnabling),
            Self::PllEnabling => Some(Self::PllStable),
            Self::PllStable => Some(Self::HighDriveEnabling),
            Self::HighDriveEnabling => Some(Self::HighDriveReady),
            Self::HighDriveReady => Some(Self::SourceSwitching),
            Self::SourceSwitching => Some(Self::SourceSwitched),
            Self::HxtalTimeout | Self::SourceSwitched => None,
        }
    }

    /// Whether moving from `self` to `to` is a legal single step.
    pub fn can_advance_to(self, to: Self) -> bool {
        self.next() == Some(to) || (self == Self::HxtalEnabling && to == Self::HxtalTimeout)
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }
}

/// Faults the sequencer can report. Every wait after the crystal check is unbounded, so this
/// is the only one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockFault {
    /// HXTAL didn't stabilize within `ClockConfig::hxtal_timeout` polls.
    OscillatorTimeout,
}
