//! Common error definitions.

use crate::clocks::{ClockFault, ConfigError};

macro_rules! impl_from_error {
    ($error:ident) => {
        impl From<$error> for Error {
            fn from(error: $error) -> Self {
                Self::$error(error)
            }
        }
    };
}

/// Alias for Result<T, Error>.
pub type Result<T> = core::result::Result<T, Error>;

/// Collection of all errors that can occur.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// An oscillator didn't report stable within its timeout.
    ClockFault(ClockFault),
    /// The clock settings are out of the chip's operating range.
    ConfigError(ConfigError),
}

impl_from_error!(ClockFault);
impl_from_error!(ConfigError);
