//! Controller error codes
//!
//! The status parameter of the *Command Complete* and *Command Status* events is one of the
//! controller error codes listed in volume one part F of the Bluetooth core specification.

use core::fmt::{self, Display, Formatter};

/// A Controller Error
///
/// `Error` only names the error codes a controller is expected to return for the commands issued
/// by the transport itself. Any other code is kept as `Unknown` with its raw value.
///
/// ### `NoError`
/// The enum `NoError` is created from the error code zero. There is no official error for zero, but
/// it is used by events to signify there was no error.
///
/// ### `MissingErrorCode`
/// This only occurs whenever the status is not present within an event parameter. When this occurs
/// it generally means the event was truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    NoError,
    Unknown(u8),
    MissingErrorCode,
    UnknownHciCommand,
    HardwareFailure,
    MemoryCapacityExceeded,
    CommandDisallowed,
    UnsupportedFeatureOrParameterValue,
    InvalidHciCommandParameters,
    UnspecifiedError,
    ControllerBusy,
}

impl Error {
    /// Check if this is `NoError`
    pub fn is_success(&self) -> bool {
        matches!(self, Error::NoError)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Error::NoError => f.write_str("no error"),
            Error::Unknown(val) => write!(f, "unknown error code (0x{:X})", val),
            Error::MissingErrorCode => f.write_str("missing error code"),
            Error::UnknownHciCommand => f.write_str("unknown HCI command (0x1)"),
            Error::HardwareFailure => f.write_str("hardware failure (0x3)"),
            Error::MemoryCapacityExceeded => f.write_str("memory capacity exceeded (0x7)"),
            Error::CommandDisallowed => f.write_str("command disallowed (0xC)"),
            Error::UnsupportedFeatureOrParameterValue => f.write_str("unsupported feature or parameter value (0x11)"),
            Error::InvalidHciCommandParameters => f.write_str("invalid HCI command parameters (0x12)"),
            Error::UnspecifiedError => f.write_str("unspecified error (0x1F)"),
            Error::ControllerBusy => f.write_str("controller busy (0x3A)"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl From<u8> for Error {
    fn from(raw: u8) -> Self {
        match raw {
            0x00 => Error::NoError,
            0x01 => Error::UnknownHciCommand,
            0x03 => Error::HardwareFailure,
            0x07 => Error::MemoryCapacityExceeded,
            0x0C => Error::CommandDisallowed,
            0x11 => Error::UnsupportedFeatureOrParameterValue,
            0x12 => Error::InvalidHciCommandParameters,
            0x1F => Error::UnspecifiedError,
            0x3A => Error::ControllerBusy,
            _ => Error::Unknown(raw),
        }
    }
}

impl From<Option<u8>> for Error {
    fn from(raw: Option<u8>) -> Self {
        raw.map(Error::from).unwrap_or(Error::MissingErrorCode)
    }
}
