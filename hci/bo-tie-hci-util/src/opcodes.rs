//! HCI Command Opcodes
//!
//! Opcodes are composed of a group identifier and an individual command identifier specific to the
//! group. The group identifier and individual identifier are put together to form the raw opcode
//! value.
//!
//! Only the commands that a transport issues on its own are enumerated within `HciCommand`. Any
//! other command passes through the transport as raw bytes.
//!
//! ```
//! # use bo_tie_hci_util::opcodes::{HciCommand, ControllerAndBaseband};
//!
//! assert_eq!(0xC03, HciCommand::ControllerAndBaseband(ControllerAndBaseband::Reset).into_opcode());
//! ```

use core::fmt;

/// Enumerations of the HCI command opcodes known to the transport
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HciCommand {
    ControllerAndBaseband(ControllerAndBaseband),
    InformationParameters(InformationParameters),
    LEController(LEController),
}

impl HciCommand {
    /// Get the opcode for this command
    pub const fn into_opcode(self) -> u16 {
        self.into_opcode_pair().into_opcode()
    }

    /// Get the `OpCodePair` for this command
    pub const fn into_opcode_pair(self) -> OpCodePair {
        match self {
            HciCommand::ControllerAndBaseband(ocf) => ocf.into_opcode_pair(),
            HciCommand::InformationParameters(ocf) => ocf.into_opcode_pair(),
            HciCommand::LEController(ocf) => ocf.into_opcode_pair(),
        }
    }
}

impl fmt::Display for HciCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let opcode = self.into_opcode_pair();

        match self {
            HciCommand::ControllerAndBaseband(c) => write!(
                f,
                "controller and baseband - {} ({:#x}:{:#x})",
                c, opcode.ogf, opcode.ocf
            ),
            HciCommand::InformationParameters(c) => write!(
                f,
                "information parameters - {} ({:#x}:{:#x})",
                c, opcode.ogf, opcode.ocf
            ),
            HciCommand::LEController(c) => write!(f, "LE controller - {} ({:#x}:{:#x})", c, opcode.ogf, opcode.ocf),
        }
    }
}

/// An type for the pair of OGF (OpCode Group Field) and OCF (OpCode Command Field)
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct OpCodePair {
    pub ogf: u16,
    pub ocf: u16,
}

impl OpCodePair {
    /// Convert the OpCodePair into the opcode
    ///
    /// The returned value is in host byte order.
    pub const fn into_opcode(self) -> u16 {
        // The first 10 bits of the OpCode is the OCF field and the last 6 bits is the OGF field.
        (self.ocf & 0x3FFu16) | (self.ogf << 10)
    }

    /// Convert an opcode in host byte order into an OpCodePair
    pub const fn from_opcode(value: u16) -> Self {
        OpCodePair {
            ogf: value >> 10,
            ocf: value & 0x3FFu16,
        }
    }
}

impl From<HciCommand> for OpCodePair {
    fn from(cmd: HciCommand) -> OpCodePair {
        cmd.into_opcode_pair()
    }
}

impl TryFrom<OpCodePair> for HciCommand {
    type Error = OpCodeError;

    fn try_from(opc_pair: OpCodePair) -> Result<Self, Self::Error> {
        match opc_pair.ogf {
            ControllerAndBaseband::OGF => ControllerAndBaseband::try_from(opc_pair.ocf).map(Self::ControllerAndBaseband),
            InformationParameters::OGF => InformationParameters::try_from(opc_pair.ocf).map(Self::InformationParameters),
            LEController::OGF => LEController::try_from(opc_pair.ocf).map(Self::LEController),
            _ => Err(OpCodeError::UnknownGroup(opc_pair.ogf)),
        }
    }
}

impl TryFrom<u16> for HciCommand {
    type Error = OpCodeError;

    fn try_from(opcode: u16) -> Result<Self, Self::Error> {
        HciCommand::try_from(OpCodePair::from_opcode(opcode))
    }
}

/// Error for an opcode not enumerated by `HciCommand`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCodeError {
    UnknownGroup(u16),
    UnknownCommand { group: &'static str, ocf: u16 },
}

impl fmt::Display for OpCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpCodeError::UnknownGroup(ogf) => write!(f, "Unknown OpCode Group Field value: 0x{:x}", ogf),
            OpCodeError::UnknownCommand { group, ocf } => {
                write!(f, "OpCode Group Field '{}' doesn't have the Op Code Field 0x{:x}", group, ocf)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for OpCodeError {}

/// Controller and baseband commands
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[non_exhaustive]
pub enum ControllerAndBaseband {
    Reset,
}

impl ControllerAndBaseband {
    const OGF: u16 = 0x3;

    const fn into_opcode_pair(self) -> OpCodePair {
        OpCodePair {
            ogf: ControllerAndBaseband::OGF,
            ocf: match self {
                ControllerAndBaseband::Reset => 0x3,
            },
        }
    }

    fn try_from(ocf: u16) -> Result<Self, OpCodeError> {
        match ocf {
            0x3 => Ok(ControllerAndBaseband::Reset),
            _ => Err(OpCodeError::UnknownCommand {
                group: "Controller and Baseband",
                ocf,
            }),
        }
    }
}

impl fmt::Display for ControllerAndBaseband {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ControllerAndBaseband::Reset => f.write_str("reset"),
        }
    }
}

/// Informational parameter commands
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[non_exhaustive]
pub enum InformationParameters {
    ReadBufferSize,
}

impl InformationParameters {
    const OGF: u16 = 0x4;

    const fn into_opcode_pair(self) -> OpCodePair {
        OpCodePair {
            ogf: InformationParameters::OGF,
            ocf: match self {
                InformationParameters::ReadBufferSize => 0x5,
            },
        }
    }

    fn try_from(ocf: u16) -> Result<Self, OpCodeError> {
        match ocf {
            0x5 => Ok(InformationParameters::ReadBufferSize),
            _ => Err(OpCodeError::UnknownCommand {
                group: "Information Parameters",
                ocf,
            }),
        }
    }
}

impl fmt::Display for InformationParameters {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InformationParameters::ReadBufferSize => f.write_str("read buffer size"),
        }
    }
}

/// LE controller commands
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[non_exhaustive]
pub enum LEController {
    ReadBufferSize,
}

impl LEController {
    const OGF: u16 = 0x8;

    const fn into_opcode_pair(self) -> OpCodePair {
        OpCodePair {
            ogf: LEController::OGF,
            ocf: match self {
                LEController::ReadBufferSize => 0x2,
            },
        }
    }

    fn try_from(ocf: u16) -> Result<Self, OpCodeError> {
        match ocf {
            0x2 => Ok(LEController::ReadBufferSize),
            _ => Err(OpCodeError::UnknownCommand {
                group: "LE Controller",
                ocf,
            }),
        }
    }
}

impl fmt::Display for LEController {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LEController::ReadBufferSize => f.write_str("read buffer size"),
        }
    }
}
