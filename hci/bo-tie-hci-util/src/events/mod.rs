//! HCI events
//!
//! Only the events that carry command flow control information are parsed here. Every other event
//! is passed through the transport untouched, but an [`EventPacket`] can still be used to look at
//! the event code and parameter of any event.

use bo_tie_core::errors::Error;
use core::fmt;

/// "chews-off" and returns a slice of size $size from the beginning of $packet.
///
/// Invoking this with only one parameter returns an u8, otherwise a reference to a slice is
/// returned. The enclosing function returns `EventParameterError::PacketTooSmall` if $packet is
/// too short.
macro_rules! chew {
    ( $packet:ident, $size:expr ) => {{
        let size = $size as usize;
        let chewed = $packet.get(..size).ok_or(EventParameterError::PacketTooSmall)?;
        $packet = &$packet[size..];
        chewed
    }};
    ( $packet:ident ) => {{
        let chewed_byte = *$packet.first().ok_or(EventParameterError::PacketTooSmall)?;
        $packet = &$packet[1..];
        chewed_byte
    }};
}

macro_rules! chew_u16 {
    ($packet:ident) => {{
        let chewed = chew!($packet, 2);
        <u16>::from_le_bytes([chewed[0], chewed[1]])
    }};
}

/// The event codes the transport looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Events {
    CommandComplete,
    CommandStatus,
}

impl Events {
    pub fn try_from_event_code(code: u8) -> Option<Self> {
        match code {
            0x0E => Some(Events::CommandComplete),
            0x0F => Some(Events::CommandStatus),
            _ => None,
        }
    }
}

/// Error when parsing an event parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventParameterError {
    PacketTooSmall,
    UnexpectedEvent(u8),
}

impl fmt::Display for EventParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventParameterError::PacketTooSmall => f.write_str("event parameter is too small"),
            EventParameterError::UnexpectedEvent(code) => write!(f, "unexpected event code {:#x}", code),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EventParameterError {}

/// A raw HCI event packet
///
/// This is the event code, the parameter length, and the parameter. The parameter is limited to
/// the length declared within the packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventPacket<'a> {
    pub event_code: u8,
    pub parameter: &'a [u8],
}

impl<'a> EventPacket<'a> {
    pub fn from_bytes(mut packet: &'a [u8]) -> Result<Self, EventParameterError> {
        let event_code = chew!(packet);

        let len = chew!(packet);

        let parameter = chew!(packet, len);

        Ok(EventPacket { event_code, parameter })
    }

    pub fn event(&self) -> Option<Events> {
        Events::try_from_event_code(self.event_code)
    }
}

/// The parameter of a *Command Complete* event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandCompleteData<'a> {
    pub number_of_hci_command_packets: u8,
    /// This is `None` when the opcode is zero. A zero opcode is used by the controller to only
    /// update the number of command packets.
    pub command_opcode: Option<u16>,
    pub return_parameter: &'a [u8],
}

impl<'a> TryFrom<&'a [u8]> for CommandCompleteData<'a> {
    type Error = EventParameterError;

    fn try_from(mut packet: &'a [u8]) -> Result<Self, Self::Error> {
        let number_of_hci_command_packets = chew!(packet);

        let opcode = chew_u16!(packet);

        Ok(CommandCompleteData {
            number_of_hci_command_packets,
            command_opcode: if opcode != 0 { Some(opcode) } else { None },
            return_parameter: packet,
        })
    }
}

impl<'a> TryFrom<EventPacket<'a>> for CommandCompleteData<'a> {
    type Error = EventParameterError;

    fn try_from(event: EventPacket<'a>) -> Result<Self, Self::Error> {
        match event.event() {
            Some(Events::CommandComplete) => Self::try_from(event.parameter),
            _ => Err(EventParameterError::UnexpectedEvent(event.event_code)),
        }
    }
}

/// The parameter of a *Command Status* event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatusData {
    pub status: Error,
    pub number_of_hci_command_packets: u8,
    pub command_opcode: Option<u16>,
}

impl TryFrom<&[u8]> for CommandStatusData {
    type Error = EventParameterError;

    fn try_from(mut packet: &[u8]) -> Result<Self, Self::Error> {
        let status = Error::from(chew!(packet));

        let number_of_hci_command_packets = chew!(packet);

        let opcode = chew_u16!(packet);

        Ok(CommandStatusData {
            status,
            number_of_hci_command_packets,
            command_opcode: if opcode != 0 { Some(opcode) } else { None },
        })
    }
}

impl<'a> TryFrom<EventPacket<'a>> for CommandStatusData {
    type Error = EventParameterError;

    fn try_from(event: EventPacket<'a>) -> Result<Self, Self::Error> {
        match event.event() {
            Some(Events::CommandStatus) => Self::try_from(event.parameter),
            _ => Err(EventParameterError::UnexpectedEvent(event.event_code)),
        }
    }
}

/// The leading part of the return parameter of the *Read Buffer Size* and *LE Read Buffer Size*
/// commands
///
/// Both commands return the status followed by the maximum length of the data portion of a HCI ACL
/// data packet. The rest of their return parameters are not needed by the transport. The status is
/// kept even when the return parameter is truncated so that a failure can still be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AclDataLengthReturn {
    pub status: Error,
    pub acl_data_packet_length: Option<u16>,
}

impl From<&[u8]> for AclDataLengthReturn {
    fn from(return_parameter: &[u8]) -> Self {
        let status = Error::from(return_parameter.first().copied());

        let acl_data_packet_length = return_parameter
            .get(1..3)
            .filter(|_| status.is_success())
            .map(|len| <u16>::from_le_bytes([len[0], len[1]]));

        AclDataLengthReturn {
            status,
            acl_data_packet_length,
        }
    }
}
