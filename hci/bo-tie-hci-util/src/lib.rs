//! Common items for the host controller interface
//!
//! This crate carries the parts of the HCI that are used by the H4 transport and by anything
//! sitting on top of it: connection handles, the packet indicator that prefixes every packet on a
//! UART, the flags within the header of a HCI ACL data packet, command opcodes, and the parsing of
//! the command events that carry flow control information.
//!
//! # Packet Indicator
//! HCI packets contain no marker within them to indicate what kind of packet they are. When the
//! packets are sent over a UART a single byte [`PacketIndicator`] is put in front of every packet.
//! The indicator is followed by the *preamble* of the packet, this is the part of the packet header
//! that ends with the length of the rest of the packet.
//!
//! | Packet  | Indicator | Preamble                            |
//! |---------|-----------|-------------------------------------|
//! | Command | 0x01      | opcode (2), parameter length (1)    |
//! | ACL     | 0x02      | handle and flags (2), length (2)    |
//! | SCO     | 0x03      | handle and flags (2), length (1)    |
//! | Event   | 0x04      | event code (1), parameter length (1)|

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![cfg_attr(all(not(feature = "std"), not(test)), no_std)]

pub mod events;
pub mod opcodes;

use core::fmt;

/// The connection handle
///
/// This is used as an identifier of a connection by both the host and controller. Its created by
/// the controller when a connection is established between this device and another device.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct ConnectionHandle {
    handle: u16,
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.handle)
    }
}

impl fmt::LowerHex for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::LowerHex::fmt(&self.handle, f)
    }
}

impl fmt::UpperHex for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::UpperHex::fmt(&self.handle, f)
    }
}

impl ConnectionHandle {
    pub const MAX: u16 = 0x0EFF;

    const ERROR: &'static str = "Raw connection handle value larger then the maximum (0x0EFF)";
}

impl TryFrom<u16> for ConnectionHandle {
    type Error = &'static str;

    fn try_from(raw: u16) -> Result<Self, Self::Error> {
        if raw <= ConnectionHandle::MAX {
            Ok(ConnectionHandle { handle: raw })
        } else {
            Err(Self::ERROR)
        }
    }
}

/// The packet indicator of the UART transport
///
/// This is the byte put in front of every HCI packet sent over a UART (the *H4* transport). It is
/// the only way for the receiver to know what kind of HCI packet follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketIndicator {
    Command,
    AclData,
    ScoData,
    Event,
}

impl PacketIndicator {
    /// Get the raw value of the indicator
    pub const fn val(&self) -> u8 {
        match self {
            PacketIndicator::Command => 0x01,
            PacketIndicator::AclData => 0x02,
            PacketIndicator::ScoData => 0x03,
            PacketIndicator::Event => 0x04,
        }
    }

    /// Get the size of the preamble
    ///
    /// The preamble is the part of the packet header up to and including the length field.
    pub const fn preamble_len(&self) -> usize {
        match self {
            PacketIndicator::Command => 3,
            PacketIndicator::AclData => 4,
            PacketIndicator::ScoData => 3,
            PacketIndicator::Event => 2,
        }
    }

    /// Get the length of the rest of the packet from a complete preamble
    ///
    /// `None` is returned if `preamble` is shorter than the preamble for this kind of packet.
    pub fn body_len(&self, preamble: &[u8]) -> Option<usize> {
        match self {
            PacketIndicator::AclData => preamble
                .get(2..4)
                .map(|len| <u16>::from_le_bytes([len[0], len[1]]).into()),
            _ => preamble.get(self.preamble_len() - 1).map(|len| (*len).into()),
        }
    }
}

impl fmt::Display for PacketIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketIndicator::Command => f.write_str("command"),
            PacketIndicator::AclData => f.write_str("ACL data"),
            PacketIndicator::ScoData => f.write_str("SCO data"),
            PacketIndicator::Event => f.write_str("event"),
        }
    }
}

impl TryFrom<u8> for PacketIndicator {
    type Error = UnknownPacketIndicator;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            1 => Ok(PacketIndicator::Command),
            2 => Ok(PacketIndicator::AclData),
            3 => Ok(PacketIndicator::ScoData),
            4 => Ok(PacketIndicator::Event),
            _ => Err(UnknownPacketIndicator(byte)),
        }
    }
}

/// Error for an invalid packet indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownPacketIndicator(pub u8);

impl fmt::Display for UnknownPacketIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid packet indicator {:#x}", self.0)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UnknownPacketIndicator {}

/// The packet boundary flag
///
/// The packet boundary flag is a two bit flag within the HCI ACL data packet. It is used for
/// recombining the fragments of a L2CAP PDU.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AclPacketBoundary {
    FirstNonFlushable,
    ContinuingFragment,
    FirstAutoFlushable,
    CompleteL2capPdu,
}

impl AclPacketBoundary {
    /// Get the value shifted into the correct place of the Packet Boundary Flag in the HCI ACL
    /// data packet. The returned value is in host byte order.
    pub fn get_shifted_val(&self) -> u16 {
        (match self {
            AclPacketBoundary::FirstNonFlushable => 0x0,
            AclPacketBoundary::ContinuingFragment => 0x1,
            AclPacketBoundary::FirstAutoFlushable => 0x2,
            AclPacketBoundary::CompleteL2capPdu => 0x3,
        }) << 12
    }

    /// Get the `AclPacketBoundary` from the first 16 bits of a HCI ACL data packet. The input
    /// `val` does not need to be masked to only include the Packet Boundary Flag, however it does
    /// need to be in host byte order.
    pub fn from_shifted_val(val: u16) -> Self {
        match (val >> 12) & 3 {
            0x0 => AclPacketBoundary::FirstNonFlushable,
            0x1 => AclPacketBoundary::ContinuingFragment,
            0x2 => AclPacketBoundary::FirstAutoFlushable,
            _ => AclPacketBoundary::CompleteL2capPdu,
        }
    }
}

/// The broadcast flag
///
/// All ACL data packets to and from a LE controller have `NoBroadcast` set as the flag.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AclBroadcastFlag {
    /// Point-to-point message
    NoBroadcast,
    /// Broadcast to all active slaves
    BrEdrBroadcast,
    /// Reserved values
    Reserved(u8),
}

impl AclBroadcastFlag {
    pub fn get_shifted_val(&self) -> u16 {
        (match self {
            AclBroadcastFlag::NoBroadcast => 0x0,
            AclBroadcastFlag::BrEdrBroadcast => 0x1,
            AclBroadcastFlag::Reserved(val) => (*val & 3).into(),
        }) << 14
    }

    pub fn from_shifted_val(val: u16) -> Self {
        match (val >> 14) & 3 {
            0x0 => AclBroadcastFlag::NoBroadcast,
            0x1 => AclBroadcastFlag::BrEdrBroadcast,
            reserved => AclBroadcastFlag::Reserved(reserved as u8),
        }
    }
}

/// The header of a HCI ACL data packet
///
/// The raw handle is kept as it appears on the interface (the lower twelve bits of the first two
/// bytes). Use [`connection_handle`](AclHeader::connection_handle) to validate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AclHeader {
    pub raw_handle: u16,
    pub packet_boundary_flag: AclPacketBoundary,
    pub broadcast_flag: AclBroadcastFlag,
    pub data_length: u16,
}

impl AclHeader {
    /// The size of the header of a HCI ACL data packet
    pub const SIZE: usize = 4;

    /// The size of the basic L2CAP header (length and channel identifier)
    pub const L2CAP_HEADER_SIZE: usize = 4;

    /// Get the header from the first four bytes of a HCI ACL data packet
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let first_2_bytes = <u16>::from_le_bytes([*bytes.get(0)?, *bytes.get(1)?]);

        let data_length = <u16>::from_le_bytes([*bytes.get(2)?, *bytes.get(3)?]);

        Some(AclHeader {
            raw_handle: first_2_bytes & 0xFFF,
            packet_boundary_flag: AclPacketBoundary::from_shifted_val(first_2_bytes),
            broadcast_flag: AclBroadcastFlag::from_shifted_val(first_2_bytes),
            data_length,
        })
    }

    /// Convert into the four header bytes
    pub fn to_bytes(&self) -> [u8; 4] {
        let first_2_bytes = (self.raw_handle & 0xFFF)
            | self.packet_boundary_flag.get_shifted_val()
            | self.broadcast_flag.get_shifted_val();

        let mut bytes = [0u8; 4];

        bytes[..2].copy_from_slice(&first_2_bytes.to_le_bytes());

        bytes[2..].copy_from_slice(&self.data_length.to_le_bytes());

        bytes
    }

    /// Validate the raw handle
    pub fn connection_handle(&self) -> Result<ConnectionHandle, &'static str> {
        ConnectionHandle::try_from(self.raw_handle)
    }
}
