//! Message buffers
//!
//! Every packet that passes through the transport, in either direction, is held within a
//! [`MessageBuffer`]. A message buffer is a [`DeVec`] with a single byte of front reserve so the
//! packet indicator can be pushed in front of a packet before it is written to the UART.

use bo_tie_core::buffer::de_vec::DeVec;
use bo_tie_core::buffer::{BufferError, TryExtend, TryFrontExtend, TryFrontRemove};
use bo_tie_hci_util::PacketIndicator;
use core::ops::{Deref, DerefMut};

/// The size of the front reserve of a freshly allocated buffer
const INDICATOR_RESERVE: usize = 1;

/// The kind of message within a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    ToControllerCommand,
    ToControllerAcl,
    ToControllerSco,
    FromControllerEvent,
    FromControllerAcl,
    FromControllerSco,
    /// A packet received from the controller that a controller should never send
    FromControllerError,
    /// An outbound ACL packet that has only been partially transmitted
    ///
    /// The buffer contains the remaining segments and can be given back to `send` to continue the
    /// transmission.
    SegmentTransmitted,
}

impl BufferKind {
    /// Get the indicator for sending a buffer of this kind to the controller
    ///
    /// `None` is returned for kinds that are not sent to the controller. A
    /// `SegmentTransmitted` buffer always contains ACL data.
    pub fn outbound_indicator(&self) -> Option<PacketIndicator> {
        match self {
            BufferKind::ToControllerCommand => Some(PacketIndicator::Command),
            BufferKind::ToControllerAcl | BufferKind::SegmentTransmitted => Some(PacketIndicator::AclData),
            BufferKind::ToControllerSco => Some(PacketIndicator::ScoData),
            _ => None,
        }
    }

    /// Get the kind for a packet received with `indicator`
    pub fn from_controller(indicator: PacketIndicator) -> Self {
        match indicator {
            PacketIndicator::Event => BufferKind::FromControllerEvent,
            PacketIndicator::AclData => BufferKind::FromControllerAcl,
            PacketIndicator::ScoData => BufferKind::FromControllerSco,
            PacketIndicator::Command => BufferKind::FromControllerError,
        }
    }
}

/// The controller an outbound ACL packet is destined for
///
/// The maximum size of the data portion of an ACL packet differs between a BR/EDR controller and a
/// LE controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerKind {
    #[default]
    BrEdr,
    Le,
}

/// A buffer containing a single HCI packet
///
/// Dereferencing a `MessageBuffer` gives the packet *without* the packet indicator. The attributes
/// of the buffer (kind, controller, fragment budget) are set by whoever fills the buffer and are
/// read by the transport.
///
/// A packet has a single owner at a time, so a `MessageBuffer` cannot be cloned.
///
/// ```compile_fail
/// # use bo_tie_hci_h4::MessageBuffer;
/// let command = MessageBuffer::command(0x0C03, &[]).unwrap();
///
/// let copy = command.clone();
/// ```
#[derive(Debug, PartialEq, Eq)]
pub struct MessageBuffer {
    kind: BufferKind,
    controller: ControllerKind,
    fragment_budget: u16,
    internal_opcode: Option<u16>,
    offset: usize,
    data: DeVec<u8>,
}

impl MessageBuffer {
    /// Create an empty buffer that can contain a packet of up to `size` bytes
    pub fn with_capacity(kind: BufferKind, size: usize) -> Self {
        MessageBuffer {
            kind,
            controller: ControllerKind::default(),
            fragment_budget: 0,
            internal_opcode: None,
            offset: 0,
            data: DeVec::with_capacity(INDICATOR_RESERVE, size),
        }
    }

    /// Create a buffer containing `packet`
    pub fn from_packet(kind: BufferKind, packet: &[u8]) -> Self {
        let mut buffer = MessageBuffer::with_capacity(kind, packet.len());

        // cannot fail, the capacity is the size of packet
        let _ = buffer.data.try_extend(packet.iter().copied());

        buffer
    }

    /// Create a buffer with a HCI command packet
    pub fn command(opcode: u16, parameter: &[u8]) -> Result<Self, BufferError> {
        let mut buffer = MessageBuffer::with_capacity(BufferKind::ToControllerCommand, 3 + parameter.len());

        buffer.rewrite_as_command(opcode, parameter)?;

        Ok(buffer)
    }

    /// Clear this buffer and fill it with a HCI command packet
    ///
    /// The capacity of the buffer is grown if the command does not fit. Every attribute of the
    /// buffer is reset.
    pub fn rewrite_as_command(&mut self, opcode: u16, parameter: &[u8]) -> Result<(), BufferError> {
        let len: u8 = parameter.len().try_into().map_err(|_| BufferError::CapacityExceeded)?;

        let size = (3 + parameter.len()).max(self.capacity());

        self.reset(BufferKind::ToControllerCommand, size);

        self.data.try_extend(opcode.to_le_bytes())?;
        self.data.try_extend_one(len)?;
        self.data.try_extend(parameter.iter().copied())
    }

    /// Clear the buffer so that it can contain a packet of up to `size` bytes
    pub(crate) fn reset(&mut self, kind: BufferKind, size: usize) {
        self.data.clear_with_capacity(INDICATOR_RESERVE, size);

        self.kind = kind;
        self.controller = ControllerKind::default();
        self.fragment_budget = 0;
        self.internal_opcode = None;
        self.offset = 0;
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: BufferKind) {
        self.kind = kind
    }

    pub fn controller(&self) -> ControllerKind {
        self.controller
    }

    pub fn set_controller(&mut self, controller: ControllerKind) {
        self.controller = controller
    }

    /// Get the fragment budget
    ///
    /// When this is non-zero, sending an ACL packet stops after this many segments are written. See
    /// the method `send` of [`H4`](crate::H4).
    pub fn fragment_budget(&self) -> u16 {
        self.fragment_budget
    }

    pub fn set_fragment_budget(&mut self, budget: u16) {
        self.fragment_budget = budget
    }

    /// Get the opcode of the internal command this buffer was sent as
    ///
    /// This is only set for commands issued by the transport itself.
    pub fn internal_opcode(&self) -> Option<u16> {
        self.internal_opcode
    }

    pub(crate) fn set_internal_opcode(&mut self, opcode: u16) {
        self.internal_opcode = Some(opcode)
    }

    /// Get the offset of the current packet from the start of the buffer
    ///
    /// This is zero until a segmented transmission advances past the segments already written.
    pub fn payload_offset(&self) -> usize {
        self.offset
    }

    /// Get the maximum number of bytes this buffer can contain
    pub fn capacity(&self) -> usize {
        self.data.len() + self.data.back_capacity()
    }

    /// Get the number of bytes that can still be added to this buffer
    pub fn remaining_capacity(&self) -> usize {
        self.data.back_capacity()
    }

    /// Fill the back of the buffer by a closure
    ///
    /// See [`DeVec::try_extend_with`].
    pub(crate) fn fill_with<F>(&mut self, max: usize, fill: F) -> Result<usize, BufferError>
    where
        F: FnOnce(&mut [u8]) -> usize,
    {
        self.data.try_extend_with(max, fill)
    }

    /// Move the start of the buffer forward by `how_many` bytes
    ///
    /// The removed bytes stay within the front reserve, so they can be overwritten with a new
    /// header.
    pub(crate) fn advance(&mut self, how_many: usize) -> Result<(), BufferError> {
        self.data.try_front_remove(how_many)?;

        self.offset += how_many;

        Ok(())
    }

    /// Call `f` with the first `len` bytes of the packet prefixed with `indicator`
    ///
    /// The indicator is pushed into the front reserve for the duration of the call.
    pub(crate) fn with_indicator<F, R>(&mut self, indicator: PacketIndicator, len: usize, f: F) -> Result<R, BufferError>
    where
        F: FnOnce(&[u8]) -> R,
    {
        let len = len.min(self.data.len());

        self.data.try_front_extend_one(indicator.val())?;

        let ret = f(&self.data[..=len]);

        self.data.try_front_pop();

        Ok(ret)
    }
}

impl Deref for MessageBuffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl DerefMut for MessageBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data
    }
}

impl TryExtend<u8> for MessageBuffer {
    type Error = BufferError;

    fn try_extend<T>(&mut self, iter: T) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = u8>,
    {
        self.data.try_extend(iter)
    }
}
