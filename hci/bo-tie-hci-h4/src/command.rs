//! Command flow control and internal commands
//!
//! The controller limits the number of commands the host may send. Every *Command Complete* and
//! *Command Status* event contains the number of commands the controller can currently accept,
//! which the transport keeps as its *command credits*.
//!
//! The transport also sends commands of its own. The *Command Complete* event for such a command is
//! not given to the host stack, instead it is given to the callback registered with the command.

use crate::buffer::{BufferKind, MessageBuffer};
use crate::driver::{BufferProvider, ByteTransport, HostStack, PowerSignal, TraceSink};
use crate::H4;
use alloc::boxed::Box;
use alloc::collections::VecDeque;
use bo_tie_hci_util::events::{CommandCompleteData, CommandStatusData, EventPacket, Events};
use core::fmt;

type Callback<C> = Box<dyn FnOnce(&mut C, MessageBuffer)>;

struct PendingCommand<C> {
    opcode: u16,
    callback: Callback<C>,
}

/// Internal commands awaiting their *Command Complete* event
///
/// Commands complete in the order they were sent, so this is a bounded first in first out queue.
pub(crate) struct InternalCommandQueue<C> {
    records: VecDeque<PendingCommand<C>>,
    capacity: usize,
}

impl<C> InternalCommandQueue<C> {
    pub(crate) fn new(capacity: usize) -> Self {
        InternalCommandQueue {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn try_push(&mut self, opcode: u16, callback: Callback<C>) -> Result<(), Callback<C>> {
        if self.records.len() >= self.capacity {
            Err(callback)
        } else {
            self.records.push_back(PendingCommand { opcode, callback });

            Ok(())
        }
    }

    /// Pop the oldest record if it is for `opcode`
    fn pop_if(&mut self, opcode: u16) -> Option<Callback<C>> {
        match self.records.front() {
            Some(record) if record.opcode == opcode => self.records.pop_front().map(|record| record.callback),
            _ => None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop every record, returning how many were dropped
    pub(crate) fn clear(&mut self) -> usize {
        let len = self.records.len();

        self.records.clear();

        len
    }
}

/// Error returned by [`send_internal_command`](H4::send_internal_command)
///
/// The buffer of the command is returned within the error.
#[derive(Debug)]
pub enum InternalCommandError {
    QueueFull { opcode: u16, buffer: MessageBuffer },
}

impl InternalCommandError {
    /// Get back the buffer of the command
    pub fn into_buffer(self) -> MessageBuffer {
        match self {
            InternalCommandError::QueueFull { buffer, .. } => buffer,
        }
    }
}

impl fmt::Display for InternalCommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InternalCommandError::QueueFull { opcode, .. } => write!(
                f,
                "no room to queue internal command with opcode {:#06x}",
                opcode
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InternalCommandError {}

impl<T, P, H, S, W> H4<T, P, H, S, W>
where
    T: ByteTransport,
    P: BufferProvider,
    H: HostStack,
    S: TraceSink,
    W: PowerSignal,
{
    /// Send a command on behalf of the transport
    ///
    /// `buffer` must contain the command packet for `opcode`. The command is sent right away and
    /// `callback` is called with the buffer of the *Command Complete* event for the command. The
    /// event is not given to the host stack. The buffer of the command is given back to the buffer
    /// provider once it is written instead of being reported to the host stack.
    ///
    /// # Error
    /// An error is returned when the maximum number of internal commands are already awaiting their
    /// *Command Complete* event. Nothing is sent in this case.
    pub fn send_internal_command<F>(
        &mut self,
        opcode: u16,
        mut buffer: MessageBuffer,
        callback: F,
    ) -> Result<(), InternalCommandError>
    where
        F: FnOnce(&mut Self, MessageBuffer) + 'static,
    {
        if self.internal.try_push(opcode, Box::new(callback)).is_err() {
            log::error!("(H4) internal command queue is full, cannot send {:#06x}", opcode);

            return Err(InternalCommandError::QueueFull { opcode, buffer });
        }

        buffer.set_kind(BufferKind::ToControllerCommand);

        buffer.set_internal_opcode(opcode);

        self.send(buffer);

        Ok(())
    }

    /// Update the command credits and capture the *Command Complete* of an internal command
    ///
    /// The event is returned if it is not captured.
    pub(crate) fn intercept_event(&mut self, buffer: MessageBuffer) -> Option<MessageBuffer> {
        let event = match EventPacket::from_bytes(&buffer) {
            Ok(event) => event,
            Err(e) => {
                log::warn!("(H4) malformed event: {}", e);

                return Some(buffer);
            }
        };

        let completed = match event.event() {
            Some(Events::CommandComplete) => match CommandCompleteData::try_from(event) {
                Ok(data) => {
                    self.credits = data.number_of_hci_command_packets.into();

                    data.command_opcode
                }
                Err(e) => {
                    log::warn!("(H4) malformed command complete event: {}", e);

                    // the number of command packets is the first parameter
                    if let Some(&credits) = event.parameter.first() {
                        self.credits = credits.into();
                    }

                    None
                }
            },
            Some(Events::CommandStatus) => {
                match CommandStatusData::try_from(event) {
                    Ok(data) => self.credits = data.number_of_hci_command_packets.into(),
                    Err(e) => {
                        log::warn!("(H4) malformed command status event: {}", e);

                        if let Some(&credits) = event.parameter.get(1) {
                            self.credits = credits.into();
                        }
                    }
                }

                None
            }
            None => None,
        };

        if let Some(callback) = completed.and_then(|opcode| self.internal.pop_if(opcode)) {
            log::debug!("(H4) captured the command complete event of an internal command");

            callback(self, buffer);

            None
        } else {
            Some(buffer)
        }
    }
}
