//! Parsing the byte stream from the controller
//!
//! The receiver is a state machine fed one byte at a time. Once the preamble of a packet is known
//! a buffer is allocated for the entire packet and the rest of it is read in bulk directly into the
//! buffer.

use crate::buffer::{BufferKind, MessageBuffer};
use crate::driver::{BufferProvider, ByteTransport, Direction, HostStack, PowerSignal, TraceSink};
use crate::reassembly::AclSegment;
use crate::H4;
use bo_tie_core::buffer::TryExtend;
use bo_tie_hci_util::PacketIndicator;

/// The size of the longest preamble
///
/// This is the ACL preamble plus the length field of the L2CAP header.
const MAX_PREAMBLE: usize = 6;

/// The state of the receiver
#[derive(Default)]
pub(crate) enum RxState {
    #[default]
    AwaitType,
    AwaitPreamble(Preamble),
    AwaitBody {
        inbound: Inbound,
        remaining: usize,
    },
    Discarding {
        remaining: usize,
    },
}

impl RxState {
    fn discard(remaining: usize) -> Self {
        if remaining == 0 {
            RxState::AwaitType
        } else {
            RxState::Discarding { remaining }
        }
    }

    /// Get the buffer of a partially received packet
    pub(crate) fn into_buffer(self) -> Option<MessageBuffer> {
        match self {
            RxState::AwaitBody { inbound, .. } => Some(inbound.buffer),
            _ => None,
        }
    }
}

/// The preamble of the packet being received
pub(crate) struct Preamble {
    indicator: PacketIndicator,
    bytes: [u8; MAX_PREAMBLE],
    count: usize,
    expected: usize,
}

impl Preamble {
    fn new(indicator: PacketIndicator) -> Self {
        Preamble {
            indicator,
            bytes: [0; MAX_PREAMBLE],
            count: 0,
            expected: indicator.preamble_len(),
        }
    }

    fn push(&mut self, byte: u8) {
        self.bytes[self.count] = byte;
        self.count += 1;
    }

    fn is_complete(&self) -> bool {
        self.count == self.expected
    }

    /// Expect `more` bytes than the preamble length
    pub(crate) fn extend(&mut self, more: usize) {
        self.expected = (self.expected + more).min(MAX_PREAMBLE)
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.bytes[..self.count]
    }
}

/// A packet being received
pub(crate) struct Inbound {
    pub(crate) indicator: PacketIndicator,
    pub(crate) buffer: MessageBuffer,
    /// Set for ACL data
    pub(crate) segment: Option<AclSegment>,
}

/// What to do with the bytes that follow the preamble
pub(crate) enum Body {
    Receive(Inbound, usize),
    Discard(usize),
}

impl<T, P, H, S, W> H4<T, P, H, S, W>
where
    T: ByteTransport,
    P: BufferProvider,
    H: HostStack,
    S: TraceSink,
    W: PowerSignal,
{
    /// Receive bytes from the controller
    ///
    /// This reads from the transport until it returns zero bytes. Every packet completed by the
    /// read bytes is given to the host stack, unless it is the *Command Complete* event of an
    /// internal command. The number of bytes read is returned.
    ///
    /// A byte that is not a valid packet indicator is logged and dropped. Bytes of a packet that
    /// could not be allocated a buffer are read and dropped.
    pub fn receive(&mut self) -> usize {
        let mut byte = [0u8; 1];
        let mut total = 0;

        while self.transport.read(&mut byte) != 0 {
            total += 1;

            self.receiver = match core::mem::take(&mut self.receiver) {
                RxState::AwaitType => self.packet_start(byte[0]),
                RxState::AwaitPreamble(preamble) => self.preamble_byte(preamble, byte[0]),
                RxState::AwaitBody { inbound, remaining } => self.body_byte(inbound, remaining, byte[0], &mut total),
                RxState::Discarding { remaining } => RxState::discard(remaining - 1),
            };
        }

        total
    }

    fn packet_start(&mut self, byte: u8) -> RxState {
        match PacketIndicator::try_from(byte) {
            Ok(indicator) => RxState::AwaitPreamble(Preamble::new(indicator)),
            Err(e) => {
                log::error!("(H4) {}, dropping byte", e);

                RxState::AwaitType
            }
        }
    }

    fn preamble_byte(&mut self, mut preamble: Preamble, byte: u8) -> RxState {
        preamble.push(byte);

        if !preamble.is_complete() {
            return RxState::AwaitPreamble(preamble);
        }

        let body = match preamble.indicator {
            PacketIndicator::AclData => {
                if self.needs_l2cap_length(&mut preamble) {
                    return RxState::AwaitPreamble(preamble);
                }

                self.acl_segment_start(preamble.bytes())
            }
            indicator => self.packet_body(indicator, preamble.bytes()),
        };

        match body {
            Body::Receive(inbound, 0) => {
                self.packet_complete(inbound);

                RxState::AwaitType
            }
            Body::Receive(inbound, remaining) => RxState::AwaitBody { inbound, remaining },
            Body::Discard(remaining) => RxState::discard(remaining),
        }
    }

    fn packet_body(&mut self, indicator: PacketIndicator, preamble: &[u8]) -> Body {
        let remaining = indicator.body_len(preamble).unwrap_or_default();

        match self.start_inbound(indicator, preamble.len() + remaining, preamble) {
            Some(buffer) => Body::Receive(
                Inbound {
                    indicator,
                    buffer,
                    segment: None,
                },
                remaining,
            ),
            None => Body::Discard(remaining),
        }
    }

    /// Allocate a buffer for a received packet and copy the preamble to it
    pub(crate) fn start_inbound(&mut self, indicator: PacketIndicator, size: usize, preamble: &[u8]) -> Option<MessageBuffer> {
        let Some(mut buffer) = self.provider.alloc(BufferKind::from_controller(indicator), size) else {
            log::error!("(H4) failed to allocate {} bytes for a {} packet", size, indicator);

            return None;
        };

        if buffer.remaining_capacity() < size {
            log::error!("(H4) allocated buffer is too small for a {} packet of {} bytes", indicator, size);

            self.provider.free(buffer);

            return None;
        }

        buffer.set_kind(BufferKind::from_controller(indicator));

        // cannot fail, the remaining capacity was checked
        let _ = buffer.try_extend(preamble.iter().copied());

        Some(buffer)
    }

    fn body_byte(&mut self, mut inbound: Inbound, remaining: usize, byte: u8, total: &mut usize) -> RxState {
        if let Err(e) = inbound.buffer.try_extend_one(byte) {
            log::warn!("(H4) {} packet overflows its buffer: {}", inbound.indicator, e);

            self.provider.free(inbound.buffer);

            return RxState::discard(remaining - 1);
        }

        let mut remaining = remaining - 1;

        let max = remaining.min(inbound.buffer.remaining_capacity());

        if max != 0 {
            let transport = &mut self.transport;

            let read = inbound
                .buffer
                .fill_with(max, |buf| transport.read(buf))
                .unwrap_or_default();

            *total += read;

            remaining -= read;
        }

        if remaining == 0 {
            self.packet_complete(inbound);

            RxState::AwaitType
        } else {
            RxState::AwaitBody { inbound, remaining }
        }
    }

    fn packet_complete(&mut self, inbound: Inbound) {
        let buffer = match inbound.segment {
            Some(segment) => match self.acl_frame_end(inbound.buffer, segment) {
                Some(buffer) => buffer,
                None => return,
            },
            None => {
                self.trace.capture(inbound.indicator, &inbound.buffer, Direction::Inbound);

                inbound.buffer
            }
        };

        if buffer.kind() == BufferKind::FromControllerError {
            log::warn!("(H4) received a command packet from the controller");
        }

        let buffer = if buffer.kind() == BufferKind::FromControllerEvent {
            match self.intercept_event(buffer) {
                Some(buffer) => buffer,
                None => return,
            }
        } else {
            buffer
        };

        self.host.on_data(buffer)
    }
}
