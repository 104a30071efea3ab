//! Recombination of ACL data segments
//!
//! A controller sends a L2CAP PDU larger than its ACL data size as a *start* segment followed by
//! *continuation* segments. The start segment contains the L2CAP header, so its length field is
//! used to allocate a buffer large enough for the entire PDU. Every continuation is appended to
//! this buffer (the *base*) and the length field of the base's HCI header is increased by the
//! length of the continuation. The base is parked until it contains the entire PDU.
//!
//! There is at most one parked base per connection handle.

use crate::buffer::MessageBuffer;
use crate::driver::{BufferProvider, ByteTransport, Direction, HostStack, PowerSignal, TraceSink};
use crate::recv::{Body, Inbound, Preamble};
use crate::H4;
use alloc::vec::Vec;
use bo_tie_hci_util::{AclHeader, AclPacketBoundary, ConnectionHandle, PacketIndicator};

/// The size of the length field of the L2CAP header
const L2CAP_LENGTH_SIZE: usize = 2;

/// Information on the ACL segment being received
pub(crate) struct AclSegment {
    handle: ConnectionHandle,
    /// The offset of the continuation within the base, `None` for a start segment
    continuation_offset: Option<usize>,
}

struct Parked {
    handle: ConnectionHandle,
    buffer: MessageBuffer,
}

/// The bases awaiting more continuation segments
pub(crate) struct AclReassembly {
    parked: Vec<Parked>,
}

impl AclReassembly {
    pub(crate) fn new() -> Self {
        AclReassembly { parked: Vec::new() }
    }

    fn take(&mut self, handle: ConnectionHandle) -> Option<MessageBuffer> {
        let index = self.parked.iter().position(|parked| parked.handle == handle)?;

        Some(self.parked.swap_remove(index).buffer)
    }

    fn park(&mut self, handle: ConnectionHandle, buffer: MessageBuffer) {
        debug_assert!(self.parked.iter().all(|parked| parked.handle != handle));

        self.parked.push(Parked { handle, buffer })
    }

    pub(crate) fn len(&self) -> usize {
        self.parked.len()
    }

    pub(crate) fn drain(&mut self) -> impl Iterator<Item = MessageBuffer> + '_ {
        self.parked.drain(..).map(|parked| parked.buffer)
    }
}

fn l2cap_length(packet: &[u8]) -> usize {
    packet
        .get(AclHeader::SIZE..AclHeader::SIZE + L2CAP_LENGTH_SIZE)
        .map_or(0, |len| <u16>::from_le_bytes([len[0], len[1]]).into())
}

impl<T, P, H, S, W> H4<T, P, H, S, W>
where
    T: ByteTransport,
    P: BufferProvider,
    H: HostStack,
    S: TraceSink,
    W: PowerSignal,
{
    /// Check if the L2CAP length must be read before the buffer is allocated
    ///
    /// The preamble is extended to include the L2CAP length when it is the HCI header of a start
    /// segment that is long enough to contain it.
    pub(crate) fn needs_l2cap_length(&self, preamble: &mut Preamble) -> bool {
        if preamble.bytes().len() != AclHeader::SIZE {
            return false;
        }

        match AclHeader::from_bytes(preamble.bytes()) {
            Some(header)
                if header.packet_boundary_flag != AclPacketBoundary::ContinuingFragment
                    && usize::from(header.data_length) >= L2CAP_LENGTH_SIZE =>
            {
                preamble.extend(L2CAP_LENGTH_SIZE);

                true
            }
            _ => false,
        }
    }

    /// Get a buffer for an ACL segment
    ///
    /// A start segment is given a new buffer and continuations are given the parked base for their
    /// connection handle.
    pub(crate) fn acl_segment_start(&mut self, preamble: &[u8]) -> Body {
        let Some(header) = AclHeader::from_bytes(preamble) else {
            return Body::Discard(0);
        };

        let remaining = usize::from(header.data_length).saturating_sub(preamble.len() - AclHeader::SIZE);

        let handle = match header.connection_handle() {
            Ok(handle) => handle,
            Err(e) => {
                log::warn!("(H4) dropping ACL segment: {}", e);

                return Body::Discard(remaining);
            }
        };

        let pending = self.reassembly.take(handle);

        if header.packet_boundary_flag == AclPacketBoundary::ContinuingFragment {
            return self.acl_continuation(handle, header, pending, remaining);
        }

        if let Some(stale) = pending {
            log::warn!(
                "(H4) new L2CAP PDU started on handle {:#x}, dropping the incomplete PDU",
                handle
            );

            self.provider.free(stale);
        }

        let pdu_size = l2cap_length(preamble) + AclHeader::SIZE + AclHeader::L2CAP_HEADER_SIZE;

        let size = pdu_size.max(preamble.len() + remaining);

        match self.start_inbound(PacketIndicator::AclData, size, preamble) {
            Some(buffer) => Body::Receive(
                Inbound {
                    indicator: PacketIndicator::AclData,
                    buffer,
                    segment: Some(AclSegment {
                        handle,
                        continuation_offset: None,
                    }),
                },
                remaining,
            ),
            None => Body::Discard(remaining),
        }
    }

    fn acl_continuation(
        &mut self,
        handle: ConnectionHandle,
        header: AclHeader,
        pending: Option<MessageBuffer>,
        remaining: usize,
    ) -> Body {
        let Some(mut base) = pending else {
            log::warn!("(H4) dropping ACL continuation on handle {:#x} without a start", handle);

            return Body::Discard(remaining);
        };

        let base_length = AclHeader::from_bytes(&base).map(|base_header| base_header.data_length);

        match base_length.and_then(|len| len.checked_add(header.data_length)) {
            Some(total) if remaining <= base.remaining_capacity() => {
                base[2..AclHeader::SIZE].copy_from_slice(&total.to_le_bytes());

                let continuation_offset = Some(base.len());

                log::trace!("(H4) continuing L2CAP PDU on handle {:#x}", handle);

                Body::Receive(
                    Inbound {
                        indicator: PacketIndicator::AclData,
                        buffer: base,
                        segment: Some(AclSegment {
                            handle,
                            continuation_offset,
                        }),
                    },
                    remaining,
                )
            }
            _ => {
                log::warn!(
                    "(H4) ACL continuation on handle {:#x} is larger than the L2CAP PDU, dropping the PDU",
                    handle
                );

                self.provider.free(base);

                Body::Discard(remaining)
            }
        }
    }

    /// Finish the reception of an ACL segment
    ///
    /// The buffer is returned if it contains a complete L2CAP PDU, otherwise it is parked.
    pub(crate) fn acl_frame_end(&mut self, mut buffer: MessageBuffer, segment: AclSegment) -> Option<MessageBuffer> {
        let hci_length = AclHeader::from_bytes(&buffer).map_or(0, |header| header.data_length);

        // the L2CAP header itself may be split across segments
        let complete = hci_length == 0
            || buffer
                .len()
                .checked_sub(AclHeader::SIZE + AclHeader::L2CAP_HEADER_SIZE)
                .map_or(false, |received| l2cap_length(&buffer) <= received);

        self.trace_acl_segment(&mut buffer, segment.continuation_offset);

        if complete {
            Some(buffer)
        } else {
            self.reassembly.park(segment.handle, buffer);

            None
        }
    }

    /// Trace only the last received segment
    ///
    /// For a continuation a HCI header for the segment is temporarily written over the bytes
    /// before it.
    fn trace_acl_segment(&mut self, buffer: &mut MessageBuffer, continuation_offset: Option<usize>) {
        let Some(offset) = continuation_offset else {
            self.trace.capture(PacketIndicator::AclData, buffer, Direction::Inbound);

            return;
        };

        let (Some(header_start), Some(base_header)) =
            (offset.checked_sub(AclHeader::SIZE), AclHeader::from_bytes(buffer))
        else {
            return;
        };

        let segment_header = AclHeader {
            packet_boundary_flag: AclPacketBoundary::ContinuingFragment,
            data_length: (buffer.len() - offset).try_into().unwrap_or(u16::MAX),
            ..base_header
        };

        let mut overwritten = [0u8; AclHeader::SIZE];

        overwritten.copy_from_slice(&buffer[header_start..offset]);

        buffer[header_start..offset].copy_from_slice(&segment_header.to_bytes());

        self.trace
            .capture(PacketIndicator::AclData, &buffer[header_start..], Direction::Inbound);

        buffer[header_start..offset].copy_from_slice(&overwritten);
    }
}
