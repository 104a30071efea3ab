//! Sending packets to the controller

use crate::buffer::{BufferKind, MessageBuffer};
use crate::driver::{BufferProvider, ByteTransport, Direction, HostStack, PowerSignal, TraceSink, TxStatus};
use crate::H4;
use bo_tie_hci_util::{AclHeader, AclPacketBoundary, PacketIndicator};

impl<T, P, H, S, W> H4<T, P, H, S, W>
where
    T: ByteTransport,
    P: BufferProvider,
    H: HostStack,
    S: TraceSink,
    W: PowerSignal,
{
    /// Send a packet to the controller
    ///
    /// The buffer is written with the packet indicator for its kind and then given back to the
    /// host stack through [`HostStack::on_tx_result`].
    ///
    /// # ACL Data
    /// An ACL packet larger than the ACL data size of its controller is split into segments. The
    /// first segment keeps the header of the packet and every following segment is given a header
    /// with the same connection handle and the continuing fragment flag. The length field of every
    /// header is set to the size of its segment.
    ///
    /// If the buffer has a non-zero fragment budget only that many segments are written. The
    /// buffer is then given back to the host stack as a `SegmentTransmitted` buffer containing the
    /// unsent segments, and it can be given to `send` again to continue the transmission.
    ///
    /// # Commands
    /// Every sent command consumes a command credit. The buffer of an internal command is freed
    /// instead of given back to the host stack.
    pub fn send(&mut self, mut buffer: MessageBuffer) {
        self.power.wake();

        let Some(indicator) = buffer.kind().outbound_indicator() else {
            log::error!("(H4) a buffer of kind {:?} cannot be sent to the controller", buffer.kind());

            self.host.on_tx_result(buffer, TxStatus::Rejected);

            self.power.tx_done(true);

            return;
        };

        if indicator == PacketIndicator::AclData && !self.write_acl_segments(&mut buffer) {
            buffer.set_kind(BufferKind::SegmentTransmitted);

            self.host.on_tx_result(buffer, TxStatus::Fragment);

            self.power.tx_done(false);

            return;
        }

        let len = buffer.len();

        self.write_packet(indicator, &mut buffer, len);

        if indicator == PacketIndicator::Command {
            self.command_sent(buffer)
        } else {
            self.host.on_tx_result(buffer, TxStatus::Success)
        }

        self.power.tx_done(true);
    }

    /// Write every segment but the last one
    ///
    /// `false` is returned if the fragment budget ran out before the last segment.
    fn write_acl_segments(&mut self, buffer: &mut MessageBuffer) -> bool {
        let data_size = self.data_sizes.for_controller(buffer.controller());

        let packet_size = usize::from(data_size) + AclHeader::SIZE;

        if data_size == 0 || buffer.len() <= packet_size {
            return true;
        }

        let Some(header) = AclHeader::from_bytes(buffer) else {
            return true;
        };

        buffer[..AclHeader::SIZE].copy_from_slice(
            &AclHeader {
                data_length: data_size,
                ..header
            }
            .to_bytes(),
        );

        while buffer.len() > packet_size {
            self.write_packet(PacketIndicator::AclData, buffer, packet_size);

            if buffer.advance(data_size.into()).is_err() {
                return true;
            }

            let data_length = (buffer.len() - AclHeader::SIZE).min(data_size.into()) as u16;

            let continuation = AclHeader {
                packet_boundary_flag: AclPacketBoundary::ContinuingFragment,
                data_length,
                ..header
            };

            buffer[..AclHeader::SIZE].copy_from_slice(&continuation.to_bytes());

            match buffer.fragment_budget() {
                0 => (),
                1 => {
                    buffer.set_fragment_budget(0);

                    log::trace!("(H4) fragment budget exhausted, {} bytes left to send", buffer.len());

                    return false;
                }
                budget => buffer.set_fragment_budget(budget - 1),
            }
        }

        true
    }

    fn write_packet(&mut self, indicator: PacketIndicator, buffer: &mut MessageBuffer, len: usize) {
        let transport = &mut self.transport;

        let written = match buffer.with_indicator(indicator, len, |frame| transport.write(frame)) {
            Ok(written) => written,
            Err(e) => {
                log::debug!("(H4) {}, writing the packet indicator separately", e);

                transport.write(&[indicator.val()]) + transport.write(&buffer[..len])
            }
        };

        if written != len + 1 {
            log::warn!(
                "(H4) short write of a {} packet, {} of {} bytes written",
                indicator,
                written,
                len + 1
            );
        }

        self.trace.capture(indicator, &buffer[..len], Direction::Outbound);
    }

    fn command_sent(&mut self, buffer: MessageBuffer) {
        self.credits -= 1;

        let opcode = buffer.get(..2).map(|opcode| <u16>::from_le_bytes([opcode[0], opcode[1]]));

        if !self.internal.is_empty() && opcode.is_some() && buffer.internal_opcode() == opcode {
            self.provider.free(buffer)
        } else {
            self.host.on_tx_result(buffer, TxStatus::Success)
        }
    }
}
