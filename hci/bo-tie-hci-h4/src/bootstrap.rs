//! Discovery of the ACL data sizes of the controller
//!
//! Before ACL packets are sent the controller is asked for the maximum size of the data portion
//! of an ACL packet. This is a *Read Buffer Size* command followed by a *LE Read Buffer Size*
//! command, both issued as internal commands.

use crate::buffer::{BufferKind, MessageBuffer};
use crate::driver::{BufferProvider, ByteTransport, HostStack, PostloadStatus, PowerSignal, TraceSink};
use crate::H4;
use bo_tie_core::errors::Error;
use bo_tie_hci_util::events::{AclDataLengthReturn, CommandCompleteData, EventPacket};
use bo_tie_hci_util::opcodes::{HciCommand, InformationParameters, LEController};

const READ_BUFFER_SIZE: HciCommand = HciCommand::InformationParameters(InformationParameters::ReadBufferSize);

const LE_READ_BUFFER_SIZE: HciCommand = HciCommand::LEController(LEController::ReadBufferSize);

fn acl_data_length(event: &[u8]) -> AclDataLengthReturn {
    EventPacket::from_bytes(event)
        .and_then(CommandCompleteData::try_from)
        .map(|data| AclDataLengthReturn::from(data.return_parameter))
        .unwrap_or(AclDataLengthReturn {
            status: Error::MissingErrorCode,
            acl_data_packet_length: None,
        })
}

/// The state of a discovery
///
/// This is moved from the callback of the first command into the callback of the second.
#[derive(Debug, Default)]
struct AclSizeDiscovery {
    classic: u16,
}

impl AclSizeDiscovery {
    fn classic_complete<T, P, H, S, W>(mut self, h4: &mut H4<T, P, H, S, W>, mut event: MessageBuffer)
    where
        T: ByteTransport,
        P: BufferProvider,
        H: HostStack,
        S: TraceSink,
        W: PowerSignal,
    {
        let ret = acl_data_length(&event);

        let Some(size) = ret.acl_data_packet_length else {
            log::warn!("(H4) {} failed: {}", READ_BUFFER_SIZE, ret.status);

            h4.provider.free(event);

            h4.host.on_postload(PostloadStatus::Failure);

            return;
        };

        self.classic = size;

        h4.data_sizes.classic = size;

        let opcode = LE_READ_BUFFER_SIZE.into_opcode();

        if let Err(e) = event.rewrite_as_command(opcode, &[]) {
            log::warn!("(H4) cannot build {}: {}", LE_READ_BUFFER_SIZE, e);

            h4.provider.free(event);

            h4.host.on_postload(PostloadStatus::Success);

            return;
        }

        let sent = h4.send_internal_command(opcode, event, move |h4, event| self.le_complete(h4, event));

        if let Err(e) = sent {
            log::warn!("(H4) {}, the LE ACL data size stays at {}", e, h4.data_sizes.le);

            h4.provider.free(e.into_buffer());

            h4.host.on_postload(PostloadStatus::Success);
        }
    }

    fn le_complete<T, P, H, S, W>(self, h4: &mut H4<T, P, H, S, W>, event: MessageBuffer)
    where
        T: ByteTransport,
        P: BufferProvider,
        H: HostStack,
        S: TraceSink,
        W: PowerSignal,
    {
        let ret = acl_data_length(&event);

        match ret.acl_data_packet_length {
            Some(0) => {
                log::debug!("(H4) the LE controller shares the BR/EDR data buffers");

                h4.data_sizes.le = self.classic;
            }
            Some(size) => h4.data_sizes.le = size,
            None => log::warn!("(H4) {} failed: {}", LE_READ_BUFFER_SIZE, ret.status),
        }

        h4.provider.free(event);

        log::info!(
            "(H4) ACL data sizes: BR/EDR {} bytes, LE {} bytes",
            h4.data_sizes.classic,
            h4.data_sizes.le
        );

        h4.host.on_postload(PostloadStatus::Success);
    }
}

impl<T, P, H, S, W> H4<T, P, H, S, W>
where
    T: ByteTransport,
    P: BufferProvider,
    H: HostStack,
    S: TraceSink,
    W: PowerSignal,
{
    /// Ask the controller for its ACL data sizes
    ///
    /// This sends the *Read Buffer Size* command and then the *LE Read Buffer Size* command. The
    /// sizes returned are used for splitting outbound ACL packets. When the LE controller reports a
    /// size of zero it shares its buffers with the BR/EDR controller, so the BR/EDR size is used
    /// for both.
    ///
    /// The outcome is reported once through [`HostStack::on_postload`]. A failure is only reported
    /// when the BR/EDR size cannot be read. If the LE size cannot be read the initial LE size is
    /// kept and success is reported.
    pub fn discover_acl_data_sizes(&mut self) {
        let opcode = READ_BUFFER_SIZE.into_opcode();

        let Some(mut buffer) = self.provider.alloc(BufferKind::ToControllerCommand, 3) else {
            log::error!("(H4) failed to allocate a buffer for {}", READ_BUFFER_SIZE);

            self.host.on_postload(PostloadStatus::Failure);

            return;
        };

        if let Err(e) = buffer.rewrite_as_command(opcode, &[]) {
            log::error!("(H4) cannot build {}: {}", READ_BUFFER_SIZE, e);

            self.provider.free(buffer);

            self.host.on_postload(PostloadStatus::Failure);

            return;
        }

        let discovery = AclSizeDiscovery::default();

        let sent = self.send_internal_command(opcode, buffer, move |h4, event| discovery.classic_complete(h4, event));

        if let Err(e) = sent {
            log::error!("(H4) {}", e);

            self.provider.free(e.into_buffer());

            self.host.on_postload(PostloadStatus::Failure);
        }
    }
}
