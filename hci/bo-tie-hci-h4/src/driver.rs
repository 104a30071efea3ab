//! The collaborators of the transport
//!
//! An [`H4`](crate::H4) does not own a UART, an allocator, or the rest of the host. These are given
//! to it as implementations of the traits within this module.

use crate::buffer::{BufferKind, MessageBuffer};
use bo_tie_hci_util::PacketIndicator;

/// Non-blocking access to the UART
pub trait ByteTransport {
    /// Read up to `buf.len()` bytes
    ///
    /// The number of bytes read is returned, zero means that no bytes are available right now.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Write `bytes`
    ///
    /// The number of bytes accepted by the UART is returned.
    fn write(&mut self, bytes: &[u8]) -> usize;
}

/// Source and sink of message buffers
pub trait BufferProvider {
    /// Allocate a buffer for a packet of `size` bytes
    ///
    /// `None` is returned when a buffer cannot be allocated.
    fn alloc(&mut self, kind: BufferKind, size: usize) -> Option<MessageBuffer>;

    /// Give a buffer back to the provider
    fn free(&mut self, buffer: MessageBuffer);
}

/// The direction of a traced packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Received from the controller
    Inbound,
    /// Sent to the controller
    Outbound,
}

/// A packet tracer
///
/// Every complete packet (or ACL segment) that passes through the transport is given to the
/// tracer. The packet does not include the packet indicator.
pub trait TraceSink {
    fn capture(&mut self, indicator: PacketIndicator, packet: &[u8], direction: Direction);
}

/// Tracing is disabled
impl TraceSink for () {
    fn capture(&mut self, _: PacketIndicator, _: &[u8], _: Direction) {}
}

/// Low power signalling
///
/// `wake` is called before anything is written to the UART. `tx_done` is called once a call to
/// `send` has finished writing, its input is `false` when the transmission is only partially done
/// (a fragment budget was exhausted).
pub trait PowerSignal {
    fn wake(&mut self);

    fn tx_done(&mut self, complete: bool);
}

/// Low power signalling is disabled
impl PowerSignal for () {
    fn wake(&mut self) {}

    fn tx_done(&mut self, _: bool) {}
}

/// The result of sending a message buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// The entire packet was written
    Success,
    /// Only some of the segments were written, the buffer is of kind `SegmentTransmitted`
    Fragment,
    /// The buffer kind cannot be sent to the controller
    Rejected,
}

/// The outcome of the discovery of the ACL data sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostloadStatus {
    Success,
    Failure,
}

/// The rest of the host
///
/// Ownership of every buffer given to the host is transferred to it. The host is expected to give
/// the buffers back to the [`BufferProvider`] when it is done with them.
pub trait HostStack {
    /// A complete packet was received from the controller
    fn on_data(&mut self, buffer: MessageBuffer);

    /// A buffer passed to `send` was written
    fn on_tx_result(&mut self, buffer: MessageBuffer, status: TxStatus);

    /// The discovery of the ACL data sizes finished
    fn on_postload(&mut self, status: PostloadStatus);
}

impl<T: ByteTransport + ?Sized> ByteTransport for &mut T {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        (**self).read(buf)
    }

    fn write(&mut self, bytes: &[u8]) -> usize {
        (**self).write(bytes)
    }
}

impl<T: BufferProvider + ?Sized> BufferProvider for &mut T {
    fn alloc(&mut self, kind: BufferKind, size: usize) -> Option<MessageBuffer> {
        (**self).alloc(kind, size)
    }

    fn free(&mut self, buffer: MessageBuffer) {
        (**self).free(buffer)
    }
}

impl<T: HostStack + ?Sized> HostStack for &mut T {
    fn on_data(&mut self, buffer: MessageBuffer) {
        (**self).on_data(buffer)
    }

    fn on_tx_result(&mut self, buffer: MessageBuffer, status: TxStatus) {
        (**self).on_tx_result(buffer, status)
    }

    fn on_postload(&mut self, status: PostloadStatus) {
        (**self).on_postload(status)
    }
}

/// A [`ByteTransport`] over anything implementing `std::io::Read` and `std::io::Write`
///
/// The inner type should be non-blocking. An `io::ErrorKind::WouldBlock` or
/// `io::ErrorKind::Interrupted` error is treated as zero bytes being transferred. Any other error
/// is logged and also treated as zero bytes.
#[cfg(feature = "std")]
#[derive(Debug)]
pub struct IoTransport<T> {
    io: T,
}

#[cfg(feature = "std")]
impl<T> IoTransport<T> {
    pub fn new(io: T) -> Self {
        IoTransport { io }
    }

    pub fn get_ref(&self) -> &T {
        &self.io
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.io
    }

    pub fn into_inner(self) -> T {
        self.io
    }
}

#[cfg(feature = "std")]
fn io_len(result: std::io::Result<usize>, operation: &str) -> usize {
    use std::io::ErrorKind;

    match result {
        Ok(len) => len,
        Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => 0,
        Err(e) => {
            log::error!("(H4) UART {} failed: {}", operation, e);
            0
        }
    }
}

#[cfg(feature = "std")]
impl<T> ByteTransport for IoTransport<T>
where
    T: std::io::Read + std::io::Write,
{
    fn read(&mut self, buf: &mut [u8]) -> usize {
        io_len(self.io.read(buf), "read")
    }

    fn write(&mut self, bytes: &[u8]) -> usize {
        let len = io_len(self.io.write(bytes), "write");

        if len != 0 {
            io_len(self.io.flush().map(|_| len), "flush")
        } else {
            0
        }
    }
}
