//! The UART transport layer of the host controller interface
//!
//! HCI packets contain no marker within them to indicate what kind of packet they are, so when
//! they are sent over a UART every packet is prefixed with a single byte
//! [`PacketIndicator`](bo_tie_hci_util::PacketIndicator). This is the *H4* transport. An [`H4`]
//! sits between a UART and the rest of the host and is responsible for
//!
//! * parsing the byte stream from the controller back into complete packets,
//! * recombining the segments of a L2CAP PDU carried by ACL data packets,
//! * splitting outbound ACL packets to the maximum size the controller accepts,
//! * tracking the number of commands the controller will accept (command credits),
//! * issuing commands of its own and capturing their *Command Complete* events.
//!
//! # Collaborators
//! An `H4` does not do any I/O or allocation by itself. It is created with a [`ByteTransport`]
//! (the UART), a [`BufferProvider`] (the allocator of [`MessageBuffer`]s), and a [`HostStack`]
//! (the rest of the host). Optionally a [`TraceSink`] can be given for capturing every packet and
//! a [`PowerSignal`] for waking the controller before a transmission.
//!
//! Everything is driven by the owner of the `H4`. The method [`receive`](H4::receive) should be
//! called whenever the UART has bytes available, and [`send`](H4::send) is called with every
//! packet that is to be sent to the controller. Neither method blocks, a read of zero bytes means
//! there is nothing more to do right now.
//!
//! ```
//! use bo_tie_hci_h4::{H4, MessageBuffer, BufferKind, TxStatus, PostloadStatus};
//! use bo_tie_hci_h4::driver::{ByteTransport, HostStack};
//! use bo_tie_hci_h4::pool::BufferPool;
//!
//! # #[derive(Default)]
//! # struct Uart { tx: Vec<u8> }
//! # impl ByteTransport for Uart {
//! #     fn read(&mut self, _: &mut [u8]) -> usize { 0 }
//! #     fn write(&mut self, bytes: &[u8]) -> usize { self.tx.extend_from_slice(bytes); bytes.len() }
//! # }
//! # struct Host;
//! # impl HostStack for Host {
//! #     fn on_data(&mut self, _: MessageBuffer) {}
//! #     fn on_tx_result(&mut self, _: MessageBuffer, _: TxStatus) {}
//! #     fn on_postload(&mut self, _: PostloadStatus) {}
//! # }
//! let mut h4 = H4::new(Uart::default(), BufferPool::default(), Host);
//!
//! // HCI Reset
//! h4.send(MessageBuffer::command(0x0C03, &[]).unwrap());
//!
//! assert_eq!(h4.transport().tx, [0x01, 0x03, 0x0C, 0x00]);
//! assert_eq!(h4.command_credits(), 0);
//! ```

#![cfg_attr(all(not(feature = "std"), not(test)), no_std)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

mod bootstrap;
pub mod buffer;
mod command;
pub mod driver;
pub mod pool;
mod reassembly;
mod recv;
mod send;
pub mod trace;

pub use buffer::{BufferKind, ControllerKind, MessageBuffer};
pub use command::InternalCommandError;
pub use driver::{BufferProvider, ByteTransport, Direction, HostStack, PostloadStatus, PowerSignal, TraceSink, TxStatus};

use command::InternalCommandQueue;
use reassembly::AclReassembly;
use recv::RxState;

/// The maximum size of the data portion of an ACL packet
///
/// These are the sizes used for splitting outbound ACL packets. They start as the values within
/// the [`H4Config`] and are updated by [`discover_acl_data_sizes`](H4::discover_acl_data_sizes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AclDataSizes {
    pub classic: u16,
    pub le: u16,
}

impl AclDataSizes {
    pub fn for_controller(&self, controller: ControllerKind) -> u16 {
        match controller {
            ControllerKind::BrEdr => self.classic,
            ControllerKind::Le => self.le,
        }
    }
}

/// Configuration of an [`H4`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct H4Config {
    classic_acl_data_size: u16,
    le_acl_data_size: u16,
    internal_command_capacity: usize,
}

impl H4Config {
    /// The classic ACL data size used until the controller is asked
    pub const DEFAULT_CLASSIC_ACL_DATA_SIZE: u16 = 1021;

    /// The LE ACL data size used until the controller is asked
    pub const DEFAULT_LE_ACL_DATA_SIZE: u16 = 27;

    /// The number of internal commands that can await their *Command Complete* event
    pub const DEFAULT_INTERNAL_COMMAND_CAPACITY: usize = 8;

    pub fn new() -> Self {
        H4Config {
            classic_acl_data_size: Self::DEFAULT_CLASSIC_ACL_DATA_SIZE,
            le_acl_data_size: Self::DEFAULT_LE_ACL_DATA_SIZE,
            internal_command_capacity: Self::DEFAULT_INTERNAL_COMMAND_CAPACITY,
        }
    }

    pub fn classic_acl_data_size(mut self, size: u16) -> Self {
        self.classic_acl_data_size = size;
        self
    }

    pub fn le_acl_data_size(mut self, size: u16) -> Self {
        self.le_acl_data_size = size;
        self
    }

    pub fn internal_command_capacity(mut self, capacity: usize) -> Self {
        self.internal_command_capacity = capacity;
        self
    }
}

impl Default for H4Config {
    fn default() -> Self {
        H4Config::new()
    }
}

/// The collaborators given back by [`shutdown`](H4::shutdown)
#[derive(Debug)]
pub struct H4Parts<T, P, H, S, W> {
    pub transport: T,
    pub provider: P,
    pub host: H,
    pub trace: S,
    pub power: W,
}

/// The H4 transport
///
/// See the [crate level documentation](crate) for details.
pub struct H4<T, P, H, S = (), W = ()> {
    transport: T,
    provider: P,
    host: H,
    trace: S,
    power: W,
    receiver: RxState,
    reassembly: AclReassembly,
    credits: i32,
    internal: InternalCommandQueue<H4<T, P, H, S, W>>,
    data_sizes: AclDataSizes,
}

impl<T, P, H> H4<T, P, H> {
    /// Create a new `H4` with the default configuration and without tracing or power signalling
    pub fn new(transport: T, provider: P, host: H) -> Self {
        H4::with_config(H4Config::default(), transport, provider, host, (), ())
    }
}

impl<T, P, H, S, W> H4<T, P, H, S, W> {
    /// Create a new `H4`
    pub fn with_config(config: H4Config, transport: T, provider: P, host: H, trace: S, power: W) -> Self {
        H4 {
            transport,
            provider,
            host,
            trace,
            power,
            receiver: RxState::default(),
            reassembly: AclReassembly::new(),
            credits: 1,
            internal: InternalCommandQueue::new(config.internal_command_capacity),
            data_sizes: AclDataSizes {
                classic: config.classic_acl_data_size,
                le: config.le_acl_data_size,
            },
        }
    }

    /// Get the number of commands the controller is able to accept
    ///
    /// This is set by every *Command Complete* and *Command Status* event and reduced by one for
    /// every command sent. It goes negative when commands are sent without regard to it.
    pub fn command_credits(&self) -> i32 {
        self.credits
    }

    pub fn acl_data_sizes(&self) -> AclDataSizes {
        self.data_sizes
    }

    /// Get the number of internal commands that have not received their *Command Complete* event
    pub fn pending_internal_commands(&self) -> usize {
        self.internal.len()
    }

    /// Get the number of connections with a partially received L2CAP PDU
    pub fn parked_acl_count(&self) -> usize {
        self.reassembly.len()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn trace(&self) -> &S {
        &self.trace
    }

    pub fn power(&self) -> &W {
        &self.power
    }
}

impl<T, P, H, S, W> H4<T, P, H, S, W>
where
    P: BufferProvider,
{
    /// Shutdown the transport
    ///
    /// Every buffer still held by the transport (a partially received packet and the partially
    /// recombined L2CAP PDUs) is given back to the buffer provider. Internal commands still awaiting
    /// their *Command Complete* event are dropped without their callbacks being called.
    pub fn shutdown(mut self) -> H4Parts<T, P, H, S, W> {
        if let Some(buffer) = core::mem::take(&mut self.receiver).into_buffer() {
            log::debug!("(H4) dropping a partially received packet");

            self.provider.free(buffer);
        }

        for buffer in self.reassembly.drain() {
            self.provider.free(buffer);
        }

        let dropped = self.internal.clear();

        if dropped != 0 {
            log::debug!("(H4) dropping {} pending internal commands", dropped);
        }

        let H4 {
            transport,
            provider,
            host,
            trace,
            power,
            ..
        } = self;

        H4Parts {
            transport,
            provider,
            host,
            trace,
            power,
        }
    }
}
