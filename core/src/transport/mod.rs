use std::net::SocketAddr;

mod channel;
mod error;

pub use channel::{ChannelConnectionlessTransporter, ChannelNetwork, ChannelTransporter};
pub use error::{ConnectFailure, RecvError, SendError};

cfg_if! {
    if #[cfg(feature = "transport_udp")] {
        mod udp;
        pub use udp::UdpConnectionlessTransporter;
    }
}

/// Largest payload a transporter is asked to carry in one datagram.
pub const MTU_BYTES: usize = 1472;

/// Delivery guarantee requested for an outgoing datagram. Transporters
/// that cannot honor a level may deliver with a stronger one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QosType {
    Unreliable,
    ReliableUnordered,
    ReliableOrdered,
}

/// Opaque token a transporter assigns to one connection attempt or
/// established link. Meaningless outside the transporter that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransportHandle(u64);

impl TransportHandle {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn to_u64(&self) -> u64 {
        self.0
    }
}

/// What a connection-oriented transporter reports from `receive()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A remote peer wants in. The payload is whatever the initiator
    /// passed to `connect`, handed onward for approval.
    ConnectionRequest {
        handle: TransportHandle,
        payload: Box<[u8]>,
    },
    /// An attempt started by `connect` (or admitted by `accept`) is live.
    Connected { handle: TransportHandle },
    /// An attempt started by `connect` died before establishment.
    ConnectFailed {
        handle: TransportHandle,
        reason: ConnectFailure,
    },
    /// An established link dropped, locally or remotely.
    Disconnected { handle: TransportHandle },
    /// One datagram arrived on an established link.
    Data {
        handle: TransportHandle,
        payload: Box<[u8]>,
    },
}

/// Connection-oriented datagram transport. Implementations queue events
/// internally and surface them one at a time through `receive()`.
pub trait ConnectionTransporter {
    /// Starts an attempt toward `address`, carrying `payload` for the
    /// remote side's approval step. Resolves later as `Connected` or
    /// `ConnectFailed` on the returned handle.
    fn connect(&mut self, address: &SocketAddr, payload: &[u8]) -> Result<TransportHandle, SendError>;

    /// Admits a pending `ConnectionRequest`.
    fn accept(&mut self, handle: TransportHandle) -> Result<(), SendError>;

    /// Turns away a pending `ConnectionRequest`. The initiator sees
    /// `ConnectFailed` with `ConnectFailure::Refused`.
    fn reject(&mut self, handle: TransportHandle) -> Result<(), SendError>;

    /// Tears down an attempt or an established link. Safe to call on a
    /// handle the transporter no longer knows.
    fn disconnect(&mut self, handle: TransportHandle);

    /// Queues one datagram on an established link.
    fn send(
        &mut self,
        handle: TransportHandle,
        qos: QosType,
        payload: &[u8],
    ) -> Result<(), SendError>;

    /// Polls the next pending event, `None` when drained.
    fn receive(&mut self) -> Result<Option<TransportEvent>, RecvError>;
}

/// Fire-and-forget datagram transport with no connection state.
pub trait ConnectionlessTransporter {
    fn send_to(&mut self, address: &SocketAddr, payload: &[u8]) -> Result<(), SendError>;

    /// Polls the next inbound datagram, `None` when drained.
    fn receive_from(&mut self) -> Result<Option<(SocketAddr, Box<[u8]>)>, RecvError>;
}
