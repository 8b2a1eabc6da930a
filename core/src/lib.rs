//! # Slipstream Core
//! Object replication over pluggable datagram transports: connection
//! lifecycle with an approval handshake, group-tagged message routing,
//! and a bounded store of replicated objects.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

#[macro_use]
extern crate cfg_if;

mod connection;
mod group;
mod messages;
mod protocol;
mod sequence;
mod serde;
mod systems;
mod transport;
mod types;
mod world;

pub use connection::{
    ConnectCallbacks, ConnectError, ConnectionEvent, ConnectionId, ConnectionIdPool,
    ConnectionManager, LatencyInfo, OnDisconnected, OnEstablished, OnFailure, Ping, PingStore,
    Pong, PoolError,
};
pub use group::{ConnectionGroup, GroupEvent, TransportGroupRouter};
pub use messages::{
    AnyMessage, Message, MessageError, MessageKind, MessageKinds, MessageMetaData, MessagePool,
    MessageRouter, MessageTypeId,
};
pub use protocol::Protocol;
pub use sequence::{
    sequence_greater_than, sequence_less_than, try_wrapping_diff, wrapping_diff, SequenceNumber,
    SequenceNumberError,
};
pub use serde::{ByteReader, ByteWriter, Serde, SerdeErr, UnsignedVariableInteger};
pub use systems::{Events, NetworkConfig, NetworkSystems};
pub use transport::{
    ChannelConnectionlessTransporter, ChannelNetwork, ChannelTransporter, ConnectFailure,
    ConnectionTransporter, ConnectionlessTransporter, QosType, RecvError, SendError,
    TransportEvent, TransportHandle, MTU_BYTES,
};
pub use types::{GlobalObjectId, ObjectId, ObjectType, TransportGroupId};
pub use world::{
    CreateObject, DeleteObject, EntityFactory, ObjectKinds, ObjectMessageParser,
    ObjectMessageRouter, ObjectMessageSender, ObjectParseError, ObjectRecord, ObjectRole,
    Quaternion, ReplicatedObjectStore, ReplicationEvent, Replicator, StoreError, ToObject,
    UnknownObjectType, Vec3,
};

cfg_if! {
    if #[cfg(feature = "transport_udp")] {
        pub use transport::UdpConnectionlessTransporter;
    }
}
