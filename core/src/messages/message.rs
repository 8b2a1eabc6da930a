use std::{any::Any, net::SocketAddr};

use crate::{
    connection::ConnectionId,
    sequence::SequenceNumber,
    serde::{ByteReader, ByteWriter, SerdeErr},
    transport::QosType,
};

/// Context attached to every message handed to a handler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MessageMetaData {
    /// Which peer sent it. `ConnectionId::NO_CONNECTION` for traffic
    /// that arrived without a connection.
    pub sender: ConnectionId,
    /// Position of the carrying datagram in the sender's group stream.
    pub sequence: SequenceNumber,
    /// Last measured round trip to the sender, in milliseconds.
    pub latency: f32,
    /// Source socket address, present for connectionless traffic only.
    pub endpoint: Option<SocketAddr>,
}

/// A reusable wire message. Implementations are registered with the
/// protocol, pooled one instance per kind, and overwritten in place on
/// receipt.
pub trait Message: Any {
    /// Delivery guarantee requested for this kind.
    const QOS: QosType;

    /// Appends the message body to `writer`.
    fn ser(&self, writer: &mut ByteWriter);

    /// Overwrites this instance from `reader`.
    fn de(&mut self, reader: &mut ByteReader) -> Result<(), SerdeErr>;

    /// Returns the instance to its freshly constructed state.
    fn reset(&mut self);
}

/// Object-safe view over a pooled message instance.
pub trait AnyMessage: Any {
    fn qos(&self) -> QosType;
    fn write(&self, writer: &mut ByteWriter);
    fn read(&mut self, reader: &mut ByteReader) -> Result<(), SerdeErr>;
    fn clear(&mut self);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<M: Message> AnyMessage for M {
    fn qos(&self) -> QosType {
        M::QOS
    }

    fn write(&self, writer: &mut ByteWriter) {
        self.ser(writer);
    }

    fn read(&mut self, reader: &mut ByteReader) -> Result<(), SerdeErr> {
        self.de(reader)
    }

    fn clear(&mut self) {
        self.reset();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
