use std::{collections::HashMap, time::Instant};

use crate::{
    messages::Message,
    serde::{ByteReader, ByteWriter, Serde, SerdeErr},
    transport::QosType,
};

use super::ConnectionId;

/// Latency probe. Carries the sender's frame id and two clock readings
/// so the echo can be matched to the exact outbound instant.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Ping {
    pub frame_id: u32,
    pub client_time: f32,
    pub fixed_time: f32,
}

impl Message for Ping {
    const QOS: QosType = QosType::Unreliable;

    fn ser(&self, writer: &mut ByteWriter) {
        self.frame_id.ser(writer);
        self.client_time.ser(writer);
        self.fixed_time.ser(writer);
    }

    fn de(&mut self, reader: &mut ByteReader) -> Result<(), SerdeErr> {
        self.frame_id = u32::de(reader)?;
        self.client_time = f32::de(reader)?;
        self.fixed_time = f32::de(reader)?;
        Ok(())
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Echo of a `Ping`, carrying the original frame id and clocks back.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pong {
    pub frame_id: u32,
    pub client_time: f32,
    pub fixed_time: f32,
}

impl Message for Pong {
    const QOS: QosType = QosType::Unreliable;

    fn ser(&self, writer: &mut ByteWriter) {
        self.frame_id.ser(writer);
        self.client_time.ser(writer);
        self.fixed_time.ser(writer);
    }

    fn de(&mut self, reader: &mut ByteReader) -> Result<(), SerdeErr> {
        self.frame_id = u32::de(reader)?;
        self.client_time = f32::de(reader)?;
        self.fixed_time = f32::de(reader)?;
        Ok(())
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

impl From<&Ping> for Pong {
    fn from(ping: &Ping) -> Self {
        Self {
            frame_id: ping.frame_id,
            client_time: ping.client_time,
            fixed_time: ping.fixed_time,
        }
    }
}

/// Outstanding pings awaiting their echo.
#[derive(Default)]
pub struct PingStore {
    sent: HashMap<(ConnectionId, u32), Instant>,
}

impl PingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remembers the instant `frame_id` left for `connection`.
    pub fn record_sent(&mut self, connection: ConnectionId, frame_id: u32) {
        self.sent.insert((connection, frame_id), Instant::now());
    }

    /// Resolves an echo into a round trip in milliseconds. `None` for
    /// echoes that were never sent, or already resolved.
    pub fn resolve(&mut self, connection: ConnectionId, frame_id: u32) -> Option<f32> {
        self.sent
            .remove(&(connection, frame_id))
            .map(|sent_at| sent_at.elapsed().as_secs_f32() * 1000.0)
    }

    /// Drops every outstanding ping for a departed connection.
    pub fn clear_connection(&mut self, connection: ConnectionId) {
        self.sent.retain(|(id, _), _| *id != connection);
    }
}
