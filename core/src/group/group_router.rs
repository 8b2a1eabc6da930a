use std::collections::HashMap;

use log::warn;

use crate::{
    connection::ConnectionId,
    sequence::SequenceNumber,
    serde::{ByteReader, ByteWriter, Serde},
    types::TransportGroupId,
};

use super::ConnectionGroup;

/// Demultiplexes connection traffic by the leading group tag. Each
/// datagram is `[group tag][sequence][message]`; the router strips the
/// header and queues the message on its group. Datagrams for a group
/// nobody opened degrade to a log line, since peers on mismatched
/// versions may disagree about which groups exist.
#[derive(Default)]
pub struct TransportGroupRouter {
    groups: HashMap<TransportGroupId, ConnectionGroup>,
}

impl TransportGroupRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a group for routing. Panics when the tag is already open.
    pub fn open_group(&mut self, group: TransportGroupId) {
        if self.groups.insert(group, ConnectionGroup::new()).is_some() {
            panic!("Transport group already open!");
        }
    }

    pub fn group(&self, group: TransportGroupId) -> Option<&ConnectionGroup> {
        self.groups.get(&group)
    }

    pub(crate) fn group_mut(&mut self, group: TransportGroupId) -> Option<&mut ConnectionGroup> {
        self.groups.get_mut(&group)
    }

    /// Adds the connection to every open group.
    pub(crate) fn connection_joined(&mut self, connection: ConnectionId) {
        for group in self.groups.values_mut() {
            group.insert(connection);
        }
    }

    /// Removes the connection from every open group.
    pub(crate) fn connection_left(&mut self, connection: ConnectionId) {
        for group in self.groups.values_mut() {
            group.remove(connection);
        }
    }

    /// Parses one inbound datagram's group header and queues the rest
    /// on the tagged group.
    pub(crate) fn route_inbound(&mut self, connection: ConnectionId, payload: &[u8]) {
        let mut reader = ByteReader::new(payload);
        let header = TransportGroupId::de(&mut reader)
            .and_then(|group| SequenceNumber::de(&mut reader).map(|sequence| (group, sequence)));
        let (group, sequence) = match header {
            Ok(header) => header,
            Err(error) => {
                warn!("dropping a datagram with an unreadable group header: {}", error);
                return;
            }
        };
        let Some(group_state) = self.groups.get_mut(&group) else {
            warn!("dropping a datagram for unopened group {:?}", group);
            return;
        };
        if !group_state.contains(connection) {
            warn!(
                "dropping a datagram from {:?}, which is not in group {:?}",
                connection, group
            );
            return;
        }
        group_state.push_inbound(connection, sequence, reader.remaining_bytes().into());
    }

    /// Frames one message for the wire: stamps the next sequence number
    /// of the stream toward `connection` and prepends the group header.
    /// `None` when the group is unopened or the connection is not in it.
    pub(crate) fn frame_outbound(
        &mut self,
        group: TransportGroupId,
        connection: ConnectionId,
        message: &[u8],
    ) -> Option<Box<[u8]>> {
        let group_state = self.groups.get_mut(&group)?;
        if !group_state.contains(connection) {
            return None;
        }
        let sequence = group_state.stamp_sequence(connection);
        let mut writer = ByteWriter::new();
        group.ser(&mut writer);
        sequence.ser(&mut writer);
        writer.write_bytes(message);
        Some(writer.to_bytes())
    }
}
