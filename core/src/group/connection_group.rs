use std::collections::{HashMap, VecDeque};

use crate::{connection::ConnectionId, sequence::SequenceNumber};

/// Membership change on one connection group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupEvent {
    PeerJoined(ConnectionId),
    PeerLeft(ConnectionId),
}

/// The population of one logical sub-channel: which connections
/// participate, their pending membership events, the inbound datagrams
/// awaiting dispatch, and the outbound sequence counter per peer.
#[derive(Default)]
pub struct ConnectionGroup {
    members: Vec<ConnectionId>,
    events: VecDeque<GroupEvent>,
    next_sequence: HashMap<ConnectionId, SequenceNumber>,
    inbound: VecDeque<(ConnectionId, SequenceNumber, Box<[u8]>)>,
}

impl ConnectionGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently participating connections, in join order.
    pub fn connections(&self) -> &[ConnectionId] {
        &self.members
    }

    pub fn contains(&self, connection: ConnectionId) -> bool {
        self.members.contains(&connection)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub(crate) fn insert(&mut self, connection: ConnectionId) {
        if self.members.contains(&connection) {
            return;
        }
        self.members.push(connection);
        self.events.push_back(GroupEvent::PeerJoined(connection));
    }

    /// Removes a member. Anything it sent that is still queued is
    /// dropped with it; after the `PeerLeft` event no further traffic
    /// from that peer is delivered.
    pub(crate) fn remove(&mut self, connection: ConnectionId) {
        let Some(position) = self.members.iter().position(|id| *id == connection) else {
            return;
        };
        self.members.remove(position);
        self.events.push_back(GroupEvent::PeerLeft(connection));
        self.next_sequence.remove(&connection);
        self.inbound.retain(|(id, _, _)| *id != connection);
    }

    /// Next outbound sequence number for the stream toward `connection`.
    pub(crate) fn stamp_sequence(&mut self, connection: ConnectionId) -> SequenceNumber {
        let entry = self
            .next_sequence
            .entry(connection)
            .or_insert(SequenceNumber::ZERO);
        let stamped = *entry;
        *entry = entry.increment();
        stamped
    }

    pub(crate) fn push_inbound(
        &mut self,
        connection: ConnectionId,
        sequence: SequenceNumber,
        payload: Box<[u8]>,
    ) {
        self.inbound.push_back((connection, sequence, payload));
    }

    pub(crate) fn take_events(&mut self) -> Vec<GroupEvent> {
        self.events.drain(..).collect()
    }

    pub(crate) fn take_inbound(&mut self) -> Vec<(ConnectionId, SequenceNumber, Box<[u8]>)> {
        self.inbound.drain(..).collect()
    }
}
