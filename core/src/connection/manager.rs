use std::{collections::HashMap, net::SocketAddr};

use log::{debug, warn};

use crate::transport::{
    ConnectFailure, ConnectionTransporter, QosType, SendError, TransportEvent, TransportHandle,
};

use super::{ConnectError, ConnectionId, ConnectionIdPool};

pub type OnEstablished = Box<dyn FnOnce(ConnectionId)>;
pub type OnFailure = Box<dyn FnOnce(ConnectionId, ConnectFailure)>;
pub type OnDisconnected = Box<dyn FnOnce(ConnectionId)>;

/// Callbacks registered against one outgoing connection attempt. Each
/// fires at most once, and a withdrawn attempt fires none of them.
#[derive(Default)]
pub struct ConnectCallbacks {
    on_established: Option<OnEstablished>,
    on_failure: Option<OnFailure>,
    on_disconnected: Option<OnDisconnected>,
}

impl ConnectCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn established(mut self, callback: impl FnOnce(ConnectionId) + 'static) -> Self {
        self.on_established = Some(Box::new(callback));
        self
    }

    pub fn failed(mut self, callback: impl FnOnce(ConnectionId, ConnectFailure) + 'static) -> Self {
        self.on_failure = Some(Box::new(callback));
        self
    }

    pub fn disconnected(mut self, callback: impl FnOnce(ConnectionId) + 'static) -> Self {
        self.on_disconnected = Some(Box::new(callback));
        self
    }
}

enum Peer {
    /// Outgoing attempt, waiting on the transporter's verdict.
    Pending {
        handle: TransportHandle,
        callbacks: ConnectCallbacks,
    },
    /// Incoming request, waiting on a local approve or deny.
    AwaitingApproval { handle: TransportHandle },
    /// Live in both directions.
    Established {
        handle: TransportHandle,
        on_disconnected: Option<OnDisconnected>,
    },
}

/// What the lifecycle pump hands back to the caller, in arrival order.
#[derive(Debug, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A remote peer wants in. Rule on it with `approve` or `deny`;
    /// until then the connection stays pending under this id.
    ApprovalRequested {
        connection: ConnectionId,
        secret: Box<[u8]>,
    },
    /// An outgoing attempt is now live.
    Established { connection: ConnectionId },
    /// An outgoing attempt died before establishment. Its id is back
    /// in the pool.
    AttemptFailed {
        connection: ConnectionId,
        reason: ConnectFailure,
    },
    /// An established connection dropped. Its id is back in the pool.
    Disconnected { connection: ConnectionId },
    /// One datagram from an established connection.
    Data {
        connection: ConnectionId,
        payload: Box<[u8]>,
    },
}

/// Owns the connection lifecycle over one connection-oriented
/// transporter: outgoing attempts, the approval handshake for incoming
/// requests, withdrawal of pending attempts, and teardown. Ids come
/// from a bounded pool and return to it when the connection resolves
/// or dies.
pub struct ConnectionManager {
    transporter: Box<dyn ConnectionTransporter>,
    pool: ConnectionIdPool,
    peers: HashMap<ConnectionId, Peer>,
    ids_by_handle: HashMap<TransportHandle, ConnectionId>,
}

impl ConnectionManager {
    pub fn new(transporter: Box<dyn ConnectionTransporter>, max_connections: usize) -> Self {
        Self {
            transporter,
            pool: ConnectionIdPool::new(max_connections),
            peers: HashMap::new(),
            ids_by_handle: HashMap::new(),
        }
    }

    pub fn id_pool(&self) -> &ConnectionIdPool {
        &self.pool
    }

    pub fn is_connected(&self, connection: ConnectionId) -> bool {
        matches!(
            self.peers.get(&connection),
            Some(Peer::Established { .. })
        )
    }

    /// Ids of every established connection, ascending.
    pub fn connections(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self
            .peers
            .iter()
            .filter(|(_, peer)| matches!(peer, Peer::Established { .. }))
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// Starts a non-blocking attempt toward `address`, carrying
    /// `secret` for the remote approval step. The returned id is
    /// reserved immediately; the attempt resolves later through the
    /// registered callbacks.
    pub fn connect(
        &mut self,
        address: &SocketAddr,
        secret: &[u8],
        callbacks: ConnectCallbacks,
    ) -> Result<ConnectionId, ConnectError> {
        let connection = self.pool.take()?;
        let handle = match self.transporter.connect(address, secret) {
            Ok(handle) => handle,
            Err(error) => {
                self.pool.put(connection);
                return Err(ConnectError::TransportSend(error));
            }
        };
        self.peers
            .insert(connection, Peer::Pending { handle, callbacks });
        self.ids_by_handle.insert(handle, connection);
        Ok(connection)
    }

    /// Tears down an established connection, firing its disconnect
    /// callback and releasing the id. Pending attempts are untouched;
    /// withdraw those with `cancel_pending`.
    pub fn disconnect(&mut self, connection: ConnectionId) {
        match self.peers.remove(&connection) {
            Some(Peer::Established {
                handle,
                on_disconnected,
            }) => {
                self.ids_by_handle.remove(&handle);
                self.transporter.disconnect(handle);
                if let Some(callback) = on_disconnected {
                    callback(connection);
                }
                self.pool.put(connection);
            }
            Some(other) => {
                warn!("disconnect called for {:?}, which is not established", connection);
                self.peers.insert(connection, other);
            }
            None => {}
        }
    }

    /// Withdraws a connection that has not yet been established and
    /// releases its id. No callback will ever fire for a withdrawn
    /// attempt. A remote request awaiting approval is denied. An
    /// established connection is left alone.
    pub fn cancel_pending(&mut self, connection: ConnectionId) {
        match self.peers.remove(&connection) {
            Some(Peer::Pending { handle, .. }) => {
                self.ids_by_handle.remove(&handle);
                self.transporter.disconnect(handle);
                self.pool.put(connection);
            }
            Some(Peer::AwaitingApproval { handle }) => {
                self.ids_by_handle.remove(&handle);
                let _ = self.transporter.reject(handle);
                self.pool.put(connection);
            }
            Some(established) => {
                self.peers.insert(connection, established);
            }
            None => {}
        }
    }

    /// Admits a remote request previously surfaced as
    /// `ApprovalRequested`. Returns false when the attempt is already
    /// gone; the id is reclaimed in that case.
    pub fn approve(&mut self, connection: ConnectionId) -> bool {
        match self.peers.remove(&connection) {
            Some(Peer::AwaitingApproval { handle }) => {
                if self.transporter.accept(handle).is_err() {
                    warn!("approval of {:?} raced a withdrawn attempt", connection);
                    self.ids_by_handle.remove(&handle);
                    self.pool.put(connection);
                    return false;
                }
                self.peers.insert(
                    connection,
                    Peer::Established {
                        handle,
                        on_disconnected: None,
                    },
                );
                true
            }
            Some(other) => {
                warn!("approve called for {:?}, which is not awaiting approval", connection);
                self.peers.insert(connection, other);
                false
            }
            None => false,
        }
    }

    /// Turns away a remote request previously surfaced as
    /// `ApprovalRequested` and reclaims its id.
    pub fn deny(&mut self, connection: ConnectionId) {
        match self.peers.remove(&connection) {
            Some(Peer::AwaitingApproval { handle }) => {
                self.ids_by_handle.remove(&handle);
                let _ = self.transporter.reject(handle);
                self.pool.put(connection);
            }
            Some(other) => {
                warn!("deny called for {:?}, which is not awaiting approval", connection);
                self.peers.insert(connection, other);
            }
            None => {}
        }
    }

    /// Queues one datagram toward an established connection.
    pub fn send(
        &mut self,
        connection: ConnectionId,
        qos: QosType,
        payload: &[u8],
    ) -> Result<(), SendError> {
        match self.peers.get(&connection) {
            Some(Peer::Established { handle, .. }) => {
                self.transporter.send(*handle, qos, payload)
            }
            _ => Err(SendError),
        }
    }

    /// Drains the transporter's pending events, advancing the state
    /// machine and firing attempt callbacks along the way.
    pub fn process_transport(&mut self) -> Vec<ConnectionEvent> {
        let mut events = Vec::new();
        loop {
            let event = match self.transporter.receive() {
                Ok(Some(event)) => event,
                Ok(None) => break,
                Err(_) => {
                    warn!("transporter failed while polling, abandoning this drain");
                    break;
                }
            };
            match event {
                TransportEvent::ConnectionRequest { handle, payload } => {
                    self.handle_request(handle, payload, &mut events);
                }
                TransportEvent::Connected { handle } => {
                    self.handle_connected(handle, &mut events);
                }
                TransportEvent::ConnectFailed { handle, reason } => {
                    self.handle_connect_failed(handle, reason, &mut events);
                }
                TransportEvent::Disconnected { handle } => {
                    self.handle_disconnected(handle, &mut events);
                }
                TransportEvent::Data { handle, payload } => {
                    self.handle_data(handle, payload, &mut events);
                }
            }
        }
        events
    }

    fn handle_request(
        &mut self,
        handle: TransportHandle,
        secret: Box<[u8]>,
        events: &mut Vec<ConnectionEvent>,
    ) {
        let connection = match self.pool.take() {
            Ok(connection) => connection,
            Err(error) => {
                warn!("turning away a connection request: {}", error);
                let _ = self.transporter.reject(handle);
                return;
            }
        };
        self.peers
            .insert(connection, Peer::AwaitingApproval { handle });
        self.ids_by_handle.insert(handle, connection);
        events.push(ConnectionEvent::ApprovalRequested { connection, secret });
    }

    fn handle_connected(&mut self, handle: TransportHandle, events: &mut Vec<ConnectionEvent>) {
        let Some(connection) = self.ids_by_handle.get(&handle).copied() else {
            // the attempt was withdrawn while the confirmation was in flight
            warn!("tearing down a connection that completed after withdrawal");
            self.transporter.disconnect(handle);
            return;
        };
        match self.peers.remove(&connection) {
            Some(Peer::Pending { callbacks, .. }) => {
                let ConnectCallbacks {
                    on_established,
                    on_disconnected,
                    ..
                } = callbacks;
                self.peers.insert(
                    connection,
                    Peer::Established {
                        handle,
                        on_disconnected,
                    },
                );
                if let Some(callback) = on_established {
                    callback(connection);
                }
                events.push(ConnectionEvent::Established { connection });
            }
            Some(other) => {
                warn!("unexpected establishment for {:?}", connection);
                self.peers.insert(connection, other);
            }
            None => {}
        }
    }

    fn handle_connect_failed(
        &mut self,
        handle: TransportHandle,
        reason: ConnectFailure,
        events: &mut Vec<ConnectionEvent>,
    ) {
        let Some(connection) = self.ids_by_handle.get(&handle).copied() else {
            debug!("a failure report arrived for an attempt no longer tracked");
            return;
        };
        match self.peers.remove(&connection) {
            Some(Peer::Pending { callbacks, .. }) => {
                self.ids_by_handle.remove(&handle);
                if let Some(callback) = callbacks.on_failure {
                    callback(connection, reason);
                }
                self.pool.put(connection);
                events.push(ConnectionEvent::AttemptFailed { connection, reason });
            }
            Some(other) => {
                warn!("unexpected failure report for {:?}", connection);
                self.peers.insert(connection, other);
            }
            None => {}
        }
    }

    fn handle_disconnected(&mut self, handle: TransportHandle, events: &mut Vec<ConnectionEvent>) {
        let Some(connection) = self.ids_by_handle.get(&handle).copied() else {
            debug!("a disconnect arrived for a connection no longer tracked");
            return;
        };
        match self.peers.remove(&connection) {
            Some(Peer::Established {
                on_disconnected, ..
            }) => {
                self.ids_by_handle.remove(&handle);
                if let Some(callback) = on_disconnected {
                    callback(connection);
                }
                self.pool.put(connection);
                events.push(ConnectionEvent::Disconnected { connection });
            }
            Some(Peer::AwaitingApproval { .. }) => {
                // the remote gave up before we ruled on its request
                self.ids_by_handle.remove(&handle);
                self.pool.put(connection);
            }
            Some(other) => {
                warn!("unexpected disconnect for {:?}", connection);
                self.peers.insert(connection, other);
            }
            None => {}
        }
    }

    fn handle_data(
        &mut self,
        handle: TransportHandle,
        payload: Box<[u8]>,
        events: &mut Vec<ConnectionEvent>,
    ) {
        match self.ids_by_handle.get(&handle) {
            Some(connection)
                if matches!(self.peers.get(connection), Some(Peer::Established { .. })) =>
            {
                events.push(ConnectionEvent::Data {
                    connection: *connection,
                    payload,
                });
            }
            _ => {
                warn!("dropping data from a connection that is not established");
            }
        }
    }
}
