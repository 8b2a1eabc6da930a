use std::{fmt::Debug, hash::Hash, mem, net::SocketAddr};

use log::{debug, warn};

use crate::{
    connection::{
        ConnectCallbacks, ConnectError, ConnectionEvent, ConnectionId, ConnectionManager,
        LatencyInfo, Ping, PingStore, Pong,
    },
    group::{ConnectionGroup, GroupEvent, TransportGroupRouter},
    messages::{
        Message, MessageError, MessageKind, MessageKinds, MessageMetaData, MessagePool,
        MessageRouter, MessageTypeId,
    },
    protocol::Protocol,
    sequence::SequenceNumber,
    serde::{ByteReader, Serde},
    transport::{ConnectionTransporter, ConnectionlessTransporter, QosType},
    types::{GlobalObjectId, ObjectId, ObjectType, TransportGroupId},
    world::{
        EntityFactory, ObjectKinds, ObjectMessageRouter, ObjectMessageSender, ObjectRole,
        Quaternion, ReplicatedObjectStore, ReplicationEvent, Replicator, StoreError, Vec3,
    },
};

/// Capacity and wiring knobs, fixed at construction.
pub struct NetworkConfig {
    /// Remote connections allowed at once. Bounds the id pool.
    pub max_connections: usize,
    /// Replicated objects allowed at once. Bounds the store.
    pub max_objects: usize,
    /// Group carrying plain connection-level messages.
    pub default_group: TransportGroupId,
    /// Group carrying replication traffic.
    pub object_group: TransportGroupId,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_connections: 16,
            max_objects: 256,
            default_group: TransportGroupId::DEFAULT,
            object_group: TransportGroupId::OBJECTS,
        }
    }
}

// Lifecycle transitions driven from outside `process` still surface as
// events on the next `process` call.
enum CarryoverEvent {
    Establishment(ConnectionId),
    Disconnection(ConnectionId),
}

/// Everything one `process` call observed, grouped by category.
/// Drain with the `take_` accessors.
pub struct Events<E> {
    approvals: Vec<(ConnectionId, Vec<u8>)>,
    establishments: Vec<ConnectionId>,
    disconnections: Vec<ConnectionId>,
    spawned: Vec<(ObjectId, E)>,
    removed: Vec<(ObjectId, E)>,
}

impl<E> Events<E> {
    fn new() -> Self {
        Self {
            approvals: Vec::new(),
            establishments: Vec::new(),
            disconnections: Vec::new(),
            spawned: Vec::new(),
            removed: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.approvals.is_empty()
            && self.establishments.is_empty()
            && self.disconnections.is_empty()
            && self.spawned.is_empty()
            && self.removed.is_empty()
    }

    /// Incoming requests waiting on `approve` or `deny`, with the
    /// secret each one carried.
    pub fn take_approvals(&mut self) -> Vec<(ConnectionId, Vec<u8>)> {
        mem::take(&mut self.approvals)
    }

    pub fn take_establishments(&mut self) -> Vec<ConnectionId> {
        mem::take(&mut self.establishments)
    }

    pub fn take_disconnections(&mut self) -> Vec<ConnectionId> {
        mem::take(&mut self.disconnections)
    }

    /// Objects spawned by remote announcements.
    pub fn take_spawned(&mut self) -> Vec<(ObjectId, E)> {
        mem::take(&mut self.spawned)
    }

    /// Objects removed by remote deletions or peer departures.
    pub fn take_removed(&mut self) -> Vec<(ObjectId, E)> {
        mem::take(&mut self.removed)
    }
}

/// The composition root. Owns every networking collaborator outright
/// and passes them to each other explicitly, so the whole subsystem is
/// a single value with a single owner. Call `process` once per frame to
/// drain transports and dispatch everything that arrived.
pub struct NetworkSystems<E> {
    config: NetworkConfig,
    message_kinds: MessageKinds,
    object_message_kinds: MessageKinds,
    manager: ConnectionManager,
    connectionless: Option<Box<dyn ConnectionlessTransporter>>,
    group_router: TransportGroupRouter,
    message_router: MessageRouter,
    message_pool: MessagePool,
    object_kinds: ObjectKinds<E>,
    store: ReplicatedObjectStore<E>,
    replicator: Replicator,
    latency: LatencyInfo,
    pings: PingStore,
    next_frame_id: u32,
    ping_type_id: Option<MessageTypeId>,
    pong_type_id: Option<MessageTypeId>,
    carryover: Vec<CarryoverEvent>,
}

impl<E: Copy + Eq + Hash + Debug + 'static> NetworkSystems<E> {
    /// Locks the protocol if the caller has not, then assembles the
    /// subsystem around the given connection-oriented transporter.
    pub fn new(
        config: NetworkConfig,
        mut protocol: Protocol,
        transporter: Box<dyn ConnectionTransporter>,
    ) -> Self {
        if !protocol.is_locked() {
            protocol.lock();
        }
        let message_kinds = mem::take(&mut protocol.message_kinds);
        let object_message_kinds = mem::take(&mut protocol.object_message_kinds);
        let ping_type_id = message_kinds.type_id_of(MessageKind::of::<Ping>());
        let pong_type_id = message_kinds.type_id_of(MessageKind::of::<Pong>());

        let mut group_router = TransportGroupRouter::new();
        group_router.open_group(config.default_group);
        group_router.open_group(config.object_group);

        Self {
            manager: ConnectionManager::new(transporter, config.max_connections),
            connectionless: None,
            group_router,
            message_router: MessageRouter::new(),
            message_pool: MessagePool::new(),
            object_kinds: ObjectKinds::new(),
            store: ReplicatedObjectStore::new(config.max_objects),
            replicator: Replicator::new(config.object_group),
            latency: LatencyInfo::new(),
            pings: PingStore::new(),
            next_frame_id: 0,
            ping_type_id,
            pong_type_id,
            carryover: Vec::new(),
            config,
            message_kinds,
            object_message_kinds,
        }
    }

    /// Attaches a transporter for traffic outside any connection, for
    /// instance discovery broadcasts.
    pub fn set_connectionless_transporter(
        &mut self,
        transporter: Box<dyn ConnectionlessTransporter>,
    ) {
        self.connectionless = Some(transporter);
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    // Connections

    /// Starts an attempt toward `address`. The callbacks report how it
    /// resolves; `secret` is shown to the remote side during approval.
    pub fn connect(
        &mut self,
        address: &SocketAddr,
        secret: &[u8],
        callbacks: ConnectCallbacks,
    ) -> Result<ConnectionId, ConnectError> {
        self.manager.connect(address, secret, callbacks)
    }

    /// Tears down an established connection and purges everything the
    /// departed peer owned.
    pub fn disconnect(&mut self, connection: ConnectionId) {
        let was_connected = self.manager.is_connected(connection);
        self.manager.disconnect(connection);
        if was_connected {
            self.teardown_connection(connection);
            self.carryover.push(CarryoverEvent::Disconnection(connection));
        }
    }

    /// Withdraws an attempt that has not established yet. None of its
    /// callbacks will ever fire.
    pub fn cancel_pending(&mut self, connection: ConnectionId) {
        self.manager.cancel_pending(connection);
    }

    /// Admits a request surfaced through `take_approvals`. On success
    /// the new peer joins every group and the establishment surfaces on
    /// the next `process`.
    pub fn approve(&mut self, connection: ConnectionId) -> bool {
        if !self.manager.approve(connection) {
            return false;
        }
        self.group_router.connection_joined(connection);
        self.carryover
            .push(CarryoverEvent::Establishment(connection));
        true
    }

    /// Turns away a request surfaced through `take_approvals`.
    pub fn deny(&mut self, connection: ConnectionId) {
        self.manager.deny(connection);
    }

    pub fn is_connected(&self, connection: ConnectionId) -> bool {
        self.manager.is_connected(connection)
    }

    pub fn connections(&self) -> Vec<ConnectionId> {
        self.manager.connections()
    }

    /// Round trip to `connection` in milliseconds, zero before the
    /// first echo.
    pub fn latency(&self, connection: ConnectionId) -> f32 {
        self.latency.latency(connection)
    }

    pub fn latency_info(&self) -> &LatencyInfo {
        &self.latency
    }

    // Messages

    /// Registers the handler for connection-level messages of type `M`.
    pub fn on_message<M: Message>(
        &mut self,
        handler: impl FnMut(&MessageMetaData, &M) + 'static,
    ) -> &mut Self {
        self.message_router.on::<M>(&self.message_kinds, handler);
        self
    }

    /// Sends one message to an established connection.
    pub fn send_message<M: Message>(
        &mut self,
        connection: ConnectionId,
        message: &M,
    ) -> Result<(), MessageError> {
        let bytes = self.message_kinds.write_message(message)?;
        self.send_on_default(connection, M::QOS, &bytes)
    }

    /// Sends one message to every established connection, in shuffled
    /// order so no connection is always served first. Per-connection
    /// failures degrade to a log line.
    pub fn broadcast_message<M: Message>(&mut self, message: &M) -> Result<(), MessageError> {
        let bytes = self.message_kinds.write_message(message)?;
        let mut targets = match self.group_router.group(self.config.default_group) {
            Some(group) => group.connections().to_vec(),
            None => return Ok(()),
        };
        fastrand::shuffle(&mut targets);
        for connection in targets {
            if let Err(error) = self.send_on_default(connection, M::QOS, &bytes) {
                warn!("broadcast skipped {:?}: {}", connection, error);
            }
        }
        Ok(())
    }

    /// Sends one message outside any connection. No group header, no
    /// sequence number; the receiver sees it with no sender id.
    pub fn send_connectionless<M: Message>(
        &mut self,
        address: &SocketAddr,
        message: &M,
    ) -> Result<(), MessageError> {
        let bytes = self.message_kinds.write_message(message)?;
        let Some(transporter) = self.connectionless.as_mut() else {
            return Err(MessageError::NoConnectionlessTransport);
        };
        transporter
            .send_to(address, &bytes)
            .map_err(|_| MessageError::TransportSend {
                connection: ConnectionId::NO_CONNECTION.to_i32(),
            })
    }

    /// Sends one latency probe to every established connection. Echoes
    /// resolve into `latency` samples during `process`.
    pub fn send_pings(&mut self, client_time: f32, fixed_time: f32) {
        let frame_id = self.next_frame_id;
        self.next_frame_id = self.next_frame_id.wrapping_add(1);
        let ping = Ping {
            frame_id,
            client_time,
            fixed_time,
        };
        let bytes = match self.message_kinds.write_message(&ping) {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!("could not encode a ping: {}", error);
                return;
            }
        };
        for connection in self.manager.connections() {
            if self.send_on_default(connection, Ping::QOS, &bytes).is_ok() {
                self.pings.record_sent(connection, frame_id);
            }
        }
    }

    // Objects

    /// Registers an object type and the handler wiring every instance
    /// of it receives.
    pub fn register_object_type(
        &mut self,
        object_type: ObjectType,
        installer: impl Fn(&mut ObjectMessageRouter<E>) + 'static,
    ) -> &mut Self {
        self.object_kinds.add_object_type(object_type, installer);
        self
    }

    /// Creates an object with local authority and announces it to every
    /// peer in the replication group.
    pub fn create_object(
        &mut self,
        factory: &mut dyn EntityFactory<E>,
        object_type: ObjectType,
        object_id: ObjectId,
        position: Vec3,
        rotation: Quaternion,
    ) -> Result<E, StoreError> {
        self.replicator.create_object(
            factory,
            &self.message_kinds,
            &self.object_kinds,
            &mut self.store,
            &mut self.group_router,
            &mut self.manager,
            object_type,
            object_id,
            position,
            rotation,
        )
    }

    /// Starts replicating an entity that already exists locally,
    /// without announcing anything. Both sides of an out-of-band
    /// agreement call this with the same object id.
    #[allow(clippy::too_many_arguments)]
    pub fn add_existing_object(
        &mut self,
        object_type: ObjectType,
        role: ObjectRole,
        owner: ConnectionId,
        entity: E,
        object_id: ObjectId,
        global_id: GlobalObjectId,
    ) -> Result<(), StoreError> {
        self.store.add_existing_instance(
            &self.object_kinds,
            object_type,
            role,
            owner,
            entity,
            object_id,
            global_id,
        )
    }

    /// Destroys a local object, announcing the deletion when this side
    /// held authority. Returns whether anything was removed.
    pub fn destroy_object(
        &mut self,
        factory: &mut dyn EntityFactory<E>,
        object_id: ObjectId,
    ) -> bool {
        self.replicator.destroy_object(
            factory,
            &self.message_kinds,
            &mut self.store,
            &mut self.group_router,
            &mut self.manager,
            object_id,
        )
    }

    /// Send handle for a live object, or `None` once it is gone.
    pub fn object_sender(&self, object_id: ObjectId) -> Option<ObjectMessageSender> {
        self.store.sender(object_id)
    }

    /// Buffers a message that peers replay when they first learn of the
    /// object, before their gameplay can observe it.
    pub fn buffer_spawn_message<M: Message>(
        &mut self,
        sender: ObjectMessageSender,
        message: &M,
    ) -> Result<(), MessageError> {
        let bytes = self.object_message_kinds.write_message(message)?;
        self.store.buffer_spawn_message(sender.object_id(), bytes);
        Ok(())
    }

    /// Sends one object message to a single peer.
    pub fn send_object_message<M: Message>(
        &mut self,
        connection: ConnectionId,
        sender: ObjectMessageSender,
        message: &M,
    ) -> Result<(), MessageError> {
        self.replicator.send_object_message(
            &self.message_kinds,
            &self.object_message_kinds,
            &self.store,
            &mut self.group_router,
            &mut self.manager,
            connection,
            sender,
            message,
        )
    }

    /// Sends one object message to every peer in the replication group.
    pub fn broadcast_object_message<M: Message>(
        &mut self,
        sender: ObjectMessageSender,
        message: &M,
    ) -> Result<(), MessageError> {
        self.replicator.broadcast_object_message(
            &self.message_kinds,
            &self.object_message_kinds,
            &self.store,
            &mut self.group_router,
            &mut self.manager,
            sender,
            message,
        )
    }

    pub fn entity(&self, object_id: ObjectId) -> Option<E> {
        self.store.entity(object_id)
    }

    pub fn object_role(&self, object_id: ObjectId) -> Option<ObjectRole> {
        self.store.role(object_id)
    }

    pub fn object_id_of_global(&self, global_id: GlobalObjectId) -> Option<ObjectId> {
        self.store.object_id_of_global(global_id)
    }

    /// Updates the transform carried by future creation announcements.
    pub fn set_object_transform(
        &mut self,
        object_id: ObjectId,
        position: Vec3,
        rotation: Quaternion,
    ) {
        self.store.set_transform(object_id, position, rotation);
    }

    pub fn object_store(&self) -> &ReplicatedObjectStore<E> {
        &self.store
    }

    pub fn replication_group(&self) -> Option<&ConnectionGroup> {
        self.group_router.group(self.config.object_group)
    }

    // Pump

    /// Drains both transports and dispatches everything that arrived:
    /// lifecycle transitions, replication traffic, then connection-level
    /// messages.
    pub fn process(&mut self, factory: &mut dyn EntityFactory<E>) -> Events<E> {
        let mut events = Events::new();
        for carryover in mem::take(&mut self.carryover) {
            match carryover {
                CarryoverEvent::Establishment(connection) => {
                    events.establishments.push(connection);
                }
                CarryoverEvent::Disconnection(connection) => {
                    events.disconnections.push(connection);
                }
            }
        }
        self.pump_connectionless();
        self.pump_connections(&mut events);
        self.pump_replication(factory, &mut events);
        self.pump_default_group();
        events
    }

    fn pump_connectionless(&mut self) {
        let Some(transporter) = self.connectionless.as_mut() else {
            return;
        };
        loop {
            let (address, payload) = match transporter.receive_from() {
                Ok(Some(datagram)) => datagram,
                Ok(None) => break,
                Err(_) => {
                    warn!("connectionless transporter failed while polling, abandoning this drain");
                    break;
                }
            };
            let meta = MessageMetaData {
                sender: ConnectionId::NO_CONNECTION,
                sequence: SequenceNumber::ZERO,
                latency: 0.0,
                endpoint: Some(address),
            };
            let mut reader = ByteReader::new(&payload);
            self.message_router
                .dispatch(&self.message_kinds, &mut self.message_pool, &meta, &mut reader);
        }
    }

    fn pump_connections(&mut self, events: &mut Events<E>) {
        for event in self.manager.process_transport() {
            match event {
                ConnectionEvent::ApprovalRequested { connection, secret } => {
                    events.approvals.push((connection, secret.into_vec()));
                }
                ConnectionEvent::Established { connection } => {
                    self.group_router.connection_joined(connection);
                    events.establishments.push(connection);
                }
                ConnectionEvent::AttemptFailed { .. } => {
                    // already resolved through the attempt's callbacks
                }
                ConnectionEvent::Disconnected { connection } => {
                    self.teardown_connection(connection);
                    events.disconnections.push(connection);
                }
                ConnectionEvent::Data { connection, payload } => {
                    self.group_router.route_inbound(connection, &payload);
                }
            }
        }
    }

    fn pump_replication(&mut self, factory: &mut dyn EntityFactory<E>, events: &mut Events<E>) {
        let (group_events, inbound) = {
            let Some(group) = self.group_router.group_mut(self.config.object_group) else {
                return;
            };
            (group.take_events(), group.take_inbound())
        };
        for event in group_events {
            match event {
                GroupEvent::PeerJoined(connection) => {
                    self.replicator.handle_peer_joined(
                        &self.message_kinds,
                        &self.store,
                        &mut self.group_router,
                        &mut self.manager,
                        connection,
                    );
                }
                GroupEvent::PeerLeft(connection) => {
                    let removals =
                        self.replicator
                            .handle_peer_left(factory, &mut self.store, connection);
                    Self::collect_replication_events(removals, events);
                }
            }
        }
        for (connection, sequence, payload) in inbound {
            let meta = MessageMetaData {
                sender: connection,
                sequence,
                latency: self.latency.latency(connection),
                endpoint: None,
            };
            let changes = self.replicator.process_datagram(
                factory,
                &self.message_kinds,
                &self.object_message_kinds,
                &self.object_kinds,
                &mut self.store,
                &meta,
                &payload,
            );
            Self::collect_replication_events(changes, events);
        }
    }

    fn pump_default_group(&mut self) {
        let inbound = {
            let Some(group) = self.group_router.group_mut(self.config.default_group) else {
                return;
            };
            // membership on the default group has no observer, drop it
            let _ = group.take_events();
            group.take_inbound()
        };
        for (connection, sequence, payload) in inbound {
            let meta = MessageMetaData {
                sender: connection,
                sequence,
                latency: self.latency.latency(connection),
                endpoint: None,
            };
            let mut reader = ByteReader::new(&payload);
            let type_id = match MessageTypeId::de(&mut reader) {
                Ok(type_id) => type_id,
                Err(error) => {
                    warn!("dropping a message with an unreadable tag: {}", error);
                    continue;
                }
            };
            if Some(type_id) == self.ping_type_id {
                self.handle_ping(connection, &mut reader);
            } else if Some(type_id) == self.pong_type_id {
                self.handle_pong(connection, &mut reader);
            } else {
                self.message_router.dispatch_known(
                    &self.message_kinds,
                    &mut self.message_pool,
                    type_id,
                    &meta,
                    &mut reader,
                );
            }
        }
    }

    fn handle_ping(&mut self, connection: ConnectionId, reader: &mut ByteReader) {
        let mut ping = Ping::default();
        if let Err(error) = ping.de(reader) {
            warn!("dropping a malformed ping: {}", error);
            return;
        }
        let pong = Pong::from(&ping);
        let bytes = match self.message_kinds.write_message(&pong) {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!("could not encode a pong: {}", error);
                return;
            }
        };
        if self.send_on_default(connection, Pong::QOS, &bytes).is_err() {
            debug!("could not echo a ping back to {:?}", connection);
        }
    }

    fn handle_pong(&mut self, connection: ConnectionId, reader: &mut ByteReader) {
        let mut pong = Pong::default();
        if let Err(error) = pong.de(reader) {
            warn!("dropping a malformed pong: {}", error);
            return;
        }
        if let Some(round_trip) = self.pings.resolve(connection, pong.frame_id) {
            self.latency.update_latency(connection, round_trip);
        }
    }

    fn collect_replication_events(changes: Vec<ReplicationEvent<E>>, events: &mut Events<E>) {
        for change in changes {
            match change {
                ReplicationEvent::Spawned { object_id, entity } => {
                    events.spawned.push((object_id, entity));
                }
                ReplicationEvent::Removed { object_id, entity } => {
                    events.removed.push((object_id, entity));
                }
            }
        }
    }

    fn send_on_default(
        &mut self,
        connection: ConnectionId,
        qos: QosType,
        message: &[u8],
    ) -> Result<(), MessageError> {
        let Some(datagram) =
            self.group_router
                .frame_outbound(self.config.default_group, connection, message)
        else {
            return Err(MessageError::NotConnected {
                connection: connection.to_i32(),
            });
        };
        self.manager
            .send(connection, qos, &datagram)
            .map_err(|_| MessageError::TransportSend {
                connection: connection.to_i32(),
            })
    }

    fn teardown_connection(&mut self, connection: ConnectionId) {
        self.group_router.connection_left(connection);
        self.pings.clear_connection(connection);
        self.latency.clear(connection);
    }
}
