use std::{fmt::Debug, hash::Hash};

use log::{debug, warn};

use crate::{
    connection::{ConnectionId, ConnectionManager},
    group::TransportGroupRouter,
    messages::{Message, MessageError, MessageKinds, MessageMetaData, MessagePool, MessageTypeId},
    serde::{ByteReader, Serde},
    transport::QosType,
    types::{ObjectId, ObjectType, TransportGroupId},
};

use super::{
    system_messages::{CreateObject, DeleteObject, ToObject},
    EntityFactory, ObjectKinds, ObjectMessageParser, ObjectMessageSender, ObjectRole, Quaternion,
    ReplicatedObjectStore, StoreError, Vec3,
};

/// Store-side change produced while applying replication traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationEvent<E> {
    Spawned { object_id: ObjectId, entity: E },
    Removed { object_id: ObjectId, entity: E },
}

/// Drives object replication over one transport group: announces local
/// creations and deletions, applies remote ones to the store, and
/// frames per-object messages into `ToObject` envelopes. Owns no
/// connections or objects itself; every call borrows the collaborators
/// it touches, so there is exactly one owner of each.
pub struct Replicator {
    group: TransportGroupId,
    system_pool: MessagePool,
    object_pool: MessagePool,
}

impl Replicator {
    pub fn new(group: TransportGroupId) -> Self {
        Self {
            group,
            system_pool: MessagePool::new(),
            object_pool: MessagePool::new(),
        }
    }

    /// Group tag replication traffic rides on.
    pub fn group(&self) -> TransportGroupId {
        self.group
    }

    /// Creates an object locally with authority and announces it to
    /// every peer in the replication group.
    #[allow(clippy::too_many_arguments)]
    pub fn create_object<E>(
        &self,
        factory: &mut dyn EntityFactory<E>,
        system_kinds: &MessageKinds,
        object_kinds: &ObjectKinds<E>,
        store: &mut ReplicatedObjectStore<E>,
        group_router: &mut TransportGroupRouter,
        manager: &mut ConnectionManager,
        object_type: ObjectType,
        object_id: ObjectId,
        position: Vec3,
        rotation: Quaternion,
    ) -> Result<E, StoreError>
    where
        E: Copy + Eq + Hash + Debug + 'static,
    {
        let entity = store.instantiate(
            factory,
            object_kinds,
            object_type,
            ObjectRole::Authority,
            object_id,
            ConnectionId::LOCAL,
            position,
            rotation,
        )?;
        store.activate(object_id);
        let announcement = CreateObject {
            object_type,
            object_id,
            role: ObjectRole::NonAuthoritive,
            position,
            rotation,
            replay: Vec::new(),
        };
        self.broadcast_system_message(system_kinds, group_router, manager, &announcement);
        Ok(entity)
    }

    /// Destroys a local object. Peers hear about it only when this side
    /// held authority; removing a replica is a purely local cleanup.
    /// Returns whether anything was removed.
    pub fn destroy_object<E>(
        &self,
        factory: &mut dyn EntityFactory<E>,
        system_kinds: &MessageKinds,
        store: &mut ReplicatedObjectStore<E>,
        group_router: &mut TransportGroupRouter,
        manager: &mut ConnectionManager,
        object_id: ObjectId,
    ) -> bool
    where
        E: Copy + Eq + Hash + Debug + 'static,
    {
        let Some(role) = store.role(object_id) else {
            return false;
        };
        if !store.remove_replicated_instance(factory, ConnectionId::LOCAL, object_id) {
            return false;
        }
        if role == ObjectRole::Authority {
            self.broadcast_system_message(
                system_kinds,
                group_router,
                manager,
                &DeleteObject { object_id },
            );
        }
        true
    }

    /// Announces every object this side has authority over to a peer
    /// that just joined the replication group, buffered creation-time
    /// messages included.
    pub fn handle_peer_joined<E>(
        &self,
        system_kinds: &MessageKinds,
        store: &ReplicatedObjectStore<E>,
        group_router: &mut TransportGroupRouter,
        manager: &mut ConnectionManager,
        connection: ConnectionId,
    ) where
        E: Copy + Eq + Hash + Debug + 'static,
    {
        for record in store.records() {
            if record.role() != ObjectRole::Authority {
                continue;
            }
            let announcement = CreateObject {
                object_type: record.object_type(),
                object_id: record.object_id(),
                role: ObjectRole::NonAuthoritive,
                position: record.position(),
                rotation: record.rotation(),
                replay: record.spawn_messages().to_vec(),
            };
            let bytes = match system_kinds.write_message(&announcement) {
                Ok(bytes) => bytes,
                Err(error) => {
                    warn!("could not encode a creation announcement: {}", error);
                    continue;
                }
            };
            self.send_framed(group_router, manager, connection, CreateObject::QOS, &bytes);
        }
    }

    /// Purges every object owned by a peer that left the replication
    /// group. Local cleanup only, nothing goes on the wire; other peers
    /// observe the same departure themselves.
    pub fn handle_peer_left<E>(
        &self,
        factory: &mut dyn EntityFactory<E>,
        store: &mut ReplicatedObjectStore<E>,
        connection: ConnectionId,
    ) -> Vec<ReplicationEvent<E>>
    where
        E: Copy + Eq + Hash + Debug + 'static,
    {
        let mut events = Vec::new();
        for object_id in store.owned_by(connection) {
            let Some(entity) = store.entity(object_id) else {
                continue;
            };
            if store.remove_replicated_instance(factory, connection, object_id) {
                events.push(ReplicationEvent::Removed { object_id, entity });
            }
        }
        events
    }

    /// Applies one replication-group datagram, already stripped of its
    /// group header. Malformed or unexpected traffic degrades to a log
    /// line.
    #[allow(clippy::too_many_arguments)]
    pub fn process_datagram<E>(
        &mut self,
        factory: &mut dyn EntityFactory<E>,
        system_kinds: &MessageKinds,
        object_message_kinds: &MessageKinds,
        object_kinds: &ObjectKinds<E>,
        store: &mut ReplicatedObjectStore<E>,
        meta: &MessageMetaData,
        payload: &[u8],
    ) -> Vec<ReplicationEvent<E>>
    where
        E: Copy + Eq + Hash + Debug + 'static,
    {
        let mut events = Vec::new();
        let mut reader = ByteReader::new(payload);
        let type_id = match MessageTypeId::de(&mut reader) {
            Ok(type_id) => type_id,
            Err(error) => {
                warn!(
                    "dropping a replication datagram with an unreadable tag: {}",
                    error
                );
                return events;
            }
        };
        let Some(instance) = self.system_pool.instance_mut(system_kinds, type_id) else {
            warn!(
                "dropping a replication datagram with unknown kind {:?}",
                type_id
            );
            return events;
        };
        if let Err(error) = instance.read(&mut reader) {
            warn!("dropping a malformed replication datagram: {}", error);
            return events;
        }
        let message = instance.as_any();
        if let Some(create) = message.downcast_ref::<CreateObject>() {
            Self::apply_create(
                &mut self.object_pool,
                factory,
                object_message_kinds,
                object_kinds,
                store,
                meta,
                create,
                &mut events,
            );
        } else if let Some(delete) = message.downcast_ref::<DeleteObject>() {
            Self::apply_delete(factory, store, meta, delete, &mut events);
        } else if let Some(envelope) = message.downcast_ref::<ToObject>() {
            Self::apply_object_payload(
                &mut self.object_pool,
                object_message_kinds,
                store,
                meta,
                envelope.object_id,
                &envelope.payload,
            );
        } else {
            warn!("dropping a non-replication message on the replication group");
        }
        events
    }

    /// Sends one object message to a single peer. A dead target object
    /// is an expected race with teardown and succeeds without sending.
    #[allow(clippy::too_many_arguments)]
    pub fn send_object_message<E, M>(
        &self,
        system_kinds: &MessageKinds,
        object_message_kinds: &MessageKinds,
        store: &ReplicatedObjectStore<E>,
        group_router: &mut TransportGroupRouter,
        manager: &mut ConnectionManager,
        connection: ConnectionId,
        sender: ObjectMessageSender,
        message: &M,
    ) -> Result<(), MessageError>
    where
        E: Copy + Eq + Hash + Debug + 'static,
        M: Message,
    {
        if !store.contains(sender.object_id()) {
            debug!(
                "dropping a message for despawned object {:?}",
                sender.object_id()
            );
            return Ok(());
        }
        let bytes = Self::prepare_object_message(
            system_kinds,
            object_message_kinds,
            sender.object_id(),
            message,
        )?;
        self.send_body(group_router, manager, connection, M::QOS, &bytes)
    }

    /// Sends one object message to every peer in the replication group,
    /// in shuffled order so no connection is always served first.
    #[allow(clippy::too_many_arguments)]
    pub fn broadcast_object_message<E, M>(
        &self,
        system_kinds: &MessageKinds,
        object_message_kinds: &MessageKinds,
        store: &ReplicatedObjectStore<E>,
        group_router: &mut TransportGroupRouter,
        manager: &mut ConnectionManager,
        sender: ObjectMessageSender,
        message: &M,
    ) -> Result<(), MessageError>
    where
        E: Copy + Eq + Hash + Debug + 'static,
        M: Message,
    {
        if !store.contains(sender.object_id()) {
            debug!(
                "dropping a broadcast for despawned object {:?}",
                sender.object_id()
            );
            return Ok(());
        }
        let bytes = Self::prepare_object_message(
            system_kinds,
            object_message_kinds,
            sender.object_id(),
            message,
        )?;
        self.broadcast_body(group_router, manager, M::QOS, &bytes);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_create<E>(
        object_pool: &mut MessagePool,
        factory: &mut dyn EntityFactory<E>,
        object_message_kinds: &MessageKinds,
        object_kinds: &ObjectKinds<E>,
        store: &mut ReplicatedObjectStore<E>,
        meta: &MessageMetaData,
        create: &CreateObject,
        events: &mut Vec<ReplicationEvent<E>>,
    ) where
        E: Copy + Eq + Hash + Debug + 'static,
    {
        let spawned = store.instantiate(
            factory,
            object_kinds,
            create.object_type,
            create.role,
            create.object_id,
            meta.sender,
            create.position,
            create.rotation,
        );
        let entity = match spawned {
            Ok(entity) => entity,
            Err(error) => {
                warn!(
                    "could not create object {:?} announced by {:?}: {}",
                    create.object_id, meta.sender, error
                );
                return;
            }
        };
        // Creation-time messages apply while the instance is still
        // inactive, before gameplay can observe it.
        for item in &create.replay {
            Self::apply_object_payload(
                object_pool,
                object_message_kinds,
                store,
                meta,
                create.object_id,
                item,
            );
        }
        store.activate(create.object_id);
        events.push(ReplicationEvent::Spawned {
            object_id: create.object_id,
            entity,
        });
    }

    fn apply_delete<E>(
        factory: &mut dyn EntityFactory<E>,
        store: &mut ReplicatedObjectStore<E>,
        meta: &MessageMetaData,
        delete: &DeleteObject,
        events: &mut Vec<ReplicationEvent<E>>,
    ) where
        E: Copy + Eq + Hash + Debug + 'static,
    {
        let Some(entity) = store.entity(delete.object_id) else {
            debug!("ignoring deletion of absent object {:?}", delete.object_id);
            return;
        };
        if store.remove_replicated_instance(factory, meta.sender, delete.object_id) {
            events.push(ReplicationEvent::Removed {
                object_id: delete.object_id,
                entity,
            });
        }
    }

    fn apply_object_payload<E>(
        object_pool: &mut MessagePool,
        object_message_kinds: &MessageKinds,
        store: &mut ReplicatedObjectStore<E>,
        meta: &MessageMetaData,
        object_id: ObjectId,
        payload: &[u8],
    ) where
        E: Copy + Eq + Hash + Debug + 'static,
    {
        let mut reader = ByteReader::new(payload);
        let (type_id, body) = match ObjectMessageParser::parse(object_message_kinds, &mut reader) {
            Ok(parsed) => parsed,
            Err(error) => {
                warn!(
                    "dropping an unreadable message for object {:?}: {}",
                    object_id, error
                );
                return;
            }
        };
        let Some(kind) = object_message_kinds.kind_of(type_id) else {
            return;
        };
        let Some(instance) = object_pool.instance_mut(object_message_kinds, type_id) else {
            return;
        };
        let mut body_reader = ByteReader::new(body);
        if let Err(error) = instance.read(&mut body_reader) {
            warn!(
                "dropping a malformed message for object {:?}: {}",
                object_id, error
            );
            return;
        }
        store.dispatch_message(object_id, kind, meta, &*instance);
    }

    /// `[ToObject tag][object id][inner tag][inner body]`, ready to
    /// frame onto the replication group.
    fn prepare_object_message<M: Message>(
        system_kinds: &MessageKinds,
        object_message_kinds: &MessageKinds,
        object_id: ObjectId,
        message: &M,
    ) -> Result<Vec<u8>, MessageError> {
        let inner = object_message_kinds.write_message(message)?;
        let envelope = ToObject {
            object_id,
            payload: inner,
        };
        system_kinds.write_message(&envelope)
    }

    fn broadcast_system_message<M: Message>(
        &self,
        system_kinds: &MessageKinds,
        group_router: &mut TransportGroupRouter,
        manager: &mut ConnectionManager,
        message: &M,
    ) {
        let bytes = match system_kinds.write_message(message) {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!("could not encode a replication control message: {}", error);
                return;
            }
        };
        self.broadcast_body(group_router, manager, M::QOS, &bytes);
    }

    fn broadcast_body(
        &self,
        group_router: &mut TransportGroupRouter,
        manager: &mut ConnectionManager,
        qos: QosType,
        message: &[u8],
    ) {
        let mut targets = match group_router.group(self.group) {
            Some(group) => group.connections().to_vec(),
            None => return,
        };
        fastrand::shuffle(&mut targets);
        for connection in targets {
            self.send_framed(group_router, manager, connection, qos, message);
        }
    }

    fn send_framed(
        &self,
        group_router: &mut TransportGroupRouter,
        manager: &mut ConnectionManager,
        connection: ConnectionId,
        qos: QosType,
        message: &[u8],
    ) {
        let Some(datagram) = group_router.frame_outbound(self.group, connection, message) else {
            debug!(
                "skipping a replication frame for {:?}, not in the replication group",
                connection
            );
            return;
        };
        if manager.send(connection, qos, &datagram).is_err() {
            warn!("transport dropped a replication frame for {:?}", connection);
        }
    }

    fn send_body(
        &self,
        group_router: &mut TransportGroupRouter,
        manager: &mut ConnectionManager,
        connection: ConnectionId,
        qos: QosType,
        message: &[u8],
    ) -> Result<(), MessageError> {
        let Some(datagram) = group_router.frame_outbound(self.group, connection, message) else {
            return Err(MessageError::NotConnected {
                connection: connection.to_i32(),
            });
        };
        manager
            .send(connection, qos, &datagram)
            .map_err(|_| MessageError::TransportSend {
                connection: connection.to_i32(),
            })
    }
}
