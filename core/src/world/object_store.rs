use std::{
    collections::HashMap,
    fmt::Debug,
    hash::Hash,
};

use log::{debug, warn};

use crate::{
    connection::ConnectionId,
    messages::{AnyMessage, MessageKind, MessageMetaData},
    types::{GlobalObjectId, ObjectId, ObjectType},
};

use super::{
    EntityFactory, ObjectKinds, ObjectMessageRouter, ObjectRole, Quaternion, StoreError, Vec3,
};

/// Send handle for one replicated object. Holds only the id; hand it
/// to the object send operations along with the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectMessageSender {
    object_id: ObjectId,
}

impl ObjectMessageSender {
    pub(crate) fn new(object_id: ObjectId) -> Self {
        Self { object_id }
    }

    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }
}

/// One live replicated object.
pub struct ObjectRecord<E> {
    pub(crate) object_id: ObjectId,
    pub(crate) object_type: ObjectType,
    pub(crate) role: ObjectRole,
    pub(crate) owner: ConnectionId,
    pub(crate) entity: E,
    pub(crate) position: Vec3,
    pub(crate) rotation: Quaternion,
    pub(crate) active: bool,
    pub(crate) router: ObjectMessageRouter<E>,
    pub(crate) spawn_messages: Vec<Vec<u8>>,
}

impl<E: Copy> ObjectRecord<E> {
    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    pub fn role(&self) -> ObjectRole {
        self.role
    }

    pub fn owner(&self) -> ConnectionId {
        self.owner
    }

    pub fn entity(&self) -> E {
        self.entity
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Quaternion {
        self.rotation
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Framed object messages replayed to peers at creation time.
    pub fn spawn_messages(&self) -> &[Vec<u8>] {
        &self.spawn_messages
    }
}

/// Arena of live replicated objects, bounded at construction. The
/// store owns every record outright and is the only place an object id
/// resolves to an entity, so nothing else holds references into it.
pub struct ReplicatedObjectStore<E> {
    slots: Vec<Option<ObjectRecord<E>>>,
    index: HashMap<ObjectId, usize>,
    globals: HashMap<GlobalObjectId, ObjectId>,
    capacity: usize,
}

impl<E: Copy + Eq + Hash + Debug + 'static> ReplicatedObjectStore<E> {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
            globals: HashMap::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, object_id: ObjectId) -> bool {
        self.index.contains_key(&object_id)
    }

    /// Creates the record and entity for a new replicated object. The
    /// instance starts inactive; apply any creation-time state, then
    /// `activate` it. Fails before touching the factory when the id is
    /// taken or the store is full.
    #[allow(clippy::too_many_arguments)]
    pub fn instantiate(
        &mut self,
        factory: &mut dyn EntityFactory<E>,
        kinds: &ObjectKinds<E>,
        object_type: ObjectType,
        role: ObjectRole,
        object_id: ObjectId,
        owner: ConnectionId,
        position: Vec3,
        rotation: Quaternion,
    ) -> Result<E, StoreError> {
        if self.index.contains_key(&object_id) {
            return Err(StoreError::DuplicateObjectId {
                object_id: object_id.to_u32(),
            });
        }
        if self.index.len() >= self.capacity {
            return Err(StoreError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        let entity = factory.instantiate(object_type, object_id, role, position, rotation)?;
        self.insert_record(ObjectRecord {
            object_id,
            object_type,
            role,
            owner,
            entity,
            position,
            rotation,
            active: false,
            router: kinds.install(object_type),
            spawn_messages: Vec::new(),
        });
        Ok(entity)
    }

    /// Marks an instance live for gameplay. Separate from construction
    /// so buffered creation-time messages apply before the entity
    /// starts producing side effects of its own.
    pub fn activate(&mut self, object_id: ObjectId) {
        if let Some(record) = self.record_mut(object_id) {
            record.active = true;
        }
    }

    /// Binds replication bookkeeping to an entity that already exists
    /// locally, mapping its stable global id to the transient object
    /// id. The instance starts active.
    #[allow(clippy::too_many_arguments)]
    pub fn add_existing_instance(
        &mut self,
        kinds: &ObjectKinds<E>,
        object_type: ObjectType,
        role: ObjectRole,
        owner: ConnectionId,
        entity: E,
        object_id: ObjectId,
        global_id: GlobalObjectId,
    ) -> Result<(), StoreError> {
        if self.index.contains_key(&object_id) {
            return Err(StoreError::DuplicateObjectId {
                object_id: object_id.to_u32(),
            });
        }
        if self.index.len() >= self.capacity {
            return Err(StoreError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        self.globals.insert(global_id, object_id);
        self.insert_record(ObjectRecord {
            object_id,
            object_type,
            role,
            owner,
            entity,
            position: Vec3::ZERO,
            rotation: Quaternion::IDENTITY,
            active: true,
            router: kinds.install(object_type),
            spawn_messages: Vec::new(),
        });
        Ok(())
    }

    /// Delivers one parsed object message to the target's role-gated
    /// handlers. A missing target is an expected race with teardown
    /// and drops silently.
    pub fn dispatch_message(
        &mut self,
        object_id: ObjectId,
        kind: MessageKind,
        meta: &MessageMetaData,
        message: &dyn AnyMessage,
    ) {
        let Some(record) = self.record_mut(object_id) else {
            debug!("dropping a message for absent object {:?}", object_id);
            return;
        };
        let entity = record.entity;
        let role = record.role;
        record.router.dispatch(role, entity, kind, meta, message);
    }

    /// Destroys the record and its entity. Only the object's owner, or
    /// the local peer itself, may remove it; removal of an absent id is
    /// a no-op. Returns whether a record went away.
    pub fn remove_replicated_instance(
        &mut self,
        factory: &mut dyn EntityFactory<E>,
        requester: ConnectionId,
        object_id: ObjectId,
    ) -> bool {
        let Some(&slot_index) = self.index.get(&object_id) else {
            return false;
        };
        let owner = match self.slots[slot_index].as_ref() {
            Some(record) => record.owner,
            None => return false,
        };
        if requester != owner && requester != ConnectionId::LOCAL {
            warn!(
                "refusing removal of {:?} requested by {:?}, owner is {:?}",
                object_id, requester, owner
            );
            return false;
        }
        let Some(record) = self.slots[slot_index].take() else {
            return false;
        };
        self.index.remove(&object_id);
        self.globals.retain(|_, id| *id != object_id);
        factory.destroy(record.entity);
        true
    }

    /// Buffers one framed object message, replayed on every peer that
    /// later receives this object's creation.
    pub fn buffer_spawn_message(&mut self, object_id: ObjectId, payload: Vec<u8>) {
        if let Some(record) = self.record_mut(object_id) {
            record.spawn_messages.push(payload);
        }
    }

    /// Updates the recorded transform carried by future creation
    /// broadcasts.
    pub fn set_transform(&mut self, object_id: ObjectId, position: Vec3, rotation: Quaternion) {
        if let Some(record) = self.record_mut(object_id) {
            record.position = position;
            record.rotation = rotation;
        }
    }

    pub fn record(&self, object_id: ObjectId) -> Option<&ObjectRecord<E>> {
        let index = self.index.get(&object_id)?;
        self.slots[*index].as_ref()
    }

    /// Every live record, in slot order.
    pub fn records(&self) -> impl Iterator<Item = &ObjectRecord<E>> {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }

    pub fn entity(&self, object_id: ObjectId) -> Option<E> {
        self.record(object_id).map(|record| record.entity)
    }

    pub fn role(&self, object_id: ObjectId) -> Option<ObjectRole> {
        self.record(object_id).map(|record| record.role)
    }

    pub fn owner(&self, object_id: ObjectId) -> Option<ConnectionId> {
        self.record(object_id).map(|record| record.owner)
    }

    /// Ids of live objects owned by `owner`.
    pub fn owned_by(&self, owner: ConnectionId) -> Vec<ObjectId> {
        self.records()
            .filter(|record| record.owner == owner)
            .map(|record| record.object_id)
            .collect()
    }

    /// Transient object id bound to a stable global id, when networked.
    pub fn object_id_of_global(&self, global_id: GlobalObjectId) -> Option<ObjectId> {
        self.globals.get(&global_id).copied()
    }

    /// Send handle for a live object.
    pub fn sender(&self, object_id: ObjectId) -> Option<ObjectMessageSender> {
        self.contains(object_id)
            .then(|| ObjectMessageSender::new(object_id))
    }

    fn record_mut(&mut self, object_id: ObjectId) -> Option<&mut ObjectRecord<E>> {
        let index = self.index.get(&object_id)?;
        self.slots[*index].as_mut()
    }

    fn insert_record(&mut self, record: ObjectRecord<E>) {
        let object_id = record.object_id;
        let index = match self.slots.iter().position(|slot| slot.is_none()) {
            Some(index) => {
                self.slots[index] = Some(record);
                index
            }
            None => {
                self.slots.push(Some(record));
                self.slots.len() - 1
            }
        };
        self.index.insert(object_id, index);
    }
}
