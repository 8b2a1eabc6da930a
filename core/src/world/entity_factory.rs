use std::{fmt::Debug, hash::Hash};

use thiserror::Error;

use crate::types::{ObjectId, ObjectType};

use super::{ObjectRole, Quaternion, Vec3};

/// The game layer's side of instantiation. The store calls
/// `instantiate` when a replicated object needs a live entity and
/// `destroy` when its record goes away.
pub trait EntityFactory<E: Copy + Eq + Hash + Debug> {
    /// Builds the entity for one replicated object. An unknown type is
    /// an error, not a panic, so creations from version-skewed peers
    /// degrade to a dropped message.
    fn instantiate(
        &mut self,
        object_type: ObjectType,
        object_id: ObjectId,
        role: ObjectRole,
        position: Vec3,
        rotation: Quaternion,
    ) -> Result<E, UnknownObjectType>;

    /// Tears down an entity previously built by `instantiate`.
    fn destroy(&mut self, entity: E);
}

/// The factory has no recipe for this object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no entity recipe for object type {object_type}")]
pub struct UnknownObjectType {
    pub object_type: u32,
}
