/// Entity bookkeeping for the end-to-end tests.
use slipstream_core::{
    EntityFactory, ObjectId, ObjectRole, ObjectType, Quaternion, UnknownObjectType, Vec3,
};

/// The one object type the test factory has a recipe for.
pub fn crate_type() -> ObjectType {
    ObjectType::new(7)
}

/// Hands out ascending `u32` entities and records every instantiation
/// and teardown for assertions.
pub struct TestFactory {
    next_entity: u32,
    pub spawned: Vec<(u32, ObjectId, ObjectRole)>,
    pub destroyed: Vec<u32>,
}

impl TestFactory {
    pub fn new() -> Self {
        Self {
            next_entity: 100,
            spawned: Vec::new(),
            destroyed: Vec::new(),
        }
    }
}

impl Default for TestFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityFactory<u32> for TestFactory {
    fn instantiate(
        &mut self,
        object_type: ObjectType,
        object_id: ObjectId,
        role: ObjectRole,
        _position: Vec3,
        _rotation: Quaternion,
    ) -> Result<u32, UnknownObjectType> {
        if object_type != crate_type() {
            return Err(UnknownObjectType {
                object_type: object_type.to_u32(),
            });
        }
        let entity = self.next_entity;
        self.next_entity += 1;
        self.spawned.push((entity, object_id, role));
        Ok(entity)
    }

    fn destroy(&mut self, entity: u32) {
        self.destroyed.push(entity);
    }
}
