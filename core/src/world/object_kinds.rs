use std::{collections::HashMap, fmt::Debug, hash::Hash};

use crate::types::ObjectType;

use super::ObjectMessageRouter;

type Installer<E> = Box<dyn Fn(&mut ObjectMessageRouter<E>)>;

/// Handler installers per replicable object type. When the store
/// creates an instance, the matching installer populates that
/// instance's message router. A type without an installer gets an
/// empty router, which is legal for objects that take no messages.
pub struct ObjectKinds<E> {
    installers: HashMap<ObjectType, Installer<E>>,
}

impl<E: Copy + Eq + Hash + Debug + 'static> ObjectKinds<E> {
    pub fn new() -> Self {
        Self {
            installers: HashMap::new(),
        }
    }

    /// Registers the installer run for every new instance of
    /// `object_type`. Panics when the type already has one.
    pub fn add_object_type(
        &mut self,
        object_type: ObjectType,
        installer: impl Fn(&mut ObjectMessageRouter<E>) + 'static,
    ) {
        if self
            .installers
            .insert(object_type, Box::new(installer))
            .is_some()
        {
            panic!("Object type already registered!");
        }
    }

    pub fn contains(&self, object_type: ObjectType) -> bool {
        self.installers.contains_key(&object_type)
    }

    /// Builds a populated router for one new instance of `object_type`.
    pub(crate) fn install(&self, object_type: ObjectType) -> ObjectMessageRouter<E> {
        let mut router = ObjectMessageRouter::new();
        if let Some(installer) = self.installers.get(&object_type) {
            installer(&mut router);
        }
        router
    }
}
