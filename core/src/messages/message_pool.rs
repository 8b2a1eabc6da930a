use std::collections::HashMap;

use super::{AnyMessage, MessageKinds, MessageTypeId};

/// One reusable instance per registered message kind, constructed on
/// first use and cleared before every reuse. Keeps sustained traffic
/// from allocating a fresh buffer per inbound message.
#[derive(Default)]
pub struct MessagePool {
    instances: HashMap<MessageTypeId, Box<dyn AnyMessage>>,
}

impl MessagePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pooled instance for `type_id`, reset and ready to fill.
    /// `None` when no such kind is registered.
    pub fn instance_mut(
        &mut self,
        kinds: &MessageKinds,
        type_id: MessageTypeId,
    ) -> Option<&mut dyn AnyMessage> {
        if !self.instances.contains_key(&type_id) {
            let instance = kinds.make(type_id)?;
            self.instances.insert(type_id, instance);
        }
        match self.instances.get_mut(&type_id) {
            Some(instance) => {
                instance.clear();
                Some(instance.as_mut())
            }
            None => None,
        }
    }
}
