use std::{collections::HashMap, fmt::Debug, hash::Hash};

use crate::messages::{AnyMessage, Message, MessageKind, MessageMetaData};

use super::ObjectRole;

type ObjectHandler<E> = Box<dyn FnMut(E, &MessageMetaData, &dyn AnyMessage)>;

/// Role-gated handler table for one object instance. Handlers are
/// registered per message type and role; a message arriving while the
/// local instance holds a different role finds no handler and is
/// ignored, which keeps authority-only traffic from acting on
/// observers and the other way around.
pub struct ObjectMessageRouter<E> {
    handlers: HashMap<(MessageKind, ObjectRole), ObjectHandler<E>>,
}

impl<E: Copy + Eq + Hash + Debug + 'static> ObjectMessageRouter<E> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers a handler for `M`, invoked only while the local
    /// instance holds `role`. Chainable. Panics on a duplicate
    /// registration for the same type and role.
    pub fn on<M: Message>(
        &mut self,
        role: ObjectRole,
        mut handler: impl FnMut(E, &MessageMetaData, &M) + 'static,
    ) -> &mut Self {
        let key = (MessageKind::of::<M>(), role);
        if self.handlers.contains_key(&key) {
            panic!("Object message handler already registered!");
        }
        self.handlers.insert(
            key,
            Box::new(move |entity, meta, message| {
                if let Some(message) = message.as_any().downcast_ref::<M>() {
                    handler(entity, meta, message);
                }
            }),
        );
        self
    }

    /// Routes a parsed message to the handler registered for its type
    /// under `local_role`. Returns whether a handler ran.
    pub fn dispatch(
        &mut self,
        local_role: ObjectRole,
        entity: E,
        kind: MessageKind,
        meta: &MessageMetaData,
        message: &dyn AnyMessage,
    ) -> bool {
        match self.handlers.get_mut(&(kind, local_role)) {
            Some(handler) => {
                handler(entity, meta, message);
                true
            }
            None => false,
        }
    }
}
