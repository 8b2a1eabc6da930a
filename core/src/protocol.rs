use crate::{
    connection::{Ping, Pong},
    messages::{Message, MessageKinds},
    world::{CreateObject, DeleteObject, ToObject},
};

/// Everything two peers must agree on before exchanging traffic: which
/// message types exist and the wire tags they carry. Tags follow
/// registration order, so every peer registers the same types in the
/// same order and then locks the protocol. The replication control
/// messages and the ping pair are pre-registered on the first tags.
pub struct Protocol {
    pub message_kinds: MessageKinds,
    pub object_message_kinds: MessageKinds,
    locked: bool,
}

impl Default for Protocol {
    fn default() -> Self {
        let mut message_kinds = MessageKinds::new();
        message_kinds.add_message::<Ping>();
        message_kinds.add_message::<Pong>();
        message_kinds.add_message::<CreateObject>();
        message_kinds.add_message::<DeleteObject>();
        message_kinds.add_message::<ToObject>();

        Self {
            message_kinds,
            object_message_kinds: MessageKinds::new(),
            locked: false,
        }
    }
}

impl Protocol {
    pub fn builder() -> Self {
        Self::default()
    }

    /// Registers a message type deliverable to connection-level
    /// handlers.
    pub fn add_message<M: Message + Default>(&mut self) -> &mut Self {
        self.check_lock();
        self.message_kinds.add_message::<M>();
        self
    }

    /// Registers a message type deliverable to per-object handlers.
    pub fn add_object_message<M: Message + Default>(&mut self) -> &mut Self {
        self.check_lock();
        self.object_message_kinds.add_message::<M>();
        self
    }

    pub fn lock(&mut self) {
        self.check_lock();
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Panics when the protocol is already locked.
    pub fn check_lock(&self) {
        if self.locked {
            panic!("Protocol already locked!");
        }
    }

    pub fn build(&mut self) -> Self {
        std::mem::take(self)
    }
}
