use std::collections::HashMap;

use log::warn;

use crate::serde::{ByteReader, Serde};

use super::{
    AnyMessage, Message, MessageKind, MessageKinds, MessageMetaData, MessagePool, MessageTypeId,
};

type Handler = Box<dyn FnMut(&MessageMetaData, &dyn AnyMessage)>;

/// Dispatches inbound buffers to per-kind handlers after reading the
/// leading wire tag. Unknown tags and malformed payloads are dropped
/// with a log line; they must never take the router down.
#[derive(Default)]
pub struct MessageRouter {
    handlers: HashMap<MessageTypeId, Handler>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler for `M`, keyed by the wire tag inferred
    /// from the payload type. Chainable. Panics when `M` was never
    /// registered, or when `M` already has a handler.
    pub fn on<M: Message>(
        &mut self,
        kinds: &MessageKinds,
        mut handler: impl FnMut(&MessageMetaData, &M) + 'static,
    ) -> &mut Self {
        let Some(type_id) = kinds.type_id_of(MessageKind::of::<M>()) else {
            panic!("Message type not registered!");
        };
        if self.handlers.contains_key(&type_id) {
            panic!("Message handler already registered!");
        }
        let shim: Handler = Box::new(move |meta, message| {
            if let Some(message) = message.as_any().downcast_ref::<M>() {
                handler(meta, message);
            }
        });
        self.handlers.insert(type_id, shim);
        self
    }

    /// Reads the leading wire tag and routes the rest of the buffer.
    pub fn dispatch(
        &mut self,
        kinds: &MessageKinds,
        pool: &mut MessagePool,
        meta: &MessageMetaData,
        reader: &mut ByteReader,
    ) {
        let type_id = match MessageTypeId::de(reader) {
            Ok(type_id) => type_id,
            Err(error) => {
                warn!("dropping a message with an unreadable tag: {}", error);
                return;
            }
        };
        self.dispatch_known(kinds, pool, type_id, meta, reader);
    }

    /// Routes a payload whose wire tag is already read.
    pub fn dispatch_known(
        &mut self,
        kinds: &MessageKinds,
        pool: &mut MessagePool,
        type_id: MessageTypeId,
        meta: &MessageMetaData,
        reader: &mut ByteReader,
    ) {
        let Some(instance) = pool.instance_mut(kinds, type_id) else {
            warn!("dropping a message with unknown type id {:?}", type_id);
            return;
        };
        if let Err(error) = instance.read(reader) {
            warn!("dropping a malformed message of type {:?}: {}", type_id, error);
            return;
        }
        if let Some(handler) = self.handlers.get_mut(&type_id) {
            handler(meta, &*instance);
        }
    }
}
