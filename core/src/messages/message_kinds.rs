use std::{any::TypeId, collections::HashMap};

use crate::{
    serde::{ByteReader, ByteWriter, Serde, SerdeErr, UnsignedVariableInteger},
    transport::QosType,
};

use super::{AnyMessage, Message, MessageError};

/// Compile-time identity of a message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageKind(TypeId);

impl MessageKind {
    pub fn of<M: Message>() -> Self {
        Self(TypeId::of::<M>())
    }
}

/// Registry-assigned wire tag for a message kind. Serialized as a
/// variable-length integer at the head of every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageTypeId(u16);

impl MessageTypeId {
    pub fn new(value: u16) -> Self {
        Self(value)
    }

    pub fn to_u16(&self) -> u16 {
        self.0
    }
}

impl Serde for MessageTypeId {
    fn ser(&self, writer: &mut ByteWriter) {
        UnsignedVariableInteger::new(self.0).ser(writer);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let raw = UnsignedVariableInteger::de(reader)?.get();
        let value = u16::try_from(raw).map_err(|_| SerdeErr::ValueOutOfRange { value: raw })?;
        Ok(Self(value))
    }
}

fn make_boxed<M: Message + Default>() -> Box<dyn AnyMessage> {
    Box::new(M::default())
}

struct MessageKindEntry {
    kind: MessageKind,
    qos: QosType,
    make: fn() -> Box<dyn AnyMessage>,
}

/// Registry mapping message types to wire tags, delivery qos, and
/// pooled constructors. Wire tags are assigned in registration order,
/// so peers must register the same types in the same order.
#[derive(Default)]
pub struct MessageKinds {
    entries: Vec<MessageKindEntry>,
    by_kind: HashMap<MessageKind, usize>,
}

impl MessageKinds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `M` under the next free wire tag. Panics when `M` is
    /// already registered.
    pub fn add_message<M: Message + Default>(&mut self) {
        let kind = MessageKind::of::<M>();
        if self.by_kind.contains_key(&kind) {
            panic!("Message type already registered!");
        }
        if self.entries.len() > u16::MAX as usize {
            panic!("Message registry is full!");
        }
        self.by_kind.insert(kind, self.entries.len());
        self.entries.push(MessageKindEntry {
            kind,
            qos: M::QOS,
            make: make_boxed::<M>,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains<M: Message>(&self) -> bool {
        self.by_kind.contains_key(&MessageKind::of::<M>())
    }

    /// Wire tag for a registered type.
    pub fn type_id_of(&self, kind: MessageKind) -> Option<MessageTypeId> {
        self.by_kind
            .get(&kind)
            .map(|index| MessageTypeId::new(*index as u16))
    }

    pub fn kind_of(&self, type_id: MessageTypeId) -> Option<MessageKind> {
        self.entry(type_id).map(|entry| entry.kind)
    }

    pub fn qos_of(&self, type_id: MessageTypeId) -> Option<QosType> {
        self.entry(type_id).map(|entry| entry.qos)
    }

    /// Constructs a fresh boxed instance of the kind behind `type_id`.
    pub fn make(&self, type_id: MessageTypeId) -> Option<Box<dyn AnyMessage>> {
        self.entry(type_id).map(|entry| (entry.make)())
    }

    /// Serializes `message` with its leading wire tag, ready to frame
    /// into a datagram.
    pub fn write_message<M: Message>(&self, message: &M) -> Result<Vec<u8>, MessageError> {
        let Some(type_id) = self.type_id_of(MessageKind::of::<M>()) else {
            return Err(MessageError::UnregisteredKind);
        };
        let mut writer = ByteWriter::new();
        type_id.ser(&mut writer);
        message.ser(&mut writer);
        Ok(writer.to_bytes().into_vec())
    }

    fn entry(&self, type_id: MessageTypeId) -> Option<&MessageKindEntry> {
        self.entries.get(type_id.to_u16() as usize)
    }
}
