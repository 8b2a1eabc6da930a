use crate::serde::{ByteReader, ByteWriter, Serde, SerdeErr, UnsignedVariableInteger};

fn de_u32_varint(reader: &mut ByteReader) -> Result<u32, SerdeErr> {
    let raw = UnsignedVariableInteger::de(reader)?.get();
    u32::try_from(raw).map_err(|_| SerdeErr::ValueOutOfRange { value: raw })
}

/// Identifies one live replicated entity instance. Unique among
/// currently-live records on a peer; legal to reuse after removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u32);

impl ObjectId {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn to_u32(&self) -> u32 {
        self.0
    }
}

impl From<u32> for ObjectId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<ObjectId> for u32 {
    fn from(value: ObjectId) -> Self {
        value.0
    }
}

impl Serde for ObjectId {
    fn ser(&self, writer: &mut ByteWriter) {
        UnsignedVariableInteger::new(self.0).ser(writer);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        Ok(Self(de_u32_varint(reader)?))
    }
}

/// Names a class of replicable entity; maps to a factory on instantiation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ObjectType(u32);

impl ObjectType {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn to_u32(&self) -> u32 {
        self.0
    }
}

impl From<u32> for ObjectType {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<ObjectType> for u32 {
    fn from(value: ObjectType) -> Self {
        value.0
    }
}

impl Serde for ObjectType {
    fn ser(&self, writer: &mut ByteWriter) {
        UnsignedVariableInteger::new(self.0).ser(writer);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        Ok(Self(de_u32_varint(reader)?))
    }
}

/// Stable cross-session identity for pre-placed entities, mapped to the
/// transient per-run `ObjectId` by the object store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GlobalObjectId(u64);

impl GlobalObjectId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn to_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for GlobalObjectId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<GlobalObjectId> for u64 {
    fn from(value: GlobalObjectId) -> Self {
        value.0
    }
}

/// Names one logical sub-channel multiplexed over a transport connection.
/// Every datagram leads with its group tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TransportGroupId(u8);

impl TransportGroupId {
    /// Plain messages and pings.
    pub const DEFAULT: Self = Self(0);
    /// Object replication traffic.
    pub const OBJECTS: Self = Self(1);

    pub fn new(value: u8) -> Self {
        Self(value)
    }

    pub fn to_u8(&self) -> u8 {
        self.0
    }
}

impl From<u8> for TransportGroupId {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<TransportGroupId> for u8 {
    fn from(value: TransportGroupId) -> Self {
        value.0
    }
}

impl Serde for TransportGroupId {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_byte(self.0);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        Ok(Self(reader.read_byte()?))
    }
}
