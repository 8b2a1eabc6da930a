use crate::{
    messages::Message,
    serde::{ByteReader, ByteWriter, Serde, SerdeErr, UnsignedVariableInteger},
    transport::QosType,
    types::{ObjectId, ObjectType},
};

use super::{ObjectRole, Quaternion, Vec3};

/// Tells a peer to bring a replica into existence. The replay run
/// carries creation-time object messages, each framed as `[wire
/// tag][body]`, applied to the new instance before it activates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateObject {
    pub object_type: ObjectType,
    pub object_id: ObjectId,
    /// Role the receiving peer adopts for the replica.
    pub role: ObjectRole,
    pub position: Vec3,
    pub rotation: Quaternion,
    pub replay: Vec<Vec<u8>>,
}

impl Message for CreateObject {
    const QOS: QosType = QosType::ReliableOrdered;

    fn ser(&self, writer: &mut ByteWriter) {
        self.object_type.ser(writer);
        self.object_id.ser(writer);
        self.role.ser(writer);
        self.position.ser(writer);
        self.rotation.ser(writer);
        UnsignedVariableInteger::new(self.replay.len() as u64).ser(writer);
        for item in &self.replay {
            item.ser(writer);
        }
    }

    fn de(&mut self, reader: &mut ByteReader) -> Result<(), SerdeErr> {
        self.object_type = ObjectType::de(reader)?;
        self.object_id = ObjectId::de(reader)?;
        self.role = ObjectRole::de(reader)?;
        self.position = Vec3::de(reader)?;
        self.rotation = Quaternion::de(reader)?;
        let count = UnsignedVariableInteger::de(reader)?.get();
        // every replay item costs at least one byte, so a count beyond
        // the remaining payload is malformed
        if count > reader.remaining() as u64 {
            return Err(SerdeErr::ValueOutOfRange { value: count });
        }
        self.replay.clear();
        for _ in 0..count {
            self.replay.push(Vec::<u8>::de(reader)?);
        }
        Ok(())
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Tells a peer to drop its replica of one object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteObject {
    pub object_id: ObjectId,
}

impl Message for DeleteObject {
    const QOS: QosType = QosType::ReliableOrdered;

    fn ser(&self, writer: &mut ByteWriter) {
        self.object_id.ser(writer);
    }

    fn de(&mut self, reader: &mut ByteReader) -> Result<(), SerdeErr> {
        self.object_id = ObjectId::de(reader)?;
        Ok(())
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Envelope for one object-scoped message: the target id, then the
/// inner `[wire tag][body]` bytes running to the end of the datagram.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToObject {
    pub object_id: ObjectId,
    pub payload: Vec<u8>,
}

impl Message for ToObject {
    const QOS: QosType = QosType::ReliableOrdered;

    fn ser(&self, writer: &mut ByteWriter) {
        self.object_id.ser(writer);
        writer.write_bytes(&self.payload);
    }

    fn de(&mut self, reader: &mut ByteReader) -> Result<(), SerdeErr> {
        self.object_id = ObjectId::de(reader)?;
        self.payload.clear();
        self.payload.extend_from_slice(reader.remaining_bytes());
        Ok(())
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}
