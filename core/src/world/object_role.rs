use crate::serde::{ByteReader, ByteWriter, Serde, SerdeErr};

/// Which side of the replication relationship a peer holds for one
/// object. The authority originates state-changing messages; observers
/// follow along.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ObjectRole {
    Authority,
    #[default]
    NonAuthoritive,
}

impl Serde for ObjectRole {
    fn ser(&self, writer: &mut ByteWriter) {
        let tag: u8 = match self {
            Self::Authority => 0,
            Self::NonAuthoritive => 1,
        };
        writer.write_byte(tag);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        match reader.read_byte()? {
            0 => Ok(Self::Authority),
            1 => Ok(Self::NonAuthoritive),
            value => Err(SerdeErr::InvalidTag { value }),
        }
    }
}
