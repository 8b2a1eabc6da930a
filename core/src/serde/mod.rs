mod error;
mod integer;
mod reader;
mod writer;

pub use error::SerdeErr;
pub use integer::UnsignedVariableInteger;
pub use reader::ByteReader;
pub use writer::ByteWriter;

/// Byte-level wire serialization. Multi-byte integers are little-endian;
/// length prefixes and tags are variable-length integers.
pub trait Serde: Sized {
    fn ser(&self, writer: &mut ByteWriter);
    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr>;
}

fn read_array<const N: usize>(reader: &mut ByteReader) -> Result<[u8; N], SerdeErr> {
    let bytes = reader.read_bytes(N)?;
    let mut array = [0u8; N];
    array.copy_from_slice(bytes);
    Ok(array)
}

impl Serde for u8 {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_byte(*self);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        reader.read_byte()
    }
}

impl Serde for u16 {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_bytes(&self.to_le_bytes());
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        Ok(Self::from_le_bytes(read_array(reader)?))
    }
}

impl Serde for u32 {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_bytes(&self.to_le_bytes());
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        Ok(Self::from_le_bytes(read_array(reader)?))
    }
}

impl Serde for u64 {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_bytes(&self.to_le_bytes());
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        Ok(Self::from_le_bytes(read_array(reader)?))
    }
}

impl Serde for i32 {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_bytes(&self.to_le_bytes());
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        Ok(Self::from_le_bytes(read_array(reader)?))
    }
}

impl Serde for f32 {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_bytes(&self.to_le_bytes());
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        Ok(Self::from_le_bytes(read_array(reader)?))
    }
}

impl Serde for bool {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_byte(u8::from(*self));
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        match reader.read_byte()? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(SerdeErr::InvalidTag { value }),
        }
    }
}

impl Serde for Vec<u8> {
    fn ser(&self, writer: &mut ByteWriter) {
        UnsignedVariableInteger::new(self.len() as u64).ser(writer);
        writer.write_bytes(self);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let raw = UnsignedVariableInteger::de(reader)?.get();
        let len = usize::try_from(raw).map_err(|_| SerdeErr::ValueOutOfRange { value: raw })?;
        Ok(reader.read_bytes(len)?.to_vec())
    }
}

impl Serde for String {
    fn ser(&self, writer: &mut ByteWriter) {
        UnsignedVariableInteger::new(self.len() as u64).ser(writer);
        writer.write_bytes(self.as_bytes());
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let raw = UnsignedVariableInteger::de(reader)?.get();
        let len = usize::try_from(raw).map_err(|_| SerdeErr::ValueOutOfRange { value: raw })?;
        let bytes = reader.read_bytes(len)?;
        let text = std::str::from_utf8(bytes).map_err(|_| SerdeErr::InvalidUtf8)?;
        Ok(text.to_string())
    }
}
