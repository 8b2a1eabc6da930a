use super::{error::SerdeErr, reader::ByteReader, writer::ByteWriter, Serde};

/// Variable-length unsigned integer: seven value bits per byte, high bit as
/// the continuation flag. Registry tags and object ids are small in the
/// common case, so they usually cost a single byte on the wire.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct UnsignedVariableInteger {
    value: u64,
}

impl UnsignedVariableInteger {
    pub fn new<T: Into<u64>>(value: T) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn get(&self) -> u64 {
        self.value
    }

    /// Converts to a narrower integer type.
    ///
    /// # Panics
    ///
    /// Panics if the value is out of range for `T`. Wire-facing code should
    /// use `get()` and convert with an explicit error instead.
    pub fn to<T: TryFrom<u64>>(&self) -> T {
        let Ok(value) = T::try_from(self.value) else {
            panic!("UnsignedVariableInteger value is out of range to convert to this type");
        };
        value
    }
}

impl<T: Into<u64>> From<T> for UnsignedVariableInteger {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl Serde for UnsignedVariableInteger {
    fn ser(&self, writer: &mut ByteWriter) {
        let mut value = self.value;
        loop {
            let proceed = value >= 0x80;
            let mut byte = (value & 0x7F) as u8;
            if proceed {
                byte |= 0x80;
            }
            writer.write_byte(byte);
            value >>= 7;
            if !proceed {
                return;
            }
        }
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let mut output: u64 = 0;
        let mut shift: u32 = 0;
        loop {
            let byte = reader.read_byte()?;
            if shift >= 64 {
                return Err(SerdeErr::VarIntTooLarge);
            }
            output |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(Self { value: output });
            }
            shift += 7;
        }
    }
}

// Tests
