use super::error::SerdeErr;

/// Cursor over a received payload. Reads never go out of bounds; overruns
/// surface as `SerdeErr::BufferExhausted` so a malformed datagram cannot
/// desynchronize anything past its own dispatch.
pub struct ByteReader<'a> {
    buffer: &'a [u8],
    cursor: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_byte(&mut self) -> Result<u8, SerdeErr> {
        let Some(&byte) = self.buffer.get(self.cursor) else {
            return Err(SerdeErr::BufferExhausted {
                offset: self.cursor,
                requested: 1,
            });
        };
        self.cursor += 1;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], SerdeErr> {
        let end = self.cursor.checked_add(len).ok_or(SerdeErr::BufferExhausted {
            offset: self.cursor,
            requested: len,
        })?;
        if end > self.buffer.len() {
            return Err(SerdeErr::BufferExhausted {
                offset: self.cursor,
                requested: len,
            });
        }
        let slice = &self.buffer[self.cursor..end];
        self.cursor = end;
        Ok(slice)
    }

    /// Consumes and returns everything left in the buffer.
    pub fn remaining_bytes(&mut self) -> &'a [u8] {
        let slice = &self.buffer[self.cursor..];
        self.cursor = self.buffer.len();
        slice
    }
}
