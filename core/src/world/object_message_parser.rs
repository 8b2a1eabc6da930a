use crate::{
    messages::{MessageKinds, MessageTypeId},
    serde::{ByteReader, Serde},
};

use super::ObjectParseError;

/// Splits an object-scoped payload into its wire tag and body. The tag
/// is validated against the object message registry here, so unknown
/// kinds are caught before any per-object dispatch starts.
pub struct ObjectMessageParser;

impl ObjectMessageParser {
    pub fn parse<'a>(
        kinds: &MessageKinds,
        reader: &mut ByteReader<'a>,
    ) -> Result<(MessageTypeId, &'a [u8]), ObjectParseError> {
        let type_id = MessageTypeId::de(reader)?;
        if kinds.kind_of(type_id).is_none() {
            return Err(ObjectParseError::UnknownKind {
                type_id: type_id.to_u16(),
            });
        }
        Ok((type_id, reader.remaining_bytes()))
    }
}
