use thiserror::Error;

/// Errors that can occur while reading values off the wire
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerdeErr {
    /// The payload ended before the value did
    #[error("Buffer exhausted: requested {requested} byte(s) at offset {offset}")]
    BufferExhausted { offset: usize, requested: usize },

    /// A one-byte tag (bool, enum discriminant) held an unknown value
    #[error("Invalid tag value {value}")]
    InvalidTag { value: u8 },

    /// A decoded integer does not fit the field it was read for
    #[error("Value {value} out of range for the target type")]
    ValueOutOfRange { value: u64 },

    /// A variable-length integer ran past 64 bits of payload
    #[error("Variable-length integer exceeds 64 bits")]
    VarIntTooLarge,

    /// String payload was not valid UTF-8
    #[error("Invalid UTF-8 in string payload")]
    InvalidUtf8,
}
