use thiserror::Error;

use crate::serde::SerdeErr;

use super::UnknownObjectType;

/// Errors from the replicated object store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
    /// An object with this id is already live
    #[error("object id {object_id} is already live")]
    DuplicateObjectId { object_id: u32 },

    /// The store is at its configured limit
    #[error("object store is full at {capacity} live objects")]
    CapacityExceeded { capacity: usize },

    /// The factory has no recipe for the requested type
    #[error(transparent)]
    UnknownType(#[from] UnknownObjectType),
}

/// Errors from parsing an object-scoped payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectParseError {
    /// The payload's header could not be read
    #[error("object message header unreadable: {0}")]
    Malformed(#[from] SerdeErr),

    /// The wire tag names no registered object message kind
    #[error("object message type id {type_id} is not registered")]
    UnknownKind { type_id: u16 },
}
