mod error;
mod message;
mod message_kinds;
mod message_pool;
mod message_router;

pub use error::MessageError;
pub use message::{AnyMessage, Message, MessageMetaData};
pub use message_kinds::{MessageKind, MessageKinds, MessageTypeId};
pub use message_pool::MessagePool;
pub use message_router::MessageRouter;
