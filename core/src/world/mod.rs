mod entity_factory;
mod error;
mod object_kinds;
mod object_message_parser;
mod object_message_router;
mod object_role;
mod object_store;
mod replicator;
mod system_messages;
mod transform;

pub use entity_factory::{EntityFactory, UnknownObjectType};
pub use error::{ObjectParseError, StoreError};
pub use object_kinds::ObjectKinds;
pub use object_message_parser::ObjectMessageParser;
pub use object_message_router::ObjectMessageRouter;
pub use object_role::ObjectRole;
pub use object_store::{ObjectMessageSender, ObjectRecord, ReplicatedObjectStore};
pub use replicator::{ReplicationEvent, Replicator};
pub use system_messages::{CreateObject, DeleteObject, ToObject};
pub use transform::{Quaternion, Vec3};
