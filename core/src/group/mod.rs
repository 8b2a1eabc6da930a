mod connection_group;
mod group_router;

pub use connection_group::{ConnectionGroup, GroupEvent};
pub use group_router::TransportGroupRouter;
