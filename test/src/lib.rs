pub mod test_protocol;
pub mod test_world;

pub use helpers::*;
pub use test_protocol::{protocol, ChatLine, SetLabel, SetVelocity};
pub use test_world::{crate_type, TestFactory};
