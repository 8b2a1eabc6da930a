mod connection_id;
mod error;
mod id_pool;
mod latency_info;
mod manager;
mod ping;

pub use connection_id::ConnectionId;
pub use error::{ConnectError, PoolError};
pub use id_pool::ConnectionIdPool;
pub use latency_info::LatencyInfo;
pub use manager::{
    ConnectCallbacks, ConnectionEvent, ConnectionManager, OnDisconnected, OnEstablished, OnFailure,
};
pub use ping::{Ping, PingStore, Pong};
