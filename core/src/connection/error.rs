use thiserror::Error;

use crate::transport::SendError;

/// Errors from the bounded connection id pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Every id the pool was built with is checked out
    #[error("all {capacity} connection ids are checked out")]
    Exhausted { capacity: usize },
}

/// Errors from starting an outgoing connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// No free connection id to assign to the attempt
    #[error("connection id pool exhausted: {0}")]
    PoolExhausted(#[from] PoolError),

    /// The transporter refused to start the attempt
    #[error("transport could not start the connection attempt")]
    TransportSend(SendError),
}
