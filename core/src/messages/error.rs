use thiserror::Error;

/// Errors from sending messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MessageError {
    /// Kind was never registered
    #[error("message kind not registered. Register the type with Protocol::add_message() before sending")]
    UnregisteredKind,

    /// Target connection is not established
    #[error("connection {connection} is not established")]
    NotConnected { connection: i32 },

    /// The transporter refused the datagram
    #[error("transport could not carry the datagram to connection {connection}")]
    TransportSend { connection: i32 },

    /// Connectionless sends need a connectionless transporter
    #[error("no connectionless transporter is configured")]
    NoConnectionlessTransport,
}
