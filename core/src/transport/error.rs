/// The transporter could not hand the datagram to the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendError;

/// The transporter failed while polling for inbound traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecvError;

/// Why an outgoing connection attempt died before establishment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConnectFailure {
    #[error("connection attempt timed out")]
    TimedOut,
    #[error("remote peer refused the connection")]
    Refused,
    #[error("remote address unreachable")]
    Unreachable,
    #[error("connection facilitator unavailable")]
    FacilitatorUnavailable,
}
