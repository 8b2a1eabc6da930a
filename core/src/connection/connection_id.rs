/// Identifies one peer slot for the lifetime of its connection. Remote
/// ids count up from zero out of the bounded pool; the negative values
/// are local sentinels and never name a live link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(i32);

impl ConnectionId {
    /// No peer at all. Stamped on messages that arrived without a
    /// connection, for instance over the connectionless transporter.
    pub const NO_CONNECTION: Self = Self(-2);

    /// This process itself, for messages that never crossed the wire.
    pub const LOCAL: Self = Self(-1);

    pub fn new(value: i32) -> Self {
        Self(value)
    }

    pub fn to_i32(&self) -> i32 {
        self.0
    }

    /// True only for ids naming an actual remote peer.
    pub fn is_remote(&self) -> bool {
        self.0 >= 0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::NO_CONNECTION
    }
}

impl From<i32> for ConnectionId {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl From<ConnectionId> for i32 {
    fn from(value: ConnectionId) -> Self {
        value.0
    }
}
