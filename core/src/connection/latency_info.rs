use std::collections::HashMap;

use super::ConnectionId;

/// Last measured round-trip latency per remote connection, in
/// milliseconds.
#[derive(Debug, Default)]
pub struct LatencyInfo {
    latencies: HashMap<ConnectionId, f32>,
}

impl LatencyInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Round trip to `connection` in milliseconds. Zero when no sample
    /// has arrived yet, and always zero for the local sentinels.
    pub fn latency(&self, connection: ConnectionId) -> f32 {
        if !connection.is_remote() {
            return 0.0;
        }
        self.latencies.get(&connection).copied().unwrap_or(0.0)
    }

    /// Records a fresh sample. Samples against local sentinels are
    /// dropped.
    pub fn update_latency(&mut self, connection: ConnectionId, milliseconds: f32) {
        if !connection.is_remote() {
            return;
        }
        self.latencies.insert(connection, milliseconds);
    }

    /// Forgets the sample for a departed connection.
    pub fn clear(&mut self, connection: ConnectionId) {
        self.latencies.remove(&connection);
    }
}
