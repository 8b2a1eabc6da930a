use std::collections::VecDeque;

use super::{ConnectionId, PoolError};

/// Bounded pool of remote connection ids. Every id exists up front;
/// `take` checks one out for a new connection and `put` returns it for
/// reuse once that connection is gone.
pub struct ConnectionIdPool {
    capacity: usize,
    free: VecDeque<ConnectionId>,
}

impl ConnectionIdPool {
    /// Builds a pool holding the ids `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        let free = (0..capacity)
            .map(|id| ConnectionId::new(id as i32))
            .collect();
        Self { capacity, free }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// How many ids are currently checked out.
    pub fn in_use(&self) -> usize {
        self.capacity - self.free.len()
    }

    /// Checks out the next free id.
    pub fn take(&mut self) -> Result<ConnectionId, PoolError> {
        self.free.pop_front().ok_or(PoolError::Exhausted {
            capacity: self.capacity,
        })
    }

    /// Returns an id for reuse. Ids the pool never issued, and ids
    /// already free, are ignored. Panics on the local sentinels, which
    /// are not pool property.
    pub fn put(&mut self, id: ConnectionId) {
        if !id.is_remote() {
            panic!("Connection id pool only holds remote ids!");
        }
        if id.to_i32() as usize >= self.capacity || self.free.contains(&id) {
            return;
        }
        self.free.push_back(id);
    }
}
