//! Lockup id → position table.
//!
//! Each position sits behind its own async mutex. An operation holds that
//! lock from its precondition checks through every suspension point to its
//! final mutation, so two operations on the same position never interleave.
//! Operations on different positions proceed independently.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::Mutex;

use lockup_core::error::NotFoundError;
use lockup_core::types::LockupId;

use crate::position::Position;

pub type PositionHandle = Arc<Mutex<Position>>;

#[derive(Debug)]
pub struct Registry {
    positions: DashMap<LockupId, PositionHandle>,
    next_id: AtomicU64,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            positions: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Next lockup id. Ids are never reused, even if the lock that
    /// allocated one fails.
    pub fn allocate_id(&self) -> LockupId {
        LockupId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn insert(&self, position: Position) -> PositionHandle {
        let id = position.lockup_id();
        let handle = Arc::new(Mutex::new(position));
        self.positions.insert(id, Arc::clone(&handle));
        handle
    }

    pub fn get(&self, id: LockupId) -> Result<PositionHandle, NotFoundError> {
        self.positions
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(NotFoundError::Lockup(id))
    }

    pub fn remove(&self, id: LockupId) -> Option<PositionHandle> {
        self.positions.remove(&id).map(|(_, handle)| handle)
    }

    /// Every live position in id order.
    ///
    /// Cloned out of the map so no shard lock is held while callers await.
    pub fn handles(&self) -> Vec<(LockupId, PositionHandle)> {
        let mut handles: Vec<_> = self
            .positions
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        handles.sort_by_key(|(id, _)| *id);
        handles
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
