//! Shared buffer of collected records and the persisted cursor
//!
//! The buffer, the cursor and the phase each sit behind their own mutex.
//! Critical sections only copy data in or out; no I/O happens while a lock
//! is held.

use crate::model::AdRecord;
use crate::state::RunPhase;
use crate::HarvestError;
use std::sync::{Mutex, MutexGuard};

/// Records collected during the current run that are not yet all durable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTail {
    /// Buffer index of the first record in `records`
    pub start: usize,
    /// Buffer length at the time the tail was copied
    pub end: usize,
    pub records: Vec<AdRecord>,
}

impl PendingTail {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Pipeline-owned state for one collection run
#[derive(Debug, Default)]
pub struct PipelineState {
    buffer: Mutex<Vec<AdRecord>>,
    cursor: Mutex<usize>,
    phase: Mutex<RunPhase>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the buffer and resets the cursor for a new run
    pub fn reset(&self) {
        lock(&self.buffer).clear();
        *lock(&self.cursor) = 0;
    }

    /// Appends records and returns the new buffer length
    pub fn append(&self, records: &[AdRecord]) -> usize {
        let mut buffer = lock(&self.buffer);
        buffer.extend_from_slice(records);
        buffer.len()
    }

    /// Copies every record past the persisted cursor
    pub fn pending_tail(&self) -> PendingTail {
        let start = *lock(&self.cursor);
        let buffer = lock(&self.buffer);
        let end = buffer.len();
        let records = if start < end {
            buffer[start..].to_vec()
        } else {
            Vec::new()
        };
        PendingTail {
            start,
            end,
            records,
        }
    }

    /// Moves the cursor forward to `position`; never moves it back
    pub fn advance_cursor(&self, position: usize) -> usize {
        let mut cursor = lock(&self.cursor);
        if position > *cursor {
            *cursor = position;
        }
        *cursor
    }

    /// Number of leading buffer records known to be durable
    pub fn persisted(&self) -> usize {
        *lock(&self.cursor)
    }

    /// Total number of records collected in this run
    pub fn buffered(&self) -> usize {
        lock(&self.buffer).len()
    }

    /// Number of collected records not yet durable
    pub fn unflushed(&self) -> usize {
        self.buffered().saturating_sub(self.persisted())
    }

    pub fn phase(&self) -> RunPhase {
        *lock(&self.phase)
    }

    /// Moves the run to `next`, rejecting transitions the lifecycle forbids
    pub fn transition(&self, next: RunPhase) -> Result<(), HarvestError> {
        let mut phase = lock(&self.phase);
        if !phase.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: *phase,
                to: next,
            });
        }
        tracing::debug!("Run phase {} -> {}", *phase, next);
        *phase = next;
        Ok(())
    }
}
