//! Rotating job queue
//!
//! A fixed-size ring of entries with a lock-protected cursor. Each call to
//! [`JobQueue::next`] hands out the entry under the cursor and advances it by
//! one, so callers see the entries in strict rotation regardless of how many
//! threads share the queue.

use std::sync::{Mutex, PoisonError};

use crate::error::QueueError;

/// One hand-out from [`JobQueue::next_dispatch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch<'a, T> {
    /// Zero-based count of hand-outs made before this one
    pub sequence: u64,
    /// Slot index that was handed out
    pub index: usize,
    /// The entry in that slot
    pub entry: &'a T,
}

#[derive(Debug)]
struct Cursor {
    position: usize,
    dispatched: u64,
}

/// Fixed-size rotation of entries with a shared cursor
#[derive(Debug)]
pub struct JobQueue<T> {
    entries: Vec<T>,
    cursor: Mutex<Cursor>,
}

impl<T> JobQueue<T> {
    /// Creates a queue over `entries`, starting at index 0
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Empty` if `entries` is empty.
    pub fn new(entries: Vec<T>) -> Result<Self, QueueError> {
        if entries.is_empty() {
            return Err(QueueError::Empty);
        }
        Ok(Self {
            entries,
            cursor: Mutex::new(Cursor {
                position: 0,
                dispatched: 0,
            }),
        })
    }

    /// Returns the entry under the cursor and advances the cursor
    pub fn next(&self) -> &T {
        self.next_dispatch().entry
    }

    /// Like [`Self::next`], also returning the slot index that was handed out
    pub fn next_indexed(&self) -> (usize, &T) {
        let dispatch = self.next_dispatch();
        (dispatch.index, dispatch.entry)
    }

    /// Fetch-and-advance under the cursor lock.
    ///
    /// The lock is held only for the index arithmetic, never while the
    /// caller uses the entry. `sequence` is unique per call.
    pub fn next_dispatch(&self) -> Dispatch<'_, T> {
        let (sequence, index) = {
            let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
            let index = cursor.position % self.entries.len();
            cursor.position = (index + 1) % self.entries.len();
            let sequence = cursor.dispatched;
            cursor.dispatched += 1;
            (sequence, index)
        };
        Dispatch {
            sequence,
            index,
            entry: &self.entries[index],
        }
    }

    /// Number of slots; always at least one
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`; an empty queue cannot be constructed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over all entries in slot order without touching the cursor
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }
}
