//! A blocking, bounded-only-by-memory MPMC task queue (§4.3), used by the
//! controller to hand rectangles to workers.
//!
//! Modelled directly on the original `queue.c`: a single mutex guards a
//! `VecDeque` and a `destroyed` flag; `dequeue` blocks on a condvar until
//! either an item arrives or the queue is destroyed. `enqueue` after
//! `destroy` is a silent no-op (not an error) — the controller calls
//! `destroy` once, unconditionally, during shutdown, and doesn't want to
//! special-case whichever workers raced it.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

struct Inner<T> {
    items: VecDeque<T>,
    destroyed: bool,
}

/// A blocking FIFO queue shared between the controller (producer) and the
/// worker pool (consumers).
pub struct TaskQueue<T> {
    state: Mutex<Inner<T>>,
    not_empty: Condvar,
}

impl<T> TaskQueue<T> {
    pub fn new() -> TaskQueue<T> {
        TaskQueue {
            state: Mutex::new(Inner {
                items: VecDeque::new(),
                destroyed: false,
            }),
            not_empty: Condvar::new(),
        }
    }

    /// Push an item and wake one waiting consumer. No-op once the queue
    /// has been destroyed.
    pub fn enqueue(&self, item: T) {
        let mut state = self.state.lock().unwrap();
        if state.destroyed {
            return;
        }
        state.items.push_back(item);
        self.not_empty.notify_one();
    }

    /// Block until an item is available or the queue is destroyed.
    /// Returns `None` only when the queue was destroyed and drained.
    pub fn dequeue(&self) -> Option<T> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            if state.destroyed {
                return None;
            }
            state = self.not_empty.wait(state).unwrap();
        }
    }

    /// Mark the queue destroyed and wake every waiting consumer. Items
    /// already queued are still handed out by `dequeue` before it starts
    /// returning `None`; after the queue drains, every blocked/future
    /// `dequeue` returns `None` immediately.
    pub fn destroy(&self) {
        let mut state = self.state.lock().unwrap();
        state.destroyed = true;
        self.not_empty.notify_all();
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.lock().unwrap().destroyed
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for TaskQueue<T> {
    fn default() -> TaskQueue<T> {
        TaskQueue::new()
    }
}
