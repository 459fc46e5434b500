// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Main-thread execution contract.
//!
//! The coordinator never runs view callbacks from the thread that requested
//! them. It posts a [`Task`] to a [`MainThreadExecutor`], which guarantees the
//! task later runs on the single UI thread. Tasks posted from the UI thread
//! itself run in submission order, and always *later*: `post` never runs the
//! task inline.
//!
//! Platform integrations implement [`MainThreadExecutor`] on top of their run
//! loop (a dispatch main queue, a window-message pump, an event-loop proxy).
//! [`QueueExecutor`] is a self-contained implementation for headless use and
//! tests: a FIFO that the owning thread pumps explicitly.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::thread::{self, ThreadId};

use core::fmt;

/// A unit of work for the UI thread.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs posted work later on the UI thread.
pub trait MainThreadExecutor: Send + Sync {
    /// Queues `task` to run on the UI thread.
    ///
    /// Must return without running `task`, even when called on the UI
    /// thread. Safe to call from any thread.
    fn post(&self, task: Task);

    /// Returns whether the calling thread is the UI thread.
    fn is_main_thread(&self) -> bool;
}

/// A FIFO task queue owned by one thread.
///
/// The thread that calls [`new`](Self::new) becomes the UI thread. Any
/// thread may [`post`](MainThreadExecutor::post); the owning thread pumps the
/// queue with [`run_one`](Self::run_one) or
/// [`run_until_idle`](Self::run_until_idle).
///
/// Tasks are popped outside the queue lock, so a running task may post more
/// tasks. Those go to the back of the queue.
pub struct QueueExecutor {
    queue: Mutex<VecDeque<Task>>,
    owner: ThreadId,
}

impl fmt::Debug for QueueExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueExecutor")
            .field("len", &self.len())
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

impl Default for QueueExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueExecutor {
    /// Default cap on tasks run by [`run_until_idle`](Self::run_until_idle).
    pub const DEFAULT_TASK_LIMIT: usize = 100_000;

    /// Creates an empty queue owned by the calling thread.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            owner: thread::current().id(),
        }
    }

    fn pop(&self) -> Option<Task> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    /// Number of queued tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns whether no tasks are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs the oldest queued task, returning `false` if there was none.
    ///
    /// # Panics
    ///
    /// Panics if called from a thread other than the owner.
    pub fn run_one(&self) -> bool {
        assert!(
            self.is_main_thread(),
            "QueueExecutor pumped from a thread that does not own it"
        );
        match self.pop() {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Runs tasks until the queue is empty, including tasks posted by the
    /// tasks themselves. Returns how many ran.
    ///
    /// Stops after [`DEFAULT_TASK_LIMIT`](Self::DEFAULT_TASK_LIMIT) tasks so a
    /// request cycle between views cannot hang the caller.
    ///
    /// # Panics
    ///
    /// Panics if called from a thread other than the owner.
    pub fn run_until_idle(&self) -> usize {
        self.run_until_idle_with_limit(Self::DEFAULT_TASK_LIMIT)
    }

    /// Like [`run_until_idle`](Self::run_until_idle) with an explicit cap.
    ///
    /// # Panics
    ///
    /// Panics if called from a thread other than the owner.
    pub fn run_until_idle_with_limit(&self, limit: usize) -> usize {
        let mut ran = 0;
        while ran < limit && self.run_one() {
            ran += 1;
        }
        if ran == limit && !self.is_empty() {
            tracing::warn!(limit, remaining = self.len(), "task limit reached before idle");
        }
        ran
    }
}

impl MainThreadExecutor for QueueExecutor {
    fn post(&self, task: Task) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(task);
    }

    fn is_main_thread(&self) -> bool {
        thread::current().id() == self.owner
    }
}
