// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A shared, ordered log of view callbacks.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arbor_core::failure::Operation;
use arbor_core::view::ViewId;

/// One callback invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Call {
    /// The view the callback ran for.
    pub view: ViewId,
    /// Which callback ran.
    pub op: Operation,
}

impl Call {
    /// Shorthand constructor.
    #[must_use]
    pub const fn new(view: ViewId, op: Operation) -> Self {
        Self { view, op }
    }
}

/// Thread-safe append-only log shared by many views.
///
/// Cloning is cheap and yields a handle to the same log.
#[derive(Clone, Debug, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl CallLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Call>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a call.
    pub fn record(&self, view: ViewId, op: Operation) {
        self.lock().push(Call::new(view, op));
    }

    /// Snapshot of every call so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().clone()
    }

    /// Number of calls recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns whether no calls were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Views that received `op`, in call order.
    #[must_use]
    pub fn views_for(&self, op: Operation) -> Vec<ViewId> {
        self.lock()
            .iter()
            .filter(|c| c.op == op)
            .map(|c| c.view)
            .collect()
    }

    /// How many times `view` received `op`.
    #[must_use]
    pub fn count(&self, view: ViewId, op: Operation) -> usize {
        self.lock()
            .iter()
            .filter(|c| c.view == view && c.op == op)
            .count()
    }

    /// Index of the first `op` call on `view`.
    #[must_use]
    pub fn position(&self, view: ViewId, op: Operation) -> Option<usize> {
        self.lock()
            .iter()
            .position(|c| c.view == view && c.op == op)
    }

    /// Forgets every recorded call.
    pub fn clear(&self) {
        self.lock().clear();
    }
}
